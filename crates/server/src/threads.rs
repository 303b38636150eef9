//! Read-only lookup of Slack thread → session mappings.
//!
//! The notifier writes `threads/<thread_ts>.json` when it first posts; we
//! only ever read them.

use std::path::PathBuf;

use claude_focus_protocol::ThreadMapping;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ThreadStore {
    dir: PathBuf,
}

impl ThreadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn get(&self, thread_ts: &str) -> Option<ThreadMapping> {
        // Slack timestamps are `<seconds>.<micros>`; anything else could escape the dir.
        if thread_ts.is_empty() || !thread_ts.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }

        let path = self.dir.join(format!("{thread_ts}.json"));
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<ThreadMapping>(&raw) {
            Ok(mapping) if mapping.thread_ts == thread_ts => Some(mapping),
            Ok(_) => {
                debug!(
                    component = "threads",
                    event = "threads.mapping_mismatch",
                    path = %path.display(),
                );
                None
            }
            Err(e) => {
                debug!(
                    component = "threads",
                    event = "threads.mapping_corrupt",
                    path = %path.display(),
                    error = %e,
                );
                None
            }
        }
    }
}
