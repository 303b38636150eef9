//! Last-interaction markers, one file per session under `activity/`.
//!
//! The notifier uses these to suppress pings for sessions someone is already
//! driving from Slack.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

#[derive(Debug, Clone)]
pub struct ActivityLog {
    dir: PathBuf,
}

impl ActivityLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Best effort: failures are logged and swallowed.
    pub fn touch(&self, instance_id: &str) {
        if instance_id.is_empty() || instance_id.contains(['/', '\\']) || instance_id.starts_with('.')
        {
            return;
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let result = std::fs::create_dir_all(&self.dir)
            .and_then(|_| std::fs::write(self.dir.join(instance_id), now.to_string()));

        if let Err(e) = result {
            warn!(
                component = "activity",
                event = "activity.touch_failed",
                instance_id = instance_id,
                error = %e,
            );
        }
    }
}
