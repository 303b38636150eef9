//! Central path resolution for all claude-focus data files.
//!
//! The data dir is resolved once at startup from: CLI `--data-dir` >
//! `CLAUDE_FOCUS_DATA_DIR` env > `~/.claude-focus`. Everything else hangs off it.

use std::io;
use std::path::{Path, PathBuf};

/// Helper path relative to the remote user's home on the paired Mac.
pub const REMOTE_HELPER_PATH: &str = ".claude-focus/bin/claude-focus-helper";

/// Resolve the data directory.
///
/// Priority: `explicit` arg > `CLAUDE_FOCUS_DATA_DIR` env > `~/.claude-focus` default.
pub fn resolve_data_dir(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Ok(env_val) = std::env::var("CLAUDE_FOCUS_DATA_DIR") {
        if !env_val.trim().is_empty() {
            return Ok(PathBuf::from(env_val));
        }
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("HOME directory not found"))?;
    Ok(home.join(".claude-focus"))
}

/// One JSON descriptor per live session.
pub fn instances_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("instances")
}

/// One JSON mapping per Slack notification thread.
pub fn threads_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("threads")
}

pub fn activity_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("activity")
}

pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

/// Existence of this file means "forward GUI work to the paired Mac".
pub fn reverse_link_path(data_dir: &Path) -> PathBuf {
    data_dir.join("reverse-link.json")
}

pub fn helper_path(data_dir: &Path) -> PathBuf {
    data_dir.join("bin").join("claude-focus-helper")
}

/// Create the directories the server writes into.
///
/// `instances/` and `threads/` belong to the registration hook and are
/// deliberately left alone; a missing one just means "nothing registered".
pub fn ensure_dirs(data_dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::create_dir_all(log_dir(data_dir))?;
    std::fs::create_dir_all(activity_dir(data_dir))?;
    Ok(())
}
