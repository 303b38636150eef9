//! macOS focus helper: an external executable that takes one
//! `claude-focus://` URL, drives iTerm2/Terminal.app via AppleScript, and
//! exits 0 on success.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::{FocusError, FocusOutcome};
use crate::process;

#[derive(Debug, Clone)]
pub struct HelperAdapter {
    path: PathBuf,
    timeout: Duration,
}

impl HelperAdapter {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    /// Liveness check: the helper only exists on a configured Mac.
    pub fn is_available(&self) -> bool {
        self.path.is_file()
    }

    /// Hand `url` to the helper as its only argument.
    pub async fn open_url(&self, url: &str) -> FocusOutcome {
        if !self.is_available() {
            return Err(FocusError::AdapterUnavailable(format!(
                "focus helper not available on this machine ({} missing)",
                self.path.display()
            )));
        }

        let program = self.path.to_string_lossy();
        let output = process::run_checked(&program, [url], self.timeout).await?;

        info!(
            component = "helper",
            event = "helper.completed",
            url = url,
            duration_ms = output.duration_ms,
        );
        Ok(format!("Focus helper handled {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fake_executable, invocations};

    #[tokio::test]
    async fn missing_helper_is_unavailable() {
        let tmp = tempfile::tempdir().unwrap();
        let helper = HelperAdapter::new(tmp.path().join("claude-focus-helper"), Duration::from_secs(5));
        let err = helper
            .open_url("claude-focus://iterm2/ABCD")
            .await
            .unwrap_err();
        assert!(matches!(err, FocusError::AdapterUnavailable(_)));
    }

    #[tokio::test]
    async fn passes_url_as_sole_argument() {
        let tmp = tempfile::tempdir().unwrap();
        let path = fake_executable(tmp.path(), "helper", "[ \"$#\" -eq 1 ] || exit 9");
        let helper = HelperAdapter::new(path, Duration::from_secs(5));

        helper
            .open_url("claude-focus://terminal/frontmost?action=continue")
            .await
            .unwrap();
        assert_eq!(
            invocations(tmp.path(), "helper"),
            vec!["claude-focus://terminal/frontmost?action=continue"]
        );
    }

    #[tokio::test]
    async fn helper_failure_carries_its_output() {
        let tmp = tempfile::tempdir().unwrap();
        let path = fake_executable(tmp.path(), "helper", "echo 'no iTerm2 session ABCD'; exit 2");
        let helper = HelperAdapter::new(path, Duration::from_secs(5));

        let err = helper
            .open_url("claude-focus://iterm2/ABCD")
            .await
            .unwrap_err();
        match err {
            FocusError::NonZeroExit { code, detail, .. } => {
                assert_eq!(code, Some(2));
                assert_eq!(detail, "no iTerm2 session ABCD");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hung_helper_is_killed_at_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let path = fake_executable(tmp.path(), "helper", "sleep 30");
        let helper = HelperAdapter::new(path, Duration::from_millis(300));

        let err = helper
            .open_url("claude-focus://iterm2/ABCD")
            .await
            .unwrap_err();
        assert!(matches!(err, FocusError::ProcessTimeout { .. }));
    }
}
