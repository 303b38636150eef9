//! Reverse-link forwarding: run the focus helper on the paired Mac over ssh.
//!
//! Used when this machine is a headless relay. An unreachable Mac must fail
//! within the ssh connect timeout, well inside Slack's response budget.

use std::time::Duration;

use claude_focus_protocol::{FocusResult, ReverseLinkConfig};
use tracing::{info, warn};

use crate::config::{FocusConfig, SshSettings};
use crate::error::{FocusError, FocusOutcome};
use crate::ssh::{self, shell_quote, SshTarget};

#[derive(Debug, Clone)]
pub struct Forwarder {
    ssh: SshSettings,
    remote_helper_path: String,
    helper_timeout: Duration,
}

impl Forwarder {
    pub fn new(ssh: SshSettings, remote_helper_path: impl Into<String>, helper_timeout: Duration) -> Self {
        Self {
            ssh,
            remote_helper_path: remote_helper_path.into(),
            helper_timeout,
        }
    }

    pub fn from_config(config: &FocusConfig) -> Self {
        Self::new(
            config.ssh.clone(),
            config.remote_helper_path.clone(),
            config.helper_timeout,
        )
    }

    pub async fn forward(&self, link: &ReverseLinkConfig, focus_url: &str) -> FocusResult {
        match self.try_forward(link, focus_url).await {
            Ok(message) => {
                info!(
                    component = "forwarder",
                    event = "forwarder.delivered",
                    host = %link.mac_host,
                    url = focus_url,
                );
                FocusResult::ok(message)
            }
            Err(e) => {
                let kind = match &e {
                    FocusError::RemoteUnreachable { .. } => "unreachable",
                    FocusError::NonZeroExit { .. } => "helper_failed",
                    FocusError::ProcessTimeout { .. } => "timeout",
                    _ => "other",
                };
                warn!(
                    component = "forwarder",
                    event = "forwarder.failed",
                    host = %link.mac_host,
                    url = focus_url,
                    kind = kind,
                    error = %e,
                );
                FocusResult::failed(e.to_string())
            }
        }
    }

    async fn try_forward(&self, link: &ReverseLinkConfig, focus_url: &str) -> FocusOutcome {
        let target = SshTarget {
            user: &link.mac_user,
            host: &link.mac_host,
            port: link.mac_port,
        };
        let command = format!("{} {}", self.helper_command(), shell_quote(focus_url));
        ssh::run_remote(&self.ssh, &target, &command, self.helper_timeout).await?;
        Ok(format!("Forwarded to {}", target.destination()))
    }

    /// Relative helper paths resolve against the remote `$HOME`.
    fn helper_command(&self) -> String {
        if self.remote_helper_path.starts_with('/') {
            shell_quote(&self.remote_helper_path)
        } else {
            format!("\"$HOME\"/{}", shell_quote(&self.remote_helper_path))
        }
    }
}
