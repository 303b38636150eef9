//! tmux backend: pane focus and text submission over the server socket.
//!
//! Input uses a fixed five-step sequence:
//! literal text, 500ms, Escape, 100ms, Enter.
//! The downstream agent needs the 500ms to finish consuming a pasted block;
//! Escape clears any editing mode the paste left active; Enter must be a
//! separate keystroke, a trailing newline inside the paste is not treated as
//! submit. Do not reorder the steps or shorten the waits.

use std::time::Duration;

use claude_focus_protocol::RemoteTmux;
use tracing::{debug, info};

use crate::config::{SshSettings, TmuxSettings};
use crate::error::{FocusError, FocusOutcome};
use crate::process::{self, ProcessOutput};
use crate::ssh::{self, shell_quote, SshTarget};

pub const PASTE_SETTLE: Duration = Duration::from_millis(500);
pub const ESCAPE_SETTLE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct TmuxAdapter {
    settings: TmuxSettings,
    ssh: SshSettings,
}

impl TmuxAdapter {
    pub fn new(settings: TmuxSettings, ssh: SshSettings) -> Self {
        Self { settings, ssh }
    }

    /// The local server is reachable only when its socket file exists.
    pub fn is_available(&self) -> bool {
        self.settings.socket.exists()
    }

    fn require_socket(&self) -> Result<(), FocusError> {
        if self.is_available() {
            Ok(())
        } else {
            Err(FocusError::AdapterUnavailable(format!(
                "tmux socket not found at {}",
                self.settings.socket.display()
            )))
        }
    }

    async fn tmux(&self, args: &[&str]) -> Result<ProcessOutput, FocusError> {
        let socket = self.settings.socket.to_string_lossy();
        let mut full = vec!["-S", socket.as_ref()];
        full.extend_from_slice(args);
        process::run_checked(&self.settings.binary, &full, self.settings.command_timeout).await
    }

    /// Bring `session:window.pane` forward.
    ///
    /// An attached client is switched to the window so whoever watches that
    /// terminal sees it; without one the window is selected on the server.
    /// The pane is always selected explicitly.
    pub async fn focus(&self, target: &str) -> FocusOutcome {
        self.require_socket()?;
        let (session, window) = split_target(target);

        let clients = self
            .tmux(&["list-clients", "-t", session, "-F", "#{client_tty}"])
            .await?;
        let client = clients
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty());

        match client {
            Some(client) => {
                debug!(
                    component = "tmux",
                    event = "tmux.switch_client",
                    client = client,
                    window = window,
                );
                self.tmux(&["switch-client", "-c", client, "-t", window])
                    .await?;
            }
            None => {
                self.tmux(&["select-window", "-t", window]).await?;
            }
        }
        self.tmux(&["select-pane", "-t", target]).await?;

        Ok(format!("Focused tmux pane {target}"))
    }

    /// Type `text` into `target` and submit it. Stops at the first failing step.
    pub async fn send_input(&self, target: &str, text: &str) -> FocusOutcome {
        self.require_socket()?;

        self.tmux(&["send-keys", "-t", target, "-l", "--", text])
            .await?;
        tokio::time::sleep(PASTE_SETTLE).await;
        self.tmux(&["send-keys", "-t", target, "Escape"]).await?;
        tokio::time::sleep(ESCAPE_SETTLE).await;
        self.tmux(&["send-keys", "-t", target, "Enter"]).await?;

        info!(
            component = "tmux",
            event = "tmux.input_sent",
            target = target,
            chars = text.chars().count(),
        );
        Ok(format!("Sent input to tmux pane {target}"))
    }

    async fn remote(&self, remote: &RemoteTmux, command: &str) -> Result<ProcessOutput, FocusError> {
        let target = SshTarget {
            user: &remote.user,
            host: &remote.host,
            port: remote.port,
        };
        ssh::run_remote(&self.ssh, &target, command, self.settings.command_timeout).await
    }

    /// [`focus`](Self::focus) for a tmux server on another host.
    pub async fn switch_remote_tmux(&self, remote: &RemoteTmux) -> FocusOutcome {
        let (session, window) = split_target(&remote.tmux_target);
        let command = format!(
            "c=$(tmux list-clients -t {session} -F '#{{client_tty}}' | head -n 1); \
             if [ -n \"$c\" ]; then tmux switch-client -c \"$c\" -t {window}; \
             else tmux select-window -t {window}; fi && tmux select-pane -t {target}",
            session = shell_quote(session),
            window = shell_quote(window),
            target = shell_quote(&remote.tmux_target),
        );
        self.remote(remote, &command).await?;
        Ok(format!(
            "Focused tmux pane {} on {}",
            remote.tmux_target, remote.host
        ))
    }

    /// [`send_input`](Self::send_input) for a tmux server on another host,
    /// with the same steps and waits.
    pub async fn send_remote_tmux_input(&self, remote: &RemoteTmux, text: &str) -> FocusOutcome {
        let target = shell_quote(&remote.tmux_target);

        self.remote(
            remote,
            &format!("tmux send-keys -t {target} -l -- {}", shell_quote(text)),
        )
        .await?;
        tokio::time::sleep(PASTE_SETTLE).await;
        self.remote(remote, &format!("tmux send-keys -t {target} Escape"))
            .await?;
        tokio::time::sleep(ESCAPE_SETTLE).await;
        self.remote(remote, &format!("tmux send-keys -t {target} Enter"))
            .await?;

        info!(
            component = "tmux",
            event = "tmux.remote_input_sent",
            host = %remote.host,
            target = %remote.tmux_target,
            chars = text.chars().count(),
        );
        Ok(format!(
            "Sent input to tmux pane {} on {}",
            remote.tmux_target, remote.host
        ))
    }
}

/// `main:1.2` → (`main`, `main:1`). A bare session name is its own window.
fn split_target(target: &str) -> (&str, &str) {
    let Some((session, rest)) = target.split_once(':') else {
        return (target, target);
    };
    let window = match rest.rfind('.') {
        Some(dot) => &target[..session.len() + 1 + dot],
        None => target,
    };
    (session, window)
}
