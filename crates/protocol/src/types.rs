//! Core types shared between the webhook server and its tooling

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal backend a session lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminalType {
    #[serde(rename = "iterm2")]
    ITerm2,
    #[serde(rename = "terminal")]
    Terminal,
    #[serde(rename = "tmux")]
    Tmux,
    #[serde(rename = "iterm-tmux")]
    ITermTmux,
    #[serde(rename = "ssh-linked")]
    SshLinked,
    #[serde(rename = "ssh-tmux")]
    SshTmux,
    #[serde(rename = "jupyter-tmux")]
    JupyterTmux,
}

impl TerminalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ITerm2 => "iterm2",
            Self::Terminal => "terminal",
            Self::Tmux => "tmux",
            Self::ITermTmux => "iterm-tmux",
            Self::SshLinked => "ssh-linked",
            Self::SshTmux => "ssh-tmux",
            Self::JupyterTmux => "jupyter-tmux",
        }
    }
}

impl fmt::Display for TerminalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerminalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iterm2" => Ok(Self::ITerm2),
            "terminal" => Ok(Self::Terminal),
            "tmux" => Ok(Self::Tmux),
            "iterm-tmux" => Ok(Self::ITermTmux),
            "ssh-linked" => Ok(Self::SshLinked),
            "ssh-tmux" => Ok(Self::SshTmux),
            "jupyter-tmux" => Ok(Self::JupyterTmux),
            other => Err(format!("unknown terminal type: {other}")),
        }
    }
}

/// Closed set of actions a Slack button can request.
///
/// `Focus` is the no-op action: it only brings the session forward. Every
/// other action additionally types its [`input_text`](Self::input_text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusAction {
    Focus,
    One,
    Two,
    Continue,
    Push,
}

impl FocusAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::One => "1",
            Self::Two => "2",
            Self::Continue => "continue",
            Self::Push => "push",
        }
    }

    /// Literal input delivered to the session after focusing.
    pub fn input_text(&self) -> Option<&'static str> {
        match self {
            Self::Focus => None,
            Self::One => Some("1"),
            Self::Two => Some("2"),
            Self::Continue => Some("continue"),
            Self::Push => Some("push"),
        }
    }
}

impl fmt::Display for FocusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FocusAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(Self::Focus),
            "1" => Ok(Self::One),
            "2" => Ok(Self::Two),
            "continue" => Ok(Self::Continue),
            "push" => Ok(Self::Push),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// One live interactive session, as written by the registration hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDescriptor {
    pub id: String,
    pub name: String,
    pub hostname: String,
    pub terminal_type: TerminalType,
    pub terminal_target: String,
    #[serde(default)]
    pub focus_url: String,
    pub registered_at: DateTime<Utc>,
}

impl SessionDescriptor {
    /// Name when present, otherwise the id. Used in user-facing messages.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Maps a Slack thread to the session its notification was posted for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMapping {
    pub thread_ts: String,
    pub instance_id: String,
    pub focus_url: String,
    #[serde(default)]
    pub term_type: Option<TerminalType>,
}

/// Paired GUI machine that focus operations are forwarded to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseLinkConfig {
    pub mac_user: String,
    pub mac_host: String,
    #[serde(default = "default_ssh_port")]
    pub mac_port: u16,
}

fn default_ssh_port() -> u16 {
    22
}

/// Uniform outcome of a focus/input operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusResult {
    pub success: bool,
    pub message: String,
}

impl FocusResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
