//! Terminal backends behind one `{focus, send_input}` capability.

pub mod helper;
pub mod tmux;

use claude_focus_protocol::focus_url;
use claude_focus_protocol::{FocusAction, FocusUrlError, TerminalType};

use crate::error::{FocusError, FocusOutcome};

pub use helper::HelperAdapter;
pub use tmux::TmuxAdapter;

/// A backend selected by the URL's declared terminal type.
#[derive(Debug, Clone)]
pub enum TerminalAdapter {
    Tmux(TmuxAdapter),
    ITerm2(HelperAdapter),
    Terminal(HelperAdapter),
}

impl TerminalAdapter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tmux(_) => "tmux",
            Self::ITerm2(_) => "iterm2",
            Self::Terminal(_) => "terminal",
        }
    }

    pub async fn focus(&self, target: &str) -> FocusOutcome {
        match self {
            Self::Tmux(tmux) => tmux.focus(target).await,
            Self::ITerm2(helper) => {
                let url = helper_url(TerminalType::ITerm2, target)?;
                helper.open_url(&url).await
            }
            Self::Terminal(helper) => {
                let url = helper_url(TerminalType::Terminal, target)?;
                helper.open_url(&url).await
            }
        }
    }

    /// Submit `text`. The Mac helper focuses before typing on its own.
    pub async fn send_input(&self, target: &str, text: &str) -> FocusOutcome {
        match self {
            Self::Tmux(tmux) => tmux.send_input(target, text).await,
            Self::ITerm2(helper) => {
                let url = helper_url(TerminalType::ITerm2, target)?;
                helper
                    .open_url(&focus_url::with_text(&url, FocusAction::Focus, text))
                    .await
            }
            Self::Terminal(helper) => {
                let url = helper_url(TerminalType::Terminal, target)?;
                helper
                    .open_url(&focus_url::with_text(&url, FocusAction::Focus, text))
                    .await
            }
        }
    }

    /// Focus, then submit `input` if there is any.
    pub async fn activate(&self, target: &str, input: Option<&str>) -> FocusOutcome {
        match (self, input) {
            (Self::Tmux(tmux), Some(text)) => {
                tmux.focus(target).await?;
                tmux.send_input(target, text).await
            }
            (_, Some(text)) => self.send_input(target, text).await,
            (_, None) => self.focus(target).await,
        }
    }
}

fn helper_url(terminal_type: TerminalType, target: &str) -> Result<String, FocusError> {
    focus_url::url_for_target(terminal_type, target).ok_or_else(|| {
        FocusError::Url(FocusUrlError::MalformedUrl {
            url: format!("{}{terminal_type}/", focus_url::SCHEME),
            reason: format!("empty {terminal_type} target"),
        })
    })
}
