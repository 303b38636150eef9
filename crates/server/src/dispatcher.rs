//! Turns a focus request into local adapter calls or a reverse-link forward.

use std::sync::Arc;

use claude_focus_protocol::focus_url;
use claude_focus_protocol::{
    FocusAction, FocusAddress, FocusResult, ParsedFocusUrl, RemoteTmux, SessionDescriptor,
    TerminalType,
};
use tracing::{debug, info, warn};

use crate::adapters::{HelperAdapter, TerminalAdapter, TmuxAdapter};
use crate::config::{FocusConfig, ReverseLink};
use crate::error::{FocusError, FocusOutcome};
use crate::forwarder::Forwarder;

/// What to focus: a registered session or a raw focus URL.
#[derive(Debug, Clone)]
pub enum FocusTarget {
    Url(String),
    Session(SessionDescriptor),
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: Arc<FocusConfig>,
    tmux: TmuxAdapter,
    helper: HelperAdapter,
    forwarder: Forwarder,
}

impl Dispatcher {
    pub fn new(config: Arc<FocusConfig>) -> Self {
        let tmux = TmuxAdapter::new(config.tmux.clone(), config.ssh.clone());
        let helper = HelperAdapter::new(config.helper_path.clone(), config.helper_timeout);
        let forwarder = Forwarder::from_config(&config);
        Self {
            config,
            tmux,
            helper,
            forwarder,
        }
    }

    /// Run one focus request. Never fails: every error becomes `success: false`.
    pub async fn execute(
        &self,
        target: &FocusTarget,
        action: FocusAction,
        text: Option<&str>,
    ) -> FocusResult {
        let url = match resolve_url(target, action, text) {
            Ok(url) => url,
            Err(e) => return FocusResult::failed(e.to_string()),
        };

        match &self.config.reverse_link {
            ReverseLink::Configured(link) => return self.forwarder.forward(link, &url).await,
            ReverseLink::Invalid(reason) => {
                warn!(
                    component = "dispatcher",
                    event = "dispatcher.reverse_link_invalid",
                    url = %url,
                    error = %reason,
                );
                return FocusResult::failed(format!("reverse link config unreadable: {reason}"));
            }
            ReverseLink::Absent => {}
        }

        match self.run_local(&url).await {
            Ok(message) => {
                info!(
                    component = "dispatcher",
                    event = "dispatcher.focused",
                    url = %url,
                    message = %message,
                );
                FocusResult::ok(message)
            }
            Err(e) => {
                warn!(
                    component = "dispatcher",
                    event = "dispatcher.failed",
                    url = %url,
                    error = %e,
                );
                FocusResult::failed(e.to_string())
            }
        }
    }

    fn adapter_for(&self, terminal_type: TerminalType) -> Option<TerminalAdapter> {
        match terminal_type {
            TerminalType::Tmux => Some(TerminalAdapter::Tmux(self.tmux.clone())),
            TerminalType::ITerm2 => Some(TerminalAdapter::ITerm2(self.helper.clone())),
            TerminalType::Terminal => Some(TerminalAdapter::Terminal(self.helper.clone())),
            _ => None,
        }
    }

    async fn run_local(&self, url: &str) -> FocusOutcome {
        let parsed = focus_url::parse(url)?;
        let input = input_for(&parsed)?;
        let input = input.as_deref();

        match &parsed.address {
            FocusAddress::Tmux { target: address }
            | FocusAddress::ITerm2 {
                session_id: address,
            }
            | FocusAddress::Terminal { tty: address } => {
                let adapter = self.adapter_for(parsed.terminal_type).ok_or_else(|| {
                    FocusError::AdapterUnavailable(format!(
                        "no adapter for {}",
                        parsed.terminal_type
                    ))
                })?;
                debug!(
                    component = "dispatcher",
                    event = "dispatcher.adapter_selected",
                    adapter = adapter.name(),
                    target = address.as_str(),
                );
                adapter.activate(address, input).await
            }
            FocusAddress::ITermTmux { .. } => self.helper.open_url(url).await,
            FocusAddress::SshTmux(remote) => self.remote_tmux(remote, input).await,
            FocusAddress::SshLinked(remote) | FocusAddress::JupyterTmux(remote) => {
                if self.helper.is_available() {
                    self.helper.open_url(url).await
                } else {
                    self.remote_tmux(remote, input).await
                }
            }
        }
    }

    async fn remote_tmux(&self, remote: &RemoteTmux, input: Option<&str>) -> FocusOutcome {
        let focused = self.tmux.switch_remote_tmux(remote).await?;
        match input {
            Some(text) => self.tmux.send_remote_tmux_input(remote, text).await,
            None => Ok(focused),
        }
    }
}

/// Effective URL for `target` carrying `action` and, if given, literal `text`.
fn resolve_url(
    target: &FocusTarget,
    action: FocusAction,
    text: Option<&str>,
) -> Result<String, FocusError> {
    match (target, text) {
        (FocusTarget::Session(session), None) => Ok(focus_url::build(session, Some(action))?),
        (FocusTarget::Session(session), Some(text)) => {
            let base = focus_url::build(session, None)?;
            Ok(focus_url::with_text(&base, action, text))
        }
        (FocusTarget::Url(url), None) => {
            Ok(focus_url::with_action(&focus_url::normalize(url)?, Some(action)))
        }
        (FocusTarget::Url(url), Some(text)) => {
            Ok(focus_url::with_text(&focus_url::normalize(url)?, action, text))
        }
    }
}

/// Explicit `text` wins; otherwise the action's own input, if any.
fn input_for(parsed: &ParsedFocusUrl) -> Result<Option<String>, FocusError> {
    let action = match parsed.action.as_deref() {
        Some(raw) => raw
            .parse::<FocusAction>()
            .map_err(FocusError::InvalidAction)?,
        None => FocusAction::Focus,
    };
    Ok(parsed
        .text
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| action.input_text().map(str::to_string)))
}
