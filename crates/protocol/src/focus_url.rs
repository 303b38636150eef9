//! `claude-focus://` URL codec.
//!
//! A focus URL names a terminal backend and the address segments needed to
//! reach one session in it:
//!
//! ```text
//! claude-focus://<terminalType>/<segments>[?action=<action>][&text=<text>]
//! ```
//!
//! Segment count is fixed per terminal type. Segments are percent-encoded so
//! a built URL never contains a raw `|`, which Slack action values use as
//! their field separator.

use thiserror::Error;

use crate::types::{FocusAction, SessionDescriptor, TerminalType};

pub const SCHEME: &str = "claude-focus://";

/// Marker used in Slack action values for sessions addressed by URL instead
/// of by registry id.
pub const DIRECT_URL_PREFIX: &str = "url:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FocusUrlError {
    #[error("session '{0}' has no focus URL to build from")]
    InvalidSession(String),

    #[error("malformed focus URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },
}

/// ssh host plus tmux target for sessions living on another machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTmux {
    pub link_id: Option<String>,
    pub host: String,
    pub user: String,
    pub port: u16,
    pub tmux_target: String,
}

/// Typed address segments, one variant per terminal type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusAddress {
    Tmux { target: String },
    ITerm2 { session_id: String },
    Terminal { tty: String },
    ITermTmux { tty: String, tmux_target: String },
    SshLinked(RemoteTmux),
    SshTmux(RemoteTmux),
    JupyterTmux(RemoteTmux),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFocusUrl {
    pub terminal_type: TerminalType,
    pub address: FocusAddress,
    /// Raw action value; membership in the action set is checked by callers.
    pub action: Option<String>,
    pub text: Option<String>,
}

/// Build the URL for `session`, optionally carrying `action`.
///
/// `None` and [`FocusAction::Focus`] yield the bare base URL. Any other action
/// replaces the existing query string with `action=<action>`.
pub fn build(
    session: &SessionDescriptor,
    action: Option<FocusAction>,
) -> Result<String, FocusUrlError> {
    if session.focus_url.trim().is_empty() {
        return Err(FocusUrlError::InvalidSession(session.label().to_string()));
    }
    Ok(with_action(&session.focus_url, action))
}

/// Replace the query string of `url` according to `action`.
pub fn with_action(url: &str, action: Option<FocusAction>) -> String {
    let base = strip_query(url);
    match action {
        None | Some(FocusAction::Focus) => base.to_string(),
        Some(action) => format!("{base}?action={action}"),
    }
}

/// Replace the query string of `url` with `action` plus literal input `text`.
pub fn with_text(url: &str, action: FocusAction, text: &str) -> String {
    format!(
        "{}?action={}&text={}",
        strip_query(url),
        action,
        urlencoding::encode(text)
    )
}

/// Base URL without any query string.
pub fn strip_query(url: &str) -> &str {
    match url.split_once('?') {
        Some((base, _)) => base,
        None => url,
    }
}

/// Recompute a base URL from a descriptor's terminal type and target.
///
/// Composite targets: `iterm-tmux` is `<tty>|<tmuxTarget>`, the ssh-style
/// types are their slash-joined segment list. Returns `None` when the target
/// does not fit the type.
pub fn url_for_target(terminal_type: TerminalType, target: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }

    let segments: Vec<&str> = match terminal_type {
        TerminalType::Tmux | TerminalType::ITerm2 | TerminalType::Terminal => vec![target],
        TerminalType::ITermTmux => {
            let (tty, tmux) = target.split_once('|')?;
            vec![tty, tmux]
        }
        TerminalType::SshTmux => {
            let parts: Vec<&str> = target.split('/').collect();
            (parts.len() == 4).then_some(parts)?
        }
        TerminalType::SshLinked | TerminalType::JupyterTmux => {
            let parts: Vec<&str> = target.split('/').collect();
            (parts.len() == 5).then_some(parts)?
        }
    };

    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    let encoded: Vec<String> = segments.iter().map(|s| encode_segment(s)).collect();
    Some(format!("{SCHEME}{}/{}", terminal_type, encoded.join("/")))
}

/// Strip the `url:` prefix of direct action values and undo a whole-URL
/// percent-encoding, yielding a plain `claude-focus://` URL.
pub fn normalize(url: &str) -> Result<String, FocusUrlError> {
    let raw = url.trim();
    let raw = raw.strip_prefix(DIRECT_URL_PREFIX).unwrap_or(raw);
    if raw.starts_with(SCHEME) {
        return Ok(raw.to_string());
    }

    let decoded = urlencoding::decode(raw).map_err(|_| FocusUrlError::MalformedUrl {
        url: url.to_string(),
        reason: "invalid percent-encoding".to_string(),
    })?;
    if !decoded.starts_with(SCHEME) {
        return Err(FocusUrlError::MalformedUrl {
            url: url.to_string(),
            reason: "missing claude-focus:// scheme".to_string(),
        });
    }
    Ok(decoded.into_owned())
}

/// Parse a focus URL, tolerating the `url:` prefix of direct action values
/// and a fully percent-encoded URL.
pub fn parse(url: &str) -> Result<ParsedFocusUrl, FocusUrlError> {
    let malformed = |reason: &str| FocusUrlError::MalformedUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let normalized = normalize(url)?;
    let rest = &normalized[SCHEME.len()..];
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let (type_str, address) = path
        .split_once('/')
        .ok_or_else(|| malformed("missing address segments"))?;
    let terminal_type: TerminalType = type_str.parse().map_err(|e: String| malformed(&e))?;
    if address.is_empty() {
        return Err(malformed("missing address segments"));
    }

    let address = parse_address(terminal_type, address).map_err(|reason| malformed(&reason))?;

    let mut action = None;
    let mut text = None;
    for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "action" => action = Some(decode(value).map_err(|reason| malformed(&reason))?),
            "text" => text = Some(decode(value).map_err(|reason| malformed(&reason))?),
            _ => {}
        }
    }

    Ok(ParsedFocusUrl {
        terminal_type,
        address,
        action,
        text,
    })
}

fn parse_address(terminal_type: TerminalType, address: &str) -> Result<FocusAddress, String> {
    match terminal_type {
        TerminalType::Tmux => Ok(FocusAddress::Tmux {
            target: decode(single_segment(address)?)?,
        }),
        TerminalType::ITerm2 => Ok(FocusAddress::ITerm2 {
            session_id: decode(single_segment(address)?)?,
        }),
        // A raw TTY path keeps its slashes.
        TerminalType::Terminal => Ok(FocusAddress::Terminal {
            tty: decode(address)?,
        }),
        TerminalType::ITermTmux => {
            let (tty, tmux_target) = address
                .rsplit_once('/')
                .ok_or_else(|| "iterm-tmux needs <tty>/<tmuxTarget>".to_string())?;
            if tty.is_empty() || tmux_target.is_empty() {
                return Err("iterm-tmux needs <tty>/<tmuxTarget>".to_string());
            }
            Ok(FocusAddress::ITermTmux {
                tty: decode(tty)?,
                tmux_target: decode(tmux_target)?,
            })
        }
        TerminalType::SshTmux => {
            let segments = decode_segments(address, 4)?;
            Ok(FocusAddress::SshTmux(remote_from(None, &segments[..])?))
        }
        TerminalType::SshLinked | TerminalType::JupyterTmux => {
            let segments = decode_segments(address, 5)?;
            let remote = remote_from(Some(segments[0].clone()), &segments[1..])?;
            if terminal_type == TerminalType::SshLinked {
                Ok(FocusAddress::SshLinked(remote))
            } else {
                Ok(FocusAddress::JupyterTmux(remote))
            }
        }
    }
}

fn single_segment(address: &str) -> Result<&str, String> {
    if address.contains('/') {
        return Err(format!(
            "expected 1 address segment, found {}",
            address.split('/').count()
        ));
    }
    Ok(address)
}

fn decode_segments(address: &str, expected: usize) -> Result<Vec<String>, String> {
    let segments: Vec<&str> = address.split('/').collect();
    if segments.len() != expected {
        return Err(format!(
            "expected {expected} address segments, found {}",
            segments.len()
        ));
    }
    if segments.iter().any(|s| s.is_empty()) {
        return Err("empty address segment".to_string());
    }
    segments.into_iter().map(decode).collect()
}

/// `host/user/port/tmuxTarget`
fn remote_from(link_id: Option<String>, segments: &[String]) -> Result<RemoteTmux, String> {
    let port = segments[2]
        .parse::<u16>()
        .map_err(|_| format!("invalid port '{}'", segments[2]))?;
    // Both end up on the ssh command line.
    for (what, value) in [("host", &segments[0]), ("user", &segments[1])] {
        if value.starts_with('-') {
            return Err(format!("{what} may not start with '-': '{value}'"));
        }
    }
    Ok(RemoteTmux {
        link_id,
        host: segments[0].clone(),
        user: segments[1].clone(),
        port,
        tmux_target: segments[3].clone(),
    })
}

fn decode(value: &str) -> Result<String, String> {
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .map_err(|_| format!("invalid percent-encoding in '{value}'"))
}

/// Percent-encode one address segment, leaving tmux/iTerm punctuation readable.
///
/// `urlencoding::encode` escapes `:` and `@`; those two are restored so a
/// target like `main:0.0` stays as written.
fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment)
        .replace("%3A", ":")
        .replace("%40", "@")
}
