//! Process-wide configuration, resolved once at startup.
//!
//! The dispatcher, forwarder and router receive this by `Arc`; nothing reads
//! the environment or the reverse-link file per request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use claude_focus_protocol::ReverseLinkConfig;
use tracing::{info, warn};

use crate::paths;

pub const HELPER_TIMEOUT: Duration = Duration::from_secs(30);
pub const TMUX_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
pub const SSH_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the multiplexer binary and its server socket live.
#[derive(Debug, Clone)]
pub struct TmuxSettings {
    pub binary: String,
    pub socket: PathBuf,
    pub command_timeout: Duration,
}

impl TmuxSettings {
    /// Platform defaults: Homebrew's tmux and `/private/tmp` on macOS, `PATH`
    /// and `/tmp` elsewhere. The socket directory is keyed by numeric uid.
    pub fn detect() -> Self {
        // SAFETY: getuid has no preconditions and cannot fail.
        let uid = unsafe { libc::getuid() };

        let (binary, socket) = if cfg!(target_os = "macos") {
            let binary = ["/opt/homebrew/bin/tmux", "/usr/local/bin/tmux"]
                .iter()
                .find(|p| Path::new(p).exists())
                .map(|p| p.to_string())
                .unwrap_or_else(|| "tmux".to_string());
            (binary, PathBuf::from(format!("/private/tmp/tmux-{uid}/default")))
        } else {
            ("tmux".to_string(), PathBuf::from(format!("/tmp/tmux-{uid}/default")))
        };

        Self {
            binary,
            socket,
            command_timeout: TMUX_COMMAND_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SshSettings {
    pub binary: String,
    pub connect_timeout: Duration,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            binary: "ssh".to_string(),
            connect_timeout: SSH_CONNECT_TIMEOUT,
        }
    }
}

/// Values that may come from the command line instead of defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub helper_path: Option<PathBuf>,
    pub signing_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FocusConfig {
    pub data_dir: PathBuf,
    pub instances_dir: PathBuf,
    pub threads_dir: PathBuf,
    pub activity_dir: PathBuf,
    pub helper_path: PathBuf,
    pub helper_timeout: Duration,
    pub remote_helper_path: String,
    pub tmux: TmuxSettings,
    pub ssh: SshSettings,
    pub reverse_link: ReverseLink,
    pub signing_secret: Option<String>,
}

impl FocusConfig {
    pub fn resolve(data_dir: &Path, overrides: ConfigOverrides) -> Self {
        let reverse_link = load_reverse_link(&paths::reverse_link_path(data_dir));
        let config = Self {
            data_dir: data_dir.to_path_buf(),
            instances_dir: paths::instances_dir(data_dir),
            threads_dir: paths::threads_dir(data_dir),
            activity_dir: paths::activity_dir(data_dir),
            helper_path: overrides
                .helper_path
                .unwrap_or_else(|| paths::helper_path(data_dir)),
            helper_timeout: HELPER_TIMEOUT,
            remote_helper_path: paths::REMOTE_HELPER_PATH.to_string(),
            tmux: TmuxSettings::detect(),
            ssh: SshSettings::default(),
            reverse_link,
            signing_secret: overrides.signing_secret.filter(|s| !s.is_empty()),
        };

        info!(
            component = "config",
            event = "config.resolved",
            data_dir = %config.data_dir.display(),
            helper_path = %config.helper_path.display(),
            tmux_socket = %config.tmux.socket.display(),
            reverse_link = %config.reverse_link,
            signature_check = config.signing_secret.is_some(),
        );

        config
    }
}

/// State of `reverse-link.json`.
///
/// The file existing at all means this machine has no GUI, so an unreadable
/// file is not the same as a missing one: nothing may run locally.
#[derive(Debug, Clone, PartialEq)]
pub enum ReverseLink {
    Absent,
    Configured(ReverseLinkConfig),
    Invalid(String),
}

impl ReverseLink {
    pub fn configured(&self) -> Option<&ReverseLinkConfig> {
        match self {
            Self::Configured(link) => Some(link),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReverseLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => f.write_str("none"),
            Self::Configured(link) => write!(f, "{}@{}:{}", link.mac_user, link.mac_host, link.mac_port),
            Self::Invalid(reason) => write!(f, "invalid ({reason})"),
        }
    }
}

pub fn load_reverse_link(path: &Path) -> ReverseLink {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ReverseLink::Absent,
        Err(e) => {
            warn!(
                component = "config",
                event = "config.reverse_link_unreadable",
                path = %path.display(),
                error = %e,
            );
            return ReverseLink::Invalid(e.to_string());
        }
    };

    match serde_json::from_str::<ReverseLinkConfig>(&raw) {
        Ok(link) => ReverseLink::Configured(link),
        Err(e) => {
            warn!(
                component = "config",
                event = "config.reverse_link_invalid",
                path = %path.display(),
                error = %e,
                "Reverse link file is not valid JSON; focus requests will fail until it is fixed"
            );
            ReverseLink::Invalid(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_reverse_link_means_local() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            load_reverse_link(&tmp.path().join("reverse-link.json")),
            ReverseLink::Absent
        );
    }

    #[test]
    fn reverse_link_file_enables_forwarding() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            paths::reverse_link_path(tmp.path()),
            r#"{"mac_user":"rob","mac_host":"studio.local","mac_port":2200}"#,
        )
        .unwrap();

        let config = FocusConfig::resolve(tmp.path(), ConfigOverrides::default());
        let link = config.reverse_link.configured().expect("expected reverse link");
        assert_eq!(link.mac_host, "studio.local");
        assert_eq!(link.mac_port, 2200);
        assert_eq!(config.instances_dir, tmp.path().join("instances"));
    }

    #[test]
    fn garbage_reverse_link_is_invalid_not_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reverse-link.json");
        std::fs::write(&path, "mac_host=studio").unwrap();
        assert!(matches!(load_reverse_link(&path), ReverseLink::Invalid(_)));
    }

    #[test]
    fn empty_signing_secret_disables_check() {
        let tmp = tempfile::tempdir().unwrap();
        let config = FocusConfig::resolve(
            tmp.path(),
            ConfigOverrides {
                helper_path: Some(PathBuf::from("/opt/focus/helper")),
                signing_secret: Some(String::new()),
            },
        );
        assert!(config.signing_secret.is_none());
        assert_eq!(config.helper_path, PathBuf::from("/opt/focus/helper"));
    }
}
