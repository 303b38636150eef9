//! Session registry backed by the `instances/` directory.
//!
//! Every call reads a fresh snapshot of the directory. Files are parsed
//! independently: a corrupt or incomplete descriptor drops only itself.

use std::path::{Path, PathBuf};

use claude_focus_protocol::focus_url;
use claude_focus_protocol::SessionDescriptor;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionQuery {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionRegistry {
    dir: PathBuf,
}

impl SessionRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All well-formed sessions, newest `registeredAt` first.
    pub fn list_sessions(&self, filter: &SessionFilter) -> Vec<SessionDescriptor> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(
                    component = "registry",
                    event = "registry.read_dir_failed",
                    dir = %self.dir.display(),
                    error = %e,
                );
                return Vec::new();
            }
        };

        let mut sessions: Vec<SessionDescriptor> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| load_descriptor(&path))
            .filter(|session| match filter.hostname.as_deref() {
                Some(hostname) => session.hostname == hostname,
                None => true,
            })
            .collect();

        // Stable: equal timestamps keep enumeration order.
        sessions.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        sessions
    }

    /// Look up one session. `id` wins over `name`; an empty query matches nothing.
    pub fn get_session(&self, query: &SessionQuery) -> Option<SessionDescriptor> {
        let id = query.id.as_deref().filter(|s| !s.is_empty());
        let name = query.name.as_deref().filter(|s| !s.is_empty());

        let sessions = match (id, name) {
            (None, None) => return None,
            _ => self.list_sessions(&SessionFilter::default()),
        };

        match id {
            Some(id) => sessions.into_iter().find(|s| s.id == id),
            None => sessions.into_iter().find(|s| Some(s.name.as_str()) == name),
        }
    }
}

fn load_descriptor(path: &Path) -> Option<SessionDescriptor> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(
                component = "registry",
                event = "registry.descriptor_unreadable",
                path = %path.display(),
                error = %e,
            );
            return None;
        }
    };

    let mut session = match serde_json::from_str::<SessionDescriptor>(&raw) {
        Ok(session) => session,
        Err(e) => {
            debug!(
                component = "registry",
                event = "registry.descriptor_corrupt",
                path = %path.display(),
                error = %e,
            );
            return None;
        }
    };

    if session.id.trim().is_empty() {
        return None;
    }

    if session.focus_url.trim().is_empty() {
        if let Some(url) = focus_url::url_for_target(session.terminal_type, &session.terminal_target)
        {
            session.focus_url = url;
        }
    }

    Some(session)
}
