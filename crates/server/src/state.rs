//! Application state

use std::sync::Arc;

use crate::activity::ActivityLog;
use crate::config::FocusConfig;
use crate::dispatcher::Dispatcher;
use crate::registry::SessionRegistry;
use crate::threads::ThreadStore;

/// Shared, read-only state for webhook handlers.
///
/// Registry and thread lookups hit the filesystem on every call, so there is
/// nothing here to lock.
pub struct AppState {
    pub config: Arc<FocusConfig>,
    pub registry: SessionRegistry,
    pub threads: ThreadStore,
    pub activity: ActivityLog,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: Arc<FocusConfig>) -> Self {
        Self {
            registry: SessionRegistry::new(config.instances_dir.clone()),
            threads: ThreadStore::new(config.threads_dir.clone()),
            activity: ActivityLog::new(config.activity_dir.clone()),
            dispatcher: Dispatcher::new(config.clone()),
            config,
        }
    }
}
