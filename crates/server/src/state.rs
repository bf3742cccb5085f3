//! Shared application state.

use std::sync::Arc;

use engine::{ResourceRegistry, StoreSet};

use crate::auth::{AllowAll, Authorizer};
use crate::config::ServerConfig;

/// Read-only registry and stores shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ResourceRegistry>,
    pub stores: Arc<StoreSet>,
    pub config: Arc<ServerConfig>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    /// Build state from a finished registry; repositories are resolved per
    /// descriptor (custom ones win over the generic in-memory table).
    pub fn new(registry: ResourceRegistry, config: ServerConfig) -> Self {
        let registry = Arc::new(registry);
        let stores = Arc::new(StoreSet::for_registry(&registry));
        Self {
            registry,
            stores,
            config: Arc::new(config),
            authorizer: Arc::new(AllowAll),
        }
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }
}
