use std::sync::Arc;

use crate::database::{TeamStore, UserDirectory};
use crate::services::identity_service::IdentityProvider;

/// Shared handles injected into every handler through `web::Data`
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserDirectory>,
    pub teams: Arc<dyn TeamStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        teams: Arc<dyn TeamStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            users,
            teams,
            identity,
        }
    }
}

#[cfg(test)]
impl AppState {
    /// State over a fresh in-memory store, returned alongside it for assertions.
    pub fn in_memory(
        identity: crate::services::identity_service::StaticIdentityProvider,
    ) -> (Self, Arc<crate::database::memory::MemoryStore>) {
        let store = Arc::new(crate::database::memory::MemoryStore::new());
        let state = Self::new(store.clone(), store.clone(), Arc::new(identity));
        (state, store)
    }
}
