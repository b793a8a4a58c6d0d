use tokio::sync::watch;

use crate::identity::{IdentityHub, IdentityState};
use crate::store::MovieStore;

/// Shared application state
///
/// Owned by the application root and handed to every handler; there is no global store.
#[derive(Clone)]
pub struct AppState {
    pub store: MovieStore,
    pub identity_hub: IdentityHub,
    pub identity: watch::Receiver<IdentityState>,
}

impl AppState {
    pub fn new(
        store: MovieStore,
        identity_hub: IdentityHub,
        identity: watch::Receiver<IdentityState>,
    ) -> Self {
        Self {
            store,
            identity_hub,
            identity,
        }
    }
}
