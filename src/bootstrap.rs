//! Wires identity events into the store and mounts the application once
//!
//! Every auth state change commits the user into the store. The first change, which
//! is the provider's initial resolution, also triggers the mount callback. Nothing is
//! mounted while the identity is still pending, so a returning user is never shown
//! as signed out just because their session had not been restored yet.

use tokio::sync::watch;

use crate::{
    identity::{IdentityEvents, IdentityState},
    models::User,
    store::MovieStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Mounted,
}

pub struct Bootstrap<M> {
    store: MovieStore,
    identity: watch::Sender<IdentityState>,
    mount: Option<M>,
}

impl<M> Bootstrap<M>
where
    M: FnOnce(&IdentityState) + Send,
{
    pub fn new(store: MovieStore, identity: watch::Sender<IdentityState>, mount: M) -> Self {
        Self {
            store,
            identity,
            mount: Some(mount),
        }
    }

    pub fn mount_state(&self) -> MountState {
        if self.mount.is_some() {
            MountState::Unmounted
        } else {
            MountState::Mounted
        }
    }

    /// Applies one auth state change
    pub async fn handle(&mut self, user: Option<User>) {
        tracing::info!(
            user_id = user.as_ref().map(|u| u.uid.as_str()).unwrap_or("-"),
            mount = ?self.mount_state(),
            "Auth state changed"
        );

        self.store.set_user(user.clone()).await;
        let state = IdentityState::from(user);
        self.identity.send_replace(state.clone());

        if let Some(mount) = self.mount.take() {
            tracing::info!("Identity resolved, mounting application");
            mount(&state);
        }
    }

    /// Consumes auth state changes until the stream closes
    pub async fn run(mut self, mut events: IdentityEvents) {
        while let Some(user) = events.next().await {
            self.handle(user).await;
        }
        tracing::debug!("Identity stream closed");
    }
}
