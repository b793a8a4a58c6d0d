//! Identity observation
//!
//! The identity provider itself (sign-in flows, tokens, persisted sessions) lives
//! outside this crate. What arrives here is its stream of auth state changes: one
//! `Option<User>` per transition, starting with the initial resolution.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::User;

/// What is known about the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "user", rename_all = "snake_case")]
pub enum IdentityState {
    /// The provider has not reported anything yet
    Pending,
    SignedOut,
    SignedIn(User),
}

impl IdentityState {
    pub fn user(&self) -> Option<&User> {
        match self {
            IdentityState::SignedIn(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, IdentityState::Pending)
    }
}

impl From<Option<User>> for IdentityState {
    fn from(user: Option<User>) -> Self {
        match user {
            Some(user) => IdentityState::SignedIn(user),
            None => IdentityState::SignedOut,
        }
    }
}

/// Publishing side of the auth state stream
#[derive(Clone)]
pub struct IdentityHub {
    tx: mpsc::UnboundedSender<Option<User>>,
}

/// Receiving side of the auth state stream
pub struct IdentityEvents {
    rx: mpsc::UnboundedReceiver<Option<User>>,
}

impl IdentityHub {
    pub fn channel() -> (Self, IdentityEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, IdentityEvents { rx })
    }

    /// Emits an auth state change; `None` means signed out.
    /// Returns false once nobody is observing.
    pub fn publish(&self, user: Option<User>) -> bool {
        match self.tx.send(user) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("Identity event dropped, no observer");
                false
            }
        }
    }
}

impl IdentityEvents {
    /// Next auth state change, or `None` when every hub is gone
    pub async fn next(&mut self) -> Option<Option<User>> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_event() {
        assert_eq!(IdentityState::from(None), IdentityState::SignedOut);

        let state = IdentityState::from(Some(User::new("alice")));
        assert_eq!(state.user().map(|u| u.uid.as_str()), Some("alice"));
        assert!(state.is_resolved());
        assert!(!IdentityState::Pending.is_resolved());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(IdentityState::Pending).unwrap();
        assert_eq!(json["status"], "pending");

        let json = serde_json::to_value(IdentityState::SignedIn(User::new("alice"))).unwrap();
        assert_eq!(json["status"], "signed_in");
        assert_eq!(json["user"]["uid"], "alice");
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (hub, mut events) = IdentityHub::channel();
        assert!(hub.publish(None));
        assert!(hub.publish(Some(User::new("alice"))));

        assert_eq!(events.next().await, Some(None));
        assert_eq!(events.next().await, Some(Some(User::new("alice"))));

        drop(hub);
        assert_eq!(events.next().await, None);
    }

    #[test]
    fn test_publish_without_observer() {
        let (hub, events) = IdentityHub::channel();
        drop(events);
        assert!(!hub.publish(None));
    }
}
