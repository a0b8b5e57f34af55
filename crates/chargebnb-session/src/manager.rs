//! Session state manager.
//!
//! One [`SessionHandle`] is created at application start and cloned into
//! every view that needs the current identity. Clones share the same state.
//! Views that re-render on sign-in/sign-out hold a [`SessionWatch`].

use std::sync::Arc;

use chargebnb_core::Identity;
use tokio::sync::watch;

use crate::gate::{self, Gated};

/// Change feed of the current identity. `changed().await` resolves after
/// every `login` or `logout` that altered the identity.
pub type SessionWatch = watch::Receiver<Option<Identity>>;

/// Shared handle to the application's session state.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: Arc<watch::Sender<Option<Identity>>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    /// Creates an anonymous session.
    #[must_use]
    pub fn new() -> Self {
        Self::from_state(None)
    }

    /// Creates a session that starts signed in as `identity`.
    ///
    /// Used to compose views under a known user in tests.
    #[must_use]
    pub fn with_identity(identity: Identity) -> Self {
        Self::from_state(Some(identity))
    }

    fn from_state(initial: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Snapshot of the current identity.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Replaces the current identity. The identity is trusted as given.
    pub fn login(&self, identity: Identity) {
        let changed = self.state.send_if_modified(|current| {
            if current.as_ref() == Some(&identity) {
                return false;
            }
            *current = Some(identity);
            true
        });
        if changed {
            tracing::info!("session login");
        }
    }

    /// Clears the current identity. Calling it while anonymous is a no-op.
    pub fn logout(&self) {
        let changed = self.state.send_if_modified(|current| current.take().is_some());
        if changed {
            tracing::info!("session logout");
        }
    }

    /// Subscribes to identity changes.
    #[must_use]
    pub fn subscribe(&self) -> SessionWatch {
        self.state.subscribe()
    }

    /// Gates `view` on the current identity.
    pub fn require_identity<V>(&self, view: V) -> Gated<V> {
        gate::require_identity(self.state.borrow().as_ref(), view)
    }

    /// Like [`require_identity`](Self::require_identity), but only builds the
    /// view when a user is signed in.
    pub fn require_identity_with<V, F>(&self, render: F) -> Gated<V>
    where
        F: FnOnce(&Identity) -> V,
    {
        let identity = self.current_identity();
        match identity {
            Some(identity) => Gated::Allowed(render(&identity)),
            None => Gated::LoginRequired,
        }
    }
}
