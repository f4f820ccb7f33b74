//! Application session context.
//!
//! [`ChatContext`] bundles the state shared by every use case of one
//! session. It is created once at startup and handed to use cases by
//! value (it is a cheap handle).
//!
//! Locks are held only between suspension points, never across an `.await`
//! on the network, so a stream in flight never blocks the UI from reading.

use rosti_domain::{ChatStore, RetryState};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Shared handle to the conversation store and the retry state.
#[derive(Clone, Default)]
pub struct ChatContext {
    store: Arc<Mutex<ChatStore>>,
    retry_state: Arc<Mutex<RetryState>>,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context around an existing store (e.g. with preferences applied).
    pub fn with_store(store: ChatStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            retry_state: Arc::default(),
        }
    }

    /// Lock the conversation store.
    pub async fn store(&self) -> MutexGuard<'_, ChatStore> {
        self.store.lock().await
    }

    /// Lock the retry state.
    pub async fn retry_state(&self) -> MutexGuard<'_, RetryState> {
        self.retry_state.lock().await
    }

    /// Shared handle to the retry state, for a retry controller.
    pub fn retry_state_handle(&self) -> Arc<Mutex<RetryState>> {
        Arc::clone(&self.retry_state)
    }

    /// Copy of the retry state, for display.
    pub async fn retry_snapshot(&self) -> RetryState {
        self.retry_state.lock().await.clone()
    }
}
