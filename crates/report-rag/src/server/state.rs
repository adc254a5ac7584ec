//! Shared state for the HTTP server

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::error::{Error, Result};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
    active_build: Arc<Mutex<Option<CancellationToken>>>,
}

/// Clears the active build slot when the build ends
pub struct BuildGuard {
    slot: Arc<Mutex<Option<CancellationToken>>>,
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

impl AppState {
    /// Create new application state
    pub fn new(context: Arc<AppContext>) -> Self {
        Self {
            context,
            active_build: Arc::new(Mutex::new(None)),
        }
    }

    /// Get the application context
    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    /// Check if an index is loaded
    pub fn is_ready(&self) -> bool {
        self.context.binding().is_ready()
    }

    /// Register a new build and hand out its cancellation token
    pub fn begin_build(&self) -> Result<(CancellationToken, BuildGuard)> {
        let mut slot = self.active_build.lock();
        if slot.is_some() {
            return Err(Error::BuildInProgress);
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        Ok((
            token,
            BuildGuard {
                slot: self.active_build.clone(),
            },
        ))
    }

    /// Cancel the running build; returns false when none is running
    pub fn cancel_build(&self) -> bool {
        match self.active_build.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}
