// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The shared client handle.
//
// Handlers take a reference-counted clone and keep it for their whole body.
// An `initialize` that installs a new client while other actions are in
// flight lets those finish against the client they acquired.

use std::sync::{Arc, PoisonError, RwLock};

use amplibridge_core::error::{BridgeError, Result};
use amplibridge_native::AnalyticsClient;

/// Single acquisition point for the live client.
#[derive(Default)]
pub struct ClientSlot {
    client: RwLock<Option<Arc<dyn AnalyticsClient>>>,
}

impl ClientSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current client, or `NotInitialized`.
    pub fn acquire(&self) -> Result<Arc<dyn AnalyticsClient>> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(BridgeError::NotInitialized)
    }

    /// Replace the client, returning the previous one.
    pub fn install(&self, client: Arc<dyn AnalyticsClient>) -> Option<Arc<dyn AnalyticsClient>> {
        self.client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(client)
    }

    pub fn is_initialized(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl std::fmt::Debug for ClientSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSlot")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
