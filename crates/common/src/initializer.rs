//! Process-wide, once-per-network vendor SDK initialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::{Lazy, OnceCell};
use serde::Serialize;

static GLOBAL: Lazy<Arc<InitRegistry>> = Lazy::new(|| Arc::new(InitRegistry::new()));

/// What [`InitRegistry::ensure_initialized`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InitOutcome {
    /// This call ran the vendor initialization.
    Initialized,
    /// An earlier call with the same identity already did.
    AlreadyInitialized,
    /// An earlier call used a different identity, which stays in effect.
    IdentityMismatch { first: String },
}

/// Registry of initialized networks keyed by network name.
///
/// The first caller for a network runs the init closure; concurrent callers
/// for the same network block until it finishes, later callers are no-ops.
/// Different networks initialize independently.
#[derive(Debug, Default)]
pub struct InitRegistry {
    networks: Mutex<HashMap<&'static str, Arc<OnceCell<String>>>>,
}

impl InitRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by every adapter in the process.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    pub fn ensure_initialized<F>(&self, network: &'static str, identity: &str, init: F) -> InitOutcome
    where
        F: FnOnce(&str),
    {
        let cell = {
            let mut networks = self
                .networks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(networks.entry(network).or_default())
        };

        let mut ran = false;
        let first = cell.get_or_init(|| {
            log::info!("Initializing {} with identity '{}'", network, identity);
            init(identity);
            ran = true;
            identity.to_string()
        });

        if ran {
            InitOutcome::Initialized
        } else if first == identity {
            InitOutcome::AlreadyInitialized
        } else {
            log::warn!(
                "{} already initialized with '{}', ignoring identity '{}'",
                network,
                first,
                identity
            );
            InitOutcome::IdentityMismatch {
                first: first.clone(),
            }
        }
    }

    /// Identity the network was first initialized with.
    #[must_use]
    pub fn identity(&self, network: &str) -> Option<String> {
        let networks = self
            .networks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        networks.get(network).and_then(|cell| cell.get().cloned())
    }

    #[must_use]
    pub fn is_initialized(&self, network: &str) -> bool {
        self.identity(network).is_some()
    }
}
