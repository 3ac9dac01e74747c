//! Shared application state.

use sprout_engine::{AggregationEngine, ProgressionEngine};
use sprout_storage::SqliteStore;

use crate::auth::AuthKeys;
use crate::push::PushClient;

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// The SQLite store (shared pool)
    pub store: SqliteStore,
    /// Progression engine over the same pool
    pub progression: ProgressionEngine<SqliteStore>,
    /// Aggregation engine over the same pool
    pub aggregation: AggregationEngine<SqliteStore>,
    /// JWT signing material
    pub auth: AuthKeys,
    /// Expo push client
    pub push: PushClient,
}

impl AppState {
    /// Assemble the state around one store handle.
    pub fn new(store: SqliteStore, auth: AuthKeys) -> Self {
        Self {
            progression: ProgressionEngine::new(store.clone()),
            aggregation: AggregationEngine::new(store.clone()),
            store,
            auth,
            push: PushClient::new(),
        }
    }
}
