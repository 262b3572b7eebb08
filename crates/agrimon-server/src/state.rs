use crate::config::ServerConfig;
use agrimon_engine::runner::RuleRunner;
use agrimon_storage::FarmStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FarmStore>,
    pub runner: Arc<RuleRunner>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the engine against the store's production adapters.
    pub fn new(store: Arc<FarmStore>, config: ServerConfig) -> Self {
        let runner = Arc::new(RuleRunner::new(
            store.clone(),
            Arc::new(store.condition_evaluator()),
            store.clone(),
            std::time::Duration::from_secs(config.engine.rule_timeout_secs),
            agrimon_engine::runner::SystemContext::new("agrimon-server"),
        ));
        Self {
            store,
            runner,
            config: Arc::new(config),
            start_time: Utc::now(),
        }
    }
}
