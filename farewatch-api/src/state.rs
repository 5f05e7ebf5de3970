use std::sync::Arc;

use farewatch_core::ports::{AlertQueue, AlertRepository, SearchRequestRepository};
use farewatch_engine::pagination::PaginationEngine;

#[derive(Clone)]
pub struct AuthConfig {
    pub admin_token: String,
    pub manual_triggers_enabled: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub alerts: Arc<dyn AlertRepository>,
    pub requests: Arc<dyn SearchRequestRepository>,
    pub queue: Arc<dyn AlertQueue>,
    pub pagination: Arc<PaginationEngine>,
    pub auth: AuthConfig,
}
