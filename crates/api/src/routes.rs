use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;

use crate::handlers::{health, tenant};
use crate::middleware::{hostname_actions, resolve_environment};
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Tenant-aware routes: environment first, then hostname actions
    let tenant_routes = Router::new()
        .route("/api/tenant", get(tenant::current_tenant))
        .layer(from_fn_with_state(state.clone(), hostname_actions))
        .layer(from_fn_with_state(state.clone(), resolve_environment));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(tenant_routes)
        .with_state(state)
}
