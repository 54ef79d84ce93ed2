//! Axum router wiring.

use axum::{routing::get, Router};

use crate::app_state::AppState;
use crate::handlers::{greet, vars};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(greet::greet))
        .route(vars::DEBUG_VARS_PATH, get(vars::debug_vars))
        .with_state(state)
}
