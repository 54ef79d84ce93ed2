use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use varz_core::exposition;

use crate::app_state::AppState;

/// Path scrapers poll. Part of the compatibility contract; do not rename.
pub const DEBUG_VARS_PATH: &str = "/debug/vars";

/// Re-snapshot on every call; no caching.
///
/// Rendering reads `/proc/self/status` and runs `Func` closures, so it stays
/// off the async workers.
pub async fn debug_vars(State(state): State<AppState>) -> Response {
    let rendered =
        tokio::task::spawn_blocking(move || exposition::render(state.registry(), state.runtime()))
            .await;
    let rendered = match rendered {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "exposition task failed");
            return error_response("INTERNAL", &e.to_string());
        }
    };
    match rendered {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "exposition failed");
            error_response(e.code().as_str(), &e.to_string())
        }
    }
}

fn error_response(code: &str, msg: &str) -> Response {
    let body = json!({ "code": code, "msg": msg }).to_string();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        body,
    )
        .into_response()
}
