//! Process bootstrap: register metrics, bind, serve until shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use varz_core::error::{Result, VarzError};
use varz_core::{ProcessRuntime, Registry, RuntimeSource};

use crate::app_state::AppState;
use crate::config::Config;
use crate::router;

/// Build state with a fresh registry and the process runtime source.
///
/// Runs the forced-collection hook first when the config asks for it.
pub fn build_state(cfg: Config) -> Result<AppState> {
    let runtime: Arc<dyn RuntimeSource> = Arc::new(ProcessRuntime::new());
    if cfg.server.force_collect_on_start {
        runtime.force_collect();
    }
    AppState::new(cfg, Arc::new(Registry::new()), runtime)
}

/// Register all metrics, then bind and serve.
///
/// Bind failure is returned as `VarzError::Serve`; the binary turns it into a
/// non-zero exit status. Returns `Ok(())` after a graceful shutdown.
pub async fn run(cfg: Config) -> Result<()> {
    let listen = cfg.server.listen_addr()?;
    let state = build_state(cfg)?;
    let app = router::build_router(state);

    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| VarzError::Serve(format!("bind {listen} failed: {e}")))?;

    info!(%listen, "varz-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| VarzError::Serve(format!("server failed: {e}")))?;

    info!("varz-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
