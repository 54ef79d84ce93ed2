//! varz server binary.
//!
//! Usage: `varz-server [config.yaml]`. Without a path the defaults apply
//! (listen on 0.0.0.0:8079, no forced collection).

use std::path::PathBuf;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use varz_core::CountingAlloc;
use varz_server::{config, startup};

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cfg = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => config::load_from_file(&path),
        None => Ok(config::Config::default()),
    };
    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = startup::run(cfg).await {
        tracing::error!(code = e.code().as_str(), error = %e, "varz-server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
