//! Shared application state for the varz server.
//!
//! Registration happens here, while the state is built and before any
//! listener exists, so handlers never race a late registration.

use std::sync::Arc;

use varz_core::error::Result;
use varz_core::{Counter, Gauge, Registry, RuntimeSource};

use crate::config::Config;

/// Metrics the application handlers mutate.
#[derive(Debug, Clone)]
pub struct AppMetrics {
    /// Calls to the greeting route.
    pub num_calls: Arc<Counter>,
    /// `user` parameter of the most recent greeting.
    pub last_user: Arc<Gauge>,
}

impl AppMetrics {
    /// Register every application metric. Fails on a name conflict.
    pub fn register(registry: &Registry) -> Result<Self> {
        Ok(Self {
            num_calls: registry.new_counter("num_calls")?,
            last_user: registry.new_gauge("last_user")?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: Config,
    registry: Arc<Registry>,
    runtime: Arc<dyn RuntimeSource>,
    metrics: AppMetrics,
}

impl AppState {
    /// Build application state, registering the application metrics in
    /// `registry`. Returns Result so startup can fail cleanly on conflicts.
    pub fn new(cfg: Config, registry: Arc<Registry>, runtime: Arc<dyn RuntimeSource>) -> Result<Self> {
        let metrics = AppMetrics::register(&registry)?;
        tracing::info!(metrics = ?registry.names(), "metrics registered");

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                runtime,
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn runtime(&self) -> &dyn RuntimeSource {
        self.inner.runtime.as_ref()
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.inner.metrics
    }
}
