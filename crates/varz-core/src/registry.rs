//! Process-wide metric registry.
//!
//! The registry is an explicit object: bootstrap creates one, registers every
//! metric, and hands typed handles to the code that mutates them. Writes to
//! the name map only happen during registration; the hot path touches the
//! metric cells, never the map.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, VarzError};
use crate::metric::{Counter, Float, Func, Gauge, MapVar, Metric};

/// Top-level document keys owned by the exposition endpoint.
pub const RESERVED_NAMES: [&str; 2] = ["cmdline", "memstats"];

/// Name -> metric map.
#[derive(Debug, Default)]
pub struct Registry {
    vars: DashMap<String, Metric>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            vars: DashMap::new(),
        }
    }

    /// Register `metric` under `name`. Fails if the name is taken or reserved.
    pub fn register(&self, name: &str, metric: impl Into<Metric>) -> Result<()> {
        if name.is_empty() {
            return Err(VarzError::InvalidName(name.to_string()));
        }
        if RESERVED_NAMES.contains(&name) {
            return Err(VarzError::ReservedName(name.to_string()));
        }

        match self.vars.entry(name.to_string()) {
            Entry::Occupied(_) => Err(VarzError::DuplicateName(name.to_string())),
            Entry::Vacant(slot) => {
                let metric = metric.into();
                tracing::debug!(metric = name, kind = metric.kind(), "metric registered");
                slot.insert(metric);
                Ok(())
            }
        }
    }

    /// Register an integer counter initialized to 0.
    pub fn new_counter(&self, name: &str) -> Result<Arc<Counter>> {
        let c = Arc::new(Counter::new());
        self.register(name, Arc::clone(&c))?;
        Ok(c)
    }

    /// Register a float cell initialized to 0.0.
    pub fn new_float(&self, name: &str) -> Result<Arc<Float>> {
        let f = Arc::new(Float::new());
        self.register(name, Arc::clone(&f))?;
        Ok(f)
    }

    /// Register a string gauge initialized to "".
    pub fn new_gauge(&self, name: &str) -> Result<Arc<Gauge>> {
        let g = Arc::new(Gauge::new());
        self.register(name, Arc::clone(&g))?;
        Ok(g)
    }

    /// Register an empty map.
    pub fn new_map(&self, name: &str) -> Result<Arc<MapVar>> {
        let m = Arc::new(MapVar::new());
        self.register(name, Arc::clone(&m))?;
        Ok(m)
    }

    /// Register a computed metric evaluated on every snapshot.
    pub fn publish_func<F>(&self, name: &str, f: F) -> Result<()>
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.register(name, Arc::new(Func::new(f)))
    }

    pub fn lookup(&self, name: &str) -> Option<Metric> {
        self.vars.get(name).map(|e| e.value().clone())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Read every metric once.
    ///
    /// Each value read is atomic on its own; the snapshot as a whole is not a
    /// transaction, so two metrics may reflect different instants. Handles
    /// are cloned out of the map first and rendered after the shard locks are
    /// released, so `Func` closures may safely consult the registry.
    pub fn snapshot(&self) -> Snapshot {
        let handles: Vec<(String, Metric)> = self
            .vars
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let vars = handles
            .into_iter()
            .map(|(name, metric)| {
                let v = metric.render();
                (name, v)
            })
            .collect();

        Snapshot { vars }
    }
}

/// Immutable point-in-time rendering of a registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    vars: BTreeMap<String, Value>,
}

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.vars
    }
}
