//! Metric cells and the closed `Metric` variant.
//!
//! Every cell is updated with a single atomic primitive, so concurrent
//! writers never lose an update and readers never observe a torn value.
//! Integer and float cells use `fetch_add`/CAS on 64-bit atomics; the string
//! gauge swaps an `Arc<String>` pointer.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde_json::{Number, Value};

use crate::error::{Result, VarzError};

/// Integer counter. `add` accepts negative deltas.
#[derive(Debug, Default)]
pub struct Counter {
    v: AtomicI64,
}

impl Counter {
    pub fn new() -> Self {
        Self { v: AtomicI64::new(0) }
    }

    /// Atomically add `delta` (may be negative).
    pub fn add(&self, delta: i64) {
        self.v.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn set(&self, value: i64) {
        self.v.store(value, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.v.load(Ordering::Relaxed)
    }
}

/// Float cell stored as its IEEE-754 bit pattern.
#[derive(Debug, Default)]
pub struct Float {
    bits: AtomicU64,
}

impl Float {
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Atomically add `delta` via a CAS loop.
    pub fn add(&self, delta: f64) {
        // The closure never returns None, so fetch_update cannot fail.
        let _ = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Last-value string gauge.
///
/// Concurrent `set` calls race; whichever pointer swap lands last wins.
/// There is no timestamp ordering.
pub struct Gauge {
    v: ArcSwap<String>,
}

impl Default for Gauge {
    fn default() -> Self {
        Self::new()
    }
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            v: ArcSwap::from_pointee(String::new()),
        }
    }

    pub fn set(&self, value: impl Into<String>) {
        self.v.store(Arc::new(value.into()));
    }

    /// Current value, shared without copying the string.
    pub fn load(&self) -> Arc<String> {
        self.v.load_full()
    }

    pub fn value(&self) -> String {
        String::clone(&self.v.load())
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge").field("v", &*self.v.load()).finish()
    }
}

/// String-keyed collection of sub-metrics, rendered as a JSON object.
///
/// Integer and float entries are created on first `add`/`add_float`.
#[derive(Debug, Default)]
pub struct MapVar {
    entries: DashMap<String, Metric>,
}

impl MapVar {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Add `delta` to the integer entry at `key`, creating it at 0 if absent.
    pub fn add(&self, key: &str, delta: i64) -> Result<()> {
        if let Some(entry) = self.entries.get(key) {
            return match entry.value() {
                Metric::Int(c) => {
                    c.add(delta);
                    Ok(())
                }
                other => Err(mismatch(key, "int", other)),
            };
        }
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Metric::Int(Arc::new(Counter::new())))
            .value()
        {
            Metric::Int(c) => {
                c.add(delta);
                Ok(())
            }
            other => Err(mismatch(key, "int", other)),
        }
    }

    /// Add `delta` to the float entry at `key`, creating it at 0.0 if absent.
    pub fn add_float(&self, key: &str, delta: f64) -> Result<()> {
        if let Some(entry) = self.entries.get(key) {
            return match entry.value() {
                Metric::Float(f) => {
                    f.add(delta);
                    Ok(())
                }
                other => Err(mismatch(key, "float", other)),
            };
        }
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Metric::Float(Arc::new(Float::new())))
            .value()
        {
            Metric::Float(f) => {
                f.add(delta);
                Ok(())
            }
            other => Err(mismatch(key, "float", other)),
        }
    }

    /// Replace the entry at `key`.
    ///
    /// Fails with `VarzError::Cycle` if `metric` is this map or contains it
    /// through nested maps.
    pub fn set(&self, key: impl Into<String>, metric: impl Into<Metric>) -> Result<()> {
        let key = key.into();
        let metric = metric.into();
        if let Metric::Map(m) = &metric {
            if m.reaches(self, &mut Vec::new()) {
                return Err(VarzError::Cycle(key));
            }
        }
        self.entries.insert(key, metric);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Metric> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn handles(&self) -> Vec<(String, Metric)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Whether `target` is this map or nested anywhere below it.
    fn reaches(&self, target: &MapVar, seen: &mut Vec<*const MapVar>) -> bool {
        let me = self as *const MapVar;
        if std::ptr::eq(me, target) {
            return true;
        }
        if seen.contains(&me) {
            return false;
        }
        seen.push(me);
        self.handles().iter().any(|(_, m)| match m {
            Metric::Map(child) => child.reaches(target, seen),
            _ => false,
        })
    }

    /// Render with `path` holding the maps currently being rendered. Two
    /// racing `set` calls can still link maps into a loop; the repeated map
    /// renders as `null` instead of recursing.
    fn render_within(&self, path: &mut Vec<*const MapVar>) -> Value {
        let me = self as *const MapVar;
        if path.contains(&me) {
            return Value::Null;
        }
        path.push(me);
        let sorted: BTreeMap<String, Value> = self
            .handles()
            .into_iter()
            .map(|(k, m)| {
                let v = m.render_within(path);
                (k, v)
            })
            .collect();
        path.pop();
        Value::Object(sorted.into_iter().collect())
    }
}

fn mismatch(key: &str, expected: &'static str, found: &Metric) -> VarzError {
    VarzError::KindMismatch {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

/// Computed metric: the closure runs on every snapshot.
pub struct Func {
    f: Box<dyn Fn() -> Value + Send + Sync>,
}

impl Func {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }

    pub fn value(&self) -> Value {
        (self.f)()
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Func(..)")
    }
}

/// Closed set of metric kinds. Cloning shares the underlying cell.
#[derive(Debug, Clone)]
pub enum Metric {
    Int(Arc<Counter>),
    Float(Arc<Float>),
    String(Arc<Gauge>),
    Map(Arc<MapVar>),
    Func(Arc<Func>),
}

impl Metric {
    pub fn kind(&self) -> &'static str {
        match self {
            Metric::Int(_) => "int",
            Metric::Float(_) => "float",
            Metric::String(_) => "string",
            Metric::Map(_) => "map",
            Metric::Func(_) => "func",
        }
    }

    /// JSON rendering of the current value.
    ///
    /// - `Int` -> number
    /// - `Float` -> number, or `null` when not finite
    /// - `String` -> string
    /// - `Map` -> object with sorted keys
    /// - `Func` -> whatever the closure returns
    pub fn render(&self) -> Value {
        self.render_within(&mut Vec::new())
    }

    fn render_within(&self, path: &mut Vec<*const MapVar>) -> Value {
        match self {
            Metric::Int(c) => Value::from(c.value()),
            Metric::Float(f) => Number::from_f64(f.value())
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Metric::String(g) => Value::String(g.value()),
            Metric::Map(m) => m.render_within(path),
            Metric::Func(f) => f.value(),
        }
    }
}

impl From<Arc<Counter>> for Metric {
    fn from(v: Arc<Counter>) -> Self {
        Metric::Int(v)
    }
}

impl From<Arc<Float>> for Metric {
    fn from(v: Arc<Float>) -> Self {
        Metric::Float(v)
    }
}

impl From<Arc<Gauge>> for Metric {
    fn from(v: Arc<Gauge>) -> Self {
        Metric::String(v)
    }
}

impl From<Arc<MapVar>> for Metric {
    fn from(v: Arc<MapVar>) -> Self {
        Metric::Map(v)
    }
}

impl From<Arc<Func>> for Metric {
    fn from(v: Arc<Func>) -> Self {
        Metric::Func(v)
    }
}
