//! varz core: metric cells, the registry, and runtime statistics.
//!
//! This crate owns everything needed to produce a `/debug/vars` document
//! except the HTTP layer itself. It carries no transport or async runtime
//! dependencies so handlers, tests and other binaries can share one registry.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Registration conflicts surface as `VarzError` so the bootstrap decides how
//! to fail.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod exposition;
pub mod metric;
pub mod registry;
pub mod runtime;

/// Shared result type.
pub use error::{Result, VarzError};
pub use metric::{Counter, Float, Func, Gauge, MapVar, Metric};
pub use registry::{Registry, Snapshot, RESERVED_NAMES};
pub use runtime::{CountingAlloc, MemStats, ProcessRuntime, RuntimeSource};
