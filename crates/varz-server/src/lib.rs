//! varz server library entry.
//!
//! Wires the core registry and runtime source into an axum service with a
//! greeting route and the `/debug/vars` exposition route. Consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod handlers;
pub mod router;
pub mod startup;
