//! HTTP handlers.
//!
//! - `/`           : greeting, mutates `num_calls` and `last_user`
//! - `/debug/vars` : JSON exposition of every metric plus runtime stats

pub mod greet;
pub mod vars;
