//! Top-level facade crate for varz.
//!
//! Re-exports the core registry types and the server library so users can depend on a single crate.

pub mod core {
    pub use varz_core::*;
}

pub mod server {
    pub use varz_server::*;
}
