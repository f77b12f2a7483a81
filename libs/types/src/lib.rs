//! Types library for the market data platform
//!
//! This library provides the core type definitions shared across the platform
//! services: stored price records, normalized ticker snapshots, and the wire
//! messages pushed to subscribers.
//!
//! # Modules
//! - `tick`: stored price records and ticker snapshot normalization
//! - `message`: the JSON wire protocol pushed to subscribers
//! - `time`: UTC timestamp formatting helpers

// Public modules
pub mod message;
pub mod tick;
pub mod time;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::message::*;
    pub use crate::tick::*;
    pub use crate::time::*;
}
