//! Real-Time Tick Relay Service
//!
//! Polls the append-only snapshot store for newly persisted price records,
//! normalizes and validates them, keeps a last-known-value cache for late
//! joiners, and fans every validated update out to all connected WebSocket
//! subscribers. A separate loop broadcasts periodic heartbeats so
//! subscribers can tell "no data" from "connection dead".
//!
//! # Architecture
//!
//! ```text
//!  Snapshot Store (Postgres)
//!        │ fetch_after(watermark)
//!    ┌───▼────┐
//!    │ Relay  │  ← normalize, validate, advance watermark
//!    │ Loop   │
//!    └───┬────┘
//!        │              ┌───────────┐
//!   ┌────┴─────┐        │ Heartbeat │
//!   │          │        │   Loop    │
//! ┌─▼────┐ ┌───▼─────┐  └─────┬─────┘
//! │Cache │ │Broadcast│◄───────┘
//! └──┬───┘ └───┬─────┘
//!    │         │
//!    │    ┌────▼──────────┐
//!    └───►│ Client        │  ← one handler task per connection
//!  (join) │ Registry / WS │
//!         └───────────────┘
//! ```
//!
//! The registry and the cache are the only shared mutable state; every
//! access goes through their mutually-exclusive operations, and no lock is
//! held across a network or datastore call.

pub mod cache;
pub mod config;
pub mod heartbeat;
pub mod registry;
pub mod relay;
pub mod server;
pub mod store;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
