//! TrafficPilot signal controller library.
//!
//! Phase sequencing, countdown timing, mode arbitration, adaptive green
//! time and heartbeat fail-safe for a two-approach intersection.  The
//! binary in `main.rs` wires these modules to host adapters; the tests
//! drive them through mock ports.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod channels;
pub mod config;
pub mod error;
pub mod fields;
pub mod fsm;
pub mod liveness;
pub mod safety;
pub mod scheduler;
pub mod signal;

pub use error::{Error, Result};
