//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules of the signal controller:
//! phase orchestration, mode arbitration, fail-safe handling and
//! persistence of the phase snapshot.  All interaction with the outside
//! world happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real lamps or a real transport.

pub mod commands;
pub mod controller;
pub mod events;
pub mod ports;
pub mod runner;
pub mod snapshot;
