#![deny(missing_debug_implementations)]

//! Model-agnostic discrete-event scheduling primitives.
//!
//! This crate knows nothing about routers, flits, or DVFS: it provides the
//! pieces any single-threaded, cooperative, discrete-event simulation
//! needs — a min-timestamp event queue (`event`), a deterministic seeded
//! RNG (`rng`), and a logging setup (`logger`) — so that `noc-router` and
//! `noc-sim` can stay focused on the NoC model itself.

pub mod event;
pub mod logger;
pub mod rng;

pub use event::{Event, EventKind, EventQueue, Time};
pub use rng::Rng;
