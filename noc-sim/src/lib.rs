//! Library surface for the NoC simulator binary, split out so that
//! scenario tests (`tests/`) can build a [`Config`] and drive a
//! [`NetworkController`] directly instead of shelling out to the binary.

pub mod config;
pub mod controller;
pub mod injector;
pub mod stats;
pub mod trace;

pub use config::Config;
pub use controller::NetworkController;
pub use stats::SimSummary;
