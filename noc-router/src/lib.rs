#![deny(missing_debug_implementations)]

pub mod addr;
pub mod dvfs;
pub mod energy;
pub mod flit;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod routing;

pub use addr::Addr;
pub use dvfs::{DvfsLevel, Policy, Predictor, PredictorMode};
pub use energy::{Component, EnergyAccumulator};
pub use flit::{make_packet, Flit, FlitKind};
pub use pipeline::{Effect, Router};
pub use routing::RoutingAlgo;
