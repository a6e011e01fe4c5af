//! Summary statistics and wall-clock reporting.

use std::fmt;
use std::time::Duration;

use noc_router::{Addr, DvfsLevel};

/// A per-run snapshot of everything an operator would want printed at
/// the end of a simulation.
#[derive(Debug, Default)]
pub struct SimSummary {
    pub packets_injected: u64,
    pub packets_injected_after_warmup: u64,
    pub packets_arrived: u64,
    pub packets_arrived_after_warmup: u64,
    pub num_injections_failed: u64,
    pub sum_latency_after_warmup: f64,
    pub max_latency: f64,
    pub final_time: f64,
    pub early_terminated: bool,
    pub early_termination_reason: Option<String>,
    pub total_unscaled_energy: f64,
    pub total_scaled_energy: f64,
    /// Per-component `(name, unscaled, scaled)` totals summed across all
    /// routers, in the fixed order energy components are tracked in.
    pub energy_by_component: Vec<(String, f64, f64)>,
    /// Cycles spent (post-warmup) at each DVFS level, summed over all
    /// routers.
    pub dvfs_cycles_boost: u64,
    pub dvfs_cycles_base: u64,
    pub dvfs_cycles_throttle1: u64,
    pub dvfs_cycles_throttle2: u64,
    /// Packets injected per router per cycle, summed over all routers and
    /// normalized by the run's elapsed cycles.
    pub offered_load: f64,
    /// Total completed DVFS prediction windows summed over all routers.
    pub total_predictions: u64,
    /// Mean per-window BU-prediction error, averaged across all routers'
    /// windows.
    pub avg_bu_prediction_error: f64,
    /// One entry per delivered packet: `(src, dst, tail flit id, finish
    /// time)`, in delivery order. Used by tests that check per-flow
    /// ordering properties; not printed in the default report.
    pub arrivals: Vec<(Addr, Addr, u64, f64)>,
    pub wall_time: Duration,
}

impl SimSummary {
    pub fn avg_latency(&self) -> f64 {
        if self.packets_arrived_after_warmup == 0 {
            0.0
        } else {
            self.sum_latency_after_warmup / self.packets_arrived_after_warmup as f64
        }
    }

    pub fn record_dvfs_cycle(&mut self, level: DvfsLevel) {
        match level {
            DvfsLevel::Boost => self.dvfs_cycles_boost += 1,
            DvfsLevel::Base => self.dvfs_cycles_base += 1,
            DvfsLevel::Throttle1 => self.dvfs_cycles_throttle1 += 1,
            DvfsLevel::Throttle2 => self.dvfs_cycles_throttle2 += 1,
        }
    }
}

impl fmt::Display for SimSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "simulation complete at cycle {:.3}", self.final_time)?;
        if let Some(reason) = &self.early_termination_reason {
            writeln!(f, "  early termination: {}", reason)?;
        }
        writeln!(f, "  packets injected:        {}", self.packets_injected)?;
        writeln!(f, "  packets arrived:         {}", self.packets_arrived)?;
        writeln!(f, "  injections failed (PE full): {}", self.num_injections_failed)?;
        writeln!(f, "  avg latency (post-warmup):   {:.3}", self.avg_latency())?;
        writeln!(f, "  max latency:                 {:.3}", self.max_latency)?;
        writeln!(f, "  offered load (per router/cycle): {:.5}", self.offered_load)?;
        writeln!(f, "  unscaled energy:             {:.3}", self.total_unscaled_energy)?;
        writeln!(f, "  scaled energy:               {:.3}", self.total_scaled_energy)?;
        for (name, unscaled, scaled) in &self.energy_by_component {
            writeln!(f, "    {:<9} unscaled {:>12.3}  scaled {:>12.3}", name, unscaled, scaled)?;
        }
        writeln!(
            f,
            "  DVFS cycles (Boost/Base/T1/T2): {}/{}/{}/{}",
            self.dvfs_cycles_boost, self.dvfs_cycles_base, self.dvfs_cycles_throttle1, self.dvfs_cycles_throttle2
        )?;
        writeln!(
            f,
            "  DVFS predictor: {} windows, avg BU-prediction error {:.5}",
            self.total_predictions, self.avg_bu_prediction_error
        )?;
        writeln!(f, "  wall time: {:?}", self.wall_time)
    }
}
