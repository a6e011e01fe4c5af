//! Per-router DVFS predictor and level controller (C7).
//!
//! Policies A/B/C are a tagged enum dispatched to three plain functions
//! rather than a trait-object hierarchy — there are exactly three, they
//! share almost all of their state and history-window math, and none of
//! them is ever swapped at runtime once a router is built.

/// DVFS operating point. Ordered low → high for the throttle ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DvfsLevel {
    Throttle2,
    Throttle1,
    Base,
    Boost,
}

impl DvfsLevel {
    /// Pipe/wire/credit delay multiplier, relative to the Base period of
    /// 1.0 (normalized to 2.0 GHz).
    pub fn period(self) -> f64 {
        match self {
            DvfsLevel::Boost => 0.8,
            DvfsLevel::Base => 1.0,
            DvfsLevel::Throttle1 => 1.111,
            DvfsLevel::Throttle2 => 1.25,
        }
    }

    /// Energy scaling factor applied to unscaled energy accrued while at
    /// this level, matching V²·f scaling from the 1.2 V/2.0 GHz
    /// baseline.
    pub fn energy_scaling(self) -> f64 {
        match self {
            DvfsLevel::Boost => 1.1736,
            DvfsLevel::Base => 1.0000,
            DvfsLevel::Throttle1 => 0.8403,
            DvfsLevel::Throttle2 => 0.6944,
        }
    }

    fn step_up(self, allow_boost: bool) -> DvfsLevel {
        match self {
            DvfsLevel::Throttle2 => DvfsLevel::Throttle1,
            DvfsLevel::Throttle1 => DvfsLevel::Base,
            DvfsLevel::Base => {
                if allow_boost {
                    DvfsLevel::Boost
                } else {
                    DvfsLevel::Base
                }
            }
            DvfsLevel::Boost => DvfsLevel::Boost,
        }
    }

    fn step_down(self) -> DvfsLevel {
        match self {
            DvfsLevel::Boost => DvfsLevel::Base,
            DvfsLevel::Base => DvfsLevel::Throttle1,
            DvfsLevel::Throttle1 => DvfsLevel::Throttle2,
            DvfsLevel::Throttle2 => DvfsLevel::Throttle2,
        }
    }
}

/// Whether predictions are driven by each router's own cycle counter
/// (ASYNC) or by a global synchronizing event (SYNC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorMode {
    Async,
    Sync,
}

/// Which policy governs level transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Link-utilization aware, throttle-only.
    A,
    /// Link-utilization aware, boost enabled.
    B,
    /// Congestion-signal only, no link prediction (`use_link_pred: 0`).
    C,
}

/// Output link index within a router, 0..=3 mapping to physical ports
/// 1..=4 (West/East/South/North); port 0 (PE) carries no DVFS signal.
pub const LINKS: usize = 4;

/// Accumulators for the window currently in progress.
#[derive(Debug, Default)]
struct Window {
    bu_out: [f64; LINKS],
    bu_all: f64,
    lu_sent: [f64; LINKS],
    cycles: u64,
}

/// Per-router DVFS predictor state.
#[derive(Debug)]
pub struct Predictor {
    pub h: u64,
    pub w: f64,
    pub mode: PredictorMode,
    pub policy: Policy,
    pub use_boost: bool,
    window: Window,
    bu_prev: [f64; LINKS],
    lu_prev: [f64; LINKS],
    bu_all_prev: f64,
    /// Own-cycle counter; in ASYNC mode a window finalizes when this
    /// reaches `h`.
    cycle_counter: u64,
    predictions_made: u64,
    bu_error_sum: f64,
}

impl Predictor {
    pub fn new(h: u64, w: f64, mode: PredictorMode, policy: Policy, use_boost: bool) -> Predictor {
        Predictor {
            h,
            w,
            mode,
            policy,
            use_boost,
            window: Window::default(),
            bu_prev: [0.0; LINKS],
            lu_prev: [0.0; LINKS],
            bu_all_prev: 0.0,
            cycle_counter: 0,
            predictions_made: 0,
            bu_error_sum: 0.0,
        }
    }

    /// Number of completed windows and the mean per-window BU-prediction
    /// error: the average (over links) absolute gap between the previous
    /// window's predicted `bu` and the current window's measured `bu`.
    pub fn prediction_stats(&self) -> (u64, f64) {
        if self.predictions_made == 0 {
            (0, 0.0)
        } else {
            (self.predictions_made, self.bu_error_sum / self.predictions_made as f64)
        }
    }

    /// Per-cycle maintenance (runs every router cycle in both modes,
    /// "in SYNC mode, maintenance still happens each router cycle").
    /// `bu_out[k]` = `(B_in - credit[k+1][*]) / (V*B_in)` downstream
    /// utilization per link; `bu_all` = overall input-buffer fill ratio
    /// across non-PE ports/VCs; `lu_sent[k]` = 1.0 if a flit departed
    /// link `k` this cycle, else 0.0.
    ///
    /// Returns `true` in ASYNC mode when this sample completed a window
    /// (the caller should then call [`Predictor::finalize_and_decide`]).
    pub fn accumulate(&mut self, bu_out: [f64; LINKS], bu_all: f64, lu_sent: [f64; LINKS]) -> bool {
        for k in 0..LINKS {
            self.window.bu_out[k] += bu_out[k];
            self.window.lu_sent[k] += lu_sent[k];
        }
        self.window.bu_all += bu_all;
        self.window.cycles += 1;

        if self.mode == PredictorMode::Async {
            self.cycle_counter += 1;
            if self.cycle_counter >= self.h {
                self.cycle_counter = 0;
                return true;
            }
        }
        false
    }

    /// Finalizes the current window (averages and updates predictor history) and runs the
    /// configured policy (step 4), returning the new level.
    pub fn finalize_and_decide(&mut self, current: DvfsLevel) -> DvfsLevel {
        let cycles = self.window.cycles.max(1) as f64;

        let mut bu_pred = [0.0; LINKS];
        let mut lu_pred = [0.0; LINKS];
        let mut window_error = 0.0;
        for k in 0..LINKS {
            let bu = self.window.bu_out[k] / cycles;
            window_error += (bu - self.bu_prev[k]).abs();
            bu_pred[k] = (self.w * bu + self.bu_prev[k]) / (self.w + 1.0);
            self.bu_prev[k] = bu_pred[k];

            let lu = self.window.lu_sent[k] / cycles;
            lu_pred[k] = (self.w * lu + self.lu_prev[k]) / (self.w + 1.0);
            self.lu_prev[k] = lu_pred[k];
        }
        self.bu_error_sum += window_error / LINKS as f64;
        self.predictions_made += 1;

        let bu_all_avg = self.window.bu_all / cycles;
        let bu_all_pred = (self.w * bu_all_avg + self.bu_all_prev) / (self.w + 1.0);
        self.bu_all_prev = bu_all_pred;

        self.window = Window::default();

        match self.policy {
            Policy::A => self.decide_link_aware(current, &bu_pred, &lu_pred, false),
            Policy::B => self.decide_link_aware(current, &bu_pred, &lu_pred, true),
            Policy::C => self.decide_congestion_signal(current, &bu_pred, bu_all_pred),
        }
    }

    fn decide_link_aware(
        &self,
        current: DvfsLevel,
        bu_pred: &[f64; LINKS],
        lu_pred: &[f64; LINKS],
        allow_boost: bool,
    ) -> DvfsLevel {
        let mut shift_up = false;
        let mut shift_down = false;
        for k in 0..LINKS {
            let (t_low, t_high) = if bu_pred[k] < 0.5 { (0.3, 0.4) } else { (0.6, 0.7) };
            if lu_pred[k] > t_high {
                shift_up = true;
            } else if lu_pred[k] < t_low {
                shift_down = true;
            }
        }
        if shift_up {
            current.step_up(allow_boost)
        } else if shift_down {
            current.step_down()
        } else {
            current
        }
    }

    fn decide_congestion_signal(&self, current: DvfsLevel, bu_pred: &[f64; LINKS], bu_all_pred: f64) -> DvfsLevel {
        let high_signal = bu_pred.iter().any(|&bu| bu > 0.65);
        let target = if bu_all_pred >= 0.15 {
            if self.use_boost {
                DvfsLevel::Boost
            } else {
                DvfsLevel::Base
            }
        } else if bu_all_pred >= 0.05 && bu_all_pred < 0.10 {
            if high_signal {
                DvfsLevel::Throttle1
            } else {
                DvfsLevel::Base
            }
        } else if high_signal {
            DvfsLevel::Throttle2
        } else {
            DvfsLevel::Base
        };
        let _ = current;
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_periods_match_constants() {
        assert_eq!(DvfsLevel::Base.period(), 1.0);
        assert_eq!(DvfsLevel::Boost.period(), 0.8);
        assert_eq!(DvfsLevel::Throttle1.period(), 1.111);
        assert_eq!(DvfsLevel::Throttle2.period(), 1.25);
    }

    #[test]
    fn async_mode_signals_window_boundary() {
        let mut pred = Predictor::new(3, 3.0, PredictorMode::Async, Policy::A, false);
        assert!(!pred.accumulate([0.0; LINKS], 0.0, [0.0; LINKS]));
        assert!(!pred.accumulate([0.0; LINKS], 0.0, [0.0; LINKS]));
        assert!(pred.accumulate([0.0; LINKS], 0.0, [0.0; LINKS]));
    }

    #[test]
    fn policy_c_converges_to_throttle2_under_sustained_low_congestion() {
        let mut pred = Predictor::new(10, 3.0, PredictorMode::Async, Policy::C, false);
        let mut level = DvfsLevel::Base;
        for _ in 0..2 {
            for _ in 0..10 {
                pred.accumulate([0.9, 0.0, 0.0, 0.0], 0.01, [0.0; LINKS]);
            }
            level = pred.finalize_and_decide(level);
        }
        assert_eq!(level, DvfsLevel::Throttle2);
    }

    #[test]
    fn policy_c_throttles_in_mid_congestion_band_under_high_link_signal() {
        // bu_all_pred lands in [0.10, 0.15): still throttles to Throttle2
        // when a link is individually congested, same as the catch-all
        // band below 0.05.
        let mut pred = Predictor::new(10, 3.0, PredictorMode::Async, Policy::C, false);
        let mut level = DvfsLevel::Base;
        for _ in 0..2 {
            for _ in 0..10 {
                pred.accumulate([0.9, 0.0, 0.0, 0.0], 0.12, [0.0; LINKS]);
            }
            level = pred.finalize_and_decide(level);
        }
        assert_eq!(level, DvfsLevel::Throttle2);
    }

    #[test]
    fn prediction_stats_track_count_and_nonzero_error_under_changing_load() {
        let mut pred = Predictor::new(4, 3.0, PredictorMode::Async, Policy::A, false);
        assert_eq!(pred.prediction_stats(), (0, 0.0));

        for _ in 0..4 {
            pred.accumulate([0.0; LINKS], 0.0, [0.0; LINKS]);
        }
        pred.finalize_and_decide(DvfsLevel::Base);
        for _ in 0..4 {
            pred.accumulate([0.9, 0.0, 0.0, 0.0], 0.0, [0.0; LINKS]);
        }
        pred.finalize_and_decide(DvfsLevel::Base);

        let (count, avg_error) = pred.prediction_stats();
        assert_eq!(count, 2);
        assert!(avg_error > 0.0);
    }

    #[test]
    fn policy_a_throttle_only_never_boosts() {
        let mut pred = Predictor::new(5, 3.0, PredictorMode::Async, Policy::A, false);
        for _ in 0..5 {
            pred.accumulate([0.4, 0.0, 0.0, 0.0], 0.0, [0.9, 0.0, 0.0, 0.0]);
        }
        let level = pred.finalize_and_decide(DvfsLevel::Base);
        assert_eq!(level, DvfsLevel::Base);
    }
}
