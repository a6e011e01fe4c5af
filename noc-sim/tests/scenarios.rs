//! End-to-end scenario tests driving the controller directly.
//!
//! Build a config struct directly (bypassing the CLI), drive the run,
//! assert on the returned counters.

use noc_router::{Policy, PredictorMode, RoutingAlgo};

use noc_sim::{Config, NetworkController};

fn quiet_logger() -> slog::Logger {
    noc_engine::logger::build_root_logger(None, slog::Level::Critical).unwrap()
}

fn base_config() -> Config {
    let mut cfg = Config::default();
    cfg.traffic = noc_sim::config::TrafficMode::Uniform;
    cfg.do_dvfs = false;
    cfg.seed = 1;
    cfg
}

/// S1 — empty run: no injection, the queue drains, power stays zero.
#[test]
fn s1_empty_run_injects_nothing() {
    let mut cfg = base_config();
    cfg.ary_size = 2;
    cfg.cycles = 10;
    cfg.warmup = 0;
    cfg.injection_rate = 0.0;

    let controller = NetworkController::new(cfg, quiet_logger()).unwrap();
    let summary = controller.run();

    assert_eq!(summary.packets_injected, 0);
    assert_eq!(summary.packets_arrived, 0);
    assert_eq!(summary.total_unscaled_energy, 0.0);
}

/// S2 — two-hop uniform traffic: some packets complete, average latency
/// is at least the one-hop minimum (RC + VC-AB + SW-AB pipe delays plus
/// one wire delay, each 1.0 at Base level).
#[test]
fn s2_two_hop_uniform_completes_with_plausible_latency() {
    let mut cfg = base_config();
    cfg.ary_size = 2;
    cfg.vc_n = 2;
    cfg.inp_buf = 4;
    cfg.out_buf = 4;
    cfg.packet_size = 2;
    cfg.injection_rate = 0.01;
    cfg.warmup = 100;
    cfg.cycles = 2000;

    let controller = NetworkController::new(cfg, quiet_logger()).unwrap();
    let summary = controller.run();

    assert!(summary.packets_arrived_after_warmup > 0, "expected at least one post-warmup arrival");
    assert!(summary.avg_latency() >= 3.0, "avg latency {} below the one-hop minimum", summary.avg_latency());
}

/// Boundary property 8: at injection_rate 0, nothing is ever injected
/// regardless of traffic mode, and the run terminates cleanly.
#[test]
fn boundary_zero_injection_rate_never_injects() {
    let mut cfg = base_config();
    cfg.ary_size = 4;
    cfg.cycles = 500;
    cfg.injection_rate = 0.0;

    let controller = NetworkController::new(cfg, quiet_logger()).unwrap();
    let summary = controller.run();
    assert_eq!(summary.packets_injected, 0);
}

/// S4 (scaled down) — with DVFS enabled and link prediction disabled,
/// scaled energy diverges from unscaled energy once a router throttles.
#[test]
fn s4_dvfs_enabled_produces_scaled_energy_divergence_or_equality() {
    let mut cfg = base_config();
    cfg.ary_size = 3;
    cfg.injection_rate = 0.005;
    cfg.cycles = 1500;
    cfg.warmup = 200;
    cfg.do_dvfs = true;
    cfg.use_boost = false;
    cfg.use_link_pred = false;
    cfg.dvfs_mode = PredictorMode::Async;
    cfg.hist_window = 200;
    assert_eq!(cfg.policy(), Policy::C);

    let controller = NetworkController::new(cfg, quiet_logger()).unwrap();
    let summary = controller.run();

    // Scaled energy can only ever be <= unscaled energy while the
    // network spends any time below Boost, and the two are equal only
    // if every router stayed at Base the whole run.
    assert!(summary.total_scaled_energy <= summary.total_unscaled_energy + 1e-6);
}

/// S3 — hotspot saturation: a handful of hotspot destinations soak up
/// 90% of traffic at a high injection rate. Per-destination arrival
/// counts aren't tracked by `SimSummary`, so only the early-termination
/// disjunct of the expected outcome is checked here.
#[test]
fn s3_hotspot_saturation_triggers_early_termination() {
    let mut cfg = base_config();
    cfg.traffic = noc_sim::config::TrafficMode::Hotspot;
    cfg.ary_size = 4;
    cfg.hotspots = vec![5];
    cfg.hotspot_percentage = 90.0;
    cfg.injection_rate = 0.2;
    cfg.cycles = 5000;
    cfg.warmup = 500;
    cfg.seed = 1;

    let controller = NetworkController::new(cfg, quiet_logger()).unwrap();
    let summary = controller.run();

    assert!(summary.early_terminated, "sustained hotspot saturation should trip the 6*N latency cutoff");
}

/// S5 — DVFS SYNC: same shape as S4 but driven by the global
/// `SyncPredictDvfs` event instead of each router's own cycle counter.
/// Level changes in SYNC mode only ever happen inside `sync_predict()`
/// (see `pipeline::tests::sync_mode_level_changes_only_on_explicit_sync_predict`
/// for the unit-level guarantee); here we only check that a SYNC run
/// completes and actually exercises the predictor.
#[test]
fn s5_dvfs_sync_mode_completes_and_produces_predictions() {
    let mut cfg = base_config();
    cfg.ary_size = 3;
    cfg.injection_rate = 0.005;
    cfg.cycles = 1500;
    cfg.warmup = 200;
    cfg.do_dvfs = true;
    cfg.use_boost = false;
    cfg.use_link_pred = false;
    cfg.dvfs_mode = PredictorMode::Sync;
    cfg.hist_window = 200;

    let controller = NetworkController::new(cfg, quiet_logger()).unwrap();
    let summary = controller.run();

    assert!(summary.total_predictions > 0, "a SYNC run spanning several windows must produce predictions");
    assert!(summary.total_scaled_energy <= summary.total_unscaled_energy + 1e-6);
}

/// S6 — XY/TRANSPOSE1 ordering: every source router sends to exactly one
/// destination (its transpose), so flit id order within a (src,dst)
/// group is also injection order. Arrival (tail-flit finish) order is
/// checked non-strictly: VCs within a group are chosen by shortest-queue
/// at injection time, so two packets queued on different VCs could in
/// principle finish in the same cycle without violating the property at
/// this injection rate.
#[test]
fn s6_xy_transpose1_tail_arrivals_stay_in_injection_order_per_flow() {
    let mut cfg = base_config();
    cfg.traffic = noc_sim::config::TrafficMode::Transpose1;
    cfg.ary_size = 4;
    cfg.routing = RoutingAlgo::Xy;
    cfg.packet_size = 4;
    cfg.injection_rate = 0.02;
    cfg.cycles = 3000;
    cfg.warmup = 300;
    cfg.seed = 7;

    let controller = NetworkController::new(cfg, quiet_logger()).unwrap();
    let summary = controller.run();

    assert!(!summary.arrivals.is_empty(), "expected at least one delivered packet");

    use std::collections::HashMap;
    let mut by_flow: HashMap<(noc_router::Addr, noc_router::Addr), Vec<(u64, f64)>> = HashMap::new();
    for &(src, dst, tail_id, finish_time) in &summary.arrivals {
        by_flow.entry((src, dst)).or_default().push((tail_id, finish_time));
    }
    for (flow, mut arrivals) in by_flow {
        arrivals.sort_by_key(|&(id, _)| id);
        for pair in arrivals.windows(2) {
            assert!(
                pair[1].1 >= pair[0].1,
                "flow {:?}: tail flit {} finished at {} before earlier-injected tail {} at {}",
                flow,
                pair[1].0,
                pair[1].1,
                pair[0].0,
                pair[0].1
            );
        }
    }
}

/// Sanity check that an unknown routing token is rejected at parse time,
/// per the Torus-XY `vc_n >= 2` requirement — exercised via the real
/// construction path rather than the CLI parser.
#[test]
fn torus_routing_with_two_vcs_constructs_successfully() {
    let mut cfg = base_config();
    cfg.ary_size = 4;
    cfg.routing = RoutingAlgo::TorusXy;
    cfg.vc_n = 2;
    cfg.cycles = 50;

    let controller = NetworkController::new(cfg, quiet_logger()).unwrap();
    let summary = controller.run();
    assert!(summary.final_time >= 0.0);
}
