//! The Network Controller (C8): owns all routers, drives the global
//! event queue, and dispatches each event kind to the right handler.
//!
//! One big match over event kinds, one handler function per arm: each
//! handler owns exactly the state transition its event kind implies
//! (an arriving flit, a returning credit, a router's own cycle tick,
//! an injector's turn) and nothing else.

use std::collections::HashMap;
use std::io;
use std::time::Instant;

use slog::{debug, info, o, warn, Logger};

use noc_engine::{EventKind, EventQueue, Rng, Time};
use noc_router::input::VcState;
use noc_router::{Addr, DvfsLevel, Effect, Flit, Predictor, PredictorMode, Router};

use crate::config::{Config, TrafficMode};
use crate::injector::Injector;
use crate::stats::SimSummary;
use crate::trace::{local_trace_path, TraceReader};

/// Report interval, in base (Base-level) cycles.
const REPORT_INTERVAL: f64 = 2000.0;
/// Epsilon used to break ties between the first `SyncPredict` event and
/// cycle-0 `RouterSingle` events.
const SYNC_EPSILON: f64 = 1e-3;

pub struct NetworkController {
    cfg: Config,
    k: u16,
    n_routers: usize,
    routers: Vec<Router>,
    injectors: Vec<Injector>,
    queue: EventQueue<Flit>,
    rng: Rng,
    now: Time,
    warmup_done: bool,
    summary: SimSummary,
    next_report_at: Time,
    main_trace: Option<TraceReader>,
    local_traces: HashMap<usize, TraceReader>,
    log: Logger,
}

impl NetworkController {
    pub fn new(cfg: Config, log: Logger) -> io::Result<NetworkController> {
        let k = cfg.ary_size;
        let n_routers = k as usize * k as usize;
        let policy = cfg.policy();

        let mut routers = Vec::with_capacity(n_routers);
        let mut injectors = Vec::with_capacity(n_routers);
        for id in 0..n_routers {
            let addr = Addr::from_id(id, k);
            let predictor = Predictor::new(cfg.hist_window, 3.0, cfg.dvfs_mode, policy, cfg.use_boost);
            routers.push(Router::new(
                addr,
                k,
                cfg.vc_n,
                cfg.inp_buf,
                cfg.out_buf,
                cfg.routing,
                true,
                predictor,
            ));
            injectors.push(Injector::new(addr));
        }

        let mut queue = EventQueue::new();
        for id in 0..n_routers {
            queue.push(0.0, EventKind::RouterSingle { router: id });
        }
        if cfg.do_dvfs && cfg.dvfs_mode == PredictorMode::Sync {
            queue.push(cfg.hist_window as f64 + SYNC_EPSILON, EventKind::SyncPredictDvfs);
        }

        let (main_trace, local_traces) = if cfg.traffic == TrafficMode::Tracefile {
            let path = cfg.tracefile.as_ref().expect("validated in config::parse");
            let local_traces = Self::preopen_local_traces(path, k)?;
            let reader = TraceReader::open(path)?;
            queue.push(0.0, EventKind::Pe);
            (Some(reader), local_traces)
        } else {
            queue.push(0.0, EventKind::Pe);
            (None, HashMap::new())
        };

        let rng = Rng::from_seed(cfg.seed);
        Ok(NetworkController {
            cfg,
            k,
            n_routers,
            routers,
            injectors,
            queue,
            rng,
            now: 0.0,
            warmup_done: false,
            summary: SimSummary::default(),
            next_report_at: REPORT_INTERVAL,
            main_trace,
            local_traces,
            log,
        })
    }

    /// Scans the main trace once up front so a missing per-router local
    /// trace file is a startup error, not a mid-run surprise (I/O
    /// errors must fail early, before scheduling begins).
    fn preopen_local_traces(main_path: &str, k: u16) -> io::Result<HashMap<usize, TraceReader>> {
        let mut scan = TraceReader::open(main_path)?;
        let mut seen = std::collections::HashSet::new();
        let mut out = HashMap::new();
        while let Some(rec) = scan.next_record()? {
            let id = rec.src.id(k);
            if seen.insert(id) {
                let path = local_trace_path(main_path, rec.src);
                let reader = TraceReader::open(&path)?;
                out.insert(id, reader);
            }
        }
        Ok(out)
    }

    pub fn run(mut self) -> SimSummary {
        let start = Instant::now();
        let cycles = self.cfg.cycles as f64;

        while let Some(evt) = self.queue.pop_min() {
            assert!(evt.time >= self.now, "event queue popped out of order");
            self.now = evt.time;
            if self.now > cycles {
                break;
            }

            if !self.warmup_done && self.now >= self.cfg.warmup as f64 {
                self.warmup_done = true;
                for r in &mut self.routers {
                    r.set_warmup_done(true);
                }
                info!(self.log, "warmup complete"; "cycle" => self.now);
            }

            match evt.kind {
                EventKind::Pe => self.handle_pe(),
                EventKind::RouterSingle { router } => self.handle_router_single(router),
                EventKind::SyncPredictDvfs => self.handle_sync_predict(),
                EventKind::Link { to_router, port, vc, flit } => self.handle_link(to_router, port, vc, flit),
                EventKind::Credit { to_router, port, vc } => self.handle_credit(to_router, port, vc),
            }

            if self.now >= self.next_report_at {
                self.next_report_at += REPORT_INTERVAL;
                if self.check_saturation() {
                    break;
                }
            }
        }

        self.summary.final_time = self.now;
        self.summary.offered_load = if self.now > 0.0 {
            self.summary.packets_injected as f64 / (self.n_routers as f64 * self.now)
        } else {
            0.0
        };
        self.finalize_energy();
        self.summary.wall_time = start.elapsed();
        self.summary
    }

    fn check_saturation(&mut self) -> bool {
        let avg = self.summary.avg_latency();
        let threshold = 6.0 * self.n_routers as f64;
        if self.summary.packets_arrived_after_warmup > 0 && avg > threshold {
            let reason = format!(
                "average latency {:.2} exceeded saturation threshold {:.2} (6*N) at cycle {:.2}",
                avg, threshold, self.now
            );
            warn!(self.log, "early termination"; "reason" => &reason);
            self.summary.early_terminated = true;
            self.summary.early_termination_reason = Some(reason);
            true
        } else {
            debug!(self.log, "progress"; "cycle" => self.now, "avg_latency" => avg, "arrived" => self.summary.packets_arrived);
            false
        }
    }

    fn handle_router_single(&mut self, router_id: usize) {
        if self.warmup_done {
            let level = self.routers[router_id].dvfs_level;
            self.summary.record_dvfs_cycle(level);
        }
        let effects = self.routers[router_id].run_cycle(self.now, &mut self.rng);
        for effect in effects {
            self.apply_effect(effect);
        }
        self.injectors[router_id].recheck_pe_full(&self.routers[router_id]);

        let period = self.routers[router_id].next_period();
        self.queue.push(self.now + period, EventKind::RouterSingle { router: router_id });
    }

    fn handle_sync_predict(&mut self) {
        for r in &mut self.routers {
            r.sync_predict();
        }
        self.queue.push(self.now + self.cfg.hist_window as f64, EventKind::SyncPredictDvfs);
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Link { to_router, port, vc, flit, delay } => {
                self.queue.push(self.now + delay, EventKind::Link { to_router, port, vc, flit });
            }
            Effect::Credit { to_router, port, vc, delay } => {
                self.queue.push(self.now + delay, EventKind::Credit { to_router, port, vc });
            }
            Effect::Delivered { flit } => self.record_delivery(flit),
        }
    }

    fn record_delivery(&mut self, flit: Flit) {
        self.summary.packets_arrived += 1;
        self.summary
            .arrivals
            .push((flit.src_addr, flit.dest_addr, flit.id, self.now));
        if self.warmup_done {
            let latency = self.now - flit.start_time;
            self.summary.packets_arrived_after_warmup += 1;
            self.summary.sum_latency_after_warmup += latency;
            if latency > self.summary.max_latency {
                self.summary.max_latency = latency;
            }
        }
    }

    fn handle_link(&mut self, to_router: usize, in_port: usize, vc: usize, flit: Flit) {
        let is_header = flit.is_header();
        let input_vc = self.routers[to_router].input.vc_mut(in_port, vc);
        let was_empty = input_vc.buffer.is_empty();
        let was_idle = input_vc.state == VcState::Idle;
        input_vc.buffer.push_back(flit);
        if was_empty && was_idle {
            input_vc.state = if is_header { VcState::Routing } else { VcState::SwAb };
        }
    }

    fn handle_credit(&mut self, to_router: usize, out_port: usize, vc: usize) {
        let out = self.routers[to_router].output.port_mut(out_port);
        out.credit[vc] = (out.credit[vc] + 1).min(self.cfg.inp_buf);
    }

    fn handle_pe(&mut self) {
        match self.cfg.traffic {
            TrafficMode::Tracefile => self.handle_pe_trace(),
            mode => self.handle_pe_synthetic(mode),
        }
    }

    fn handle_pe_trace(&mut self) {
        let next_time = {
            let main = self.main_trace.as_mut().expect("tracefile mode always has a main trace");
            match main.next_record() {
                Ok(Some(rec)) => {
                    let router_id = rec.src.id(self.k);
                    if let Some(local) = self.local_traces.get_mut(&router_id) {
                        match local.next_record() {
                            Ok(Some(local_rec)) => {
                                let inj = &mut self.injectors[router_id];
                                let ok = inj.inject(
                                    &mut self.routers[router_id],
                                    local_rec.dst,
                                    local_rec.packet_size,
                                    self.cfg.flit_size,
                                    self.now,
                                );
                                self.summary.packets_injected += 1;
                                if self.warmup_done {
                                    self.summary.packets_injected_after_warmup += 1;
                                }
                                if !ok {
                                    self.summary.num_injections_failed += 1;
                                }
                            }
                            Ok(None) => {} // local trace EOF: silently stop injecting for this router
                            Err(e) => {
                                warn!(self.log, "local trace read error"; "router" => router_id, "error" => %e);
                            }
                        }
                    }
                    Some(rec.time)
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(self.log, "main trace read error"; "error" => %e);
                    None
                }
            }
        };
        if let Some(t) = next_time {
            self.queue.push(t.max(self.now), EventKind::Pe);
        }
    }

    fn handle_pe_synthetic(&mut self, mode: TrafficMode) {
        for router_id in 0..self.n_routers {
            let dest = {
                let inj = &mut self.injectors[router_id];
                inj.next_synthetic_dest(
                    mode,
                    &mut self.rng,
                    self.k,
                    self.cfg.injection_rate,
                    &self.cfg.hotspots,
                    self.cfg.hotspot_percentage,
                )
            };
            if let Some(dest) = dest {
                let ok = self.injectors[router_id].inject(
                    &mut self.routers[router_id],
                    dest,
                    self.cfg.packet_size,
                    self.cfg.flit_size,
                    self.now,
                );
                self.summary.packets_injected += 1;
                if self.warmup_done {
                    self.summary.packets_injected_after_warmup += 1;
                }
                if !ok {
                    self.summary.num_injections_failed += 1;
                }
            }
        }
        self.queue.push(self.now + DvfsLevel::Base.period(), EventKind::Pe);
    }

    fn finalize_energy(&mut self) {
        let mut unscaled_totals = [0.0f64; 5];
        let mut scaled_totals = [0.0f64; 5];
        let mut component_names: Vec<String> = Vec::new();
        let mut error_weighted_sum = 0.0;
        let mut total_predictions = 0u64;

        for r in &mut self.routers {
            r.energy.scale_and_accumulate_energy(r.dvfs_level);
            self.summary.total_unscaled_energy += r.energy.total_unscaled();
            self.summary.total_scaled_energy += r.energy.total_scaled();
            for (i, (component, unscaled, scaled)) in r.energy.component_breakdown().into_iter().enumerate() {
                unscaled_totals[i] += unscaled;
                scaled_totals[i] += scaled;
                if component_names.len() <= i {
                    component_names.push(component.to_string());
                }
            }

            let (count, avg_error) = r.predictor.prediction_stats();
            error_weighted_sum += avg_error * count as f64;
            total_predictions += count;
        }

        self.summary.energy_by_component = component_names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, unscaled_totals[i], scaled_totals[i]))
            .collect();
        self.summary.total_predictions = total_predictions;
        self.summary.avg_bu_prediction_error = if total_predictions > 0 {
            error_weighted_sum / total_predictions as f64
        } else {
            0.0
        };
    }
}

pub fn child_logger(log: &Logger, cfg: &Config) -> Logger {
    log.new(o!("ary_size" => cfg.ary_size, "routing" => format!("{:?}", cfg.routing)))
}
