//! Per-router packet injector (C9): trace-driven and synthetic traffic
//! generation, PE-port admission, and the soft PE-buffer cap.
//!
//! A small struct owning its own RNG-consuming decision plus a handful of
//! named constants for traffic-shape math: a self-contained generator
//! driven by the shared deterministic RNG rather than a process-wide
//! random source.

use noc_engine::{Rng, Time};
use noc_router::addr::port;
use noc_router::input::VcState;
use noc_router::{make_packet, Addr, Router};

use crate::config::TrafficMode;

/// Soft cap on PE input-buffer occupancy (flits), past which the
/// injector stops offering new packets until it drains.
pub const PE_SOFT_CAP: usize = 512;

#[derive(Debug)]
pub struct Injector {
    pub addr: Addr,
    pub pe_full: bool,
    pub num_injected: u64,
    pub num_injections_failed: u64,
    next_flit_id: u64,
}

impl Injector {
    pub fn new(addr: Addr) -> Injector {
        Injector {
            addr,
            pe_full: false,
            num_injected: 0,
            num_injections_failed: 0,
            next_flit_id: ((addr.x as u64) << 48) | ((addr.y as u64) << 32),
        }
    }

    /// Appends one packet's flits to `router`'s PE-port buffer, choosing
    /// the PE VC with the shortest queue. Returns `false` without
    /// modifying anything if the PE is already marked full.
    pub fn inject(&mut self, router: &mut Router, dest: Addr, packet_size: usize, flit_words: usize, now: Time) -> bool {
        if self.pe_full {
            self.num_injections_failed += 1;
            return false;
        }

        let vc_n = router.vc_n;
        let vc = (0..vc_n)
            .min_by_key(|&j| router.input.vc(port::PE, j).buffer.len())
            .expect("vc_n >= 1");

        let flits = make_packet(self.next_flit_id, self.addr, dest, packet_size, flit_words, now);
        self.next_flit_id += flits.len() as u64;

        let in_vc = router.input.vc_mut(port::PE, vc);
        if in_vc.buffer.is_empty() && in_vc.state == VcState::Idle {
            in_vc.state = VcState::Routing;
        }
        for f in flits {
            in_vc.buffer.push_back(f);
        }
        self.num_injected += 1;
        if in_vc.buffer.len() > PE_SOFT_CAP {
            self.pe_full = true;
        }
        true
    }

    /// Re-enabled by the caller once the PE port's buffer occupancy has
    /// dropped back under the soft cap.
    pub fn recheck_pe_full(&mut self, router: &Router) {
        if !self.pe_full {
            return;
        }
        let still_full = (0..router.vc_n).any(|j| router.input.vc(port::PE, j).buffer.len() > PE_SOFT_CAP);
        if !still_full {
            self.pe_full = false;
        }
    }

    /// One synthetic-traffic decision point, called once per base period
    /// for non-tracefile modes. Returns the destination to inject to, if
    /// this tick's Bernoulli draw succeeds.
    ///
    /// `SelfSimilar` is accepted as a traffic-mode token (the CLI/config
    /// interface exists) but is not given its own burst shaping — it
    /// draws uniform destinations at the nominal rate, same as `Uniform`.
    pub fn next_synthetic_dest(
        &mut self,
        mode: TrafficMode,
        rng: &mut Rng,
        k: u16,
        injection_rate: f64,
        hotspots: &[usize],
        hotspot_percentage: f64,
    ) -> Option<Addr> {
        if rng.uniform_unit() >= injection_rate {
            return None;
        }

        let dest = match mode {
            TrafficMode::Uniform | TrafficMode::SelfSimilar => self.uniform_dest(rng, k),
            TrafficMode::Hotspot => self.hotspot_dest(rng, k, hotspots, hotspot_percentage),
            TrafficMode::Transpose1 => Addr::new(self.addr.y, self.addr.x),
            TrafficMode::Transpose2 => Addr::new(k - 1 - self.addr.y, k - 1 - self.addr.x),
            TrafficMode::Tracefile => unreachable!("tracefile mode does not use synthetic destinations"),
        };
        if dest == self.addr {
            None
        } else {
            Some(dest)
        }
    }

    fn uniform_dest(&self, rng: &mut Rng, k: u16) -> Addr {
        loop {
            let id = rng.uniform_below(k as usize * k as usize);
            let candidate = Addr::from_id(id, k);
            if candidate != self.addr {
                return candidate;
            }
        }
    }

    fn hotspot_dest(&self, rng: &mut Rng, k: u16, hotspots: &[usize], hotspot_percentage: f64) -> Addr {
        if !hotspots.is_empty() && rng.uniform_unit() * 100.0 < hotspot_percentage {
            let id = hotspots[rng.uniform_below(hotspots.len())];
            Addr::from_id(id, k)
        } else {
            self.uniform_dest(rng, k)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noc_router::{DvfsLevel, Policy, Predictor, PredictorMode, RoutingAlgo};

    fn make_test_router(addr: Addr) -> Router {
        let predictor = Predictor::new(200, 3.0, PredictorMode::Async, Policy::A, false);
        let mut r = Router::new(addr, 4, 2, 16, 16, RoutingAlgo::Xy, true, predictor);
        r.dvfs_level = DvfsLevel::Base;
        r
    }

    #[test]
    fn inject_picks_shortest_queue_vc() {
        let mut router = make_test_router(Addr::new(0, 0));
        router.input.vc_mut(port::PE, 0).buffer.push_back(
            make_packet(0, Addr::new(0, 0), Addr::new(1, 1), 2, 1, 0.0).remove(0),
        );
        let mut inj = Injector::new(Addr::new(0, 0));
        assert!(inj.inject(&mut router, Addr::new(2, 2), 2, 1, 1.0));
        assert_eq!(router.input.vc(port::PE, 1).buffer.len(), 2);
    }

    #[test]
    fn injection_fails_once_pe_full() {
        let mut router = make_test_router(Addr::new(0, 0));
        let mut inj = Injector::new(Addr::new(0, 0));
        for _ in 0..300 {
            inj.inject(&mut router, Addr::new(1, 1), 2, 1, 0.0);
        }
        assert!(inj.pe_full);
        assert!(!inj.inject(&mut router, Addr::new(1, 1), 2, 1, 0.0));
        assert_eq!(inj.num_injections_failed, 1);
    }

    #[test]
    fn transpose1_swaps_coordinates() {
        let mut inj = Injector::new(Addr::new(2, 5));
        let mut rng = Rng::from_seed(1);
        let dest = inj
            .next_synthetic_dest(TrafficMode::Transpose1, &mut rng, 8, 1.0, &[], 0.0)
            .unwrap();
        assert_eq!(dest, Addr::new(5, 2));
    }
}
