//! Routing algorithms (Stage 1, RC).
//!
//! Dimension-order (XY) and torus-XY routing are both oblivious: the next
//! hop is a pure function of the current and destination coordinates, so
//! this computes a per-hop decision directly rather than precomputing and
//! storing a whole-network routing table.

use crate::addr::{port, Addr};

/// Routing algorithm selector (`routing:` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingAlgo {
    Xy,
    TorusXy,
}

impl RoutingAlgo {
    pub fn parse(s: &str) -> Option<RoutingAlgo> {
        match s {
            "XY" => Some(RoutingAlgo::Xy),
            "TXY" => Some(RoutingAlgo::TorusXy),
            _ => None,
        }
    }
}

/// A candidate `(out_port, out_vc)` pair permitted by the routing function
/// for the packet's head flit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub out_port: usize,
    pub out_vc: usize,
}

/// Computes the routing candidates for a flit at `here` destined for
/// `dest`, given `k` (mesh side) and `vc_n` (VCs per port).
///
/// Returns an empty vector if `here == dest` (the caller is expected to
/// have already consumed the packet at the RC stage in that case, per
/// the Home-state handling in the RC stage).
pub fn candidates(algo: RoutingAlgo, here: Addr, dest: Addr, k: u16, vc_n: usize) -> Vec<Candidate> {
    if here == dest {
        return Vec::new();
    }

    let dx = dest.x as i32 - here.x as i32;
    let dy = dest.y as i32 - here.y as i32;

    let out_port = if dy < 0 {
        port::SOUTH
    } else if dy > 0 {
        port::NORTH
    } else if dx < 0 {
        port::WEST
    } else {
        port::EAST
    };

    match algo {
        RoutingAlgo::Xy => (0..vc_n)
            .map(|vc| Candidate { out_port, out_vc: vc })
            .collect(),
        RoutingAlgo::TorusXy => {
            assert!(vc_n >= 2, "Torus-XY routing requires vc_n >= 2 (dateline class)");
            let wraps = if out_port == port::WEST || out_port == port::EAST {
                dx.unsigned_abs() as u32 * 2 > k as u32
            } else {
                dy.unsigned_abs() as u32 * 2 > k as u32
            };
            let vc = if wraps { 1 } else { 0 };
            vec![Candidate { out_port, out_vc: vc }]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xy_prefers_y_then_x() {
        let here = Addr::new(2, 2);
        let dest_north = Addr::new(2, 5);
        let cands = candidates(RoutingAlgo::Xy, here, dest_north, 8, 2);
        assert!(cands.iter().all(|c| c.out_port == port::NORTH));

        let dest_east = Addr::new(5, 2);
        let cands = candidates(RoutingAlgo::Xy, here, dest_east, 8, 2);
        assert!(cands.iter().all(|c| c.out_port == port::EAST));
    }

    #[test]
    fn xy_offers_all_vcs() {
        let cands = candidates(RoutingAlgo::Xy, Addr::new(0, 0), Addr::new(3, 0), 8, 4);
        assert_eq!(cands.len(), 4);
    }

    #[test]
    fn same_router_has_no_candidates() {
        let here = Addr::new(1, 1);
        assert!(candidates(RoutingAlgo::Xy, here, here, 8, 2).is_empty());
    }

    #[test]
    fn torus_xy_uses_dateline_vc_on_wraparound() {
        // k=8: going from x=1 to x=6 the short way wraps (distance 3 vs 5).
        let here = Addr::new(1, 0);
        let dest = Addr::new(6, 0);
        let cands = candidates(RoutingAlgo::TorusXy, here, dest, 8, 2);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].out_vc, 1);
    }

    #[test]
    fn torus_xy_uses_non_wrap_vc_for_short_hops() {
        let here = Addr::new(1, 0);
        let dest = Addr::new(2, 0);
        let cands = candidates(RoutingAlgo::TorusXy, here, dest, 8, 2);
        assert_eq!(cands[0].out_vc, 0);
    }
}
