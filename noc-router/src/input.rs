//! Per-(port, VC) input-side state (C3).
//!
//! One `VecDeque`-backed FIFO per VC plus a small state enum is the unit
//! of input-side state: bounded capacity, one lifecycle state machine,
//! and whatever routing decision was made for the flit currently at its
//! head.

use std::collections::VecDeque;

use crate::flit::Flit;
use crate::routing::Candidate;

/// Per-(port, VC) lifecycle (state machine; legal transitions are
/// enforced by the pipeline stages in `pipeline.rs`, not by this type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcState {
    Idle,
    Routing,
    VcAb,
    SwAb,
    SwTr,
    Home,
}

/// The input-side state of a single (port, VC).
#[derive(Debug)]
pub struct InputVc {
    pub buffer: VecDeque<Flit>,
    pub state: VcState,
    pub routing_candidates: Vec<Candidate>,
    pub selected_routing: Option<(usize, usize)>,
    /// Bound on `buffer.len()`; `B_in` nominally, with a soft cap of 512 on
    /// port 0 (the PE port) enforced by the injector, not this struct.
    pub capacity: usize,
}

impl InputVc {
    pub fn new(capacity: usize) -> InputVc {
        InputVc {
            buffer: VecDeque::new(),
            state: VcState::Idle,
            routing_candidates: Vec::new(),
            selected_routing: None,
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }

    pub fn peek_head(&self) -> Option<&Flit> {
        self.buffer.front()
    }
}

/// All input-side state for one router: `[port][vc]`.
#[derive(Debug)]
pub struct RouterInput {
    pub ports: Vec<Vec<InputVc>>,
}

impl RouterInput {
    pub fn new(num_ports: usize, vc_n: usize, b_in: usize) -> RouterInput {
        let ports = (0..num_ports)
            .map(|_| (0..vc_n).map(|_| InputVc::new(b_in)).collect())
            .collect();
        RouterInput { ports }
    }

    pub fn vc(&self, port: usize, vc: usize) -> &InputVc {
        &self.ports[port][vc]
    }

    pub fn vc_mut(&mut self, port: usize, vc: usize) -> &mut InputVc {
        &mut self.ports[port][vc]
    }

    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    pub fn num_vcs(&self) -> usize {
        self.ports[0].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::Addr;
    use crate::flit::{Flit, FlitKind};

    fn dummy_flit(kind: FlitKind) -> Flit {
        Flit {
            id: 0,
            kind,
            src_addr: Addr::new(0, 0),
            dest_addr: Addr::new(1, 1),
            start_time: 0.0,
            finish_time: None,
            payload: vec![0],
        }
    }

    #[test]
    fn capacity_is_respected() {
        let mut vc = InputVc::new(2);
        assert!(!vc.is_full());
        vc.buffer.push_back(dummy_flit(FlitKind::Header));
        vc.buffer.push_back(dummy_flit(FlitKind::Tail));
        assert!(vc.is_full());
    }

    #[test]
    fn router_input_indexes_by_port_and_vc() {
        let input = RouterInput::new(5, 4, 16);
        assert_eq!(input.num_ports(), 5);
        assert_eq!(input.num_vcs(), 4);
        assert_eq!(input.vc(0, 0).state, VcState::Idle);
    }
}
