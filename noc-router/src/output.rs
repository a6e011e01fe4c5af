//! Per-port output-side state (C4): assignment, credits, and the output
//! buffer that feeds the link-transmission stage.
//!
//! `credit` is one free-slot counter per VC, decremented on send and
//! incremented on ack — a plain `Vec<usize>`, not a trait object, since
//! there is only ever one kind of credit-based flow control here.

use std::collections::VecDeque;

use crate::flit::Flit;

/// Whether a VC at the downstream end of a link is currently assigned to
/// an input VC on this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcUsage {
    Free,
    Used,
}

/// Output-side state for a single physical port.
#[derive(Debug)]
pub struct OutputPort {
    /// Flits that have won SW-AB and are waiting for LT, each tagged with
    /// the downstream `out_vc` it was granted (the upstream credit for
    /// the input VC it came from is already returned at SW-TR time).
    pub out_buffer: VecDeque<(Flit, usize)>,
    /// Free-slot counter on *this* router's send side, one per VC, for the
    /// local arbiter's own admission control (distinct from `credit`,
    /// which tracks the downstream neighbour's free slots).
    pub local_counter: Vec<usize>,
    /// Downstream free-slot count per VC (credit-based flow control, I1).
    pub credit: Vec<usize>,
    /// Whether each downstream VC is currently claimed by an input VC.
    pub vc_usage: Vec<VcUsage>,
    /// Which (in_port, in_vc) currently owns each downstream VC, if used.
    pub assigned_to: Vec<Option<(usize, usize)>>,
}

impl OutputPort {
    /// `b_out` sizes this port's own send-side `local_counter`; `b_in`
    /// sizes `credit`, since that counter tracks free slots in the
    /// downstream router's *input* buffer, not this router's output
    /// buffer.
    pub fn new(vc_n: usize, b_in: usize, b_out: usize) -> OutputPort {
        OutputPort {
            out_buffer: VecDeque::new(),
            local_counter: vec![b_out; vc_n],
            credit: vec![b_in; vc_n],
            vc_usage: vec![VcUsage::Free; vc_n],
            assigned_to: vec![None; vc_n],
        }
    }

    pub fn is_vc_free(&self, vc: usize) -> bool {
        self.vc_usage[vc] == VcUsage::Free
    }

    pub fn has_credit(&self, vc: usize) -> bool {
        self.credit[vc] > 0
    }

    pub fn claim(&mut self, vc: usize, owner: (usize, usize)) {
        debug_assert!(self.is_vc_free(vc));
        self.vc_usage[vc] = VcUsage::Used;
        self.assigned_to[vc] = Some(owner);
    }

    pub fn release(&mut self, vc: usize) {
        self.vc_usage[vc] = VcUsage::Free;
        self.assigned_to[vc] = None;
    }
}

/// All output-side state for one router: one [`OutputPort`] per physical
/// port.
#[derive(Debug)]
pub struct RouterOutput {
    pub ports: Vec<OutputPort>,
}

impl RouterOutput {
    pub fn new(num_ports: usize, vc_n: usize, b_in: usize, b_out: usize) -> RouterOutput {
        RouterOutput {
            ports: (0..num_ports).map(|_| OutputPort::new(vc_n, b_in, b_out)).collect(),
        }
    }

    pub fn port(&self, p: usize) -> &OutputPort {
        &self.ports[p]
    }

    pub fn port_mut(&mut self, p: usize) -> &mut OutputPort {
        &mut self.ports[p]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_port_starts_with_full_credit_and_free_vcs() {
        let out = OutputPort::new(4, 16, 16);
        assert!(out.has_credit(0));
        assert!(out.is_vc_free(0));
        assert_eq!(out.credit[0], 16);
    }

    #[test]
    fn credit_is_sized_by_b_in_not_b_out() {
        let out = OutputPort::new(4, 24, 8);
        assert_eq!(out.credit[0], 24);
        assert_eq!(out.local_counter[0], 8);
    }

    #[test]
    fn claim_and_release_roundtrip() {
        let mut out = OutputPort::new(2, 8, 8);
        out.claim(0, (1, 2));
        assert!(!out.is_vc_free(0));
        assert_eq!(out.assigned_to[0], Some((1, 2)));
        out.release(0);
        assert!(out.is_vc_free(0));
        assert_eq!(out.assigned_to[0], None);
    }

    #[test]
    fn router_output_indexes_by_port() {
        let router_out = RouterOutput::new(5, 4, 16, 16);
        assert_eq!(router_out.ports.len(), 5);
        assert_eq!(router_out.port(0).credit.len(), 4);
    }
}
