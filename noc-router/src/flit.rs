//! Flit / credit value types (C2).
//!
//! A plain data struct carried by events, plus a small builder
//! (`make_packet`) that synthesizes a run of them: the wormhole flit here
//! plays the same role on the wire that a packet would in a
//! packet-switched model, just carrying routing/VC state instead of
//! sequence numbers.

use crate::addr::Addr;

/// Which part of a packet a flit is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlitKind {
    Header,
    Body,
    Tail,
}

/// The smallest flow-control unit moved by the pipeline.
#[derive(Debug, Clone)]
pub struct Flit {
    pub id: u64,
    pub kind: FlitKind,
    pub src_addr: Addr,
    pub dest_addr: Addr,
    pub start_time: f64,
    pub finish_time: Option<f64>,
    pub payload: Vec<u64>,
}

impl Flit {
    pub fn is_header(&self) -> bool {
        self.kind == FlitKind::Header
    }

    pub fn is_tail(&self) -> bool {
        self.kind == FlitKind::Tail
    }
}

/// Synthesizes one packet's worth of flits: one Header, `packet_size - 2`
/// Body, one Tail (minimum packet size is 2, enforced by the caller).
pub fn make_packet(
    first_id: u64,
    src_addr: Addr,
    dest_addr: Addr,
    packet_size: usize,
    flit_width_words: usize,
    start_time: f64,
) -> Vec<Flit> {
    assert!(packet_size >= 2, "packet_size must be at least 2 (Header+Tail)");

    let mut flits = Vec::with_capacity(packet_size);
    for i in 0..packet_size {
        let kind = if i == 0 {
            FlitKind::Header
        } else if i == packet_size - 1 {
            FlitKind::Tail
        } else {
            FlitKind::Body
        };
        flits.push(Flit {
            id: first_id + i as u64,
            kind,
            src_addr,
            dest_addr,
            start_time,
            finish_time: None,
            payload: vec![0u64; flit_width_words],
        });
    }
    flits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_has_one_header_and_one_tail() {
        let flits = make_packet(0, Addr::new(0, 0), Addr::new(1, 1), 5, 1, 0.0);
        assert_eq!(flits.len(), 5);
        assert!(flits[0].is_header());
        assert!(flits[4].is_tail());
        for mid in &flits[1..4] {
            assert_eq!(mid.kind, FlitKind::Body);
        }
    }

    #[test]
    fn minimum_packet_size_is_header_and_tail() {
        let flits = make_packet(0, Addr::new(0, 0), Addr::new(0, 1), 2, 1, 0.0);
        assert_eq!(flits.len(), 2);
        assert!(flits[0].is_header());
        assert!(flits[1].is_tail());
    }

    #[test]
    #[should_panic]
    fn rejects_too_small_packet() {
        make_packet(0, Addr::new(0, 0), Addr::new(0, 0), 1, 1, 0.0);
    }
}
