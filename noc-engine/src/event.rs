//! The discrete-event core: a single global, min-timestamp-ordered queue.
//!
//! The model this crate drives is single-threaded and cooperative (one
//! simulation clock, no channels, no null-messages, no per-actor
//! synchronization), so the queue is a plain `BinaryHeap` with a reversed
//! `Ord` impl to turn the max-heap `std::collections::BinaryHeap` into a
//! min-heap over event timestamps.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

/// Simulation time, in cycles. `f64` so fractional local-trace timestamps
/// (see the trace file formats in the external interface) round-trip
/// exactly for the magnitudes this simulator deals with.
pub type Time = f64;

/// The kind of event flowing through the queue, parametrized by the
/// model-specific payload `M` (e.g. `noc_router::NetworkEvent`).
#[derive(Debug, Clone)]
pub enum EventKind<M> {
    /// Injector tick: attempt to inject the next packet/trace line.
    Pe,
    /// Re-schedule a single router for its next pipeline cycle.
    RouterSingle {
        /// id of the router to advance
        router: usize,
    },
    /// Global synchronous DVFS prediction tick (SYNC mode only).
    SyncPredictDvfs,
    /// A flit arriving on a link at a neighbouring router.
    Link {
        /// destination router id
        to_router: usize,
        /// destination physical port
        port: usize,
        /// destination virtual channel
        vc: usize,
        /// the flit in flight
        flit: M,
    },
    /// A credit returning upstream after a downstream buffer slot freed.
    Credit {
        /// destination (upstream) router id
        to_router: usize,
        /// upstream port receiving the credit
        port: usize,
        /// upstream virtual channel receiving the credit
        vc: usize,
    },
}

/// A fully described event: what to do (`kind`), and when (`time`).
///
/// Events are totally ordered by `time`; ties are broken by insertion order
/// (`seq`), giving the FIFO-within-a-timestamp guarantee required by the
/// ordering invariants.
pub struct Event<M> {
    pub time: Time,
    pub seq: u64,
    pub kind: EventKind<M>,
}

impl<M> fmt::Debug for Event<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("time", &self.time)
            .field("seq", &self.seq)
            .finish()
    }
}

impl<M> Event<M> {
    /// Builds a new event. `seq` must be supplied by the queue on push so
    /// that insertion order is preserved across ties; use
    /// [`EventQueue::push`] rather than constructing `Event` directly where
    /// possible.
    pub fn new(time: Time, seq: u64, kind: EventKind<M>) -> Event<M> {
        Event { time, seq, kind }
    }
}

// Reversed `Ord` so that `BinaryHeap<Event<M>>` (a max-heap) pops the
// smallest `time` first, and among equal times the smallest `seq` first
// (earliest inserted).
impl<M> Ord for Event<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<M> PartialOrd for Event<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> PartialEq for Event<M> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl<M> Eq for Event<M> {}

/// A priority structure keyed by `start_time`, stable for equal keys (C1).
///
/// Single-threaded, no locking: the whole simulation lives on one logical
/// clock and this queue is the only globally shared structure.
#[derive(Debug)]
pub struct EventQueue<M> {
    heap: BinaryHeap<Event<M>>,
    next_seq: u64,
}

impl<M> Default for EventQueue<M> {
    fn default() -> Self {
        EventQueue::new()
    }
}

impl<M> EventQueue<M> {
    /// Creates an empty queue.
    pub fn new() -> EventQueue<M> {
        EventQueue {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Pushes an event, stamping it with the next insertion sequence
    /// number so ties at the same `time` resolve in push order.
    pub fn push(&mut self, time: Time, kind: EventKind<M>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event::new(time, seq, kind));
    }

    /// Pops the event with the smallest `time` (ties broken by insertion
    /// order).
    pub fn pop_min(&mut self) -> Option<Event<M>> {
        self.heap.pop()
    }

    /// Looks at the minimum event without removing it.
    pub fn peek_min(&self) -> Option<&Event<M>> {
        self.heap.peek()
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue has no events left.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Dummy;

    #[test]
    fn pops_in_time_order() {
        let mut q: EventQueue<Dummy> = EventQueue::new();
        q.push(5.0, EventKind::Pe);
        q.push(1.0, EventKind::Pe);
        q.push(3.0, EventKind::Pe);

        let mut times = Vec::new();
        while let Some(evt) = q.pop_min() {
            times.push(evt.time);
        }
        assert_eq!(times, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn ties_break_fifo() {
        let mut q: EventQueue<Dummy> = EventQueue::new();
        q.push(1.0, EventKind::RouterSingle { router: 0 });
        q.push(1.0, EventKind::RouterSingle { router: 1 });
        q.push(1.0, EventKind::RouterSingle { router: 2 });

        let ids: Vec<usize> = std::iter::from_fn(|| q.pop_min())
            .map(|evt| match evt.kind {
                EventKind::RouterSingle { router } => router,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn peek_does_not_remove() {
        let mut q: EventQueue<Dummy> = EventQueue::new();
        q.push(2.0, EventKind::Pe);
        assert_eq!(q.peek_min().unwrap().time, 2.0);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn monotonic_pop_assertion_style() {
        let mut q: EventQueue<Dummy> = EventQueue::new();
        q.push(1.0, EventKind::Pe);
        q.push(2.0, EventKind::Pe);
        let mut now = 0.0;
        while let Some(evt) = q.pop_min() {
            assert!(evt.time >= now, "event queue popped out of order");
            now = evt.time;
        }
    }
}
