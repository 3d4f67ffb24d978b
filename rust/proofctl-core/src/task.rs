use std::cmp::Ordering;

use tokio::sync::oneshot;

use crate::error::TaskError;

/// A queued unit of work with a payload, a monotonic submission sequence
/// (the FIFO tie-breaker), and a single-shot slot the scheduler resolves
/// exactly once with either the worker's result or a `TaskError`.
pub struct PriorityTask<P, R> {
    pub payload: P,
    pub priority: i64,
    pub sequence: u64,
    pub result_tx: oneshot::Sender<Result<R, TaskError>>,
}

impl<P, R> PriorityTask<P, R> {
    pub fn new(
        payload: P,
        priority: i64,
        sequence: u64,
    ) -> (Self, oneshot::Receiver<Result<R, TaskError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                payload,
                priority,
                sequence,
                result_tx: tx,
            },
            rx,
        )
    }

    /// True once the submitter has dropped its receiver — the dequeue loop
    /// checks this before doing any upstream work and silently discards the
    /// task rather than running it for nobody.
    pub fn is_abandoned(&self) -> bool {
        self.result_tx.is_closed()
    }
}

/// Ordering key only: lower `priority` dequeues first, ties broken by lower
/// `sequence` (earliest submission wins). Implemented so that wrapping a
/// task in `std::cmp::Reverse` before pushing onto a `BinaryHeap` (a
/// max-heap) yields min-priority-first pop order.
impl<P, R> PartialEq for PriorityTask<P, R> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl<P, R> Eq for PriorityTask<P, R> {}

impl<P, R> PartialOrd for PriorityTask<P, R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P, R> Ord for PriorityTask<P, R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// Pure-FIFO task for the compilation scheduler: ordering is by `sequence`
/// only, `priority` is unused but kept so both schedulers share a dequeue
/// loop shape.
pub struct FifoTask<P, R> {
    pub payload: P,
    pub sequence: u64,
    pub result_tx: oneshot::Sender<Result<R, TaskError>>,
}

impl<P, R> FifoTask<P, R> {
    pub fn new(payload: P, sequence: u64) -> (Self, oneshot::Receiver<Result<R, TaskError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                payload,
                sequence,
                result_tx: tx,
            },
            rx,
        )
    }

    pub fn is_abandoned(&self) -> bool {
        self.result_tx.is_closed()
    }
}

impl<P, R> PartialEq for FifoTask<P, R> {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}
impl<P, R> Eq for FifoTask<P, R> {}

impl<P, R> PartialOrd for FifoTask<P, R> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P, R> Ord for FifoTask<P, R> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sequence.cmp(&other.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    #[test]
    fn priority_task_orders_lower_priority_first() {
        let mut heap = BinaryHeap::new();
        let (t1, _r1) = PriorityTask::<_, ()>::new("low-priority-later", 5, 10);
        let (t2, _r2) = PriorityTask::<_, ()>::new("high-priority", 1, 20);
        let (t3, _r3) = PriorityTask::<_, ()>::new("low-priority-earlier", 5, 5);
        heap.push(Reverse(t1));
        heap.push(Reverse(t2));
        heap.push(Reverse(t3));

        let Reverse(first) = heap.pop().unwrap();
        assert_eq!(first.payload, "high-priority");
        let Reverse(second) = heap.pop().unwrap();
        assert_eq!(second.payload, "low-priority-earlier");
        let Reverse(third) = heap.pop().unwrap();
        assert_eq!(third.payload, "low-priority-later");
    }

    #[test]
    fn fifo_task_orders_by_sequence() {
        let mut heap = BinaryHeap::new();
        let (t1, _r1) = FifoTask::<_, ()>::new("second", 2);
        let (t2, _r2) = FifoTask::<_, ()>::new("first", 1);
        heap.push(Reverse(t1));
        heap.push(Reverse(t2));

        let Reverse(first) = heap.pop().unwrap();
        assert_eq!(first.payload, "first");
    }
}
