/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! The discrete-event loop's priority queue (component E).
//!
//! Keyed by `(time, kind_rank, monotonic_sequence)`: time orders events
//! chronologically; `kind_rank` clusters simultaneous events into the
//! `DownloadEnd → TaskEnd → TaskStart → SchedulerWake` processing order the
//! kernel requires so readiness and freed CPU are visible before new starts
//! are considered; `sequence` is assigned at insertion and never derived
//! from wall-clock or random state, the last tie-break for events of the
//! same kind at the same instant.
//!
//! Implemented as `BinaryHeap<Reverse<QueueEntry>>` — a min-heap via
//! max-heap inversion, the same trick the rest of the corpus uses rather
//! than reaching for an external binary-heap crate.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::ids::{DataObjectId, TaskId, WorkerId};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Time(f64);

impl Eq for Time {}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).expect("simulated time must never be NaN")
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One occurrence the event loop dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    DownloadEnd { object: DataObjectId, dest: WorkerId },
    TaskEnd { task: TaskId, worker: WorkerId },
    TaskStart { task: TaskId, worker: WorkerId },
    /// Wakes the loop at a `scheduling_time`-delayed assignment's apply
    /// time. Carries no scheduler-facing meaning of its own — the deferred
    /// batch is applied unconditionally once a group is processed at that
    /// instant — so it must not mark a scheduling point due.
    DeferredApply,
    SchedulerWake,
}

impl Event {
    fn kind_rank(&self) -> u8 {
        match self {
            Event::DownloadEnd { .. } => 0,
            Event::TaskEnd { .. } => 1,
            Event::TaskStart { .. } => 2,
            Event::DeferredApply => 3,
            Event::SchedulerWake => 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    time: Time,
    seq: u64,
    event: Event,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.event.kind_rank().cmp(&other.event.kind_rank()))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority-ordered discrete-event dispatcher over simulated time.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` at `time`, returning the sequence number assigned
    /// (useful for later cancellation bookkeeping by a caller that wants to
    /// correlate against something other than the event's own payload).
    pub fn push(&mut self, time: f64, event: Event) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(QueueEntry { time: Time(time), seq, event }));
        seq
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Time of the earliest still-queued event, if any. Used by the
    /// simulator to decide whether to keep draining same-instant cascades
    /// before running a scheduling point.
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(e)| e.time.0)
    }

    fn pop(&mut self) -> Option<(f64, Event)> {
        self.heap.pop().map(|Reverse(e)| (e.time.0, e.event))
    }

    /// Pop every event sharing the earliest time, already ordered
    /// `DownloadEnd → TaskEnd → TaskStart → SchedulerWake`. Empty if the
    /// queue is empty.
    pub fn pop_group(&mut self) -> (f64, Vec<Event>) {
        let Some(first) = self.peek_time() else {
            return (0.0, Vec::new());
        };
        let mut group = Vec::new();
        while self.peek_time() == Some(first) {
            let (_, event) = self.pop().expect("peek just confirmed an entry exists");
            group.push(event);
        }
        (first, group)
    }

    /// Remove every still-queued event matching `pred`. Used to cancel a
    /// not-yet-fired `TaskStart` when a pending task is reassigned away
    /// from its worker, and to drop a stale `DownloadEnd` superseded by a
    /// bandwidth-sharing model's recomputed ETA.
    pub fn cancel_matching(&mut self, mut pred: impl FnMut(&Event) -> bool) {
        let remaining: Vec<Reverse<QueueEntry>> =
            std::mem::take(&mut self.heap).into_iter().filter(|Reverse(e)| !pred(&e.event)).collect();
        self.heap = BinaryHeap::from(remaining);
    }
}
