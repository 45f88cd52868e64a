/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Worker-side CPU admission and download bookkeeping (component C).
//!
//! A `Worker` does not know about the task graph or the network model — it
//! is handed a cpu demand at enqueue time and an `input_ready` predicate at
//! admission time, so its own logic stays a closed, independently testable
//! priority-queue-plus-bin-packing problem. The simulator is the only
//! caller that knows how "input ready" and "cpu demand" map back to the
//! graph.

use std::collections::{BTreeMap, BTreeSet};
use std::collections::BinaryHeap;

use crate::ids::{DataObjectId, TaskId, WorkerId};

/// A task that has started running on this worker.
#[derive(Debug, Clone, Copy)]
pub struct RunningTask {
    pub cpus: u32,
    pub start_time: f64,
}

/// An assignment waiting for CPU and/or data to become available.
#[derive(Debug, Clone, Copy)]
pub struct PendingAssignment {
    pub task: TaskId,
    pub cpus: u32,
    pub priority: i64,
    /// Number of this task's pending downloads that must finish before it
    /// may start, even if not all inputs are locally available yet.
    pub blocking: usize,
    insertion_order: u64,
}

impl PartialEq for PendingAssignment {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.insertion_order == other.insertion_order
    }
}
impl Eq for PendingAssignment {}

impl Ord for PendingAssignment {
    /// Keyed `(priority, -insertion_order)`: higher priority sorts greater;
    /// among equal priorities, the earlier-enqueued entry sorts greater so
    /// it is popped first — oldest-first tie-breaking without a scan.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.insertion_order.cmp(&self.insertion_order))
    }
}
impl PartialOrd for PendingAssignment {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// One worker's CPU capacity, running set, pending-assignment queue, and
/// in-flight downloads.
#[derive(Debug)]
pub struct Worker {
    pub id: WorkerId,
    pub cpus: u32,
    running: BTreeMap<TaskId, RunningTask>,
    pending: BinaryHeap<PendingAssignment>,
    downloads_in_flight: BTreeSet<DataObjectId>,
    downloads_completed: BTreeMap<TaskId, usize>,
    next_insertion_order: u64,
}

impl Worker {
    pub fn new(id: WorkerId, cpus: u32) -> Self {
        Self {
            id,
            cpus,
            running: BTreeMap::new(),
            pending: BinaryHeap::new(),
            downloads_in_flight: BTreeSet::new(),
            downloads_completed: BTreeMap::new(),
            next_insertion_order: 0,
        }
    }

    pub fn free_cpus(&self) -> u32 {
        self.cpus - self.running.values().map(|r| r.cpus).sum::<u32>()
    }

    pub fn running_tasks(&self) -> impl Iterator<Item = (TaskId, &RunningTask)> {
        self.running.iter().map(|(&t, r)| (t, r))
    }

    pub fn is_running(&self, task: TaskId) -> bool {
        self.running.contains_key(&task)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self, task: TaskId) -> bool {
        self.pending.iter().any(|p| p.task == task)
    }

    /// Ids of every currently pending (not yet started) task, in no
    /// particular order. Non-destructive — used to look for inputs that
    /// still need a download kicked off.
    pub fn pending_task_ids(&self) -> Vec<TaskId> {
        self.pending.iter().map(|p| p.task).collect()
    }

    /// Queue `task` for this worker. Cancels any existing pending entry for
    /// the same task first, so a scheduler re-assigning within one update
    /// leaves only the last assignment in effect.
    pub fn enqueue(&mut self, task: TaskId, cpus: u32, priority: i64, blocking: usize) {
        self.withdraw(task);
        let insertion_order = self.next_insertion_order;
        self.next_insertion_order += 1;
        self.pending.push(PendingAssignment {
            task,
            cpus,
            priority,
            blocking,
            insertion_order,
        });
        self.downloads_completed.remove(&task);
    }

    /// Remove `task` from the pending queue, if present. Used for
    /// `worker_id = none` withdrawal and for detaching a not-yet-started
    /// task before reattaching it elsewhere during a reassignment.
    pub fn withdraw(&mut self, task: TaskId) -> bool {
        if !self.has_pending(task) {
            return false;
        }
        let remaining: Vec<PendingAssignment> =
            std::mem::take(&mut self.pending).into_iter().filter(|p| p.task != task).collect();
        self.pending = BinaryHeap::from(remaining);
        self.downloads_completed.remove(&task);
        true
    }

    pub fn start_download(&mut self, object: DataObjectId) {
        self.downloads_in_flight.insert(object);
    }

    /// Mark `object`'s download to this worker as complete, and credit any
    /// pending task whose blocking requirement counts it. Returns the tasks
    /// whose `blocking` threshold this download completion satisfies.
    pub fn finish_download(&mut self, object: DataObjectId, tasks_waiting_on_it: &[TaskId]) {
        self.downloads_in_flight.remove(&object);
        for &task in tasks_waiting_on_it {
            *self.downloads_completed.entry(task).or_insert(0) += 1;
        }
    }

    /// `blocking == 0` is "no hint given" and never relaxes admission on its
    /// own; only a positive threshold lets a task start before all its
    /// inputs are locally available.
    fn blocking_satisfied(&self, pending: &PendingAssignment) -> bool {
        pending.blocking > 0
            && self.downloads_completed.get(&pending.task).copied().unwrap_or(0) >= pending.blocking
    }

    /// Admit as many eligible pending tasks as fit in current free CPU,
    /// scanning in descending priority (ties broken oldest-first) and
    /// greedily bin-packing: a task that doesn't fit does not block a
    /// lower-priority one that does. `input_ready` reports whether a task's
    /// inputs are locally available; with no `blocking` hint a task must
    /// wait for it, same as the scheduler never having sent one.
    pub fn admit_eligible(
        &mut self,
        now: f64,
        mut input_ready: impl FnMut(TaskId) -> bool,
    ) -> Vec<TaskId> {
        let mut candidates: Vec<PendingAssignment> = std::mem::take(&mut self.pending).into_sorted_vec();
        candidates.reverse(); // descending priority, oldest-first on ties

        let mut started = Vec::new();
        let mut remaining = Vec::new();
        let mut free = self.free_cpus();

        for cand in candidates {
            let ready = input_ready(cand.task) || self.blocking_satisfied(&cand);
            if ready && cand.cpus <= free {
                free -= cand.cpus;
                self.running.insert(
                    cand.task,
                    RunningTask {
                        cpus: cand.cpus,
                        start_time: now,
                    },
                );
                self.downloads_completed.remove(&cand.task);
                started.push(cand.task);
            } else {
                remaining.push(cand);
            }
        }

        self.pending = BinaryHeap::from(remaining);
        started
    }

    /// Remove a finished task from the running set, freeing its CPUs.
    pub fn finish_task(&mut self, task: TaskId) -> Option<RunningTask> {
        self.running.remove(&task)
    }
}
