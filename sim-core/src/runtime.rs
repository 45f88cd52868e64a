/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Per-task and per-object runtime state: the mutable side of the kernel
//! that the event loop advances and the protocol reads to build `update`
//! deltas.
//!
//! Task state is a closed tagged enum; every transition goes through
//! [`TaskRuntimeInfo::transition`] so an invalid jump (e.g. `Waiting` to
//! `Running`) is a programmer error caught at the call site, not a silently
//! corrupted field.

use std::collections::BTreeSet;

use crate::ids::{DataObjectId, TaskId, WorkerId};

/// Closed set of states a task passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Waiting,
    Ready,
    Assigned,
    Running,
    Finished,
}

impl TaskState {
    fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Waiting, Ready) | (Ready, Assigned) | (Assigned, Running) | (Running, Finished)
        )
    }
}

/// Mutable per-task runtime record.
#[derive(Debug, Clone)]
pub struct TaskRuntimeInfo {
    pub state: TaskState,
    /// Every assignment ever made, appended in order; the current worker is
    /// the last entry (if any). A no-op reassignment to the same worker
    /// still appends.
    pub assigned_workers: Vec<WorkerId>,
    pub assign_time: Option<f64>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    /// Counts down from `inputs.len()` to zero; the task becomes `Ready`
    /// exactly when this first reaches zero.
    pub unfinished_inputs: usize,
}

impl TaskRuntimeInfo {
    pub fn new(unfinished_inputs: usize) -> Self {
        Self {
            state: TaskState::Waiting,
            assigned_workers: Vec::new(),
            assign_time: None,
            start_time: None,
            end_time: None,
            unfinished_inputs,
        }
    }

    pub fn current_worker(&self) -> Option<WorkerId> {
        self.assigned_workers.last().copied()
    }

    /// Move to `next`, panicking if the transition isn't one the state
    /// machine allows. Kernel-internal invariant, never triggered by
    /// scheduler input directly (the protocol layer validates first).
    pub fn transition(&mut self, next: TaskState) {
        assert!(
            self.state.can_transition_to(next),
            "illegal task state transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Decrement `unfinished_inputs`, returning `true` if the task just
    /// became `Ready` as a result.
    pub fn input_satisfied(&mut self) -> bool {
        debug_assert!(self.unfinished_inputs > 0);
        self.unfinished_inputs -= 1;
        if self.unfinished_inputs == 0 {
            self.transition(TaskState::Ready);
            true
        } else {
            false
        }
    }

    pub fn record_assignment(&mut self, worker: WorkerId, now: f64) {
        self.assigned_workers.push(worker);
        self.assign_time = Some(now);
        if self.state == TaskState::Ready {
            self.transition(TaskState::Assigned);
        }
    }

    pub fn record_start(&mut self, now: f64) {
        self.start_time = Some(now);
        self.transition(TaskState::Running);
    }

    pub fn record_finish(&mut self, now: f64) {
        self.end_time = Some(now);
        self.transition(TaskState::Finished);
    }
}

/// Mutable per-object runtime record.
#[derive(Debug, Clone, Default)]
pub struct ObjectRuntimeInfo {
    /// Workers where the object physically exists.
    pub placing: BTreeSet<WorkerId>,
    /// `placing` ∪ workers where an in-flight transfer has completed. Kept
    /// distinct from `placing` for future partial-replication extensions,
    /// though the two sets coincide once any transfer finishes.
    pub availability: BTreeSet<WorkerId>,
    /// Workers the scheduler intends to deposit this object on. Advisory,
    /// owned by the scheduler mirror rather than the kernel, but tracked
    /// here too for reassignment recovery bookkeeping.
    pub scheduled: BTreeSet<WorkerId>,
}

impl ObjectRuntimeInfo {
    pub fn mark_placed(&mut self, worker: WorkerId) {
        self.placing.insert(worker);
        self.availability.insert(worker);
    }
}

/// Container for every task's and object's runtime state, plus the
/// invariant checks enforced at every event boundary.
#[derive(Debug, Default)]
pub struct RuntimeState {
    pub tasks: Vec<TaskRuntimeInfo>,
    pub objects: Vec<ObjectRuntimeInfo>,
}

impl RuntimeState {
    pub fn new(task_count: usize, object_count: usize, unfinished_inputs: impl Fn(TaskId) -> usize) -> Self {
        let tasks = (0..task_count)
            .map(|i| TaskRuntimeInfo::new(unfinished_inputs(TaskId(i as u32))))
            .collect();
        let objects = vec![ObjectRuntimeInfo::default(); object_count];
        Self { tasks, objects }
    }

    pub fn task(&self, id: TaskId) -> &TaskRuntimeInfo {
        &self.tasks[id.index()]
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut TaskRuntimeInfo {
        &mut self.tasks[id.index()]
    }

    pub fn object(&self, id: DataObjectId) -> &ObjectRuntimeInfo {
        &self.objects[id.index()]
    }

    pub fn object_mut(&mut self, id: DataObjectId) -> &mut ObjectRuntimeInfo {
        &mut self.objects[id.index()]
    }

    pub fn all_finished(&self) -> bool {
        self.tasks.iter().all(|t| t.state == TaskState::Finished)
    }

    pub fn finished_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.state == TaskState::Finished).count()
    }

    /// `placing(o) ⊆ availability(o)` for every object — checked after
    /// every event in debug builds by callers that care.
    pub fn placing_subset_of_availability(&self) -> bool {
        self.objects.iter().all(|o| o.placing.is_subset(&o.availability))
    }
}
