/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Scheduler-side graph mirror (component G).
//!
//! A scheduler never mutates kernel state directly; it holds this
//! independent mirror of workers, tasks, and objects, refreshed from the
//! protocol's [`UpdateMessage`](crate::protocol::UpdateMessage) before every
//! `schedule` call. [`SchedulerGraphMirror::assign`] is the only way a
//! scheduler expresses intent back to the kernel.

use std::collections::{BTreeMap, BTreeSet};

use crate::ids::{DataObjectId, TaskId, WorkerId};
use crate::protocol::{Assignment, UpdateMessage};
use crate::runtime::TaskState;

#[derive(Debug, Clone, Copy)]
pub struct MirrorWorker {
    pub cpus: u32,
}

#[derive(Debug, Clone)]
pub struct MirrorTask {
    pub inputs: Vec<DataObjectId>,
    pub outputs: Vec<DataObjectId>,
    pub expected_duration: Option<f64>,
    pub cpus: u32,
    pub state: TaskState,
    /// The worker the scheduler most recently assigned this task to, `None`
    /// if withdrawn. Overwritten wholesale on every `assign` call — never
    /// appended — mirroring "only the last assignment within an update
    /// takes effect."
    pub scheduled_worker: Option<WorkerId>,
    /// The worker the task actually finished running on, once known.
    pub computed_by: Option<WorkerId>,
}

#[derive(Debug, Clone, Default)]
pub struct MirrorObject {
    pub expected_size: Option<f64>,
    pub size: Option<f64>,
    pub parent: Option<TaskId>,
    pub consumers: BTreeSet<TaskId>,
    pub placing: BTreeSet<WorkerId>,
    pub availability: BTreeSet<WorkerId>,
    /// Workers the scheduler intends to deposit this object on, derived
    /// from `assign` calls against tasks that own it as an output.
    pub scheduled: BTreeSet<WorkerId>,
}

/// The scheduler's own view of the cluster and workload, rebuilt
/// incrementally from successive protocol updates.
#[derive(Debug, Default)]
pub struct SchedulerGraphMirror {
    pub workers: BTreeMap<WorkerId, MirrorWorker>,
    pub tasks: BTreeMap<TaskId, MirrorTask>,
    pub objects: BTreeMap<DataObjectId, MirrorObject>,
    pending_assignments: Vec<Assignment>,
}

impl SchedulerGraphMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one `update` delta into the mirror. Applying the same delta
    /// twice to a fresh mirror is equivalent to applying it once: every
    /// step here overwrites rather than accumulates.
    pub fn apply_update(&mut self, update: &UpdateMessage) {
        for w in &update.new_workers {
            self.workers.insert(w.id, MirrorWorker { cpus: w.cpus });
        }

        for o in &update.new_objects {
            self.objects.insert(
                o.id,
                MirrorObject {
                    expected_size: o.expected_size,
                    size: o.size,
                    ..Default::default()
                },
            );
        }

        for t in &update.new_tasks {
            for &out in &t.outputs {
                self.objects.entry(out).or_default().parent = Some(t.id);
            }
            for &input in &t.inputs {
                self.objects.entry(input).or_default().consumers.insert(t.id);
            }
            self.tasks.insert(
                t.id,
                MirrorTask {
                    inputs: t.inputs.clone(),
                    outputs: t.outputs.clone(),
                    expected_duration: t.expected_duration,
                    cpus: t.cpus,
                    state: TaskState::Waiting,
                    scheduled_worker: None,
                    computed_by: None,
                },
            );
        }

        for finished in &update.tasks_update {
            if let Some(t) = self.tasks.get_mut(&finished.id) {
                t.state = TaskState::Finished;
                t.computed_by = Some(finished.worker);
            }
        }

        for ou in &update.objects_update {
            let obj = self.objects.entry(ou.id).or_default();
            obj.placing = ou.placing.iter().copied().collect();
            obj.availability = ou.availability.iter().copied().collect();
            if ou.size.is_some() {
                obj.size = ou.size;
            }
        }

        for &id in &update.new_ready_tasks {
            if let Some(t) = self.tasks.get_mut(&id) {
                t.state = TaskState::Ready;
            }
        }

        for &id in &update.new_started_tasks {
            if let Some(t) = self.tasks.get_mut(&id) {
                t.state = TaskState::Running;
            }
        }
    }

    /// Express intent to run `task` on `worker` (or withdraw if `None`).
    /// Net effect: `scheduled_worker` and each output object's `scheduled`
    /// set are overwritten to reflect only this, most recent, call — and a
    /// reply record is queued for the next [`take_assignments`]
    /// (SchedulerGraphMirror::take_assignments) call.
    pub fn assign(&mut self, task: TaskId, worker: Option<WorkerId>, priority: Option<i64>, blocking: Option<usize>) {
        if let Some(t) = self.tasks.get_mut(&task) {
            if let Some(prev) = t.scheduled_worker {
                for out in t.outputs.clone() {
                    if let Some(obj) = self.objects.get_mut(&out) {
                        obj.scheduled.remove(&prev);
                    }
                }
            }
            t.scheduled_worker = worker;
            if let Some(w) = worker {
                for out in t.outputs.clone() {
                    if let Some(obj) = self.objects.get_mut(&out) {
                        obj.scheduled.insert(w);
                    }
                }
            }
        }
        self.pending_assignments.push(Assignment { task, worker, priority, blocking });
    }

    /// Drain every assignment queued by `assign` since the last drain, in
    /// call order, for the scheduler to return from `send_message`.
    pub fn take_assignments(&mut self) -> Vec<Assignment> {
        std::mem::take(&mut self.pending_assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FinishedTaskUpdate, NewObject, NewTaskInfo, NewWorker, ObjectUpdate};

    fn single_task_update() -> UpdateMessage {
        UpdateMessage {
            new_workers: vec![NewWorker { id: WorkerId(0), cpus: 1 }],
            new_objects: vec![NewObject { id: DataObjectId(0), expected_size: Some(1.0), size: None }],
            new_tasks: vec![NewTaskInfo {
                id: TaskId(0),
                inputs: vec![],
                outputs: vec![DataObjectId(0)],
                expected_duration: Some(1.0),
                cpus: 1,
            }],
            new_ready_tasks: vec![TaskId(0)],
            ..Default::default()
        }
    }

    #[test]
    fn apply_update_populates_mirror() {
        let mut mirror = SchedulerGraphMirror::new();
        mirror.apply_update(&single_task_update());
        assert_eq!(mirror.workers.len(), 1);
        assert_eq!(mirror.tasks[&TaskId(0)].state, TaskState::Ready);
        assert_eq!(mirror.objects[&DataObjectId(0)].parent, Some(TaskId(0)));
    }

    #[test]
    fn apply_update_twice_is_same_as_once() {
        let mut a = SchedulerGraphMirror::new();
        a.apply_update(&single_task_update());
        let mut b = SchedulerGraphMirror::new();
        b.apply_update(&single_task_update());
        b.apply_update(&single_task_update());
        assert_eq!(a.tasks.len(), b.tasks.len());
        assert_eq!(a.tasks[&TaskId(0)].state, b.tasks[&TaskId(0)].state);
    }

    #[test]
    fn reassign_within_one_update_leaves_only_last_scheduled_set() {
        let mut mirror = SchedulerGraphMirror::new();
        mirror.apply_update(&single_task_update());
        mirror.assign(TaskId(0), Some(WorkerId(0)), None, None);
        mirror.assign(TaskId(0), Some(WorkerId(1)), None, None);

        assert_eq!(mirror.tasks[&TaskId(0)].scheduled_worker, Some(WorkerId(1)));
        let out = &mirror.objects[&DataObjectId(0)];
        assert!(!out.scheduled.contains(&WorkerId(0)));
        assert!(out.scheduled.contains(&WorkerId(1)));

        let replies = mirror.take_assignments();
        assert_eq!(replies.len(), 2); // the kernel applies both, last wins
    }

    #[test]
    fn finished_task_records_computed_by() {
        let mut mirror = SchedulerGraphMirror::new();
        mirror.apply_update(&single_task_update());
        mirror.apply_update(&UpdateMessage {
            tasks_update: vec![FinishedTaskUpdate { id: TaskId(0), worker: WorkerId(0) }],
            objects_update: vec![ObjectUpdate {
                id: DataObjectId(0),
                placing: vec![WorkerId(0)],
                availability: vec![WorkerId(0)],
                size: Some(1.0),
            }],
            ..Default::default()
        });
        assert_eq!(mirror.tasks[&TaskId(0)].computed_by, Some(WorkerId(0)));
        assert_eq!(mirror.tasks[&TaskId(0)].state, TaskState::Finished);
        assert!(mirror.objects[&DataObjectId(0)].availability.contains(&WorkerId(0)));
    }
}
