/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! The scheduler protocol (component F) — the synchronous message boundary
//! between the kernel and a pluggable scheduler.
//!
//! A `Scheduler` is a plain Rust trait with two calls (`start`,
//! `send_message`) plus `stop`; the kernel never introspects the scheduler
//! beyond what `start` reports. For in-process schedulers the "message bus"
//! is a direct method call — nothing here assumes or prevents moving it
//! across an IPC boundary later.

pub mod error;

pub use error::ProtocolError;

use serde::{Deserialize, Serialize};

use crate::ids::{DataObjectId, TaskId, WorkerId};

/// The only protocol version this kernel speaks. A scheduler's `register`
/// reply carrying anything else is fatal.
pub const PROTOCOL_VERSION: u32 = 0;

/// Scheduler identity and capability flags, returned once from `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterReply {
    pub name: String,
    pub version: String,
    pub protocol_version: u32,
    /// Whether this scheduler may change a task's assignment after the
    /// initial one.
    pub reassigning: bool,
    /// Whether the kernel should populate `new_started_tasks` on future
    /// updates. Schedulers that don't need start notifications leave this
    /// `false` to avoid the bookkeeping cost.
    pub wants_start_notifications: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewWorker {
    pub id: WorkerId,
    pub cpus: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewObject {
    pub id: DataObjectId,
    pub expected_size: Option<f64>,
    pub size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaskInfo {
    pub id: TaskId,
    pub inputs: Vec<DataObjectId>,
    pub outputs: Vec<DataObjectId>,
    pub expected_duration: Option<f64>,
    pub cpus: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinishedTaskUpdate {
    pub id: TaskId,
    pub worker: WorkerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectUpdate {
    pub id: DataObjectId,
    pub placing: Vec<WorkerId>,
    pub availability: Vec<WorkerId>,
    pub size: Option<f64>,
}

/// Everything that changed since the previous scheduling point, in the
/// order newly-appearing entities must be visible before anything that
/// references them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    pub new_workers: Vec<NewWorker>,
    pub network_bandwidth: Option<f64>,
    pub new_objects: Vec<NewObject>,
    pub new_tasks: Vec<NewTaskInfo>,
    pub tasks_update: Vec<FinishedTaskUpdate>,
    pub objects_update: Vec<ObjectUpdate>,
    pub new_ready_tasks: Vec<TaskId>,
    /// Populated only when the scheduler's `register` reply set
    /// `wants_start_notifications`; empty otherwise.
    pub new_started_tasks: Vec<TaskId>,
    /// Reassigning schedulers only: tasks whose prior reassignment could
    /// not be honored because the task had already started running.
    pub reassign_failed: Vec<TaskId>,
}

impl UpdateMessage {
    /// `true` if this delta carries nothing worth telling the scheduler
    /// about (used at t=0 with an empty graph: no scheduler update fires).
    pub fn is_empty(&self) -> bool {
        self.new_workers.is_empty()
            && self.network_bandwidth.is_none()
            && self.new_objects.is_empty()
            && self.new_tasks.is_empty()
            && self.tasks_update.is_empty()
            && self.objects_update.is_empty()
            && self.new_ready_tasks.is_empty()
            && self.new_started_tasks.is_empty()
            && self.reassign_failed.is_empty()
    }
}

/// One assignment returned by the scheduler. `worker = None` withdraws any
/// pending assignment not yet started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub task: TaskId,
    pub worker: Option<WorkerId>,
    /// Higher is earlier. Defaults to `0` when absent.
    pub priority: Option<i64>,
    /// Number of this task's downloads that must complete before it may
    /// run, even if not all inputs are locally available. Clamped to
    /// `inputs.len()` if larger.
    pub blocking: Option<usize>,
}

impl Assignment {
    pub fn new(task: TaskId, worker: WorkerId) -> Self {
        Self {
            task,
            worker: Some(worker),
            priority: None,
            blocking: None,
        }
    }

    pub fn withdraw(task: TaskId) -> Self {
        Self {
            task,
            worker: None,
            priority: None,
            blocking: None,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_blocking(mut self, blocking: usize) -> Self {
        self.blocking = Some(blocking);
        self
    }
}

/// A pluggable scheduling policy. The kernel drives this trait exclusively
/// through `Simulator`; nothing in the kernel inspects a scheduler beyond
/// what `start` reports.
pub trait Scheduler {
    fn start(&mut self) -> RegisterReply;
    fn send_message(&mut self, update: UpdateMessage) -> Vec<Assignment>;
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_message_is_empty() {
        assert!(UpdateMessage::default().is_empty());
    }

    #[test]
    fn update_with_only_ready_tasks_is_not_empty() {
        let mut u = UpdateMessage::default();
        u.new_ready_tasks.push(TaskId(0));
        assert!(!u.is_empty());
    }

    #[test]
    fn assignment_builder_sets_optional_fields() {
        let a = Assignment::new(TaskId(1), WorkerId(2)).with_priority(5).with_blocking(1);
        assert_eq!(a.worker, Some(WorkerId(2)));
        assert_eq!(a.priority, Some(5));
        assert_eq!(a.blocking, Some(1));
    }

    #[test]
    fn withdraw_assignment_has_no_worker() {
        let a = Assignment::withdraw(TaskId(3));
        assert_eq!(a.worker, None);
    }
}
