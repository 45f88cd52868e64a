/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Discrete-event simulation kernel for task-graph scheduling over a
//! bandwidth-limited worker cluster.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── ids        – dense TaskId/DataObjectId/WorkerId newtypes
//! ├── graph/     – task graph model & validation                (A)
//! ├── network    – transfer-time models                         (B)
//! ├── worker     – CPU admission, pending queue, downloads       (C)
//! ├── runtime    – per-task/per-object runtime state             (D)
//! ├── event      – the event-loop priority queue                 (E)
//! ├── protocol/  – scheduler message types & trait                (F)
//! ├── mirror     – scheduler-side graph mirror                    (G)
//! ├── simulator  – wires A–G together and drives `run()`
//! └── error      – top-level `SimulatorError`
//! ```
//!
//! A driver constructs a [`graph::TaskGraph`], a list of worker CPU
//! capacities, a [`protocol::Scheduler`] implementation, and a
//! [`network::NetworkModel`], hands them to [`simulator::Simulator::new`],
//! and calls [`simulator::Simulator::run`] to obtain a makespan.

pub mod error;
pub mod event;
pub mod graph;
pub mod ids;
pub mod mirror;
pub mod network;
pub mod protocol;
pub mod runtime;
pub mod simulator;
pub mod worker;

pub use error::SimulatorError;
pub use graph::{DataObject, NewTask, OutputSpec, Task, TaskGraph};
pub use ids::{DataObjectId, TaskId, WorkerId};
pub use mirror::{MirrorObject, MirrorTask, MirrorWorker, SchedulerGraphMirror};
pub use network::{InstantNetwork, NetworkModel, SimpleNetwork, TransferId};
pub use protocol::{Assignment, RegisterReply, Scheduler, UpdateMessage, PROTOCOL_VERSION};
pub use runtime::{ObjectRuntimeInfo, RuntimeState, TaskRuntimeInfo, TaskState};
pub use simulator::Simulator;
