/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Structured errors for the scheduler protocol boundary. Every variant
//! here is fatal: the kernel never retries a protocol violation,
//! it aborts `run` with a descriptive error. Recoverable reassignment
//! failures are not errors — they are reported via `reassign_failed` on
//! the next update instead.

use thiserror::Error;

use crate::ids::{TaskId, WorkerId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// An assignment referenced a task id the kernel never registered.
    #[error("scheduler assigned unknown task {task}")]
    UnknownTask { task: TaskId },

    /// An assignment referenced a worker id the kernel never registered.
    #[error("scheduler assigned unknown worker {worker}")]
    UnknownWorker { worker: WorkerId },

    /// An assignment targeted a task that has already reached `Finished`.
    #[error("scheduler assigned task {task}, which has already finished")]
    TaskAlreadyFinished { task: TaskId },

    /// `reassigning = false`, but the assignment's worker differs from the
    /// task's current worker and the task is past `Waiting`/`Ready`.
    #[error(
        "non-reassigning scheduler tried to move task {task} from worker {current} to worker {requested}"
    )]
    ReassignmentNotAllowed {
        task: TaskId,
        current: WorkerId,
        requested: WorkerId,
    },

    /// An assignment's task demands more CPUs than the target worker has.
    #[error("task {task} needs {requested} cpus, worker {worker} only has {capacity}")]
    CpuExceedsCapacity {
        task: TaskId,
        worker: WorkerId,
        requested: u32,
        capacity: u32,
    },

    /// The scheduler's `register` reply carries a `protocol_version` this
    /// kernel does not speak.
    #[error("protocol version mismatch: kernel speaks {expected}, scheduler replied {got}")]
    ProtocolVersionMismatch { expected: u32, got: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_offending_ids() {
        let e = ProtocolError::UnknownTask { task: TaskId(4) };
        assert!(format!("{e}").contains("4"));

        let e = ProtocolError::CpuExceedsCapacity {
            task: TaskId(0),
            worker: WorkerId(1),
            requested: 4,
            capacity: 2,
        };
        let msg = format!("{e}");
        assert!(msg.contains('4') && msg.contains('2'));
    }
}
