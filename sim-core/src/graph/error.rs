/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Structured errors for task-graph construction and validation.

use thiserror::Error;

use crate::ids::{DataObjectId, TaskId};

/// Reasons [`TaskGraph::validate`](super::TaskGraph::validate) can fail.
///
/// Every variant carries the offending id(s) so a caller can report exactly
/// which task or object is malformed without re-scanning the graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A task is (transitively) its own ancestor.
    #[error("task {task} is its own ancestor (cycle detected)")]
    Cycle { task: TaskId },

    /// `Task::duration` or `Task::expected_duration` is negative.
    ///
    /// Represented with `duration` carried as a fixed-point microsecond
    /// count (`i64`) so the check applies uniformly to both fields without
    /// relying on float comparisons.
    #[error("task {task} has a negative duration ({duration_us}us)")]
    NegativeDuration { task: TaskId, duration_us: i64 },

    /// `DataObject::size` or `expected_size` is negative.
    #[error("data object {object} has a negative size ({size} bytes)")]
    NegativeSize { object: DataObjectId, size: i64 },

    /// A task declares an input whose id does not exist in the graph.
    #[error("task {task} references unknown input object {object}")]
    DanglingInput { task: TaskId, object: DataObjectId },

    /// A task's output id appears more than once in its own output tuple.
    #[error("task {task} declares duplicate output {object}")]
    DuplicateOutput { task: TaskId, object: DataObjectId },

    /// An input object's recorded parent is not actually in the graph.
    #[error("data object {object} has no task in the graph as its parent")]
    OrphanObject { object: DataObjectId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_informative() {
        let e = GraphError::Cycle { task: TaskId(2) };
        assert!(format!("{e}").contains("task 2"));

        let e = GraphError::DanglingInput {
            task: TaskId(1),
            object: DataObjectId(9),
        };
        assert!(format!("{e}").contains("9"));
    }
}
