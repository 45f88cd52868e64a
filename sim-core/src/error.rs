/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Top-level error type `Simulator::run` returns.

use thiserror::Error;

use crate::graph::GraphError;
use crate::protocol::ProtocolError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulatorError {
    #[error("task graph is invalid: {0}")]
    Graph(#[from] GraphError),

    #[error("scheduler protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The event heap drained while tasks remain unfinished — a scheduler
    /// deadlock. Fatal; never retried.
    #[error("no events to process but {unfinished} task(s) remain unfinished")]
    Deadlock { unfinished: usize },
}
