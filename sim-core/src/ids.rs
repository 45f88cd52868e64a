/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Dense identifier types shared by the graph, runtime state, and protocol.
//!
//! Tasks, data objects, and workers are referred to everywhere by id, never
//! by reference — three distinct newtypes around `u32` so the compiler
//! rejects a `DataObjectId` passed where a `TaskId` is expected, instead of
//! relying on convention.

use std::fmt;

macro_rules! dense_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Returns the raw dense index.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                $name(v)
            }
        }
    };
}

dense_id!(TaskId, "Stable dense id of a [`Task`](crate::graph::Task).");
dense_id!(
    DataObjectId,
    "Stable dense id of a [`DataObject`](crate::graph::DataObject)."
);
dense_id!(WorkerId, "Stable dense id of a [`Worker`](crate::worker::Worker).");
