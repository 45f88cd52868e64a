/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Task graph data model and validation.
//!
//! [`TaskGraph`] owns every [`Task`] and [`DataObject`] in a workload and
//! assigns both kinds of entity stable, dense ids on insertion. Removal
//! leaves a tombstone rather than shifting later ids, so a [`TaskId`] or
//! [`DataObjectId`] handed out once never changes meaning for the lifetime
//! of the graph.
//!
//! # Ownership model
//! The driver builds one `TaskGraph`, validates it, and moves it into a
//! [`Simulator`](crate::simulator::Simulator). The scheduler-side
//! [mirror](crate::mirror) never shares this graph; it only ever learns
//! about tasks and objects by id through the protocol, which is what lets
//! kernel and scheduler evolve their own copies independently.

pub mod error;

use std::collections::BTreeSet;

pub use error::GraphError;

use crate::ids::{DataObjectId, TaskId};

// ── Task ────────────────────────────────────────────────────────────────────

/// Computational unit with input/output data dependencies and resource
/// requirements.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    /// Optional human-readable name, for debugging/tracing only.
    pub name: Option<String>,
    /// CPU-seconds of work, simulated.
    pub duration: f64,
    /// Hint given to the scheduler; may differ from `duration`. `None`
    /// means no hint was supplied (driver `imode` may fill this in).
    pub expected_duration: Option<f64>,
    /// CPU demand; `0` never blocks admission.
    pub cpus: u32,
    /// Ordered input references, in the order they were added.
    pub inputs: Vec<DataObjectId>,
    /// Ordered tuple of owned outputs, fixed at creation time.
    pub outputs: Vec<DataObjectId>,
}

impl Task {
    /// `true` if no other task's inputs reference any of this task's
    /// outputs.
    pub fn is_source(&self) -> bool {
        self.inputs.is_empty()
    }
}

// ── DataObject ──────────────────────────────────────────────────────────────

/// Data object produced by exactly one parent task.
#[derive(Debug, Clone)]
pub struct DataObject {
    pub id: DataObjectId,
    pub parent: TaskId,
    /// Actual size in bytes.
    pub size: f64,
    /// Hint given to the scheduler; `None` means no hint was supplied.
    pub expected_size: Option<f64>,
    /// Derived relation: tasks that read this object. Rebuilt on
    /// `add_input`, pruned on `remove_task` — the object never owns its
    /// consumers.
    pub consumers: BTreeSet<TaskId>,
}

/// Size/expected-size pair used when declaring a task's outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputSpec {
    pub size: f64,
    pub expected_size: Option<f64>,
}

impl OutputSpec {
    pub fn new(size: f64) -> Self {
        Self {
            size,
            expected_size: None,
        }
    }
}

/// Parameters for [`TaskGraph::new_task`].
///
/// A keyword-argument-style constructor: every field except `outputs` has
/// a sensible default so callers only set what matters for their scenario.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: Option<String>,
    pub outputs: Vec<OutputSpec>,
    pub duration: f64,
    pub expected_duration: Option<f64>,
    pub cpus: u32,
}

impl Default for NewTask {
    fn default() -> Self {
        Self {
            name: None,
            outputs: Vec::new(),
            duration: 1.0,
            expected_duration: None,
            cpus: 1,
        }
    }
}

impl NewTask {
    /// Convenience constructor for a task with a single output of `size`
    /// bytes (the common case in test fixtures).
    pub fn with_single_output(duration: f64, output_size: f64) -> Self {
        Self {
            duration,
            outputs: vec![OutputSpec::new(output_size)],
            ..Default::default()
        }
    }
}

// ── TaskGraph ─────────────────────────────────────────────────────────────

/// Owns all tasks and data objects of one workload.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: Vec<Option<Task>>,
    objects: Vec<Option<DataObject>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ──────────────────────────────────────────────────────

    /// Add a new task with the given outputs and return its id.
    pub fn new_task(&mut self, spec: NewTask) -> TaskId {
        let task_id = TaskId(self.tasks.len() as u32);

        let mut outputs = Vec::with_capacity(spec.outputs.len());
        for out in spec.outputs {
            let object_id = DataObjectId(self.objects.len() as u32);
            self.objects.push(Some(DataObject {
                id: object_id,
                parent: task_id,
                size: out.size,
                expected_size: out.expected_size,
                consumers: BTreeSet::new(),
            }));
            outputs.push(object_id);
        }

        self.tasks.push(Some(Task {
            id: task_id,
            name: spec.name,
            duration: spec.duration,
            expected_duration: spec.expected_duration,
            cpus: spec.cpus,
            inputs: Vec::new(),
            outputs,
        }));

        task_id
    }

    /// Declare that `task` reads `object` as an input. Updates the derived
    /// `consumers` relation on `object`.
    pub fn add_input(&mut self, task: TaskId, object: DataObjectId) -> Result<(), GraphError> {
        if self.object(object).is_none() {
            return Err(GraphError::DanglingInput { task, object });
        }
        if let Some(t) = self.task_mut(task) {
            t.inputs.push(object);
        }
        if let Some(o) = self.object_mut(object) {
            o.consumers.insert(task);
        }
        Ok(())
    }

    /// Remove `task` and all of its outputs from the graph. Any task that
    /// consumed one of the removed outputs has that input reference pruned.
    /// Leaves a tombstone — every other task/object keeps its id.
    pub fn remove_task(&mut self, task: TaskId) {
        let Some(removed) = self.tasks.get_mut(task.index()).and_then(Option::take) else {
            return;
        };

        for output_id in &removed.outputs {
            if let Some(obj) = self.objects.get_mut(output_id.index()).and_then(Option::take) {
                for consumer in obj.consumers {
                    if let Some(c) = self.task_mut(consumer) {
                        c.inputs.retain(|&o| o != *output_id);
                    }
                }
            }
        }

        for input_id in &removed.inputs {
            if let Some(obj) = self.object_mut(*input_id) {
                obj.consumers.remove(&task);
            }
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index()).and_then(Option::as_ref)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn object(&self, id: DataObjectId) -> Option<&DataObject> {
        self.objects.get(id.index()).and_then(Option::as_ref)
    }

    pub fn object_mut(&mut self, id: DataObjectId) -> Option<&mut DataObject> {
        self.objects.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter_map(Option::as_ref)
    }

    pub fn objects(&self) -> impl Iterator<Item = &DataObject> {
        self.objects.iter().filter_map(Option::as_ref)
    }

    pub fn task_count(&self) -> usize {
        self.tasks().count()
    }

    /// Total task slots ever allocated, including tombstoned ones — the
    /// size a `TaskId`-indexed array needs to stay valid even if tasks were
    /// removed before the graph was handed to the simulator.
    pub fn task_capacity(&self) -> usize {
        self.tasks.len()
    }

    /// Total data-object slots ever allocated, including tombstoned ones.
    pub fn object_capacity(&self) -> usize {
        self.objects.len()
    }

    /// Tasks with no inputs.
    pub fn source_tasks(&self) -> Vec<TaskId> {
        self.tasks().filter(|t| t.is_source()).map(|t| t.id).collect()
    }

    /// Tasks none of whose outputs are consumed by anything.
    pub fn leaf_tasks(&self) -> Vec<TaskId> {
        self.tasks()
            .filter(|t| {
                t.outputs
                    .iter()
                    .all(|o| self.object(*o).map(|o| o.consumers.is_empty()).unwrap_or(true))
            })
            .map(|t| t.id)
            .collect()
    }

    /// Deep copy: an independent `TaskGraph` with identical ids, inputs and
    /// outputs. `validate()` succeeds on the copy iff it succeeds on the
    /// original.
    pub fn copy(&self) -> TaskGraph {
        self.clone()
    }

    // ── Validation ────────────────────────────────────────────────────────

    /// Check acyclicity, parent/consumer symmetry, and nonnegative
    /// sizes/durations. Returns the first violation found.
    pub fn validate(&self) -> Result<(), GraphError> {
        for task in self.tasks() {
            if task.duration < 0.0 {
                return Err(GraphError::NegativeDuration {
                    task: task.id,
                    duration_us: (task.duration * 1_000_000.0) as i64,
                });
            }
            if let Some(d) = task.expected_duration {
                if d < 0.0 {
                    return Err(GraphError::NegativeDuration {
                        task: task.id,
                        duration_us: (d * 1_000_000.0) as i64,
                    });
                }
            }

            let mut seen = BTreeSet::new();
            for &o in &task.outputs {
                if !seen.insert(o) {
                    return Err(GraphError::DuplicateOutput { task: task.id, object: o });
                }
            }

            for &input in &task.inputs {
                match self.object(input) {
                    None => {
                        return Err(GraphError::DanglingInput {
                            task: task.id,
                            object: input,
                        })
                    }
                    Some(o) => {
                        if self.task(o.parent).is_none() {
                            return Err(GraphError::OrphanObject { object: input });
                        }
                    }
                }
            }
        }

        for object in self.objects() {
            if object.size < 0.0 {
                return Err(GraphError::NegativeSize {
                    object: object.id,
                    size: object.size as i64,
                });
            }
            if let Some(s) = object.expected_size {
                if s < 0.0 {
                    return Err(GraphError::NegativeSize {
                        object: object.id,
                        size: s as i64,
                    });
                }
            }
            if self.task(object.parent).is_none() {
                return Err(GraphError::OrphanObject { object: object.id });
            }
        }

        self.topological_sort().map(|_| ())
    }

    /// Kahn's algorithm, ties broken by ascending task id for determinism.
    /// Returns `Err(GraphError::Cycle)` if not every task can be ordered.
    pub fn topological_sort(&self) -> Result<Vec<TaskId>, GraphError> {
        use std::cmp::Reverse;
        use std::collections::BinaryHeap;
        use std::collections::HashMap;

        let mut indegree: HashMap<TaskId, usize> =
            self.tasks().map(|t| (t.id, t.inputs.len())).collect();

        let mut ready: BinaryHeap<Reverse<TaskId>> = indegree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| Reverse(id))
            .collect();

        let mut order = Vec::with_capacity(indegree.len());

        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            let Some(task) = self.task(id) else { continue };
            for &output in &task.outputs {
                let Some(object) = self.object(output) else { continue };
                for &consumer in &object.consumers {
                    if let Some(d) = indegree.get_mut(&consumer) {
                        *d -= 1;
                        if *d == 0 {
                            ready.push(Reverse(consumer));
                        }
                    }
                }
            }
        }

        if order.len() != indegree.len() {
            let stuck = indegree
                .iter()
                .find(|&(_, &d)| d > 0)
                .map(|(&id, _)| id)
                .expect("fewer ordered than total implies a remaining task");
            return Err(GraphError::Cycle { task: stuck });
        }

        Ok(order)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
