//! Workload (task graph) description loading.
//!
//! Same loader shape as [`crate::cluster`]: YAML → struct, `anyhow::Context`
//! on every failure path. Tasks reference their inputs by the producing
//! task's name and an output index rather than by a bare integer, so
//! hand-written fixtures stay readable; [`build_graph`] resolves those
//! names to dense ids in a second pass, matching how
//! [`sim_core::graph::TaskGraph`] only ever wires inputs by id.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use sim_core::graph::{NewTask, OutputSpec, TaskGraph};
use sim_core::TaskId;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct WorkloadFile {
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
struct OutputEntry {
    size: f64,
    #[serde(default)]
    expected_size: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct InputRef {
    /// Name of the task that produces the referenced output.
    task: String,
    /// Index into that task's `outputs` list. Defaults to `0`, the common
    /// single-output case.
    #[serde(default)]
    output: usize,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    /// Every task must be named so later entries can reference its outputs
    /// by name; the driver has no other stable handle before ids exist.
    name: String,
    #[serde(default = "default_duration")]
    duration: f64,
    #[serde(default)]
    expected_duration: Option<f64>,
    #[serde(default = "default_cpus")]
    cpus: u32,
    #[serde(default)]
    outputs: Vec<OutputEntry>,
    #[serde(default)]
    inputs: Vec<InputRef>,
}

fn default_duration() -> f64 {
    1.0
}

fn default_cpus() -> u32 {
    1
}

/// Parses `path` and builds a [`TaskGraph`] from it. Task names are resolved
/// to dense ids as the graph is built; a dangling or forward-only name
/// resolves fine (all task entries are registered before any `add_input`
/// call), but a name that never appears as a task is an error.
pub fn load_graph(path: &Path) -> Result<TaskGraph> {
    info!(path = %path.display(), "loading workload description");

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot open workload file: {}", path.display()))?;

    let file: WorkloadFile = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse workload YAML: {}", path.display()))?;

    build_graph(file)
}

fn build_graph(file: WorkloadFile) -> Result<TaskGraph> {
    let mut graph = TaskGraph::new();
    let mut by_name: HashMap<String, TaskId> = HashMap::new();

    for entry in &file.tasks {
        let outputs = entry
            .outputs
            .iter()
            .map(|o| OutputSpec {
                size: o.size,
                expected_size: o.expected_size,
            })
            .collect();

        let id = graph.new_task(NewTask {
            name: Some(entry.name.clone()),
            outputs,
            duration: entry.duration,
            expected_duration: entry.expected_duration,
            cpus: entry.cpus,
        });

        if by_name.insert(entry.name.clone(), id).is_some() {
            return Err(anyhow!("duplicate task name '{}' in workload file", entry.name));
        }
    }

    for entry in &file.tasks {
        let consumer = by_name[&entry.name];
        for input in &entry.inputs {
            let producer = *by_name
                .get(&input.task)
                .ok_or_else(|| anyhow!("task '{}' references unknown producer '{}'", entry.name, input.task))?;
            let producer_task = graph
                .task(producer)
                .ok_or_else(|| anyhow!("producer task '{}' vanished mid-build", input.task))?;
            let object = *producer_task.outputs.get(input.output).ok_or_else(|| {
                anyhow!(
                    "task '{}' references output {} of '{}', which only has {} output(s)",
                    entry.name,
                    input.output,
                    input.task,
                    producer_task.outputs.len()
                )
            })?;
            graph
                .add_input(consumer, object)
                .with_context(|| format!("wiring input for task '{}'", entry.name))?;
        }
    }

    debug!(tasks = graph.task_count(), "workload graph built");
    Ok(graph)
}
