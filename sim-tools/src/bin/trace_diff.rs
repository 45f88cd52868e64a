/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Compares two `sim-cli --out` execution-trace JSON files for exact
//! makespan and per-task assignment-history equality — a manual,
//! run-it-twice-and-diff counterpart of the kernel's automated determinism
//! test.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "trace-diff", version, about)]
struct Cli {
    left: PathBuf,
    right: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ExecutionTrace {
    makespan: f64,
    tasks: Vec<TaskTrace>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct TaskTrace {
    task: u32,
    #[serde(default)]
    name: Option<String>,
    assigned_workers: Vec<u32>,
    assign_time: Option<f64>,
    start_time: Option<f64>,
    end_time: Option<f64>,
}

fn load(path: &PathBuf) -> Result<ExecutionTrace> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {} as an execution trace", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let left = load(&cli.left)?;
    let right = load(&cli.right)?;

    let mut mismatches = Vec::new();

    if left.makespan != right.makespan {
        mismatches.push(format!("makespan differs: {} vs {}", left.makespan, right.makespan));
    }

    let left_by_id: BTreeMap<u32, &TaskTrace> = left.tasks.iter().map(|t| (t.task, t)).collect();
    let right_by_id: BTreeMap<u32, &TaskTrace> = right.tasks.iter().map(|t| (t.task, t)).collect();

    for (id, lt) in &left_by_id {
        match right_by_id.get(id) {
            None => mismatches.push(format!("task {id} present in left trace only")),
            Some(rt) => {
                if lt.assigned_workers != rt.assigned_workers {
                    mismatches.push(format!(
                        "task {id} assigned_workers differ: {:?} vs {:?}",
                        lt.assigned_workers, rt.assigned_workers
                    ));
                }
                if lt.start_time != rt.start_time || lt.end_time != rt.end_time {
                    mismatches.push(format!(
                        "task {id} timing differs: ({:?}, {:?}) vs ({:?}, {:?})",
                        lt.start_time, lt.end_time, rt.start_time, rt.end_time
                    ));
                }
            }
        }
    }
    for id in right_by_id.keys() {
        if !left_by_id.contains_key(id) {
            mismatches.push(format!("task {id} present in right trace only"));
        }
    }

    if mismatches.is_empty() {
        println!("traces are identical ({} task(s), makespan {})", left.tasks.len(), left.makespan);
        Ok(())
    } else {
        for m in &mismatches {
            eprintln!("{m}");
        }
        anyhow::bail!("{} mismatch(es) found", mismatches.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(makespan: f64, tasks: Vec<TaskTrace>) -> ExecutionTrace {
        ExecutionTrace { makespan, tasks }
    }

    fn t(task: u32, workers: Vec<u32>, start: f64, end: f64) -> TaskTrace {
        TaskTrace {
            task,
            name: None,
            assigned_workers: workers,
            assign_time: Some(0.0),
            start_time: Some(start),
            end_time: Some(end),
        }
    }

    #[test]
    fn parses_the_json_shape_sim_cli_writes() {
        let a = trace(5.0, vec![t(0, vec![0], 0.0, 5.0)]);
        let b: ExecutionTrace = serde_json::from_str(
            r#"{"makespan":5.0,"tasks":[{"task":0,"assigned_workers":[0],"assign_time":0.0,"start_time":0.0,"end_time":5.0}]}"#,
        )
        .unwrap();
        assert_eq!(a.makespan, b.makespan);
        assert_eq!(a.tasks[0], b.tasks[0]);
    }
}
