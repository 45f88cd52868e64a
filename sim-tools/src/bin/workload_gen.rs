/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Generates a synthetic cluster/workload YAML pair for manually exercising
//! `sim-cli` without hand-authoring fixtures — the manual-simulator
//! counterpart of the kernel's own scenario builders
//! (`sim-core/tests/scenarios.rs`), but producing the on-disk YAML shape a
//! driver actually consumes rather than an in-process `TaskGraph`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    /// A single linear chain A -> B -> C -> ... of `--tasks` tasks.
    Chain,
    /// One source task feeding `--tasks - 1` independent leaves.
    Fanout,
    /// A source feeding two parallel tasks that both feed one sink
    /// (requires `--tasks >= 4`; extra tasks extend the two parallel arms).
    Diamond,
    /// A seeded random DAG: each task after the first picks a random
    /// nonempty subset of the already-generated tasks as its inputs.
    Random,
}

#[derive(Debug, Parser)]
#[command(name = "workload-gen", version, about)]
struct Cli {
    #[arg(long, value_enum)]
    kind: Kind,

    /// Number of tasks to generate.
    #[arg(long, default_value_t = 4)]
    tasks: usize,

    /// Duration assigned to every generated task, in simulated seconds.
    #[arg(long, default_value_t = 1.0)]
    duration: f64,

    /// CPUs required by every generated task.
    #[arg(long, default_value_t = 1)]
    cpus: u32,

    /// Size in bytes of every generated task's single output.
    #[arg(long, default_value_t = 1.0)]
    output_size: f64,

    /// PRNG seed, only used by `--kind random`.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Number of workers in the generated cluster.
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// CPU capacity of every generated worker.
    #[arg(long, default_value_t = 1)]
    worker_cpus: u32,

    /// Optional network bandwidth to put in the cluster file.
    #[arg(long)]
    bandwidth: Option<f64>,

    #[arg(long, default_value = "workload.yaml")]
    workload_out: PathBuf,

    #[arg(long, default_value = "cluster.yaml")]
    cluster_out: PathBuf,
}

#[derive(Debug, Serialize)]
struct ClusterFile {
    workers: Vec<WorkerEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<NetworkEntry>,
}

#[derive(Debug, Serialize)]
struct WorkerEntry {
    cpus: u32,
}

#[derive(Debug, Serialize)]
struct NetworkEntry {
    bandwidth: f64,
}

#[derive(Debug, Serialize)]
struct WorkloadFile {
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Serialize)]
struct TaskEntry {
    name: String,
    duration: f64,
    cpus: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    outputs: Vec<OutputEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    inputs: Vec<InputRef>,
}

#[derive(Debug, Serialize)]
struct OutputEntry {
    size: f64,
}

#[derive(Debug, Serialize)]
struct InputRef {
    task: String,
    output: usize,
}

fn name(i: usize) -> String {
    format!("t{i}")
}

fn task(i: usize, cli: &Cli, inputs: Vec<InputRef>) -> TaskEntry {
    TaskEntry {
        name: name(i),
        duration: cli.duration,
        cpus: cli.cpus,
        outputs: vec![OutputEntry { size: cli.output_size }],
        inputs,
    }
}

fn build_chain(cli: &Cli) -> Vec<TaskEntry> {
    (0..cli.tasks)
        .map(|i| {
            let inputs = if i == 0 {
                vec![]
            } else {
                vec![InputRef { task: name(i - 1), output: 0 }]
            };
            task(i, cli, inputs)
        })
        .collect()
}

fn build_fanout(cli: &Cli) -> Vec<TaskEntry> {
    (0..cli.tasks)
        .map(|i| {
            let inputs = if i == 0 { vec![] } else { vec![InputRef { task: name(0), output: 0 }] };
            task(i, cli, inputs)
        })
        .collect()
}

fn build_diamond(cli: &Cli) -> Vec<TaskEntry> {
    let n = cli.tasks.max(4);
    let mut tasks = vec![task(0, cli, vec![])];
    let mid = 1 + (n - 2) / 2;
    for i in 1..n - 1 {
        let arm_start = if i < mid { 1 } else { mid };
        let inputs = if i == arm_start {
            vec![InputRef { task: name(0), output: 0 }]
        } else {
            vec![InputRef { task: name(i - 1), output: 0 }]
        };
        tasks.push(task(i, cli, inputs));
    }
    let sink_inputs = vec![
        InputRef { task: name(mid - 1), output: 0 },
        InputRef { task: name(n - 2), output: 0 },
    ];
    tasks.push(task(n - 1, cli, sink_inputs));
    tasks
}

fn build_random(cli: &Cli) -> Vec<TaskEntry> {
    let mut rng = StdRng::seed_from_u64(cli.seed);
    (0..cli.tasks)
        .map(|i| {
            if i == 0 {
                return task(i, cli, vec![]);
            }
            let max_parents = i.min(3);
            let parent_count = rng.gen_range(1..=max_parents);
            let mut candidates: Vec<usize> = (0..i).collect();
            let mut inputs = Vec::with_capacity(parent_count);
            for _ in 0..parent_count {
                let idx = rng.gen_range(0..candidates.len());
                let parent = candidates.remove(idx);
                inputs.push(InputRef { task: name(parent), output: 0 });
            }
            task(i, cli, inputs)
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    let tasks = match cli.kind {
        Kind::Chain => build_chain(&cli),
        Kind::Fanout => build_fanout(&cli),
        Kind::Diamond => build_diamond(&cli),
        Kind::Random => build_random(&cli),
    };

    let workload = WorkloadFile { tasks };
    let workload_yaml = serde_yaml::to_string(&workload).context("serializing workload")?;
    std::fs::write(&cli.workload_out, workload_yaml)
        .with_context(|| format!("writing {}", cli.workload_out.display()))?;

    let cluster = ClusterFile {
        workers: (0..cli.workers).map(|_| WorkerEntry { cpus: cli.worker_cpus }).collect(),
        network: cli.bandwidth.map(|bandwidth| NetworkEntry { bandwidth }),
    };
    let cluster_yaml = serde_yaml::to_string(&cluster).context("serializing cluster")?;
    std::fs::write(&cli.cluster_out, cluster_yaml)
        .with_context(|| format!("writing {}", cli.cluster_out.display()))?;

    println!(
        "wrote {} task(s) to {} and {} worker(s) to {}",
        cli.tasks,
        cli.workload_out.display(),
        cli.workers,
        cli.cluster_out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(kind: Kind, tasks: usize) -> Cli {
        Cli {
            kind,
            tasks,
            duration: 1.0,
            cpus: 1,
            output_size: 1.0,
            seed: 0,
            workers: 1,
            worker_cpus: 1,
            bandwidth: None,
            workload_out: "workload.yaml".into(),
            cluster_out: "cluster.yaml".into(),
        }
    }

    #[test]
    fn chain_wires_each_task_to_its_predecessor() {
        let tasks = build_chain(&cli(Kind::Chain, 3));
        assert_eq!(tasks.len(), 3);
        assert!(tasks[0].inputs.is_empty());
        assert_eq!(tasks[1].inputs[0].task, "t0");
        assert_eq!(tasks[2].inputs[0].task, "t1");
    }

    #[test]
    fn fanout_every_leaf_depends_only_on_the_source() {
        let tasks = build_fanout(&cli(Kind::Fanout, 4));
        assert!(tasks[0].inputs.is_empty());
        for t in &tasks[1..] {
            assert_eq!(t.inputs.len(), 1);
            assert_eq!(t.inputs[0].task, "t0");
        }
    }

    #[test]
    fn diamond_sink_depends_on_both_arms() {
        let tasks = build_diamond(&cli(Kind::Diamond, 4));
        let sink = tasks.last().unwrap();
        assert_eq!(sink.inputs.len(), 2);
    }

    #[test]
    fn random_is_deterministic_for_a_fixed_seed() {
        let a = build_random(&cli(Kind::Random, 10));
        let b = build_random(&cli(Kind::Random, 10));
        let names_a: Vec<_> = a.iter().map(|t| (t.name.clone(), t.inputs.len())).collect();
        let names_b: Vec<_> = b.iter().map(|t| (t.name.clone(), t.inputs.len())).collect();
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn random_first_task_has_no_inputs() {
        let tasks = build_random(&cli(Kind::Random, 5));
        assert!(tasks[0].inputs.is_empty());
    }
}
