/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Reference driver: loads a cluster description and a workload
//! description, runs the simulation kernel with a bundled greedy scheduler,
//! and writes a JSON execution trace.
//!
//! Exposes the driver-level run options — scheduler, cluster, bandwidth,
//! network model, imode, scheduler timing, repeat count, timeout — as CLI
//! flags. None of this lives in `sim-core`: the kernel never reads a config
//! file or writes a trace itself.

mod cluster;
mod imode;
mod scheduler;
mod trace;
mod workload;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use sim_core::{InstantNetwork, NetworkModel, SimpleNetwork, Simulator};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cluster::ClusterConfig;
use imode::Imode;
use scheduler::GreedyScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NetmodelArg {
    Instant,
    Simple,
}

/// Discrete-event task-graph scheduling simulator.
#[derive(Debug, Parser)]
#[command(name = "sim-cli", version, about)]
struct Cli {
    /// Path to the cluster description YAML (worker CPU counts, optional
    /// network bandwidth).
    #[arg(long)]
    cluster: PathBuf,

    /// Path to the workload description YAML (task graph).
    #[arg(long)]
    workload: PathBuf,

    /// Network model to use. `simple` requires `--bandwidth` (or a
    /// `network.bandwidth` entry in the cluster file).
    #[arg(long, value_enum, default_value = "instant")]
    netmodel: NetmodelArg,

    /// Bandwidth in bytes/second for the `simple` network model. Overrides
    /// any value in the cluster file.
    #[arg(long)]
    bandwidth: Option<f64>,

    /// Scheduler hint preprocessing applied to the loaded graph before the
    /// run: exact, blind, mean, or user (no-op).
    #[arg(long, value_enum, default_value = "user")]
    imode: Imode,

    /// Simulated scheduler-latency seconds consumed after each scheduling
    /// point before its effects take hold.
    #[arg(long = "sched-timing")]
    sched_timing: Option<f64>,

    /// Periodic scheduler wake-up interval, in simulated seconds.
    #[arg(long)]
    min_scheduling_interval: Option<f64>,

    /// Number of times to repeat the run (same inputs; exercises
    /// determinism, matches the driver-level `repeat` option).
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Wall-clock timeout in seconds for the whole invocation. Purely a
    /// driver-level guard against a misbehaving scheduler looping forever
    /// in its own code; the kernel itself has no notion of wall-clock time.
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the JSON trace here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let deadline = cli.timeout.map(Duration::from_secs);
    let start = std::time::Instant::now();

    let cluster = ClusterConfig::load_from_file(&cli.cluster)
        .with_context(|| format!("loading cluster file {}", cli.cluster.display()))?;

    if cluster.worker_cpus.is_empty() {
        bail!("cluster file {} declares no workers", cli.cluster.display());
    }

    let bandwidth = cli.bandwidth.or(cluster.bandwidth);

    let mut last_trace = None;
    for run in 0..cli.repeat.max(1) {
        if let Some(d) = deadline {
            if start.elapsed() > d {
                bail!("timeout of {:?} exceeded before run {run} started", d);
            }
        }

        let mut graph = workload::load_graph(&cli.workload)
            .with_context(|| format!("loading workload file {}", cli.workload.display()))?;
        imode::apply(&mut graph, cli.imode);
        graph.validate().context("workload graph failed validation")?;

        let netmodel: Box<dyn NetworkModel> = match cli.netmodel {
            NetmodelArg::Instant => Box::new(InstantNetwork),
            NetmodelArg::Simple => {
                let bw = bandwidth.context("--netmodel simple requires a bandwidth (via --bandwidth or the cluster file)")?;
                Box::new(SimpleNetwork::new(bw))
            }
        };

        let mut sim = Simulator::new(graph, cluster.worker_cpus.clone(), Box::new(GreedyScheduler::new()), netmodel);
        if let Some(st) = cli.sched_timing {
            sim = sim.with_scheduling_time(st);
        }
        if let Some(iv) = cli.min_scheduling_interval {
            sim = sim.with_min_scheduling_interval(iv);
        }
        if let Some(bw) = bandwidth {
            sim = sim.with_initial_bandwidth(bw);
        }

        let makespan = sim.run().context("simulation run failed")?;
        info!(run, makespan, "run complete");
        last_trace = Some(trace::build(&sim, makespan));
    }

    let trace = last_trace.expect("repeat is clamped to at least one run");
    let json = serde_json::to_string_pretty(&trace).context("serializing execution trace")?;

    match cli.out {
        Some(path) => std::fs::write(&path, json).with_context(|| format!("writing trace to {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}
