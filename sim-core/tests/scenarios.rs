/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! End-to-end scenarios against the full kernel. Each test drives a real
//! [`Simulator`] with a small fixed-schedule scheduler double, grounded in
//! the literal cases enumerated in the kernel's testable-properties section
//! (single-worker chains, CPU packing, scheduling-time overhead, reassign
//! before/after start, and cross-worker transfer cost).

use std::collections::VecDeque;

use sim_core::{Assignment, InstantNetwork, NewTask, RegisterReply, Scheduler, SimpleNetwork, Simulator, TaskGraph, UpdateMessage};

/// A scheduler whose behaviour is a fixed sequence of steps, one per
/// `send_message` call; the final step repeats once its queue is drained.
/// `reassigning` and `wants_start_notifications` are configurable so the
/// same harness can exercise both plain and reassigning protocol paths.
struct ScriptedScheduler {
    steps: VecDeque<Vec<Assignment>>,
    reassigning: bool,
    wants_start_notifications: bool,
}

impl ScriptedScheduler {
    fn new(steps: Vec<Vec<Assignment>>) -> Self {
        Self {
            steps: steps.into(),
            reassigning: false,
            wants_start_notifications: false,
        }
    }

    fn reassigning(mut self) -> Self {
        self.reassigning = true;
        self
    }
}

impl Scheduler for ScriptedScheduler {
    fn start(&mut self) -> RegisterReply {
        RegisterReply {
            name: "scripted".into(),
            version: "0".into(),
            protocol_version: sim_core::PROTOCOL_VERSION,
            reassigning: self.reassigning,
            wants_start_notifications: self.wants_start_notifications,
        }
    }

    fn send_message(&mut self, _update: UpdateMessage) -> Vec<Assignment> {
        self.steps.pop_front().unwrap_or_default()
    }

    fn stop(&mut self) {}
}

/// Greedily assigns every newly ready task to worker 0, in id order, with no
/// priority and no blocking — the simplest possible scheduler, used where a
/// scenario just needs *something* to run the graph to completion.
struct GreedyScheduler {
    reassigning: bool,
}

impl Scheduler for GreedyScheduler {
    fn start(&mut self) -> RegisterReply {
        RegisterReply {
            name: "greedy".into(),
            version: "0".into(),
            protocol_version: sim_core::PROTOCOL_VERSION,
            reassigning: self.reassigning,
            wants_start_notifications: false,
        }
    }

    fn send_message(&mut self, update: UpdateMessage) -> Vec<Assignment> {
        update
            .new_ready_tasks
            .into_iter()
            .map(|t| Assignment::new(t, sim_core::WorkerId(0)))
            .collect()
    }

    fn stop(&mut self) {}
}

/// Never assigns anything — used to provoke the deadlock error path.
struct DoNothingScheduler;

impl Scheduler for DoNothingScheduler {
    fn start(&mut self) -> RegisterReply {
        RegisterReply {
            name: "do-nothing".into(),
            version: "0".into(),
            protocol_version: sim_core::PROTOCOL_VERSION,
            reassigning: false,
            wants_start_notifications: false,
        }
    }

    fn send_message(&mut self, _update: UpdateMessage) -> Vec<Assignment> {
        Vec::new()
    }

    fn stop(&mut self) {}
}

fn chain_graph(durations: &[f64]) -> TaskGraph {
    let mut g = TaskGraph::new();
    let mut prev = None;
    for &d in durations {
        let t = g.new_task(NewTask::with_single_output(d, 1.0));
        if let Some(p) = prev {
            g.add_input(t, g.task(p).unwrap().outputs[0]).unwrap();
        }
        prev = Some(t);
    }
    g
}

// ── S1 — single worker, serial chain ───────────────────────────────────────

#[test]
fn s1_single_worker_serial_chain() {
    let graph = chain_graph(&[3.0, 1.0, 1.0, 1.0]);
    let mut sim = Simulator::new(
        graph,
        vec![1],
        Box::new(GreedyScheduler { reassigning: false }),
        Box::new(InstantNetwork),
    );
    let makespan = sim.run().unwrap();
    assert_eq!(makespan, 6.0);
}

// ── S2 — CPU packing on one worker ─────────────────────────────────────────

#[test]
fn s2_cpu_packing() {
    let mut g = TaskGraph::new();
    for (duration, cpus) in [(3.0, 1), (1.0, 2), (1.0, 1), (1.0, 3), (1.0, 1), (1.0, 1)] {
        g.new_task(NewTask {
            duration,
            cpus,
            ..Default::default()
        });
    }
    let mut sim = Simulator::new(
        g,
        vec![3],
        Box::new(GreedyScheduler { reassigning: false }),
        Box::new(InstantNetwork),
    );
    assert_eq!(sim.run().unwrap(), 4.0);
}

// ── S3 — scheduling-time overhead ──────────────────────────────────────────

#[test]
fn s3_scheduling_time_overhead() {
    let graph = chain_graph(&[3.0, 1.0, 1.0, 1.0]);

    let mut sim = Simulator::new(
        graph,
        vec![1],
        Box::new(GreedyScheduler { reassigning: false }),
        Box::new(SimpleNetwork::new(2.0)),
    )
    .with_scheduling_time(2.0);

    sim.run().unwrap();
    let rt = sim.runtime_state();
    let tasks: Vec<_> = (0..4).map(sim_core::TaskId).collect();
    assert_eq!(rt.task(tasks[0]).end_time, Some(5.0));
    assert_eq!(rt.task(tasks[1]).end_time, Some(8.0));
    assert_eq!(rt.task(tasks[2]).end_time, Some(11.0));
    assert_eq!(rt.task(tasks[3]).end_time, Some(14.0));
}

// ── S4 — reassign before start ──────────────────────────────────────────────

#[test]
fn s4_reassign_before_start() {
    // A filler task occupies worker 0's single cpu at higher priority so A1
    // stays pending there; the scheduler then moves A1 to the idle worker 2
    // before worker 0 ever frees up, i.e. strictly before A1 starts.
    let mut g = TaskGraph::new();
    let filler = g.new_task(NewTask {
        duration: 5.0,
        cpus: 1,
        ..Default::default()
    });
    let a1 = g.new_task(NewTask {
        duration: 10.0,
        cpus: 1,
        ..Default::default()
    });

    let steps = vec![
        vec![
            Assignment::new(filler, sim_core::WorkerId(0)).with_priority(10),
            Assignment::new(a1, sim_core::WorkerId(0)),
        ],
        vec![Assignment::new(a1, sim_core::WorkerId(2))],
    ];

    let mut sim = Simulator::new(
        g,
        vec![1, 1, 1],
        Box::new(ScriptedScheduler::new(steps).reassigning()),
        Box::new(InstantNetwork),
    )
    .with_min_scheduling_interval(1.0);

    let makespan = sim.run().unwrap();
    assert_eq!(makespan, 11.0);

    let rt = sim.runtime_state();
    assert_eq!(rt.task(a1).assigned_workers, vec![sim_core::WorkerId(0), sim_core::WorkerId(2)]);
    assert_eq!(rt.task(a1).start_time, Some(1.0));
}

// ── S5 — reassign too late (already running) ───────────────────────────────

#[test]
fn s5_reassign_too_late() {
    let mut g = TaskGraph::new();
    let a1 = g.new_task(NewTask {
        duration: 10.0,
        cpus: 1,
        ..Default::default()
    });

    let steps = vec![
        vec![Assignment::new(a1, sim_core::WorkerId(0))],
        // By the time this fires (min_scheduling_interval later), A1 is
        // already Running on worker 0 — the reassignment must be rejected.
        vec![Assignment::new(a1, sim_core::WorkerId(1))],
    ];

    let mut sim = Simulator::new(
        g,
        vec![1, 1],
        Box::new(ScriptedScheduler::new(steps).reassigning()),
        Box::new(InstantNetwork),
    )
    .with_min_scheduling_interval(5.0);

    let makespan = sim.run().unwrap();
    assert_eq!(makespan, 10.0);
    let rt = sim.runtime_state();
    assert_eq!(rt.task(a1).assigned_workers, vec![sim_core::WorkerId(0)]);
}

// ── S6 — cross-worker transfer cost ────────────────────────────────────────

#[test]
fn s6_transfer_cost() {
    let mut g = TaskGraph::new();
    let a = g.new_task(NewTask::with_single_output(1.0, 10.0));
    let b = g.new_task(NewTask {
        duration: 1.0,
        cpus: 1,
        ..Default::default()
    });
    g.add_input(b, g.task(a).unwrap().outputs[0]).unwrap();

    let steps = vec![vec![
        Assignment::new(a, sim_core::WorkerId(0)),
        Assignment::new(b, sim_core::WorkerId(1)),
    ]];

    let mut sim = Simulator::new(
        g,
        vec![1, 1],
        Box::new(ScriptedScheduler::new(steps)),
        Box::new(SimpleNetwork::new(2.0)),
    );

    let makespan = sim.run().unwrap();
    let rt = sim.runtime_state();
    assert_eq!(rt.task(a).end_time, Some(1.0));
    assert_eq!(rt.task(b).start_time, Some(6.0));
    assert_eq!(rt.task(b).end_time, Some(7.0));
    assert_eq!(makespan, 7.0);
}

// ── Boundary cases ──────────────────────────────────────────────────────────

#[test]
fn empty_graph_makespan_is_zero() {
    let g = TaskGraph::new();
    let mut sim = Simulator::new(g, vec![1], Box::new(DoNothingScheduler), Box::new(InstantNetwork));
    assert_eq!(sim.run().unwrap(), 0.0);
}

#[test]
fn scheduler_that_never_assigns_deadlocks() {
    let mut g = TaskGraph::new();
    g.new_task(NewTask {
        duration: 1.0,
        ..Default::default()
    });
    let mut sim = Simulator::new(g, vec![1], Box::new(DoNothingScheduler), Box::new(InstantNetwork));
    let err = sim.run().unwrap_err();
    assert!(matches!(err, sim_core::SimulatorError::Deadlock { unfinished: 1 }));
}

#[test]
fn zero_duration_task_still_traverses_running() {
    let mut g = TaskGraph::new();
    g.new_task(NewTask {
        duration: 0.0,
        ..Default::default()
    });
    let mut sim = Simulator::new(
        g,
        vec![1],
        Box::new(GreedyScheduler { reassigning: false }),
        Box::new(InstantNetwork),
    );
    let makespan = sim.run().unwrap();
    assert_eq!(makespan, 0.0);
    let rt = sim.runtime_state();
    let t = rt.task(sim_core::TaskId(0));
    assert_eq!(t.start_time, Some(0.0));
    assert_eq!(t.end_time, Some(0.0));
    assert_eq!(t.state, sim_core::TaskState::Finished);
}

#[test]
fn zero_cpu_task_never_blocks_admission() {
    let mut g = TaskGraph::new();
    g.new_task(NewTask {
        duration: 1.0,
        cpus: 0,
        ..Default::default()
    });
    let mut sim = Simulator::new(
        g,
        vec![0],
        Box::new(GreedyScheduler { reassigning: false }),
        Box::new(InstantNetwork),
    );
    assert_eq!(sim.run().unwrap(), 1.0);
}

#[test]
fn protocol_version_mismatch_is_fatal() {
    struct WrongVersionScheduler;
    impl Scheduler for WrongVersionScheduler {
        fn start(&mut self) -> RegisterReply {
            RegisterReply {
                name: "bad".into(),
                version: "0".into(),
                protocol_version: 99,
                reassigning: false,
                wants_start_notifications: false,
            }
        }
        fn send_message(&mut self, _update: UpdateMessage) -> Vec<Assignment> {
            Vec::new()
        }
        fn stop(&mut self) {}
    }

    let g = TaskGraph::new();
    let mut sim = Simulator::new(g, vec![1], Box::new(WrongVersionScheduler), Box::new(InstantNetwork));
    let err = sim.run().unwrap_err();
    assert!(matches!(
        err,
        sim_core::SimulatorError::Protocol(sim_core::protocol::ProtocolError::ProtocolVersionMismatch { .. })
    ));
}

#[test]
fn cpu_violation_is_fatal() {
    let mut g = TaskGraph::new();
    let t = g.new_task(NewTask {
        duration: 1.0,
        cpus: 4,
        ..Default::default()
    });

    let mut sim = Simulator::new(
        g,
        vec![1],
        Box::new(ScriptedScheduler::new(vec![vec![Assignment::new(t, sim_core::WorkerId(0))]])),
        Box::new(InstantNetwork),
    );
    let err = sim.run().unwrap_err();
    assert!(matches!(
        err,
        sim_core::SimulatorError::Protocol(sim_core::protocol::ProtocolError::CpuExceedsCapacity { .. })
    ));
}

#[test]
fn determinism_same_inputs_same_makespan() {
    let run_once = || {
        let graph = chain_graph(&[3.0, 1.0, 1.0]);
        let mut sim = Simulator::new(
            graph,
            vec![1],
            Box::new(GreedyScheduler { reassigning: false }),
            Box::new(InstantNetwork),
        );
        sim.run().unwrap()
    };
    assert_eq!(run_once(), run_once());
}
