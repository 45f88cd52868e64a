//! Execution trace assembly: turns a finished [`Simulator`]'s runtime state
//! into the JSON shape a driver persists. This is driver-level, not a
//! property of the core — the kernel itself never serializes anything;
//! this module is purely a read-only projection over
//! [`sim_core::RuntimeState`].

use serde::Serialize;
use sim_core::{Simulator, TaskId, WorkerId};

#[derive(Debug, Serialize)]
pub struct TaskTrace {
    pub task: TaskId,
    pub name: Option<String>,
    pub assigned_workers: Vec<WorkerId>,
    pub assign_time: Option<f64>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ExecutionTrace {
    pub makespan: f64,
    pub tasks: Vec<TaskTrace>,
}

/// Builds the full trace for a simulator that has already returned
/// successfully from [`Simulator::run`].
pub fn build(sim: &Simulator, makespan: f64) -> ExecutionTrace {
    let graph = sim.task_graph();
    let runtime = sim.runtime_state();

    let mut tasks: Vec<TaskTrace> = graph
        .tasks()
        .map(|t| {
            let info = runtime.task(t.id);
            TaskTrace {
                task: t.id,
                name: t.name.clone(),
                assigned_workers: info.assigned_workers.clone(),
                assign_time: info.assign_time,
                start_time: info.start_time,
                end_time: info.end_time,
            }
        })
        .collect();
    tasks.sort_by_key(|t| t.task);

    ExecutionTrace { makespan, tasks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::graph::NewTask;
    use sim_core::protocol::{Assignment, RegisterReply, UpdateMessage};
    use sim_core::{InstantNetwork, Scheduler, TaskGraph, PROTOCOL_VERSION};

    struct OneShot;
    impl Scheduler for OneShot {
        fn start(&mut self) -> RegisterReply {
            RegisterReply {
                name: "test".into(),
                version: "0".into(),
                protocol_version: PROTOCOL_VERSION,
                reassigning: false,
                wants_start_notifications: false,
            }
        }
        fn send_message(&mut self, update: UpdateMessage) -> Vec<Assignment> {
            update.new_ready_tasks.into_iter().map(|t| Assignment::new(t, WorkerId(0))).collect()
        }
        fn stop(&mut self) {}
    }

    #[test]
    fn trace_reports_makespan_and_per_task_timing() {
        let mut g = TaskGraph::new();
        g.new_task(NewTask {
            name: Some("only".into()),
            duration: 2.0,
            ..Default::default()
        });

        let mut sim = Simulator::new(g, vec![1], Box::new(OneShot), Box::new(InstantNetwork));
        let makespan = sim.run().unwrap();
        let trace = build(&sim, makespan);

        assert_eq!(trace.makespan, 2.0);
        assert_eq!(trace.tasks.len(), 1);
        assert_eq!(trace.tasks[0].name.as_deref(), Some("only"));
        assert_eq!(trace.tasks[0].start_time, Some(0.0));
        assert_eq!(trace.tasks[0].end_time, Some(2.0));
    }
}
