//! A minimal greedy reference scheduler, bundled only so the driver has
//! something to hand `Simulator::run` — concrete scheduling policies are an
//! external collaborator of the kernel, not something the kernel itself
//! ships an implementation of.
//!
//! Policy: every newly ready task is assigned, in ascending task-id order,
//! to whichever worker currently has the most free CPU headroom among those
//! with enough total capacity to ever run it. Never reassigns, never sets
//! priority or blocking hints.

use std::collections::HashMap;

use sim_core::{Assignment, RegisterReply, Scheduler, SchedulerGraphMirror, TaskId, UpdateMessage, WorkerId, PROTOCOL_VERSION};
use tracing::{trace, warn};

#[derive(Debug, Default)]
pub struct GreedyScheduler {
    mirror: SchedulerGraphMirror,
    /// CPUs currently committed on each worker by this scheduler's own
    /// assignments — incremented on assign, decremented once the kernel
    /// reports the task finished. The mirror itself has no notion of "load",
    /// only static capacity, so the policy tracks this independently.
    load: HashMap<WorkerId, u32>,
}

impl GreedyScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn free_cpus(&self, worker: WorkerId, capacity: u32) -> u32 {
        capacity.saturating_sub(self.load.get(&worker).copied().unwrap_or(0))
    }

    fn pick_worker(&self, cpus: u32) -> Option<WorkerId> {
        self.mirror
            .workers
            .iter()
            .filter(|(_, w)| w.cpus >= cpus)
            .max_by_key(|(&id, w)| self.free_cpus(id, w.cpus))
            .map(|(&id, _)| id)
    }
}

impl Scheduler for GreedyScheduler {
    fn start(&mut self) -> RegisterReply {
        RegisterReply {
            name: "sim-cli-greedy".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: PROTOCOL_VERSION,
            reassigning: false,
            wants_start_notifications: false,
        }
    }

    fn send_message(&mut self, update: UpdateMessage) -> Vec<Assignment> {
        self.mirror.apply_update(&update);

        for finished in &update.tasks_update {
            if let Some(t) = self.mirror.tasks.get(&finished.id) {
                if let Some(load) = self.load.get_mut(&finished.worker) {
                    *load = load.saturating_sub(t.cpus);
                }
            }
        }

        let mut ready: Vec<TaskId> = update.new_ready_tasks;
        ready.sort();

        for task in ready {
            let cpus = match self.mirror.tasks.get(&task) {
                Some(t) => t.cpus,
                None => continue,
            };
            match self.pick_worker(cpus) {
                Some(worker) => {
                    trace!(task = %task, worker = %worker, "assigning");
                    self.mirror.assign(task, Some(worker), None, None);
                    *self.load.entry(worker).or_insert(0) += cpus;
                }
                None => warn!(task = %task, cpus, "no worker has enough capacity for this task"),
            }
        }

        self.mirror.take_assignments()
    }

    fn stop(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::protocol::{NewTaskInfo, NewWorker};

    #[test]
    fn assigns_to_the_least_loaded_capable_worker() {
        let mut s = GreedyScheduler::new();
        s.start();

        let update = UpdateMessage {
            new_workers: vec![
                NewWorker { id: WorkerId(0), cpus: 2 },
                NewWorker { id: WorkerId(1), cpus: 4 },
            ],
            new_tasks: vec![NewTaskInfo {
                id: TaskId(0),
                inputs: vec![],
                outputs: vec![],
                expected_duration: None,
                cpus: 1,
            }],
            new_ready_tasks: vec![TaskId(0)],
            ..Default::default()
        };

        let assignments = s.send_message(update);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].worker, Some(WorkerId(1)));
    }

    #[test]
    fn skips_tasks_no_worker_can_fit() {
        let mut s = GreedyScheduler::new();
        s.start();
        let update = UpdateMessage {
            new_workers: vec![NewWorker { id: WorkerId(0), cpus: 1 }],
            new_tasks: vec![NewTaskInfo {
                id: TaskId(0),
                inputs: vec![],
                outputs: vec![],
                expected_duration: None,
                cpus: 4,
            }],
            new_ready_tasks: vec![TaskId(0)],
            ..Default::default()
        };
        assert!(s.send_message(update).is_empty());
    }
}
