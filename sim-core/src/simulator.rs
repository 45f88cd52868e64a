/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! The simulation kernel proper: wires the task graph, worker runtimes,
//! network model, event loop, and scheduler protocol together and drives
//! `run()` to a makespan or a fatal error.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::error::SimulatorError;
use crate::event::{Event, EventQueue};
use crate::graph::TaskGraph;
use crate::ids::{DataObjectId, TaskId, WorkerId};
use crate::network::{NetworkModel, TransferId};
use crate::protocol::{
    Assignment, FinishedTaskUpdate, NewObject, NewTaskInfo, NewWorker, ObjectUpdate, ProtocolError,
    Scheduler, UpdateMessage, PROTOCOL_VERSION,
};
use crate::runtime::{RuntimeState, TaskState};
use crate::worker::Worker;

struct DownloadState {
    transfer_id: TransferId,
    waiters: Vec<TaskId>,
}

impl DownloadState {
    fn push_waiter(&mut self, task: TaskId) {
        if !self.waiters.contains(&task) {
            self.waiters.push(task);
        }
    }
}

/// Whether an input object is already usable on `worker` without waiting
/// on any download — the "fully satisfied" half of the admission rule. The
/// `blocking` relaxation is checked separately, inside `Worker`.
fn inputs_fully_local(graph: &TaskGraph, runtime: &RuntimeState, task: TaskId, worker: WorkerId) -> bool {
    let Some(t) = graph.task(task) else { return false };
    t.inputs.iter().all(|&input| runtime.object(input).availability.contains(&worker))
}

fn task_locally_ready(graph: &TaskGraph, runtime: &RuntimeState, task: TaskId, worker: WorkerId) -> bool {
    runtime.task(task).unfinished_inputs == 0 && inputs_fully_local(graph, runtime, task, worker)
}

/// Discrete-event simulator tying components A–G together.
pub struct Simulator {
    graph: TaskGraph,
    workers: Vec<Worker>,
    scheduler: Box<dyn Scheduler>,
    netmodel: Box<dyn NetworkModel>,
    runtime: RuntimeState,
    events: EventQueue,

    scheduling_time: Option<f64>,
    min_scheduling_interval: Option<f64>,
    initial_bandwidth: Option<f64>,
    trace: bool,

    reassigning: bool,
    wants_start_notifications: bool,

    reported_workers: BTreeSet<WorkerId>,
    reported_objects: BTreeSet<DataObjectId>,
    reported_tasks: BTreeSet<TaskId>,
    bandwidth_reported: bool,

    pending_ready: Vec<TaskId>,
    pending_started: Vec<TaskId>,
    pending_finished: Vec<(TaskId, WorkerId)>,
    pending_object_changes: Vec<DataObjectId>,
    pending_reassign_failed: Vec<TaskId>,
    pending_wake: bool,

    downloads: std::collections::BTreeMap<(DataObjectId, WorkerId), DownloadState>,
    transfer_lookup: std::collections::BTreeMap<TransferId, (DataObjectId, WorkerId)>,
    next_transfer_seq: u64,

    /// `(apply_at, assignments)` pairs awaiting their `scheduling_time`
    /// delay before taking effect.
    deferred: Vec<(f64, Vec<Assignment>)>,

    current_time: f64,
}

impl Simulator {
    pub fn new(
        graph: TaskGraph,
        worker_cpus: Vec<u32>,
        scheduler: Box<dyn Scheduler>,
        netmodel: Box<dyn NetworkModel>,
    ) -> Self {
        let workers: Vec<Worker> = worker_cpus
            .into_iter()
            .enumerate()
            .map(|(i, cpus)| Worker::new(WorkerId(i as u32), cpus))
            .collect();

        let task_count = graph.task_capacity();
        let object_count = graph.object_capacity();
        let runtime = RuntimeState::new(task_count, object_count, |id| {
            graph.task(id).map(|t| t.inputs.len()).unwrap_or(0)
        });

        Self {
            graph,
            workers,
            scheduler,
            netmodel,
            runtime,
            events: EventQueue::new(),
            scheduling_time: None,
            min_scheduling_interval: None,
            initial_bandwidth: None,
            trace: false,
            reassigning: false,
            wants_start_notifications: false,
            reported_workers: BTreeSet::new(),
            reported_objects: BTreeSet::new(),
            reported_tasks: BTreeSet::new(),
            bandwidth_reported: false,
            pending_ready: Vec::new(),
            pending_started: Vec::new(),
            pending_finished: Vec::new(),
            pending_object_changes: Vec::new(),
            pending_reassign_failed: Vec::new(),
            pending_wake: false,
            downloads: std::collections::BTreeMap::new(),
            transfer_lookup: std::collections::BTreeMap::new(),
            next_transfer_seq: 0,
            deferred: Vec::new(),
            current_time: 0.0,
        }
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_scheduling_time(mut self, seconds: f64) -> Self {
        self.scheduling_time = Some(seconds);
        self
    }

    pub fn with_min_scheduling_interval(mut self, seconds: f64) -> Self {
        self.min_scheduling_interval = Some(seconds);
        self
    }

    pub fn with_initial_bandwidth(mut self, bandwidth: f64) -> Self {
        self.initial_bandwidth = Some(bandwidth);
        self
    }

    pub fn runtime_state(&self) -> &RuntimeState {
        &self.runtime
    }

    pub fn task_graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Run the simulation to completion, returning the makespan.
    pub fn run(&mut self) -> Result<f64, SimulatorError> {
        self.graph.validate()?;

        let reply = self.scheduler.start();
        if reply.protocol_version != PROTOCOL_VERSION {
            return Err(ProtocolError::ProtocolVersionMismatch {
                expected: PROTOCOL_VERSION,
                got: reply.protocol_version,
            }
            .into());
        }
        self.reassigning = reply.reassigning;
        self.wants_start_notifications = reply.wants_start_notifications;
        debug!(scheduler = %reply.name, reassigning = reply.reassigning, "scheduler registered");

        for task in self.graph.source_tasks() {
            self.runtime.task_mut(task).transition(TaskState::Ready);
            self.pending_ready.push(task);
        }

        self.run_scheduling_point(0.0, false)?;

        if self.runtime.all_finished() {
            self.scheduler.stop();
            return Ok(self.current_time);
        }

        loop {
            if self.events.is_empty() {
                let unfinished = self.graph.task_count() - self.runtime.finished_count();
                return Err(SimulatorError::Deadlock { unfinished });
            }

            let (time, group) = self.events.pop_group();
            self.current_time = time;
            trace!(time, events = group.len(), "processing event group");
            self.process_group(time, group)?;

            if self.events_due_at(time) {
                continue;
            }

            if self.scheduling_point_due() {
                self.run_scheduling_point(time, self.pending_wake)?;
            }

            if self.runtime.all_finished() {
                break;
            }
        }

        self.scheduler.stop();
        Ok(self.current_time)
    }

    fn events_due_at(&self, time: f64) -> bool {
        self.events.peek_time() == Some(time)
    }

    fn scheduling_point_due(&self) -> bool {
        !self.pending_ready.is_empty()
            || (self.wants_start_notifications && !self.pending_started.is_empty())
            || !self.pending_finished.is_empty()
            || !self.pending_object_changes.is_empty()
            || !self.pending_reassign_failed.is_empty()
            || self.pending_wake
    }

    fn process_group(&mut self, time: f64, group: Vec<Event>) -> Result<(), SimulatorError> {
        for event in group {
            match event {
                Event::DownloadEnd { object, dest } => self.on_download_end(object, dest, time),
                Event::TaskEnd { task, worker } => self.on_task_end(task, worker, time),
                Event::TaskStart { task, worker } => self.on_task_start(task, worker, time),
                Event::DeferredApply => {}
                Event::SchedulerWake => self.pending_wake = true,
            }
        }

        self.sync_all_downloads(time);
        self.admit_pass_all_workers(time);

        if let Some(assignments) = self.take_deferred(time) {
            self.apply_assignments(assignments, time)?;
            self.sync_all_downloads(time);
            self.admit_pass_all_workers(time);
        }

        Ok(())
    }

    fn on_task_start(&mut self, task: TaskId, worker: WorkerId, time: f64) {
        self.runtime.task_mut(task).record_start(time);
        self.pending_started.push(task);
        let duration = self.graph.task(task).expect("started task must exist").duration;
        self.events.push(time + duration, Event::TaskEnd { task, worker });
    }

    fn on_task_end(&mut self, task: TaskId, worker: WorkerId, time: f64) {
        if let Some(w) = self.workers.get_mut(worker.index()) {
            w.finish_task(task);
        }
        self.runtime.task_mut(task).record_finish(time);
        self.pending_finished.push((task, worker));

        let outputs = self.graph.task(task).expect("finished task must exist").outputs.clone();
        for out in outputs {
            self.runtime.object_mut(out).mark_placed(worker);
            self.pending_object_changes.push(out);

            let consumers: Vec<TaskId> = self
                .graph
                .object(out)
                .map(|o| o.consumers.iter().copied().collect())
                .unwrap_or_default();
            for consumer in consumers {
                if self.runtime.task_mut(consumer).input_satisfied() {
                    self.pending_ready.push(consumer);
                }
            }
        }
    }

    fn on_download_end(&mut self, object: DataObjectId, dest: WorkerId, time: f64) {
        let key = (object, dest);
        let Some(state) = self.downloads.remove(&key) else { return };

        self.runtime.object_mut(object).mark_placed(dest);
        self.pending_object_changes.push(object);

        if let Some(w) = self.workers.get_mut(dest.index()) {
            w.finish_download(object, &state.waiters);
        }
        self.transfer_lookup.remove(&state.transfer_id);

        let updates = self.netmodel.end_transfer(state.transfer_id, time);
        for (transfer_id, new_eta) in updates {
            if let Some(&(obj2, dest2)) = self.transfer_lookup.get(&transfer_id) {
                self.events
                    .cancel_matching(|e| matches!(e, Event::DownloadEnd { object, dest } if *object == obj2 && *dest == dest2));
                self.events.push(new_eta, Event::DownloadEnd { object: obj2, dest: dest2 });
            }
        }
    }

    /// For every worker, make sure each of its pending tasks' missing-but-
    /// produced inputs have an in-flight download heading their way.
    fn sync_all_downloads(&mut self, time: f64) {
        for i in 0..self.workers.len() {
            let worker_id = self.workers[i].id;
            let pending_tasks = self.workers[i].pending_task_ids();
            for task in pending_tasks {
                let Some(t) = self.graph.task(task) else { continue };
                let inputs = t.inputs.clone();
                for input in inputs {
                    self.ensure_download(input, worker_id, task, time);
                }
            }
        }
    }

    fn ensure_download(&mut self, object: DataObjectId, worker: WorkerId, task: TaskId, time: f64) {
        let availability = self.runtime.object(object).availability.clone();
        if availability.contains(&worker) || availability.is_empty() {
            return;
        }
        let key = (object, worker);
        if let Some(state) = self.downloads.get_mut(&key) {
            state.push_waiter(task);
            return;
        }

        let source = *availability.iter().min().expect("non-empty availability");
        let size = self.graph.object(object).expect("object must exist").size;
        let transfer_id = TransferId(self.next_transfer_seq);
        self.next_transfer_seq += 1;

        let eta = self.netmodel.start_transfer(transfer_id, size, source, worker, time);
        if let Some(w) = self.workers.get_mut(worker.index()) {
            w.start_download(object);
        }
        self.downloads.insert(key, DownloadState { transfer_id, waiters: vec![task] });
        self.transfer_lookup.insert(transfer_id, key);
        self.events.push(eta, Event::DownloadEnd { object, dest: worker });
    }

    fn admit_pass_all_workers(&mut self, time: f64) {
        for i in 0..self.workers.len() {
            let worker_id = self.workers[i].id;
            let graph = &self.graph;
            let runtime = &self.runtime;
            let started = self.workers[i].admit_eligible(time, |t| task_locally_ready(graph, runtime, t, worker_id));
            for task in started {
                self.events.push(time, Event::TaskStart { task, worker: worker_id });
            }
        }
    }

    fn take_deferred(&mut self, at: f64) -> Option<Vec<Assignment>> {
        let pos = self.deferred.iter().position(|(t, _)| *t == at)?;
        Some(self.deferred.remove(pos).1)
    }

    fn build_delta(&mut self) -> UpdateMessage {
        let mut msg = UpdateMessage::default();

        for w in &self.workers {
            if self.reported_workers.insert(w.id) {
                msg.new_workers.push(NewWorker { id: w.id, cpus: w.cpus });
            }
        }

        if !self.bandwidth_reported {
            if let Some(bw) = self.initial_bandwidth {
                msg.network_bandwidth = Some(bw);
            }
            self.bandwidth_reported = true;
        }

        let new_object_ids: Vec<DataObjectId> =
            self.graph.objects().map(|o| o.id).filter(|id| !self.reported_objects.contains(id)).collect();
        for id in new_object_ids {
            self.reported_objects.insert(id);
            let o = self.graph.object(id).expect("just listed");
            msg.new_objects.push(NewObject { id, expected_size: o.expected_size, size: None });
        }

        let new_task_ids: Vec<TaskId> =
            self.graph.tasks().map(|t| t.id).filter(|id| !self.reported_tasks.contains(id)).collect();
        for id in new_task_ids {
            self.reported_tasks.insert(id);
            let t = self.graph.task(id).expect("just listed");
            msg.new_tasks.push(NewTaskInfo {
                id,
                inputs: t.inputs.clone(),
                outputs: t.outputs.clone(),
                expected_duration: t.expected_duration,
                cpus: t.cpus,
            });
        }

        for (task, worker) in self.pending_finished.drain(..) {
            msg.tasks_update.push(FinishedTaskUpdate { id: task, worker });
        }

        let mut seen = BTreeSet::new();
        for object in self.pending_object_changes.drain(..) {
            if !seen.insert(object) {
                continue;
            }
            let rt = self.runtime.object(object);
            msg.objects_update.push(ObjectUpdate {
                id: object,
                placing: rt.placing.iter().copied().collect(),
                availability: rt.availability.iter().copied().collect(),
                size: Some(self.graph.object(object).expect("object must exist").size),
            });
        }

        msg.new_ready_tasks = std::mem::take(&mut self.pending_ready);

        if self.wants_start_notifications {
            msg.new_started_tasks = std::mem::take(&mut self.pending_started);
        } else {
            self.pending_started.clear();
        }

        msg.reassign_failed = std::mem::take(&mut self.pending_reassign_failed);

        msg
    }

    fn run_scheduling_point(&mut self, now: f64, force: bool) -> Result<(), SimulatorError> {
        self.pending_wake = false;
        let delta = self.build_delta();

        if force || !delta.is_empty() {
            let assignments = self.scheduler.send_message(delta);
            match self.scheduling_time {
                Some(st) if st > 0.0 => {
                    let apply_at = now + st;
                    self.deferred.push((apply_at, assignments));
                    self.events.push(apply_at, Event::DeferredApply);
                }
                _ => {
                    self.apply_assignments(assignments, now)?;
                    self.sync_all_downloads(now);
                    self.admit_pass_all_workers(now);
                }
            }
        }

        if let Some(iv) = self.min_scheduling_interval {
            self.events.push(now + iv, Event::SchedulerWake);
        }

        Ok(())
    }

    fn apply_assignments(&mut self, assignments: Vec<Assignment>, now: f64) -> Result<(), SimulatorError> {
        for a in assignments {
            let Some(task_def) = self.graph.task(a.task) else {
                return Err(ProtocolError::UnknownTask { task: a.task }.into());
            };
            let task_cpus = task_def.cpus;
            let inputs_len = task_def.inputs.len();

            if let Some(w) = a.worker {
                if self.workers.get(w.index()).is_none() {
                    return Err(ProtocolError::UnknownWorker { worker: w }.into());
                }
                let capacity = self.workers[w.index()].cpus;
                if task_cpus > capacity {
                    return Err(ProtocolError::CpuExceedsCapacity {
                        task: a.task,
                        worker: w,
                        requested: task_cpus,
                        capacity,
                    }
                    .into());
                }
            }

            let info = self.runtime.task(a.task);
            let state = info.state;
            let current_worker = info.current_worker();

            if state == TaskState::Finished {
                return Err(ProtocolError::TaskAlreadyFinished { task: a.task }.into());
            }

            if !self.reassigning {
                if let Some(cur) = current_worker {
                    let conflicts = match a.worker {
                        Some(w) => w != cur,
                        None => true,
                    };
                    if conflicts {
                        return Err(ProtocolError::ReassignmentNotAllowed {
                            task: a.task,
                            current: cur,
                            requested: a.worker.unwrap_or(cur),
                        }
                        .into());
                    }
                }
            } else if state == TaskState::Running {
                self.pending_reassign_failed.push(a.task);
                continue;
            }

            if let Some(cur) = current_worker {
                if let Some(w) = self.workers.get_mut(cur.index()) {
                    w.withdraw(a.task);
                }
            }

            match a.worker {
                Some(w) => {
                    let priority = a.priority.unwrap_or(0);
                    let blocking = a.blocking.unwrap_or(0).min(inputs_len);
                    self.workers[w.index()].enqueue(a.task, task_cpus, priority, blocking);
                    self.runtime.task_mut(a.task).record_assignment(w, now);
                    self.sync_all_downloads(now);
                }
                None => {
                    // already withdrawn above; no assignment to record.
                }
            }
        }

        Ok(())
    }
}
