/*
SPDX-FileCopyrightText: Copyright 2026 Project Contributors
SPDX-License-Identifier: MIT
*/

//! Network models: the transfer-time function data-object downloads are
//! charged against, and the bookkeeping a bandwidth-sharing model needs to
//! keep in-flight ETAs correct as transfers start and end.
//!
//! `NetworkModel` is a trait object (`Box<dyn NetworkModel>`) so a driver can
//! supply a model this crate never heard of without touching the kernel —
//! a collaborator injected through a trait rather than a concrete type.

use std::collections::BTreeMap;
use std::fmt;

use crate::ids::WorkerId;

/// Identifies one in-flight transfer across `register`/`deregister` calls.
/// Scoped to the network model; callers mint these however is convenient
/// (the kernel uses the destination `DataObjectId` converted to a `u64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransferId(pub u64);

/// Transfer-time function for a data object moving between two workers, plus
/// the registration hooks a bandwidth-sharing model needs to recompute
/// in-flight ETAs whenever the set of active transfers changes.
pub trait NetworkModel: fmt::Debug {
    /// Begin transferring `size` bytes from `source` to `dest` at simulated
    /// time `now`. Returns the completion time given contention *at the
    /// moment of registration* — for a sharing model this may later be
    /// invalidated by a call to [`end_transfer`](NetworkModel::end_transfer);
    /// the caller is responsible for rescheduling using the returned pairs.
    ///
    /// Same-worker transfers (`source == dest`) are always zero cost and
    /// must not be registered.
    fn start_transfer(
        &mut self,
        transfer: TransferId,
        size: f64,
        source: WorkerId,
        dest: WorkerId,
        now: f64,
    ) -> f64;

    /// Deregister a transfer (natural completion or cancellation) at `now`.
    /// Returns `(transfer, new_completion_time)` for every other still-active
    /// transfer whose ETA changed as a result, so the caller can replace
    /// their stale `DownloadEnd` events.
    fn end_transfer(&mut self, transfer: TransferId, now: f64) -> Vec<(TransferId, f64)>;
}

// ── Instant ─────────────────────────────────────────────────────────────────

/// All transfers complete immediately; `availability` updates at the same
/// simulated time as `placing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantNetwork;

impl NetworkModel for InstantNetwork {
    fn start_transfer(
        &mut self,
        _transfer: TransferId,
        _size: f64,
        _source: WorkerId,
        _dest: WorkerId,
        now: f64,
    ) -> f64 {
        now
    }

    fn end_transfer(&mut self, _transfer: TransferId, _now: f64) -> Vec<(TransferId, f64)> {
        Vec::new()
    }
}

// ── Simple(bandwidth) ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct ActiveTransfer {
    dest: WorkerId,
    remaining_bytes: f64,
    started_at: f64,
    rate: f64,
}

/// Point-to-point model with a single shared bandwidth figure. In isolation
/// `transfer_time = size / bandwidth`. Parallel transfers landing on the
/// same destination worker split that worker's bandwidth equally; ETAs are
/// recomputed every time a transfer starts or ends.
#[derive(Debug, Clone)]
pub struct SimpleNetwork {
    bandwidth: f64,
    active: BTreeMap<TransferId, ActiveTransfer>,
}

impl SimpleNetwork {
    pub fn new(bandwidth: f64) -> Self {
        assert!(bandwidth > 0.0, "network bandwidth must be positive");
        Self {
            bandwidth,
            active: BTreeMap::new(),
        }
    }

    /// Advance every active transfer's remaining byte count to `now` at its
    /// current rate, without changing rates.
    fn settle(&mut self, now: f64) {
        for t in self.active.values_mut() {
            let elapsed = now - t.started_at;
            if elapsed > 0.0 {
                t.remaining_bytes -= elapsed * t.rate;
            }
            t.started_at = now;
        }
    }

    /// Recompute each active transfer's rate as `bandwidth` split equally
    /// among transfers sharing its destination worker.
    fn recompute_rates(&mut self) {
        let mut counts: BTreeMap<WorkerId, usize> = BTreeMap::new();
        for t in self.active.values() {
            *counts.entry(t.dest).or_insert(0) += 1;
        }
        for t in self.active.values_mut() {
            let n = counts[&t.dest] as f64;
            t.rate = self.bandwidth / n;
        }
    }
}

impl NetworkModel for SimpleNetwork {
    fn start_transfer(
        &mut self,
        transfer: TransferId,
        size: f64,
        source: WorkerId,
        dest: WorkerId,
        now: f64,
    ) -> f64 {
        if source == dest {
            return now;
        }
        self.settle(now);
        self.active.insert(
            transfer,
            ActiveTransfer {
                dest,
                remaining_bytes: size,
                started_at: now,
                rate: 0.0,
            },
        );
        self.recompute_rates();
        let t = &self.active[&transfer];
        now + t.remaining_bytes / t.rate
    }

    fn end_transfer(&mut self, transfer: TransferId, now: f64) -> Vec<(TransferId, f64)> {
        self.settle(now);
        let Some(removed) = self.active.remove(&transfer) else {
            return Vec::new();
        };
        self.recompute_rates();
        self.active
            .iter()
            .filter(|(_, t)| t.dest == removed.dest)
            .map(|(&tid, t)| (tid, now + t.remaining_bytes / t.rate))
            .collect()
    }
}
