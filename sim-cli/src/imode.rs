//! "Information mode" — driver-side preprocessing of a loaded task graph's
//! scheduler hints (`expected_duration` / `expected_size`), controlling how
//! much foresight a scheduler is given about tasks it hasn't run yet.
//! Purely a transform over [`TaskGraph`]; the kernel never reads these
//! hints itself, only forwards them to the scheduler protocol, so this has
//! no effect on kernel semantics.

use clap::ValueEnum;
use sim_core::graph::TaskGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Imode {
    /// Hints equal the real values — the scheduler sees perfect foresight.
    Exact,
    /// Hints cleared to `None` — the scheduler gets no foresight at all.
    Blind,
    /// Hints set to the graph-wide mean duration/size.
    Mean,
    /// No-op: hints stay exactly as authored in the workload file.
    User,
}

/// Rewrites every task's `expected_duration` and every object's
/// `expected_size` in place according to `mode`.
pub fn apply(graph: &mut TaskGraph, mode: Imode) {
    match mode {
        Imode::Exact => apply_exact(graph),
        Imode::Blind => set_all(graph, None, None),
        Imode::Mean => apply_mean(graph),
        Imode::User => {}
    }
}

fn apply_exact(graph: &mut TaskGraph) {
    let durations: Vec<_> = graph.tasks().map(|t| (t.id, t.duration)).collect();
    for (id, duration) in durations {
        graph.task_mut(id).expect("id just listed").expected_duration = Some(duration);
    }

    let sizes: Vec<_> = graph.objects().map(|o| (o.id, o.size)).collect();
    for (id, size) in sizes {
        graph.object_mut(id).expect("id just listed").expected_size = Some(size);
    }
}

fn apply_mean(graph: &mut TaskGraph) {
    let durations: Vec<f64> = graph.tasks().map(|t| t.duration).collect();
    let mean_duration = mean(&durations);

    let sizes: Vec<f64> = graph.objects().map(|o| o.size).collect();
    let mean_size = mean(&sizes);

    set_all(graph, Some(mean_duration), Some(mean_size));
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn set_all(graph: &mut TaskGraph, duration: Option<f64>, size: Option<f64>) {
    let task_ids: Vec<_> = graph.tasks().map(|t| t.id).collect();
    for id in task_ids {
        graph.task_mut(id).expect("id just listed").expected_duration = duration;
    }

    let object_ids: Vec<_> = graph.objects().map(|o| o.id).collect();
    for id in object_ids {
        graph.object_mut(id).expect("id just listed").expected_size = size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::graph::{NewTask, OutputSpec};

    fn two_task_graph() -> TaskGraph {
        let mut g = TaskGraph::new();
        g.new_task(NewTask {
            duration: 2.0,
            outputs: vec![OutputSpec::new(10.0)],
            ..Default::default()
        });
        g.new_task(NewTask {
            duration: 4.0,
            outputs: vec![OutputSpec::new(20.0)],
            ..Default::default()
        });
        g
    }

    #[test]
    fn exact_mirrors_real_values() {
        let mut g = two_task_graph();
        apply(&mut g, Imode::Exact);
        for t in g.tasks() {
            assert_eq!(t.expected_duration, Some(t.duration));
        }
        for o in g.objects() {
            assert_eq!(o.expected_size, Some(o.size));
        }
    }

    #[test]
    fn blind_clears_hints() {
        let mut g = two_task_graph();
        apply(&mut g, Imode::Exact);
        apply(&mut g, Imode::Blind);
        assert!(g.tasks().all(|t| t.expected_duration.is_none()));
        assert!(g.objects().all(|o| o.expected_size.is_none()));
    }

    #[test]
    fn mean_sets_the_graph_wide_average() {
        let mut g = two_task_graph();
        apply(&mut g, Imode::Mean);
        assert!(g.tasks().all(|t| t.expected_duration == Some(3.0)));
        assert!(g.objects().all(|o| o.expected_size == Some(15.0)));
    }

    #[test]
    fn user_is_a_noop() {
        let mut g = two_task_graph();
        apply(&mut g, Imode::User);
        assert!(g.tasks().all(|t| t.expected_duration.is_none()));
    }

    #[test]
    fn mean_on_empty_graph_is_zero() {
        let mut g = TaskGraph::new();
        apply(&mut g, Imode::Mean); // must not panic or divide by zero
        assert_eq!(g.task_count(), 0);
    }
}
