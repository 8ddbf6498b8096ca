//! Dependency graph over one queue's candidate tasks.
//!
//! Design:
//! - Forward edges: task -> tasks it depends on (waits for)
//! - Reverse edges: task -> tasks that depend on it (waiting tasks)
//! - Invariant: edges and reverse_edges must be kept in sync
//! - Only edges between candidates are kept; a dependency on a task outside
//!   the queue never blocks ordering.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::domain::{Task, TaskId};

/// Dependency graph for tracking task dependencies.
///
/// This graph maintains both forward and reverse edges for efficient lookups:
/// - `edges`: TaskId -> Set of TaskIds it depends on
/// - `reverse_edges`: TaskId -> Set of TaskIds waiting for it
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Forward edges: task -> tasks it depends on (waits for)
    edges: HashMap<TaskId, HashSet<TaskId>>,

    /// Reverse edges: task -> tasks that depend on it (waiting tasks)
    reverse_edges: HashMap<TaskId, HashSet<TaskId>>,
}

/// Result of [`DependencyGraph::order`].
#[derive(Debug)]
pub struct DependencyOrder<'a> {
    /// Every input task exactly once.
    pub ordered: Vec<&'a Task>,

    /// Tasks that could not be placed after their dependencies (cycle members
    /// and anything waiting on them). They sit at the end of `ordered` in rank
    /// order.
    pub unresolved: Vec<TaskId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from a candidate set, dropping edges that leave it.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let tasks: Vec<&Task> = tasks.into_iter().collect();
        let known: HashSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();

        let mut graph = Self::new();
        for task in &tasks {
            for dep in &task.depends_on {
                if known.contains(dep) {
                    graph.add_dependency(task.id.clone(), dep.clone());
                }
            }
        }
        graph
    }

    /// Add a dependency: `task` depends on `depends_on`.
    ///
    /// Example: add_dependency(b, a) means "B waits for A"
    /// - edges: B -> {A}
    /// - reverse_edges: A -> {B}
    pub fn add_dependency(&mut self, task: TaskId, depends_on: TaskId) {
        self.reverse_edges
            .entry(depends_on.clone())
            .or_default()
            .insert(task.clone());
        self.edges.entry(task).or_default().insert(depends_on);
    }

    /// Number of tasks that transitively wait for `task` (excluding itself).
    ///
    /// This is the "unblocks many descendants" signal of the tunable planner.
    pub fn descendant_count(&self, task: &TaskId) -> usize {
        let mut seen: HashSet<&TaskId> = HashSet::new();
        let mut frontier: VecDeque<&TaskId> = VecDeque::from([task]);

        while let Some(current) = frontier.pop_front() {
            if let Some(waiting) = self.reverse_edges.get(current) {
                for next in waiting {
                    if next != task && seen.insert(next) {
                        frontier.push_back(next);
                    }
                }
            }
        }
        seen.len()
    }

    /// Reorder `ranked` so no task precedes one of its dependencies.
    ///
    /// Kahn's algorithm, always emitting the best-ranked ready task, so the
    /// ranking is preserved wherever dependencies allow. O(V log V + E).
    pub fn order<'a>(&self, ranked: Vec<&'a Task>) -> DependencyOrder<'a> {
        let index: HashMap<&TaskId, usize> = ranked
            .iter()
            .enumerate()
            .map(|(i, t)| (&t.id, i))
            .collect();

        let mut in_degree: Vec<usize> = ranked
            .iter()
            .map(|t| self.edges.get(&t.id).map_or(0, HashSet::len))
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut emitted = vec![false; ranked.len()];
        let mut ordered = Vec::with_capacity(ranked.len());

        while let Some(Reverse(i)) = ready.pop() {
            emitted[i] = true;
            ordered.push(ranked[i]);

            if let Some(waiting) = self.reverse_edges.get(&ranked[i].id) {
                for w in waiting {
                    if let Some(&j) = index.get(w) {
                        in_degree[j] -= 1;
                        if in_degree[j] == 0 {
                            ready.push(Reverse(j));
                        }
                    }
                }
            }
        }

        let mut unresolved = Vec::new();
        for (i, task) in ranked.iter().enumerate() {
            if !emitted[i] {
                unresolved.push(task.id.clone());
                ordered.push(task);
            }
        }

        DependencyOrder {
            ordered,
            unresolved,
        }
    }
}
