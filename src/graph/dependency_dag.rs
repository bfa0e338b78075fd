use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;

use crate::task::{Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    CycleDetected { from: TaskId, to: TaskId },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::CycleDetected { from, to } => write!(
                f,
                "dependency {from} -> {to} would create a cycle"
            ),
        }
    }
}

impl std::error::Error for GraphError {}

/// Directed dependency graph over the scheduled tasks, built on demand
/// from their `depends_on` lists. Edges point prerequisite -> dependent.
pub struct DependencyDag {
    graph: DiGraph<TaskId, ()>,
    indices: HashMap<TaskId, NodeIndex>,
}

impl DependencyDag {
    pub fn build(tasks: &BTreeMap<TaskId, Task>) -> Self {
        let mut graph: DiGraph<TaskId, ()> = DiGraph::new();
        let mut indices: HashMap<TaskId, NodeIndex> = HashMap::new();

        for &task_id in tasks.keys() {
            let node = graph.add_node(task_id);
            indices.insert(task_id, node);
        }
        for task in tasks.values() {
            for prerequisite in &task.depends_on {
                if let (Some(&from), Some(&to)) =
                    (indices.get(prerequisite), indices.get(&task.id))
                {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { graph, indices }
    }

    /// Would inserting `from -> to` close a cycle? True whenever `from`
    /// is already reachable from `to` (including `from == to`).
    pub fn would_close_cycle(&self, from: TaskId, to: TaskId) -> bool {
        let (Some(&from_ix), Some(&to_ix)) = (self.indices.get(&from), self.indices.get(&to))
        else {
            return false;
        };
        has_path_connecting(&self.graph, to_ix, from_ix, None)
    }

    /// Tasks whose `depends_on` directly references `task_id`, ascending.
    pub fn direct_dependents(&self, task_id: TaskId) -> Vec<TaskId> {
        let Some(&node) = self.indices.get(&task_id) else {
            return Vec::new();
        };
        let mut dependents: Vec<TaskId> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|ix| self.graph[ix])
            .collect();
        dependents.sort_unstable();
        dependents.dedup();
        dependents
    }

    /// All transitive dependents of `task_id`, in topological order, so a
    /// cascade can rewrite each task after every prerequisite it has in
    /// the cascade.
    pub fn transitive_dependents(&self, task_id: TaskId) -> Vec<TaskId> {
        let Some(&start) = self.indices.get(&task_id) else {
            return Vec::new();
        };

        let mut reachable: HashSet<NodeIndex> = HashSet::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(node) = bfs.next(&self.graph) {
            reachable.insert(node);
        }
        reachable.remove(&start);

        // The graph is acyclic by construction (cycles are rejected on
        // insert), so toposort only fails on corrupted state.
        let order = toposort(&self.graph, None).unwrap_or_default();
        order
            .into_iter()
            .filter(|node| reachable.contains(node))
            .map(|node| self.graph[node])
            .collect()
    }

    pub fn ensure_acyclic(&self) -> Result<(), String> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => {
                let task_id = self.graph[cycle.node_id()];
                Err(format!("dependency cycle through task {task_id}"))
            }
        }
    }
}

/// Maximum end date over a task's direct prerequisites; `None` when it
/// has no dependencies. A dependent may start on the very day its last
/// prerequisite ends, but not before.
pub fn earliest_start(tasks: &BTreeMap<TaskId, Task>, task_id: TaskId) -> Option<NaiveDate> {
    let task = tasks.get(&task_id)?;
    task.depends_on
        .iter()
        .filter_map(|prerequisite| tasks.get(prerequisite))
        .map(|prerequisite| prerequisite.end_date)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowId;
    use crate::task::TaskCategory;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn chain() -> BTreeMap<TaskId, Task> {
        let mut tasks = BTreeMap::new();
        let t1 = Task::new(
            1,
            "T1",
            TaskCategory::EfficiencyAssay,
            RowId::Index(1),
            d(2025, 1, 10),
            d(2025, 1, 12),
        );
        let mut t2 = Task::new(
            2,
            "T2",
            TaskCategory::EfficiencyAssay,
            RowId::Index(1),
            d(2025, 1, 13),
            d(2025, 1, 15),
        );
        let mut t3 = Task::new(
            3,
            "T3",
            TaskCategory::EfficiencyAssay,
            RowId::Index(1),
            d(2025, 1, 16),
            d(2025, 1, 18),
        );
        t2.depends_on.push(1);
        t3.depends_on.push(2);
        tasks.insert(1, t1);
        tasks.insert(2, t2);
        tasks.insert(3, t3);
        tasks
    }

    #[test]
    fn cycle_probe_covers_transitive_paths() {
        let tasks = chain();
        let dag = DependencyDag::build(&tasks);
        assert!(dag.would_close_cycle(3, 1));
        assert!(dag.would_close_cycle(2, 2));
        assert!(!dag.would_close_cycle(1, 3));
    }

    #[test]
    fn transitive_dependents_in_topo_order() {
        let tasks = chain();
        let dag = DependencyDag::build(&tasks);
        assert_eq!(dag.transitive_dependents(1), vec![2, 3]);
        assert_eq!(dag.transitive_dependents(3), Vec::<TaskId>::new());
    }

    #[test]
    fn earliest_start_is_max_prerequisite_end() {
        let tasks = chain();
        assert_eq!(earliest_start(&tasks, 2), Some(d(2025, 1, 12)));
        assert_eq!(earliest_start(&tasks, 1), None);
    }
}
