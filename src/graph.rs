//! Dependency graph module.
//!
//! Provides the `ActionGraph` type, which records which action definitions
//! reference which. The definition loader uses it to reject reference
//! cycles and to build referenced actions before the actions that embed
//! them.

use crate::error::CombatError;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// A directed graph of action references.
///
/// An edge `a -> b` means action `a` embeds action `b`, so `b` must be
/// built first.
///
/// # Examples
///
/// ```rust
/// use zzcombat::graph::ActionGraph;
///
/// let mut graph = ActionGraph::new();
/// graph.add_dependency("flurry", "jab");
/// graph.add_dependency("flurry", "kick");
/// graph.add_dependency("kick", "jab");
///
/// let order = graph.build_order().unwrap();
/// assert_eq!(order, ["jab", "kick", "flurry"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it doesn't exist and return its index.
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.node_map.insert(id.to_string(), idx);
        idx
    }

    /// Record that `dependent` embeds `dependency`.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) {
        let from = self.add_node(dependent);
        let to = self.add_node(dependency);
        self.graph.update_edge(from, to, ());
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    /// Direct dependencies of `id`, sorted.
    pub fn dependencies_of(&self, id: &str) -> Vec<String> {
        let Some(&idx) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        deps.sort();
        deps
    }

    pub fn nodes(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    /// Find a reference cycle.
    ///
    /// Returns `Err(CombatError::Cycle)` with the closed cycle path, for
    /// example `["a", "b", "a"]`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzcombat::graph::ActionGraph;
    /// use zzcombat::CombatError;
    ///
    /// let mut graph = ActionGraph::new();
    /// graph.add_dependency("a", "b");
    /// assert!(graph.detect_cycles().is_ok());
    ///
    /// graph.add_dependency("b", "a");
    /// let err = graph.detect_cycles().unwrap_err();
    /// assert_eq!(err, CombatError::Cycle { path: vec!["a".into(), "b".into(), "a".into()] });
    /// ```
    pub fn detect_cycles(&self) -> Result<(), CombatError> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();

        for node in self.graph.node_indices() {
            if visited.contains(&node) {
                continue;
            }
            let mut path = Vec::new();
            if let Some(cycle) = self.find_cycle(node, &mut visited, &mut on_stack, &mut path) {
                return Err(CombatError::Cycle { path: cycle });
            }
        }
        Ok(())
    }

    fn find_cycle(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        on_stack.insert(node);
        path.push(node);

        for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if !visited.contains(&next) {
                if let Some(cycle) = self.find_cycle(next, visited, on_stack, path) {
                    return Some(cycle);
                }
            } else if on_stack.contains(&next) {
                let start = path.iter().position(|n| *n == next).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|n| self.graph[*n].clone()).collect();
                cycle.push(self.graph[next].clone());
                return Some(cycle);
            }
        }

        on_stack.remove(&node);
        path.pop();
        None
    }

    /// Order in which actions can be built: every action after all the
    /// actions it embeds.
    pub fn build_order(&self) -> Result<Vec<String>, CombatError> {
        self.detect_cycles()?;

        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .into_iter()
                .rev()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => Err(CombatError::Cycle {
                path: vec![self.graph[cycle.node_id()].clone()],
            }),
        }
    }
}
