//! Dependence graph views: topological ordering and cycle extraction.
//!
//! All traversals visit operations and edges in insertion order, so results are
//! deterministic for a given problem.

use std::collections::VecDeque;

use crate::problem::{Dependence, OperationId, Problem};

/// Adjacency lists over a subset of the dependences, indexed by operation.
pub struct DependenceGraph {
    /// Outgoing edges: (destination, latency of source).
    pub successors: Vec<Vec<(OperationId, u32)>>,
    /// Incoming edges: (source, latency of source).
    pub predecessors: Vec<Vec<(OperationId, u32)>>,
}

impl DependenceGraph {
    /// Build the graph from the dependences accepted by `keep`.
    ///
    /// The problem must be validated; dangling edges are skipped.
    pub fn build(problem: &Problem, keep: impl Fn(&Dependence) -> bool) -> Self {
        let n = problem.operations().len();
        let mut successors = vec![Vec::new(); n];
        let mut predecessors = vec![Vec::new(); n];

        for dep in problem.dependences().iter().filter(|d| keep(d)) {
            let (src, dst) = (dep.source.index(), dep.destination.index());
            if src >= n || dst >= n {
                continue;
            }
            let latency = problem.latency(dep.source);
            successors[src].push((dep.destination, latency));
            predecessors[dst].push((dep.source, latency));
        }

        Self {
            successors,
            predecessors,
        }
    }

    /// Graph of the same-iteration (distance 0) dependences.
    pub fn intra_iteration(problem: &Problem) -> Self {
        Self::build(problem, |d| !d.is_loop_carried())
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// Order operations so that every edge points forward, using Kahn's algorithm.
    ///
    /// Ready operations are taken in insertion order. On failure returns one
    /// cycle as a closed walk (first operation repeated at the end).
    pub fn topological_order(&self) -> Result<Vec<OperationId>, Vec<OperationId>> {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();

        let mut queue: VecDeque<OperationId> = (0..n)
            .filter(|&idx| in_degree[idx] == 0)
            .map(|idx| OperationId(idx as u32))
            .collect();

        let mut order: Vec<OperationId> = Vec::with_capacity(n);

        while let Some(op) = queue.pop_front() {
            order.push(op);
            for &(succ, _) in &self.successors[op.index()] {
                let degree = &mut in_degree[succ.index()];
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(succ);
                }
            }
        }

        if order.len() != n {
            let remaining: Vec<bool> = in_degree.iter().map(|&d| d > 0).collect();
            return Err(self.extract_cycle(&remaining));
        }

        Ok(order)
    }

    /// Walk predecessors inside `remaining` until an operation repeats.
    ///
    /// After Kahn's algorithm stalls, every remaining operation has a remaining
    /// predecessor, so the walk always closes.
    fn extract_cycle(&self, remaining: &[bool]) -> Vec<OperationId> {
        let Some(start) = remaining.iter().position(|&r| r) else {
            return Vec::new();
        };

        let mut position: Vec<Option<usize>> = vec![None; self.len()];
        let mut walk: Vec<OperationId> = Vec::new();
        let mut current = start;

        loop {
            if let Some(pos) = position[current] {
                // walk[pos..] follows predecessor edges; reverse into dependence order
                let mut cycle: Vec<OperationId> = walk[pos..].iter().rev().copied().collect();
                cycle.push(cycle[0]);
                return cycle;
            }
            position[current] = Some(walk.len());
            walk.push(OperationId(current as u32));

            match self.predecessors[current]
                .iter()
                .find(|(pred, _)| remaining[pred.index()])
            {
                Some(&(pred, _)) => current = pred.index(),
                None => return Vec::new(),
            }
        }
    }

    /// Find a cycle on which at least one edge has a positive latency.
    ///
    /// Edges are tried in insertion order; for each candidate edge `u -> v` the
    /// shortest path `v ~> u` closes the cycle. Returns a closed walk.
    pub fn find_positive_latency_cycle(&self) -> Option<Vec<OperationId>> {
        for src in 0..self.len() {
            for &(dst, latency) in &self.successors[src] {
                if latency == 0 {
                    continue;
                }
                if let Some(path) = self.shortest_path(dst, OperationId(src as u32)) {
                    let mut cycle = Vec::with_capacity(path.len() + 1);
                    cycle.push(OperationId(src as u32));
                    cycle.extend(path);
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// Breadth-first path from `from` to `to`, both included.
    fn shortest_path(&self, from: OperationId, to: OperationId) -> Option<Vec<OperationId>> {
        let mut parent: Vec<Option<OperationId>> = vec![None; self.len()];
        let mut visited = vec![false; self.len()];
        let mut queue = VecDeque::from([from]);
        visited[from.index()] = true;

        while let Some(op) = queue.pop_front() {
            if op == to {
                let mut path = vec![op];
                let mut current = op;
                while let Some(prev) = parent[current.index()] {
                    path.push(prev);
                    current = prev;
                }
                path.reverse();
                return Some(path);
            }
            for &(succ, _) in &self.successors[op.index()] {
                if !visited[succ.index()] {
                    visited[succ.index()] = true;
                    parent[succ.index()] = Some(op);
                    queue.push_back(succ);
                }
            }
        }
        None
    }
}

/// Render a cycle as operation names for diagnostics.
pub fn cycle_names(problem: &Problem, cycle: &[OperationId]) -> Vec<String> {
    cycle.iter().map(|&op| problem.operation_name(op)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_problem(latencies: &[u32], edges: &[(u32, u32, u32)]) -> Problem {
        let mut problem = Problem::new();
        for (idx, &latency) in latencies.iter().enumerate() {
            let opr = problem.add_operator_type(&format!("t{}", idx), latency, None);
            problem.add_operation(&format!("op{}", idx), opr);
        }
        for &(src, dst, distance) in edges {
            problem.add_dependence(OperationId(src), OperationId(dst), Some(distance));
        }
        problem
    }

    #[test]
    fn test_topological_order_respects_edges() {
        // 2 -> 0 -> 1
        let problem = make_problem(&[1, 1, 1], &[(2, 0, 0), (0, 1, 0)]);
        let order = DependenceGraph::intra_iteration(&problem)
            .topological_order()
            .unwrap();
        assert_eq!(order, vec![OperationId(2), OperationId(0), OperationId(1)]);
    }

    #[test]
    fn test_independent_operations_keep_insertion_order() {
        let problem = make_problem(&[1, 1, 1], &[]);
        let order = DependenceGraph::intra_iteration(&problem)
            .topological_order()
            .unwrap();
        assert_eq!(order, vec![OperationId(0), OperationId(1), OperationId(2)]);
    }

    #[test]
    fn test_cycle_is_reported_in_dependence_order() {
        // 0 -> 1 -> 2 -> 1, plus a tail 2 -> 3
        let problem = make_problem(&[1, 1, 1, 1], &[(0, 1, 0), (1, 2, 0), (2, 1, 0), (2, 3, 0)]);
        let cycle = DependenceGraph::intra_iteration(&problem)
            .topological_order()
            .unwrap_err();

        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 3);
        for pair in cycle.windows(2) {
            assert!(problem
                .dependences()
                .iter()
                .any(|d| d.source == pair[0] && d.destination == pair[1]));
        }
    }

    #[test]
    fn test_loop_carried_edges_are_excluded() {
        let problem = make_problem(&[1, 1], &[(0, 1, 0), (1, 0, 1)]);
        assert!(DependenceGraph::intra_iteration(&problem)
            .topological_order()
            .is_ok());
    }

    #[test]
    fn test_positive_latency_cycle() {
        let zero = make_problem(&[0, 0], &[(0, 1, 0), (1, 0, 0)]);
        assert!(DependenceGraph::intra_iteration(&zero)
            .find_positive_latency_cycle()
            .is_none());

        let positive = make_problem(&[0, 3], &[(0, 1, 0), (1, 0, 0)]);
        let cycle = DependenceGraph::intra_iteration(&positive)
            .find_positive_latency_cycle()
            .unwrap();
        assert_eq!(cycle, vec![OperationId(1), OperationId(0), OperationId(1)]);
        assert_eq!(cycle_names(&positive, &cycle), vec!["op1", "op0", "op1"]);
    }
}
