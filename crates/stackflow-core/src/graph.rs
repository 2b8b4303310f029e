//! Stack dependency graph
//!
//! Builds a DAG over the manifest's stack descriptors and produces a
//! stable topological ordering: ties are broken by manifest order, so the
//! same manifest always deploys in the same sequence.

use crate::error::{CoreError, Result};
use crate::model::StackDescriptor;
use std::collections::{BTreeSet, HashMap};

/// Dependency graph over a set of stack descriptors
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Stack names in manifest order
    names: Vec<String>,
    /// deps[i] = indices stack i depends on
    deps: Vec<Vec<usize>>,
    /// dependents[i] = indices that depend on stack i
    dependents: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build the graph, failing on unresolved dependency names.
    ///
    /// Cycle detection happens in [`ordering`](Self::ordering); callers
    /// that need fail-fast validation should call it before touching any
    /// backend.
    pub fn build(stacks: &[StackDescriptor]) -> Result<Self> {
        let names: Vec<String> = stacks.iter().map(|s| s.name.clone()).collect();
        let index: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let mut deps = vec![Vec::new(); stacks.len()];
        let mut dependents = vec![Vec::new(); stacks.len()];

        for (i, stack) in stacks.iter().enumerate() {
            for dep in &stack.depends_on {
                let Some(&j) = index.get(dep.as_str()) else {
                    return Err(CoreError::UnknownDependency {
                        stack: stack.name.clone(),
                        dependency: dep.clone(),
                    });
                };
                if !deps[i].contains(&j) {
                    deps[i].push(j);
                    dependents[j].push(i);
                }
            }
        }

        Ok(Self {
            names,
            deps,
            dependents,
        })
    }

    /// Stable topological ordering (Kahn's algorithm, manifest-order ready
    /// queue). Fails with [`CoreError::DependencyCycle`] if the graph is
    /// not a DAG.
    pub fn ordering(&self) -> Result<Vec<String>> {
        let mut indegree: Vec<usize> = self.deps.iter().map(|d| d.len()).collect();
        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| i)
            .collect();

        let mut order = Vec::with_capacity(self.names.len());
        while let Some(&i) = ready.first() {
            ready.remove(&i);
            order.push(self.names[i].clone());
            for &j in &self.dependents[i] {
                indegree[j] -= 1;
                if indegree[j] == 0 {
                    ready.insert(j);
                }
            }
        }

        if order.len() != self.names.len() {
            let stuck: Vec<&str> = indegree
                .iter()
                .enumerate()
                .filter(|&(_, &d)| d > 0)
                .map(|(i, _)| self.names[i].as_str())
                .collect();
            return Err(CoreError::DependencyCycle(stuck.join(", ")));
        }

        Ok(order)
    }

    /// Reverse topological ordering, used for teardown
    pub fn reverse_ordering(&self) -> Result<Vec<String>> {
        let mut order = self.ordering()?;
        order.reverse();
        Ok(order)
    }

    /// Direct dependencies of a stack, by name
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.index_of(name)
            .map(|i| self.deps[i].iter().map(|&j| self.names[j].as_str()).collect())
            .unwrap_or_default()
    }

    /// Direct dependents of a stack, by name
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        self.index_of(name)
            .map(|i| {
                self.dependents[i]
                    .iter()
                    .map(|&j| self.names[j].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(name: &str, deps: &[&str]) -> StackDescriptor {
        let mut s = StackDescriptor::new(name, format!("t/{name}.yaml"));
        for d in deps {
            s = s.with_dependency(*d);
        }
        s
    }

    #[test]
    fn test_ordering_respects_dependencies() {
        let stacks = vec![
            stack("nodegroup", &["cluster"]),
            stack("vpc", &[]),
            stack("cluster", &["vpc"]),
        ];
        let graph = DependencyGraph::build(&stacks).unwrap();
        let order = graph.ordering().unwrap();

        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("vpc") < pos("cluster"));
        assert!(pos("cluster") < pos("nodegroup"));
    }

    #[test]
    fn test_ordering_is_stable_on_ties() {
        // No dependencies at all: manifest order must be preserved
        let stacks = vec![stack("c", &[]), stack("a", &[]), stack("b", &[])];
        let graph = DependencyGraph::build(&stacks).unwrap();
        assert_eq!(graph.ordering().unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_reverse_ordering() {
        let stacks = vec![
            stack("vpc", &[]),
            stack("cluster", &["vpc"]),
            stack("nodegroup", &["cluster"]),
        ];
        let graph = DependencyGraph::build(&stacks).unwrap();
        assert_eq!(
            graph.reverse_ordering().unwrap(),
            vec!["nodegroup", "cluster", "vpc"]
        );
    }

    #[test]
    fn test_cycle_detected() {
        let stacks = vec![stack("a", &["b"]), stack("b", &["a"])];
        let graph = DependencyGraph::build(&stacks).unwrap();
        assert!(matches!(
            graph.ordering(),
            Err(CoreError::DependencyCycle(_))
        ));
    }

    #[test]
    fn test_self_cycle_detected() {
        let stacks = vec![stack("a", &["a"])];
        let graph = DependencyGraph::build(&stacks).unwrap();
        assert!(graph.ordering().is_err());
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let stacks = vec![stack("cluster", &["vpc"])];
        let result = DependencyGraph::build(&stacks);
        assert!(matches!(
            result,
            Err(CoreError::UnknownDependency { stack, dependency })
                if stack == "cluster" && dependency == "vpc"
        ));
    }

    #[test]
    fn test_dependents_of() {
        let stacks = vec![
            stack("vpc", &[]),
            stack("cluster", &["vpc"]),
            stack("ingress", &["cluster"]),
            stack("nodegroup", &["cluster"]),
        ];
        let graph = DependencyGraph::build(&stacks).unwrap();
        assert_eq!(graph.dependents_of("cluster"), vec!["ingress", "nodegroup"]);
        assert_eq!(graph.dependencies_of("cluster"), vec!["vpc"]);
        assert!(graph.dependents_of("ingress").is_empty());
    }

    #[test]
    fn test_duplicate_depends_on_deduplicated() {
        let stacks = vec![stack("vpc", &[]), stack("cluster", &["vpc", "vpc"])];
        let graph = DependencyGraph::build(&stacks).unwrap();
        assert_eq!(graph.dependencies_of("cluster"), vec!["vpc"]);
        assert_eq!(graph.ordering().unwrap(), vec!["vpc", "cluster"]);
    }
}
