//! Processing order for handlers with declared dependencies.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::RegistrationError;

/// A resolved, deterministic processing order.
///
/// Every handler comes after all of its dependencies. Among handlers whose
/// dependencies are satisfied, registration order wins, so the same
/// registrations always produce the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    order: Vec<&'static str>,
}

impl DependencyGraph {
    /// Resolves the order for `(name, deps)` registrations.
    ///
    /// Duplicate names, dependencies on unregistered handlers and cycles are
    /// configuration errors and are rejected here rather than surfacing
    /// while events are processed.
    pub fn new<I>(registrations: I) -> Result<Self, RegistrationError>
    where
        I: IntoIterator<Item = (&'static str, &'static [&'static str])>,
    {
        let registrations: Vec<_> = registrations.into_iter().collect();

        let mut index = HashMap::with_capacity(registrations.len());
        for (i, (name, _)) in registrations.iter().enumerate() {
            if index.insert(*name, i).is_some() {
                return Err(RegistrationError::DuplicateHandler(*name));
            }
        }

        let mut indegree = vec![0usize; registrations.len()];
        let mut dependents = vec![HashSet::new(); registrations.len()];
        for (i, (name, deps)) in registrations.iter().enumerate() {
            for dep in deps.iter() {
                let &d = index
                    .get(dep)
                    .ok_or(RegistrationError::UnknownDependency {
                        handler: *name,
                        dependency: *dep,
                    })?;
                if dependents[d].insert(i) {
                    indegree[i] += 1;
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..registrations.len())
            .filter(|&i| indegree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(registrations.len());
        while let Some(i) = ready.pop_first() {
            order.push(registrations[i].0);
            for &dependent in &dependents[i] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != registrations.len() {
            let cycle = registrations
                .iter()
                .enumerate()
                .filter(|(i, _)| indegree[*i] > 0)
                .map(|(_, (name, _))| *name)
                .collect();
            return Err(RegistrationError::DependencyCycle(cycle));
        }

        Ok(DependencyGraph { order })
    }

    pub fn order(&self) -> &[&'static str] {
        &self.order
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| *n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn reg(
        name: &'static str,
        deps: &'static [&'static str],
    ) -> (&'static str, &'static [&'static str]) {
        (name, deps)
    }

    #[test]
    fn test_dependencies_come_first() {
        let graph = DependencyGraph::new([
            reg("PageLoadMetrics", &["Meta", "Renderer"]),
            reg("Renderer", &["Meta"]),
            reg("Meta", &[]),
        ])
        .unwrap();
        assert_eq!(graph.order(), &["Meta", "Renderer", "PageLoadMetrics"]);
    }

    #[test]
    fn test_ties_follow_registration_order() {
        let graph = DependencyGraph::new([reg("B", &[]), reg("A", &[]), reg("C", &["A"])]).unwrap();
        assert_eq!(graph.order(), &["B", "A", "C"]);
        assert_eq!(graph.position("C"), Some(2));
        assert_eq!(graph.position("missing"), None);
    }

    #[test]
    fn test_repeated_dependency_counts_once() {
        let graph = DependencyGraph::new([reg("A", &[]), reg("B", &["A", "A"])]).unwrap();
        assert_eq!(graph.order(), &["A", "B"]);
    }

    #[test]
    fn test_cycle_rejected() {
        let err = DependencyGraph::new([reg("Meta", &[]), reg("A", &["B"]), reg("B", &["A"])])
            .unwrap_err();
        assert_eq!(err, RegistrationError::DependencyCycle(vec!["A", "B"]));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let err = DependencyGraph::new([reg("A", &["A"])]).unwrap_err();
        assert_matches!(err, RegistrationError::DependencyCycle(names) if names == vec!["A"]);
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let err = DependencyGraph::new([reg("PageLoadMetrics", &["Meta"])]).unwrap_err();
        assert_matches!(
            err,
            RegistrationError::UnknownDependency {
                handler: "PageLoadMetrics",
                dependency: "Meta"
            }
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = DependencyGraph::new([reg("Meta", &[]), reg("Meta", &[])]).unwrap_err();
        assert_matches!(err, RegistrationError::DuplicateHandler("Meta"));
    }
}
