//! Dependency resolution: ordering systems into stages.
//!
//! Resolution runs in rounds. The first stage holds every system without
//! dependencies; each following stage holds the systems whose dependencies
//! were all placed in earlier stages. Within a stage, systems keep their
//! registration order. Systems left over once a round adds nothing depend
//! on a missing system or sit on a cycle.

use std::any::TypeId;
use std::fmt;

use crate::system::Dependencies;

/// A system as seen by the resolver.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    /// The system name.
    pub name: &'static str,
    /// The system's concrete type.
    pub type_id: TypeId,
    /// Systems that must come first.
    pub dependencies: Dependencies,
}

/// A group of systems whose dependencies were all resolved by earlier stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Indices into the resolver's input.
    pub system_indices: Vec<usize>,
}

/// A system whose dependencies could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// The system name.
    pub name: &'static str,
    /// Dependencies that never resolved.
    pub outstanding: Vec<&'static str>,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.outstanding.join(", "))
    }
}

/// Computes the resolution stages for `nodes`.
///
/// # Errors
///
/// Returns every unresolved system, in registration order, if any remain.
pub fn resolve_stages(nodes: &[DependencyNode]) -> Result<Vec<Stage>, Vec<Unresolved>> {
    let mut resolved = vec![false; nodes.len()];
    let mut stages: Vec<Stage> = Vec::new();

    let mut next: Vec<usize> = (0..nodes.len())
        .filter(|&index| nodes[index].dependencies.is_empty())
        .collect();

    while !next.is_empty() {
        for &index in &next {
            resolved[index] = true;
        }
        stages.push(Stage {
            system_indices: next,
        });

        next = (0..nodes.len())
            .filter(|&index| {
                !resolved[index]
                    && nodes[index]
                        .dependencies
                        .iter()
                        .all(|dependency| is_resolved(nodes, &resolved, dependency.type_id()))
            })
            .collect();
    }

    let unresolved: Vec<Unresolved> = (0..nodes.len())
        .filter(|&index| !resolved[index])
        .map(|index| Unresolved {
            name: nodes[index].name,
            outstanding: nodes[index]
                .dependencies
                .iter()
                .filter(|dependency| !is_resolved(nodes, &resolved, dependency.type_id()))
                .map(|dependency| dependency.name())
                .collect(),
        })
        .collect();

    if unresolved.is_empty() {
        Ok(stages)
    } else {
        Err(unresolved)
    }
}

fn is_resolved(nodes: &[DependencyNode], resolved: &[bool], type_id: TypeId) -> bool {
    nodes
        .iter()
        .zip(resolved)
        .any(|(node, &done)| done && node.type_id == type_id)
}

/// Flattens stages into the execution order.
#[must_use]
pub fn execution_order(stages: &[Stage]) -> Vec<usize> {
    stages
        .iter()
        .flat_map(|stage| stage.system_indices.iter().copied())
        .collect()
}
