//! Dependency resolution against the local package store
//!
//! Resolution only reads: neither the descriptor nor the store is modified.
//! Problems found along the way (a dependency with no installed version, a
//! missing or corrupt `project.json`) are recorded on the affected node
//! instead of aborting the walk.

use crate::coordinate::ProjectCoordinate;
use crate::manifest::ProjectDescriptor;
use crate::store::PackageStore;
use crate::PackageError;
use std::collections::HashSet;
use tracing::{debug, warn};

/// One dependency in a resolved dependency tree
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyNode {
    /// The dependency, pinned to a version when one could be resolved
    pub coordinate: ProjectCoordinate,
    /// Why this branch could not be expanded, if it couldn't
    pub issue: Option<String>,
    /// Dependencies of this dependency
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    fn leaf(coordinate: ProjectCoordinate, issue: Option<String>) -> Self {
        Self {
            coordinate,
            issue,
            children: Vec::new(),
        }
    }

    /// Depth-first rows of `(depth, node)`, starting at depth 0 for this node
    pub fn flatten(&self) -> Vec<(usize, &DependencyNode)> {
        let mut rows = Vec::new();
        self.flatten_into(0, &mut rows);
        rows
    }

    fn flatten_into<'a>(&'a self, depth: usize, rows: &mut Vec<(usize, &'a DependencyNode)>) {
        rows.push((depth, self));
        for child in &self.children {
            child.flatten_into(depth + 1, rows);
        }
    }
}

/// A problem attached to one dependency during resolution
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyIssue {
    pub coordinate: ProjectCoordinate,
    pub message: String,
}

/// The transitive dependencies of a project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyClosure {
    /// Resolved coordinates, de-duplicated, in first-seen depth-first order
    pub coordinates: Vec<ProjectCoordinate>,
    /// Problems found while walking the graph
    pub issues: Vec<DependencyIssue>,
}

impl DependencyClosure {
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/// Resolves a project's dependencies against a package store
pub struct DependencyResolver<'a> {
    store: &'a PackageStore,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(store: &'a PackageStore) -> Self {
        Self { store }
    }

    /// The declared dependencies, in declaration order with duplicates kept.
    /// Nothing is looked up in the store.
    pub fn resolve_direct(&self, descriptor: &ProjectDescriptor) -> Vec<ProjectCoordinate> {
        descriptor.dependencies.clone()
    }

    /// Expand every declared dependency recursively.
    ///
    /// A coordinate that appears again on its own branch is reported as a
    /// cycle and not expanded further.
    pub fn resolve_tree(&self, descriptor: &ProjectDescriptor) -> Vec<DependencyNode> {
        let mut ancestors = Vec::new();
        if let Some(root) = descriptor.coordinate() {
            ancestors.push(root);
        }

        descriptor
            .dependencies
            .iter()
            .map(|dependency| self.expand(dependency, &mut ancestors))
            .collect()
    }

    /// Every resolved dependency reachable from the descriptor
    pub fn resolve_closure(&self, descriptor: &ProjectDescriptor) -> DependencyClosure {
        let mut closure = DependencyClosure::default();
        let mut seen = HashSet::new();

        for root in self.resolve_tree(descriptor) {
            for (_, node) in root.flatten() {
                if let Some(message) = &node.issue {
                    closure.issues.push(DependencyIssue {
                        coordinate: node.coordinate.clone(),
                        message: message.clone(),
                    });
                }
                if node.coordinate.version().is_some() && seen.insert(node.coordinate.clone()) {
                    closure.coordinates.push(node.coordinate.clone());
                }
            }
        }

        closure
    }

    fn expand(
        &self,
        dependency: &ProjectCoordinate,
        ancestors: &mut Vec<ProjectCoordinate>,
    ) -> DependencyNode {
        let coordinate = match self.store.resolve_version(dependency) {
            Ok(coordinate) => coordinate,
            Err(e) => return DependencyNode::leaf(dependency.clone(), Some(e.to_string())),
        };

        if ancestors.contains(&coordinate) {
            let chain = ancestors
                .iter()
                .chain(std::iter::once(&coordinate))
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            warn!(dependency = %coordinate, "dependency cycle detected");
            return DependencyNode::leaf(
                coordinate,
                Some(format!("Dependency cycle detected: {}", chain)),
            );
        }

        let descriptor = match self.store.load_descriptor(&coordinate) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                let message = match &e {
                    PackageError::DescriptorNotFound(path) => format!(
                        "Could not find project.json file for {} at {}",
                        coordinate,
                        path.display()
                    ),
                    _ => e.to_string(),
                };
                warn!(dependency = %coordinate, error = %e, "cannot read dependency descriptor");
                return DependencyNode::leaf(coordinate, Some(message));
            }
        };

        debug!(
            dependency = %coordinate,
            count = descriptor.dependencies.len(),
            "expanding dependency"
        );

        ancestors.push(coordinate.clone());
        let children = descriptor
            .dependencies
            .iter()
            .map(|child| self.expand(child, ancestors))
            .collect();
        ancestors.pop();

        DependencyNode {
            coordinate,
            issue: None,
            children,
        }
    }
}
