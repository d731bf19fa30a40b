//! Core types for the entity graph.
//!
//! A node per non-module entity, a nested tree node per namespace, and
//! the state machines the later passes drive.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::idl::{Declaration, EntityKind};

/// DFS coloring for the topological sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortState {
    #[default]
    Unvisited,
    /// On the DFS stack; meeting this again means a definition-order cycle.
    Active,
    Done,
}

/// Emission progress of one entity within a single backend run.
///
/// Kept in a per-run side table rather than on the node, so independent
/// backends never observe each other's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteState {
    #[default]
    NotWritten,
    /// A forward declaration has been emitted.
    Declared,
    Defined,
}

/// A non-module entity in the graph.
#[derive(Debug, Clone)]
pub struct EntityNode {
    pub fqn: String,
    pub decl: Arc<Declaration>,
    /// Reachable from the requested scope; monotonic, never revoked.
    pub relevant: bool,
    pub sort_state: SortState,
    /// Targets that must be fully defined before this entity.
    pub dependencies: BTreeSet<String>,
    /// Interface targets for which a forward declaration suffices.
    pub interface_dependencies: BTreeSet<String>,
    /// Interfaces offered through capability casts.
    pub adjacent_interfaces: BTreeSet<String>,
}

impl EntityNode {
    pub fn new(fqn: String, decl: Arc<Declaration>, relevant: bool) -> Self {
        EntityNode {
            fqn,
            decl,
            relevant,
            sort_state: SortState::Unvisited,
            dependencies: BTreeSet::new(),
            interface_dependencies: BTreeSet::new(),
            adjacent_interfaces: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.decl.kind()
    }
}

/// A namespace node in the module tree.
///
/// Purely organizational: modules are never code-generation targets
/// themselves, but per-module index files are derived from this tree.
#[derive(Debug, Clone, Default)]
pub struct ModuleNode {
    pub modules: BTreeMap<String, ModuleNode>,
    /// Simple names of non-module children.
    pub members: BTreeSet<String>,
    /// Whether anything below this namespace is needed. Cleared again
    /// during index pruning when nothing relevant remains.
    pub relevant: bool,
}

/// Summary counters, logged after graph construction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStats {
    pub entities: usize,
    pub interfaces: usize,
    pub relevant: usize,
}

impl fmt::Display for GraphStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entities ({} interfaces, {} relevant)",
            self.entities, self.interfaces, self.relevant
        )
    }
}
