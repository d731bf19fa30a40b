//! The entity graph — the structural backbone of the generator.
//!
//! Built once per run from the providers, then transformed in place by
//! the dependency, relevance, and ordering passes. No pass holds hidden
//! state across runs.

pub mod builder;
pub mod deps;
pub mod engine;
pub mod sort;
pub mod types;

pub use builder::{build, ScopeRequest};
pub use engine::EntityGraph;
pub use types::{EntityNode, GraphStats, ModuleNode, SortState, WriteState};
