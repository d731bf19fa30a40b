//! The entity graph arena.
//!
//! Owns every entity node in a flat map keyed by fully-qualified name,
//! plus the nested module tree. All cross-references between entities
//! are FQN-keyed lookups into the arena; nothing holds a pointer to
//! another node.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::types::{EntityNode, GraphStats, ModuleNode};
use crate::error::{Error, Result};
use crate::idl::{DeclBody, Declaration};

/// The dependency graph over one provider snapshot.
#[derive(Debug, Default)]
pub struct EntityGraph {
    entities: BTreeMap<String, EntityNode>,
    root: ModuleNode,
}

impl EntityGraph {
    pub fn new() -> Self {
        EntityGraph::default()
    }

    // ─── Node Operations ────────────────────────────────────────

    /// Insert a non-module entity. Inserting the same name twice is a
    /// fatal error.
    pub fn insert(&mut self, fqn: &str, decl: Arc<Declaration>, relevant: bool) -> Result<()> {
        if self.entities.contains_key(fqn) {
            return Err(Error::DuplicateEntity {
                name: fqn.to_string(),
            });
        }
        self.entities
            .insert(fqn.to_string(), EntityNode::new(fqn.to_string(), decl, relevant));
        self.record_member(fqn);
        Ok(())
    }

    pub fn get(&self, fqn: &str) -> Option<&EntityNode> {
        self.entities.get(fqn)
    }

    pub fn get_mut(&mut self, fqn: &str) -> Option<&mut EntityNode> {
        self.entities.get_mut(fqn)
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.entities.contains_key(fqn)
    }

    /// All entity names in deterministic (lexicographic) order.
    pub fn names(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntityNode)> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    // ─── Module Tree ────────────────────────────────────────────

    pub fn root(&self) -> &ModuleNode {
        &self.root
    }

    /// Split borrow: entity map and module tree at once, for passes that
    /// walk the tree while consulting the arena.
    pub fn split_mut(&mut self) -> (&BTreeMap<String, EntityNode>, &mut ModuleNode) {
        (&self.entities, &mut self.root)
    }

    /// Record `fqn` as a member of its parent namespace, creating module
    /// nodes along the way without touching their relevance.
    ///
    /// Instantiated polymorphic-struct names are not module members and
    /// are left out of the tree.
    pub fn record_member(&mut self, fqn: &str) {
        if fqn.contains('<') {
            return;
        }
        let mut node = &mut self.root;
        let mut segments = fqn.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                node.members.insert(segment.to_string());
            } else {
                node = node.modules.entry(segment.to_string()).or_default();
            }
        }
    }

    /// Record `fqn` as a member and mark every ancestor namespace
    /// relevant. Called for every dependency target and for each entity
    /// that starts out relevant, so the index pass later knows which
    /// namespaces still matter.
    pub fn mark_namespace_relevant(&mut self, fqn: &str) {
        if fqn.contains('<') {
            return;
        }
        let mut node = &mut self.root;
        let mut segments = fqn.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                node.members.insert(segment.to_string());
            } else {
                node = node.modules.entry(segment.to_string()).or_default();
                node.relevant = true;
            }
        }
    }

    // ─── Queries ────────────────────────────────────────────────

    /// Follow typedef aliases to the underlying type reference. Bounded
    /// by the arena size, so an aliasing loop cannot hang the pass.
    pub fn resolve_typedef<'a>(&'a self, reference: &'a str) -> &'a str {
        let mut current = reference;
        for _ in 0..self.entities.len() {
            match self.entities.get(current) {
                Some(node) => match &node.decl.body {
                    DeclBody::Typedef(body) => current = &body.ty,
                    _ => return current,
                },
                None => return current,
            }
        }
        current
    }

    pub fn stats(&self) -> GraphStats {
        let stats = GraphStats {
            entities: self.entities.len(),
            interfaces: self
                .entities
                .values()
                .filter(|n| n.decl.is_interface())
                .count(),
            relevant: self.entities.values().filter(|n| n.relevant).count(),
        };
        debug!(%stats, "graph stats");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::{DeclBody, TypedefBody};

    fn plain_struct() -> Arc<Declaration> {
        Arc::new(Declaration {
            published: true,
            doc: None,
            body: DeclBody::PlainStruct(crate::idl::StructBody {
                base: None,
                members: vec![],
            }),
        })
    }

    fn typedef(target: &str) -> Arc<Declaration> {
        Arc::new(Declaration {
            published: true,
            doc: None,
            body: DeclBody::Typedef(TypedefBody {
                ty: target.to_string(),
            }),
        })
    }

    #[test]
    fn test_duplicate_insert_is_fatal() {
        let mut graph = EntityGraph::new();
        graph.insert("api.draw.Shape", plain_struct(), true).unwrap();
        let err = graph.insert("api.draw.Shape", plain_struct(), true).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity { name } if name == "api.draw.Shape"));
    }

    #[test]
    fn test_member_recording_builds_tree() {
        let mut graph = EntityGraph::new();
        graph.insert("api.draw.Shape", plain_struct(), false).unwrap();
        let api = graph.root().modules.get("api").unwrap();
        let draw = api.modules.get("draw").unwrap();
        assert!(draw.members.contains("Shape"));
        assert!(!api.relevant);
    }

    #[test]
    fn test_namespace_relevance_marking() {
        let mut graph = EntityGraph::new();
        graph.insert("api.draw.Shape", plain_struct(), true).unwrap();
        graph.mark_namespace_relevant("api.draw.Shape");
        let api = graph.root().modules.get("api").unwrap();
        assert!(api.relevant);
        assert!(api.modules.get("draw").unwrap().relevant);
    }

    #[test]
    fn test_resolve_typedef_chain() {
        let mut graph = EntityGraph::new();
        graph
            .insert("api.text.Range", typedef("api.text.Span"), true)
            .unwrap();
        graph
            .insert("api.text.Span", typedef("[]long"), true)
            .unwrap();
        assert_eq!(graph.resolve_typedef("api.text.Range"), "[]long");
    }

    #[test]
    fn test_resolve_typedef_tolerates_cycles() {
        let mut graph = EntityGraph::new();
        graph
            .insert("api.a.A", typedef("api.b.B"), true)
            .unwrap();
        graph
            .insert("api.b.B", typedef("api.a.A"), true)
            .unwrap();
        // Terminates; lands on one of the aliases.
        let resolved = graph.resolve_typedef("api.a.A");
        assert!(resolved == "api.a.A" || resolved == "api.b.B");
    }
}
