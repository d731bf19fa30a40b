//! Graph builder — materializes the entity graph from providers.
//!
//! Without an explicit scope the whole provider content is enumerated
//! recursively; with one, each listed name is resolved individually and
//! ancestor namespaces are synthesized so the module tree stays
//! consistent.

use std::path::PathBuf;
use tracing::info;

use super::engine::EntityGraph;
use crate::error::{Error, Result};
use crate::idl::is_legacy_listener_instantiation;
use crate::provider::{EntityProvider, Manager};

/// An explicit include set read from a scope file.
#[derive(Debug, Clone)]
pub struct ScopeRequest {
    /// Where the names came from, for diagnostics.
    pub path: PathBuf,
    pub names: Vec<String>,
}

/// Build the entity graph from the providers behind `manager`.
pub fn build(manager: &Manager, scope: Option<&ScopeRequest>) -> Result<EntityGraph> {
    let mut graph = EntityGraph::new();
    match scope {
        Some(request) => {
            for name in &request.names {
                let decl = manager.find(name).ok_or_else(|| Error::UnknownEntity {
                    name: name.clone(),
                    origin: request.path.display().to_string(),
                })?;
                if decl.is_module() {
                    return Err(Error::ModuleInScope {
                        name: name.clone(),
                        path: request.path.clone(),
                    });
                }
                let relevant = initial_relevance(name, &decl);
                graph.insert(name, decl, relevant)?;
                if relevant {
                    graph.mark_namespace_relevant(name);
                }
            }
        }
        None => enumerate(&mut graph, manager, "")?,
    }
    info!(entities = graph.len(), scoped = scope.is_some(), "entity graph built");
    Ok(graph)
}

/// Recursively enumerate everything the provider exposes below
/// `namespace` (`""` for the root).
fn enumerate(graph: &mut EntityGraph, manager: &Manager, namespace: &str) -> Result<()> {
    let Some(members) = manager.module_members(namespace) else {
        return Ok(());
    };
    // The member list keeps cross-provider duplicates; a module shared by
    // several providers is descended once, while a duplicated leaf name
    // falls through to the duplicate-entity diagnostic on insert.
    let mut previous_module: Option<String> = None;
    for simple in members {
        let fqn = if namespace.is_empty() {
            simple
        } else {
            format!("{namespace}.{simple}")
        };
        let decl = manager.find(&fqn).ok_or_else(|| Error::UnknownEntity {
            name: fqn.clone(),
            origin: format!("enumeration of module `{namespace}`"),
        })?;
        if decl.is_module() {
            if previous_module.as_deref() == Some(fqn.as_str()) {
                continue;
            }
            previous_module = Some(fqn.clone());
            enumerate(graph, manager, &fqn)?;
        } else {
            let relevant = initial_relevance(&fqn, &decl);
            graph.insert(&fqn, decl, relevant)?;
            if relevant {
                graph.mark_namespace_relevant(&fqn);
            }
        }
    }
    Ok(())
}

/// Published, not an exception, and not a construct the output notations
/// cannot express. Exceptions stay in the graph for ordering but get no
/// generated bindings.
fn initial_relevance(fqn: &str, decl: &crate::idl::Declaration) -> bool {
    decl.published && !decl.is_exception() && !is_legacy_listener_instantiation(fqn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Registry;

    fn manager(json: &str) -> Manager {
        let mut manager = Manager::new();
        manager.add_provider(Box::new(Registry::from_json_str("test", json).unwrap()));
        manager
    }

    const BASIC: &str = r#"{"entities": {
        "api.draw.Shape": {"published": true, "kind": "plain_struct"},
        "api.draw.XDrawable": {"published": true, "kind": "interface"},
        "api.draw.Hidden": {"published": false, "kind": "plain_struct"},
        "api.draw.DrawError": {"published": true, "kind": "exception"}
    }}"#;

    #[test]
    fn test_full_enumeration() {
        let graph = build(&manager(BASIC), None).unwrap();
        assert_eq!(graph.len(), 4);
        assert!(graph.get("api.draw.Shape").unwrap().relevant);
        assert!(graph.get("api.draw.XDrawable").unwrap().relevant);
        // Unpublished and exception entities are present but irrelevant.
        assert!(!graph.get("api.draw.Hidden").unwrap().relevant);
        assert!(!graph.get("api.draw.DrawError").unwrap().relevant);
    }

    #[test]
    fn test_scoped_build() {
        let scope = ScopeRequest {
            path: PathBuf::from("scope.lst"),
            names: vec!["api.draw.Shape".to_string()],
        };
        let graph = build(&manager(BASIC), Some(&scope)).unwrap();
        assert_eq!(graph.len(), 1);
        assert!(graph.get("api.draw.Shape").unwrap().relevant);
        let api = graph.root().modules.get("api").unwrap();
        assert!(api.relevant);
        assert!(api.modules.get("draw").unwrap().members.contains("Shape"));
    }

    #[test]
    fn test_scope_entry_unknown() {
        let scope = ScopeRequest {
            path: PathBuf::from("scope.lst"),
            names: vec!["api.draw.Missing".to_string()],
        };
        let err = build(&manager(BASIC), Some(&scope)).unwrap_err();
        assert!(matches!(err, Error::UnknownEntity { name, .. } if name == "api.draw.Missing"));
    }

    #[test]
    fn test_scope_entry_naming_module() {
        let scope = ScopeRequest {
            path: PathBuf::from("scope.lst"),
            names: vec!["api.draw".to_string()],
        };
        let err = build(&manager(BASIC), Some(&scope)).unwrap_err();
        assert!(matches!(err, Error::ModuleInScope { name, .. } if name == "api.draw"));
    }

    #[test]
    fn test_duplicate_across_sources() {
        let mut m = Manager::new();
        m.add_provider(Box::new(Registry::from_json_str("a", BASIC).unwrap()));
        m.add_provider(Box::new(Registry::from_json_str("b", BASIC).unwrap()));
        let err = build(&m, None).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity { .. }));
    }
}
