//! Relevance propagation and topological ordering.
//!
//! A DFS over definition-order dependencies that yields a sequence in
//! which every dependency precedes its dependent. Relevance spreads
//! lazily along the same traversal: visiting a relevant entity makes
//! its definition-order targets relevant too. Forward-declarable
//! interface references impose no ordering constraint, which is what
//! keeps legitimately circular interface graphs sortable.

use tracing::{debug, info};

use super::engine::EntityGraph;
use super::types::SortState;
use crate::error::{Error, Result};
use crate::idl::is_legacy_listener_instantiation;

/// Sort the whole graph. Returns the FQN sequence in emission order.
pub fn sort(graph: &mut EntityGraph) -> Result<Vec<String>> {
    let mut sequence = Vec::with_capacity(graph.len());
    for fqn in graph.names() {
        visit(graph, &fqn, &mut sequence)?;
    }
    info!(entities = sequence.len(), "topological sort finished");
    Ok(sequence)
}

/// Mark `fqn` and everything reachable through its definition-order
/// dependencies relevant. Forward-declarable targets are left alone: a
/// declaration is enough until something else needs the definition.
pub fn propagate_relevant(graph: &mut EntityGraph, fqn: &str) {
    if is_legacy_listener_instantiation(fqn) {
        debug!(entity = fqn, "withheld from output: unsupported instantiation");
        return;
    }
    let Some(node) = graph.get_mut(fqn) else {
        return;
    };
    if node.relevant {
        return;
    }
    node.relevant = true;
    // Recurse on first marking even when the target is already sorted:
    // the output set must be closed under definition-order dependencies
    // no matter in which order the DFS reached them.
    let targets: Vec<String> = node.dependencies.iter().cloned().collect();
    for target in targets {
        propagate_relevant(graph, &target);
    }
}

fn visit(graph: &mut EntityGraph, fqn: &str, sequence: &mut Vec<String>) -> Result<()> {
    let Some(node) = graph.get_mut(fqn) else {
        return Ok(());
    };
    match node.sort_state {
        SortState::Done => Ok(()),
        SortState::Active => Err(Error::DependencyCycle {
            name: fqn.to_string(),
        }),
        SortState::Unvisited => {
            node.sort_state = SortState::Active;
            let relevant = node.relevant;
            let targets: Vec<String> = node.dependencies.iter().cloned().collect();
            for target in targets {
                if !graph.contains(&target) {
                    // External reference; satisfied outside this run.
                    continue;
                }
                if relevant {
                    propagate_relevant(graph, &target);
                }
                visit(graph, &target, sequence)?;
            }
            if let Some(node) = graph.get_mut(fqn) {
                node.sort_state = SortState::Done;
            }
            sequence.push(fqn.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{builder, deps};
    use crate::provider::{Manager, Registry};

    fn sorted_graph(json: &str) -> Result<(EntityGraph, Vec<String>)> {
        let mut manager = Manager::new();
        manager.add_provider(Box::new(Registry::from_json_str("test", json).unwrap()));
        let mut graph = builder::build(&manager, None)?;
        deps::extract(&mut graph, &manager)?;
        let sequence = sort(&mut graph)?;
        Ok((graph, sequence))
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let (_, sequence) = sorted_graph(
            r#"{"entities": {
                "api.draw.Point": {"published": true, "kind": "plain_struct"},
                "api.draw.Shape": {"published": true, "kind": "plain_struct",
                    "members": [{"name": "origin", "type": "api.draw.Point"}]}
            }}"#,
        )
        .unwrap();
        let point = sequence.iter().position(|n| n == "api.draw.Point").unwrap();
        let shape = sequence.iter().position(|n| n == "api.draw.Shape").unwrap();
        assert!(point < shape);
    }

    #[test]
    fn test_strong_cycle_is_fatal() {
        let err = sorted_graph(
            r#"{"entities": {
                "api.a.First": {"published": true, "kind": "plain_struct",
                    "members": [{"name": "other", "type": "api.a.Second"}]},
                "api.a.Second": {"published": true, "kind": "plain_struct",
                    "members": [{"name": "other", "type": "api.a.First"}]}
            }}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { .. }));
    }

    #[test]
    fn test_interface_cycle_sorts() {
        let (graph, sequence) = sorted_graph(
            r#"{"entities": {
                "api.a.XFirst": {"published": true, "kind": "interface",
                    "methods": [{"name": "other", "return_type": "api.a.XSecond"}]},
                "api.a.XSecond": {"published": true, "kind": "interface",
                    "methods": [{"name": "other", "return_type": "api.a.XFirst"}]}
            }}"#,
        )
        .unwrap();
        assert!(sequence.contains(&"api.a.XFirst".to_string()));
        assert!(sequence.contains(&"api.a.XSecond".to_string()));
        assert!(graph.get("api.a.XFirst").unwrap().relevant);
        assert!(graph.get("api.a.XSecond").unwrap().relevant);
    }

    #[test]
    fn test_relevance_spreads_through_definition_deps_only() {
        let (graph, _) = sorted_graph(
            r#"{"entities": {
                "api.a.Base": {"published": false, "kind": "plain_struct"},
                "api.a.Used": {"published": true, "kind": "plain_struct",
                    "members": [{"name": "b", "type": "api.a.Base"}]},
                "api.a.XHandle": {"published": false, "kind": "interface"},
                "api.a.Holder": {"published": true, "kind": "plain_struct",
                    "members": [{"name": "h", "type": "api.a.XHandle"}]}
            }}"#,
        )
        .unwrap();
        // Definition-order target became relevant through the sort.
        assert!(graph.get("api.a.Base").unwrap().relevant);
        // Forward-declarable target did not: a declaration suffices.
        assert!(!graph.get("api.a.XHandle").unwrap().relevant);
    }

    #[test]
    fn test_relevance_is_idempotent() {
        let (mut graph, _) = sorted_graph(
            r#"{"entities": {
                "api.a.Point": {"published": true, "kind": "plain_struct"}
            }}"#,
        )
        .unwrap();
        let before: Vec<bool> = graph.iter().map(|(_, n)| n.relevant).collect();
        for fqn in graph.names() {
            if graph.get(&fqn).unwrap().relevant {
                propagate_relevant(&mut graph, &fqn);
            }
        }
        let after: Vec<bool> = graph.iter().map(|(_, n)| n.relevant).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unsupported_instantiation_never_relevant() {
        // Reachable through a definition-order reference, and even
        // published itself: the carve-out wins on both paths.
        let (graph, _) = sorted_graph(
            r#"{"entities": {
                "api.events.Wrapped<api.lang.XEventListener>":
                    {"published": true, "kind": "plain_struct"},
                "api.events.Broadcaster": {"published": true, "kind": "plain_struct",
                    "base": "api.events.Wrapped<api.lang.XEventListener>"}
            }}"#,
        )
        .unwrap();
        assert!(!graph
            .get("api.events.Wrapped<api.lang.XEventListener>")
            .unwrap()
            .relevant);
        assert!(graph.get("api.events.Broadcaster").unwrap().relevant);
    }
}
