//! Dependency extraction.
//!
//! Walks every non-module entity once and fills its dependency sets:
//! targets that must be fully defined first, and interface targets for
//! which a forward declaration suffices. Also derives the
//! capability-cast adjacency between the base interfaces of accumulated
//! services.

use std::collections::BTreeSet;
use tracing::debug;

use super::engine::EntityGraph;
use crate::error::{Error, Result};
use crate::idl::{self, DeclBody};
use crate::parser;
use crate::provider::{EntityProvider, Manager};

/// Populate the dependency sets of every entity in the graph.
pub fn extract(graph: &mut EntityGraph, manager: &Manager) -> Result<()> {
    for fqn in graph.names() {
        let Some(decl) = graph.get(&fqn).map(|node| node.decl.clone()) else {
            continue;
        };
        extract_entity(graph, manager, &fqn, &decl.body)?;
    }
    connect_adjacent_interfaces(graph);
    debug!("dependency extraction finished");
    Ok(())
}

fn extract_entity(
    graph: &mut EntityGraph,
    manager: &Manager,
    fqn: &str,
    body: &DeclBody,
) -> Result<()> {
    match body {
        // Members are literal values; no entity dependencies.
        DeclBody::Module | DeclBody::Enum(_) | DeclBody::ConstantGroup(_) => {}
        DeclBody::PlainStruct(body) | DeclBody::Exception(body) => {
            if let Some(base) = &body.base {
                insert_entity_dependency(graph, manager, fqn, base, false)?;
            }
            for member in &body.members {
                insert_type_dependency(graph, manager, fqn, &member.ty)?;
            }
        }
        DeclBody::PolymorphicStructTemplate(body) => {
            for member in &body.members {
                if !member.parameterized {
                    insert_type_dependency(graph, manager, fqn, &member.ty)?;
                }
            }
        }
        DeclBody::Interface(body) => {
            for base in body.mandatory_bases.iter().chain(&body.optional_bases) {
                insert_entity_dependency(graph, manager, fqn, &base.name, true)?;
            }
            for attribute in &body.attributes {
                insert_type_dependency(graph, manager, fqn, &attribute.ty)?;
            }
            for method in &body.methods {
                insert_type_dependency(graph, manager, fqn, &method.return_type)?;
                for parameter in &method.parameters {
                    insert_type_dependency(graph, manager, fqn, &parameter.ty)?;
                }
                for exception in &method.exceptions {
                    insert_entity_dependency(graph, manager, fqn, exception, true)?;
                }
            }
        }
        DeclBody::Typedef(body) => {
            insert_type_dependency(graph, manager, fqn, &body.ty)?;
        }
        DeclBody::SingleInterfaceService(body) => {
            insert_entity_dependency(graph, manager, fqn, &body.base, true)?;
            for constructor in &body.constructors {
                for parameter in &constructor.parameters {
                    insert_type_dependency(graph, manager, fqn, &parameter.ty)?;
                }
                for exception in &constructor.exceptions {
                    insert_entity_dependency(graph, manager, fqn, exception, true)?;
                }
            }
        }
        DeclBody::AccumulationService(body) => {
            for base in body
                .mandatory_base_services
                .iter()
                .chain(&body.optional_base_services)
                .chain(&body.mandatory_base_interfaces)
                .chain(&body.optional_base_interfaces)
            {
                insert_entity_dependency(graph, manager, fqn, &base.name, true)?;
            }
            for property in &body.properties {
                insert_type_dependency(graph, manager, fqn, &property.ty)?;
            }
        }
        DeclBody::InterfaceSingleton(body) | DeclBody::ServiceSingleton(body) => {
            insert_entity_dependency(graph, manager, fqn, &body.base, true)?;
        }
    }
    Ok(())
}

/// Insert a dependency on a named entity.
///
/// With `classify` the target's kind decides where the dependency lands:
/// interfaces are forward-declarable, exception references are dropped
/// entirely (exceptions get no generated bindings), anything else must
/// be fully defined first. Classification needs a kind lookup, so an
/// unresolvable name is fatal there; without `classify` the name is
/// tolerated as an external reference.
fn insert_entity_dependency(
    graph: &mut EntityGraph,
    manager: &Manager,
    owner: &str,
    name: &str,
    classify: bool,
) -> Result<()> {
    // Trivial self-reference is not an error, just noise.
    if name == owner {
        return Ok(());
    }
    let mut forward_declarable = false;
    if classify {
        let target = graph
            .get(name)
            .map(|node| node.decl.clone())
            .or_else(|| manager.find(name))
            .ok_or_else(|| Error::UnknownEntity {
                name: name.to_string(),
                origin: owner.to_string(),
            })?;
        if target.is_exception() {
            return Ok(());
        }
        forward_declarable = target.is_interface();
    }
    graph.mark_namespace_relevant(name);
    if let Some(node) = graph.get_mut(owner) {
        if forward_declarable {
            node.interface_dependencies.insert(name.to_string());
        } else {
            node.dependencies.insert(name.to_string());
        }
    }
    pull_in(graph, manager, name)
}

/// Make a dependency target part of the graph when the provider knows
/// it. A scoped run starts from the listed names only; the closure the
/// sort and the backends need is materialized here, irrelevant until
/// relevance propagation says otherwise.
fn pull_in(graph: &mut EntityGraph, manager: &Manager, name: &str) -> Result<()> {
    if graph.contains(name) {
        return Ok(());
    }
    let Some(decl) = manager.find(name) else {
        // External reference; nothing to materialize.
        return Ok(());
    };
    if decl.is_module() {
        return Ok(());
    }
    graph.insert(name, decl.clone(), false)?;
    extract_entity(graph, manager, name, &decl.body)
}

/// Insert the dependencies implied by a textual type reference:
/// the nucleus entity, every entity named in its type arguments, and
/// the carrier types for arrays, `type` and `any`.
fn insert_type_dependency(
    graph: &mut EntityGraph,
    manager: &Manager,
    owner: &str,
    reference: &str,
) -> Result<()> {
    let descriptor = parser::decompose(reference)?;
    if descriptor.is_entity {
        // A sequence of the property-bag struct collapses to a plain
        // record of name to Any; see the backends' type renderers.
        if descriptor.rank > 0 && descriptor.nucleus == idl::PROPERTY_BAG {
            add_strong(graph, owner, idl::ANY_TYPE);
            return Ok(());
        }
        insert_entity_dependency(graph, manager, owner, &descriptor.nucleus, true)?;
        for argument in &descriptor.type_arguments {
            insert_type_dependency(graph, manager, owner, argument)?;
        }
    }
    if descriptor.rank > 0 {
        add_strong(graph, owner, idl::SEQUENCE_TYPE);
    } else if descriptor.nucleus == "type" {
        add_strong(graph, owner, idl::TYPE_TYPE);
    } else if descriptor.nucleus == "any" {
        add_strong(graph, owner, idl::ANY_TYPE);
    }
    Ok(())
}

fn add_strong(graph: &mut EntityGraph, owner: &str, name: &str) {
    if owner == name {
        return;
    }
    if let Some(node) = graph.get_mut(owner) {
        node.dependencies.insert(name.to_string());
    }
}

/// The direct base interfaces of an accumulated service are pairwise
/// adjacent: an object of the service can be capability-cast between
/// them, and each interface advertises the casts it offers.
fn connect_adjacent_interfaces(graph: &mut EntityGraph) {
    let mut groups: Vec<BTreeSet<String>> = Vec::new();
    for (_, node) in graph.iter() {
        if let DeclBody::AccumulationService(body) = &node.decl.body {
            let group: BTreeSet<String> = body
                .mandatory_base_interfaces
                .iter()
                .chain(&body.optional_base_interfaces)
                .map(|base| base.name.clone())
                .collect();
            if group.len() > 1 {
                groups.push(group);
            }
        }
    }
    for group in groups {
        for name in &group {
            if let Some(node) = graph.get_mut(name) {
                node.adjacent_interfaces
                    .extend(group.iter().filter(|other| *other != name).cloned());
            }
        }
    }
}
