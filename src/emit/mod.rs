//! The emission protocol.
//!
//! A backend implements one writer per entity kind plus a
//! forward-declaration writer; the driver walks the sorted, relevant
//! sequence once per backend, emitting forward declarations for
//! interface dependencies before each definition. Emission progress
//! lives in a per-run table, so multiple backends can run over the same
//! sequence without sharing state.

pub mod native;
pub mod sink;
pub mod typescript;

pub use native::NativeBackend;
pub use sink::{FsSink, MemorySink, OutputSink};
pub use typescript::TypeScriptBackend;

use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::{EntityGraph, EntityNode, ModuleNode, WriteState};
use crate::idl::{
    AccumulationBody, ConstantGroupBody, EnumBody, InterfaceBody, PolyStructBody, ServiceBody,
    SingletonBody, StructBody, TypedefBody,
};

/// One output notation.
///
/// Writers receive the declaration payload for their kind and stream
/// text into the sink. Backends keep only rendering state of their own
/// (the per-file import counter); everything structural comes from the
/// driver.
pub trait Backend {
    fn name(&self) -> &'static str;

    /// Relative output path for an entity's artifact.
    fn entity_file(&self, fqn: &str) -> String;

    /// Called after the entity's file is opened, before anything else is
    /// written for `fqn`. Backends reset per-file state here and may
    /// emit a file prologue.
    fn begin_entity(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        node: &EntityNode,
    ) -> Result<()>;

    /// Emit an import / forward declaration of `dependency` inside the
    /// artifact of `dependent`.
    fn write_interface_dependency(
        &mut self,
        out: &mut dyn OutputSink,
        dependent: &str,
        dependency: &str,
        published: bool,
    ) -> Result<()>;

    /// Documentation block ahead of a definition.
    fn write_doc(&mut self, out: &mut dyn OutputSink, doc: &str) -> Result<()> {
        out.write(&format!("/** {} */\n", doc))
    }

    fn write_enum(&mut self, out: &mut dyn OutputSink, fqn: &str, body: &EnumBody) -> Result<()>;
    fn write_plain_struct(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &StructBody,
    ) -> Result<()>;
    fn write_polymorphic_struct(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &PolyStructBody,
    ) -> Result<()>;
    fn write_interface(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &InterfaceBody,
    ) -> Result<()>;
    fn write_typedef(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &TypedefBody,
    ) -> Result<()>;
    fn write_constant_group(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &ConstantGroupBody,
    ) -> Result<()>;
    fn write_single_interface_service(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &ServiceBody,
    ) -> Result<()>;
    fn write_accumulation_service(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &AccumulationBody,
    ) -> Result<()>;
    fn write_interface_singleton(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &SingletonBody,
    ) -> Result<()>;
    fn write_service_singleton(
        &mut self,
        out: &mut dyn OutputSink,
        fqn: &str,
        body: &SingletonBody,
    ) -> Result<()>;

    /// Relative path of a module's index artifact; `None` if the
    /// backend has no per-module files.
    fn module_index_file(&self, _module_fqn: &str) -> Option<String> {
        None
    }

    /// Emit a module index over the relevant submodules and members.
    fn write_module_index(
        &mut self,
        _out: &mut dyn OutputSink,
        _module_fqn: &str,
        _submodules: &[String],
        _members: &[String],
    ) -> Result<()> {
        Ok(())
    }

    /// Called once after all entities and indexes, for aggregated
    /// artifacts.
    fn finish(
        &mut self,
        _out: &mut dyn OutputSink,
        _graph: &EntityGraph,
        _sorted: &[String],
    ) -> Result<()> {
        Ok(())
    }
}

/// Run one backend over the sorted sequence.
pub fn emit<B: Backend>(
    graph: &mut EntityGraph,
    sorted: &[String],
    backend: &mut B,
    sink: &mut dyn OutputSink,
) -> Result<()> {
    let mut progress: HashMap<String, WriteState> = HashMap::new();
    let mut written = 0usize;

    for fqn in sorted {
        let Some(node) = graph.get(fqn) else {
            continue;
        };
        // Exceptions deliberately get no generated bindings; the
        // cross-runtime error model is handled elsewhere.
        if !node.relevant || node.decl.is_exception() {
            continue;
        }
        if progress.get(fqn) == Some(&WriteState::Defined) {
            continue;
        }

        sink.create(&backend.entity_file(fqn))?;
        backend.begin_entity(sink, fqn, node)?;

        for dependency in &node.interface_dependencies {
            let state = progress.get(dependency).copied().unwrap_or_default();
            if state != WriteState::NotWritten {
                continue;
            }
            if let Some(target) = graph.get(dependency) {
                if !target.decl.is_interface() {
                    return Err(Error::NotAnInterface {
                        name: dependency.clone(),
                    });
                }
                progress.insert(dependency.clone(), WriteState::Declared);
                backend.write_interface_dependency(sink, fqn, dependency, target.decl.published)?;
            }
        }

        if let Some(doc) = &node.decl.doc {
            backend.write_doc(sink, doc)?;
        }

        use crate::idl::DeclBody::*;
        match &node.decl.body {
            Enum(body) => backend.write_enum(sink, fqn, body)?,
            PlainStruct(body) => backend.write_plain_struct(sink, fqn, body)?,
            PolymorphicStructTemplate(body) => {
                backend.write_polymorphic_struct(sink, fqn, body)?
            }
            Interface(body) => backend.write_interface(sink, fqn, body)?,
            Typedef(body) => backend.write_typedef(sink, fqn, body)?,
            ConstantGroup(body) => backend.write_constant_group(sink, fqn, body)?,
            SingleInterfaceService(body) => {
                backend.write_single_interface_service(sink, fqn, body)?
            }
            AccumulationService(body) => backend.write_accumulation_service(sink, fqn, body)?,
            InterfaceSingleton(body) => backend.write_interface_singleton(sink, fqn, body)?,
            ServiceSingleton(body) => backend.write_service_singleton(sink, fqn, body)?,
            Module | Exception(_) => unreachable!("filtered before dispatch"),
        }

        progress.insert(fqn.clone(), WriteState::Defined);
        written += 1;
        sink.close()?;
    }

    write_module_indexes(graph, backend, sink)?;
    backend.finish(sink, graph, sorted)?;
    info!(backend = backend.name(), written, "emission finished");
    Ok(())
}

/// Walk the module tree bottom-up, pruning namespaces with nothing
/// relevant left and emitting an index artifact for the rest.
fn write_module_indexes<B: Backend>(
    graph: &mut EntityGraph,
    backend: &mut B,
    sink: &mut dyn OutputSink,
) -> Result<()> {
    let (entities, root) = graph.split_mut();
    for (name, node) in root.modules.iter_mut() {
        visit_module(entities, backend, sink, name, node)?;
    }
    Ok(())
}

fn visit_module<B: Backend>(
    entities: &BTreeMap<String, EntityNode>,
    backend: &mut B,
    sink: &mut dyn OutputSink,
    fqn: &str,
    node: &mut ModuleNode,
) -> Result<()> {
    for (name, child) in node.modules.iter_mut() {
        let child_fqn = format!("{fqn}.{name}");
        visit_module(entities, backend, sink, &child_fqn, child)?;
    }
    if !node.relevant {
        return Ok(());
    }
    let submodules: Vec<String> = node
        .modules
        .iter()
        .filter(|(_, child)| child.relevant)
        .map(|(name, _)| name.clone())
        .collect();
    let members: Vec<String> = node
        .members
        .iter()
        .filter(|member| {
            entities
                .get(&format!("{fqn}.{member}"))
                .is_some_and(|entity| entity.relevant && !entity.decl.is_exception())
        })
        .cloned()
        .collect();
    if submodules.is_empty() && members.is_empty() {
        node.relevant = false;
        return Ok(());
    }
    if let Some(path) = backend.module_index_file(fqn) {
        sink.create(&path)?;
        backend.write_module_index(sink, fqn, &submodules, &members)?;
        sink.close()?;
    }
    Ok(())
}
