//! # idlbridge
//!
//! An interface-definition compiler. Reads declarations (modules,
//! interfaces, structs, enums, exceptions, services, singletons,
//! typedefs, constant groups) from one or more registries, builds a
//! global dependency graph, resolves which declarations a requested
//! scope actually needs, orders them so definitions precede uses, and
//! emits equivalent declarations as TypeScript type declarations and as
//! a C++ bridging layer.
//!
//! ## Pipeline
//!
//! ```rust,no_run
//! use idlbridge::{generate, GenerateOptions};
//! use std::path::PathBuf;
//!
//! let options = GenerateOptions {
//!     sources: vec![PathBuf::from("registry.json")],
//!     scope: None,
//!     out_dir: PathBuf::from("generated"),
//!     backends: vec![],
//! };
//! generate(&options).unwrap();
//! ```
//!
//! Each stage is a pure transformation of the graph: build, extract
//! dependencies, propagate relevance while sorting, emit. A fatal error
//! at any stage aborts the run with a diagnostic; there is no partial
//! output mode.

pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod graph;
pub mod idl;
pub mod parser;
pub mod provider;

// Re-exports for convenience
pub use error::{Error, Result};

pub use emit::{Backend, FsSink, MemorySink, NativeBackend, OutputSink, TypeScriptBackend};
pub use graph::{EntityGraph, GraphStats, ScopeRequest};
pub use idl::{Declaration, EntityKind};
pub use parser::{decompose, TypeDescriptor};
pub use provider::{DeclarationTree, EntityProvider, Manager, Registry};

use cli::BackendChoice;
use std::path::{Path, PathBuf};
use tracing::info;

/// Inputs of one generator run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Registry files or declaration-tree directories.
    pub sources: Vec<PathBuf>,
    /// Scope file; `None` means everything the sources publish.
    pub scope: Option<PathBuf>,
    /// Output directory root.
    pub out_dir: PathBuf,
    /// Backends to run; empty means all of them.
    pub backends: Vec<BackendChoice>,
}

/// Load providers, build and sort the graph, and run every requested
/// backend over the sorted sequence.
pub fn generate(options: &GenerateOptions) -> Result<()> {
    let manager = load_sources(&options.sources)?;

    let scope = match &options.scope {
        Some(path) => Some(ScopeRequest {
            path: path.clone(),
            names: provider::read_scope_file(path)?,
        }),
        None => None,
    };

    let mut graph = graph::build(&manager, scope.as_ref())?;
    graph::deps::extract(&mut graph, &manager)?;
    let sorted = graph::sort::sort(&mut graph)?;
    info!(stats = %graph.stats(), "graph ready");

    let backends = if options.backends.is_empty() {
        vec![BackendChoice::Typescript, BackendChoice::Native]
    } else {
        options.backends.clone()
    };
    let mut sink = FsSink::new(&options.out_dir);
    for choice in backends {
        match choice {
            BackendChoice::Typescript => {
                let mut backend = TypeScriptBackend::new();
                emit::emit(&mut graph, &sorted, &mut backend, &mut sink)?;
            }
            BackendChoice::Native => {
                let mut backend = NativeBackend::new();
                emit::emit(&mut graph, &sorted, &mut backend, &mut sink)?;
            }
        }
    }
    Ok(())
}

/// A source is a registry file or a directory tree of declaration
/// fragments.
fn load_sources(sources: &[PathBuf]) -> Result<Manager> {
    let mut manager = Manager::new();
    for source in sources {
        manager.add_provider(load_source(source)?);
    }
    Ok(manager)
}

fn load_source(source: &Path) -> Result<Box<dyn EntityProvider>> {
    if source.is_dir() {
        Ok(Box::new(DeclarationTree::load(source)?))
    } else {
        Ok(Box::new(Registry::load(source)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Registry, graph, sort, and one TypeScript emission pass over an
    /// in-memory sink.
    fn run_typescript(json: &str, scope: Option<Vec<&str>>) -> (MemorySink, Vec<String>) {
        let mut manager = Manager::new();
        manager.add_provider(Box::new(Registry::from_json_str("test", json).unwrap()));
        let request = scope.map(|names| ScopeRequest {
            path: PathBuf::from("scope.lst"),
            names: names.into_iter().map(String::from).collect(),
        });
        let mut graph = graph::build(&manager, request.as_ref()).unwrap();
        graph::deps::extract(&mut graph, &manager).unwrap();
        let sorted = graph::sort::sort(&mut graph).unwrap();
        let mut backend = TypeScriptBackend::new();
        let mut sink = MemorySink::new();
        emit::emit(&mut graph, &sorted, &mut backend, &mut sink).unwrap();
        (sink, sorted)
    }

    const DRAW: &str = r#"{"entities": {
        "api.draw.Point": {"published": true, "kind": "plain_struct",
            "doc": "A position in device units.",
            "members": [{"name": "x", "type": "long"}, {"name": "y", "type": "long"}]},
        "api.draw.Shape": {"published": true, "kind": "plain_struct",
            "members": [{"name": "origin", "type": "api.draw.Point"}]},
        "api.draw.XDrawable": {"published": true, "kind": "interface",
            "methods": [{"name": "draw", "return_type": "void",
                "parameters": [{"name": "shape", "type": "api.draw.Shape"}]}]}
    }}"#;

    #[test]
    fn test_end_to_end_unscoped() {
        let (sink, sorted) = run_typescript(DRAW, None);

        // Dependencies come out first.
        let relevant: Vec<&str> = sorted.iter().map(String::as_str).collect();
        assert_eq!(
            relevant,
            vec!["api.draw.Point", "api.draw.Shape", "api.draw.XDrawable"]
        );

        let point = sink.file("typescript/api/draw/Point.d.ts").unwrap();
        assert!(point.contains("/** A position in device units. */"));

        let shape = sink.file("typescript/api/draw/Shape.d.ts").unwrap();
        assert!(shape.contains("export interface Shape {"));
        assert!(shape.contains("origin: Point,"));

        // The structural requirement on Shape is satisfied by ordering,
        // not by a forward declaration.
        let drawable = sink.file("typescript/api/draw/XDrawable.d.ts").unwrap();
        assert!(!drawable.contains("import"));
        assert!(drawable.contains("draw(shape: Shape): void;"));

        let index = sink.file("typescript/api/draw/index.d.ts").unwrap();
        assert!(index.contains("export * from './Point';"));
        assert!(index.contains("export * from './XDrawable';"));
    }

    #[test]
    fn test_scope_restricts_to_definition_closure() {
        let (sink, _) = run_typescript(DRAW, Some(vec!["api.draw.Shape"]));
        assert!(sink.file("typescript/api/draw/Shape.d.ts").is_some());
        assert!(sink.file("typescript/api/draw/Point.d.ts").is_some());
        assert!(sink.file("typescript/api/draw/XDrawable.d.ts").is_none());
    }

    #[test]
    fn test_forward_declarable_reference_stays_a_declaration() {
        // The canvas needs the interface only as a handle; the scope
        // never asks for its full binding.
        let json = r#"{"entities": {
            "api.draw.XDrawable": {"published": true, "kind": "interface"},
            "api.draw.Canvas": {"published": true, "kind": "plain_struct",
                "members": [{"name": "target", "type": "api.draw.XDrawable"}]}
        }}"#;
        let (sink, _) = run_typescript(json, Some(vec!["api.draw.Canvas"]));
        let canvas = sink.file("typescript/api/draw/Canvas.d.ts").unwrap();
        assert!(canvas.contains("import { XDrawable } from './XDrawable';"));
        assert!(sink.file("typescript/api/draw/XDrawable.d.ts").is_none());
    }

    #[test]
    fn test_mutual_interface_references_emit_forward_declaration() {
        let json = r#"{"entities": {
            "api.a.XFirst": {"published": true, "kind": "interface",
                "methods": [{"name": "other", "return_type": "api.a.XSecond"}]},
            "api.a.XSecond": {"published": true, "kind": "interface",
                "methods": [{"name": "other", "return_type": "api.a.XFirst"}]}
        }}"#;
        let (sink, _) = run_typescript(json, None);
        let first = sink.file("typescript/api/a/XFirst.d.ts").unwrap();
        assert!(first.contains("import { XSecond } from './XSecond';"));
        // Once declared, the reverse edge needs no second declaration.
        let second = sink.file("typescript/api/a/XSecond.d.ts").unwrap();
        assert!(!second.contains("import"));
    }

    #[test]
    fn test_exceptions_get_no_artifacts() {
        let json = r#"{"entities": {
            "api.draw.DrawError": {"published": true, "kind": "exception"},
            "api.draw.Shape": {"published": true, "kind": "plain_struct"}
        }}"#;
        let (sink, _) = run_typescript(json, None);
        assert!(sink.file("typescript/api/draw/DrawError.d.ts").is_none());
        let index = sink.file("typescript/api/draw/index.d.ts").unwrap();
        assert!(!index.contains("DrawError"));
    }

    #[test]
    fn test_index_pruning_drops_empty_namespaces() {
        let json = r#"{"entities": {
            "api.draw.Shape": {"published": true, "kind": "plain_struct"},
            "api.hidden.Secret": {"published": false, "kind": "plain_struct"}
        }}"#;
        let (sink, _) = run_typescript(json, None);
        let index = sink.file("typescript/api/index.d.ts").unwrap();
        assert!(index.contains("export * as draw from './draw';"));
        assert!(!index.contains("hidden"));
        assert!(sink.file("typescript/api/hidden/index.d.ts").is_none());
    }

    #[test]
    fn test_core_index_carries_prelude() {
        let json = r#"{"entities": {
            "api.core.XInterface": {"published": true, "kind": "interface"},
            "api.core.TypeClass": {"published": true, "kind": "enum",
                "members": [{"name": "VOID", "value": 0}]}
        }}"#;
        let (sink, _) = run_typescript(json, None);
        let index = sink.file("typescript/api/core/index.d.ts").unwrap();
        assert!(index.contains("export * from './TypeClass';"));
        // The prelude supplies the root interface, not a re-export.
        assert!(!index.contains("export * from './XInterface';"));
        assert!(index.contains("export interface XInterface"));
        assert!(index.contains("export type Sequence"));
    }

    #[test]
    fn test_generate_writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("registry.json");
        std::fs::write(&registry, DRAW).unwrap();
        let out = dir.path().join("generated");
        generate(&GenerateOptions {
            sources: vec![registry],
            scope: None,
            out_dir: out.clone(),
            backends: vec![],
        })
        .unwrap();
        assert!(out.join("typescript/api/draw/Shape.d.ts").exists());
        assert!(out.join("typescript/api/draw/index.d.ts").exists());
        assert!(out.join("bridge/api/draw/Shape.hxx").exists());
        assert!(out.join("bridge/typemap.hxx").exists());
        let point = std::fs::read_to_string(out.join("bridge/api/draw/Point.hxx")).unwrap();
        assert!(point.contains("/** A position in device units. */"));
        assert!(point.contains("std::int32_t x;"));
        let typemap = std::fs::read_to_string(out.join("bridge/typemap.hxx")).unwrap();
        assert!(typemap.contains("case hash(\"api.draw.XDrawable\")"));
    }

    #[test]
    fn test_scope_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let registry = dir.path().join("registry.json");
        std::fs::write(&registry, DRAW).unwrap();
        let scope = dir.path().join("entities.lst");
        std::fs::write(&scope, "api.draw.Shape\n").unwrap();
        let out = dir.path().join("generated");
        generate(&GenerateOptions {
            sources: vec![registry],
            scope: Some(scope),
            out_dir: out.clone(),
            backends: vec![BackendChoice::Typescript],
        })
        .unwrap();
        assert!(out.join("typescript/api/draw/Shape.d.ts").exists());
        assert!(out.join("typescript/api/draw/Point.d.ts").exists());
        assert!(!out.join("typescript/api/draw/XDrawable.d.ts").exists());
    }
}
