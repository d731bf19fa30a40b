//! Registry providers: an aggregate JSON file, or a tree of them.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::EntityProvider;
use crate::error::{Error, Result};
use crate::idl::{leaf_name, namespace_of, Declaration};

/// On-disk shape of a registry file.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    entities: BTreeMap<String, Declaration>,
}

/// An aggregate registry loaded from one JSON document.
///
/// Ancestor modules that the document does not declare explicitly are
/// synthesized, so every declared entity is reachable by walking module
/// members from the root.
#[derive(Debug)]
pub struct Registry {
    /// Where the declarations came from, for diagnostics.
    source: String,
    entities: BTreeMap<String, Arc<Declaration>>,
    /// Namespace -> simple names of direct children.
    members: BTreeMap<String, BTreeSet<String>>,
}

impl Registry {
    /// Load a registry from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut registry = Registry::from_json_str(&path.display().to_string(), &text)
            .map_err(|e| match e {
                Error::BadRegistry { detail, .. } => Error::BadRegistry {
                    path: path.to_path_buf(),
                    detail,
                },
                other => other,
            })?;
        registry.source = path.display().to_string();
        Ok(registry)
    }

    /// Parse a registry from JSON text. `source` labels diagnostics.
    pub fn from_json_str(source: &str, text: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(text).map_err(|e| Error::BadRegistry {
            path: PathBuf::from(source),
            detail: e.to_string(),
        })?;
        let mut registry = Registry {
            source: source.to_string(),
            entities: BTreeMap::new(),
            members: BTreeMap::new(),
        };
        for (fqn, decl) in file.entities {
            registry.insert(fqn, Arc::new(decl))?;
        }
        debug!(
            source = registry.source.as_str(),
            entities = registry.entities.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    /// Number of declarations, synthesized modules included.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn insert(&mut self, fqn: String, decl: Arc<Declaration>) -> Result<()> {
        // A synthesized module may be upgraded by an explicit declaration,
        // but two explicit declarations of one name are a hard error.
        if let Some(existing) = self.entities.get(&fqn) {
            if !existing.is_module() || !decl.is_module() {
                return Err(Error::DuplicateEntity { name: fqn });
            }
            return Ok(());
        }
        self.index_ancestors(&fqn);
        self.entities.insert(fqn, decl);
        Ok(())
    }

    /// Record `fqn` in its parent's member set and synthesize module
    /// entries for every ancestor namespace segment.
    fn index_ancestors(&mut self, fqn: &str) {
        self.members
            .entry(namespace_of(fqn).to_string())
            .or_default()
            .insert(leaf_name(fqn).to_string());
        let namespace = namespace_of(fqn);
        if !namespace.is_empty() && !self.entities.contains_key(namespace) {
            self.index_ancestors(namespace);
            self.entities
                .insert(namespace.to_string(), Arc::new(Declaration::module()));
        }
    }
}

impl EntityProvider for Registry {
    fn find(&self, fqn: &str) -> Option<Arc<Declaration>> {
        self.entities.get(fqn).cloned()
    }

    fn module_members(&self, fqn: &str) -> Option<Vec<String>> {
        self.members
            .get(fqn)
            .map(|names| names.iter().cloned().collect())
    }
}

/// A provider backed by a directory tree of registry fragments.
///
/// Every `*.json` file below the root is parsed as a registry document;
/// the fragments are merged, and a name declared by two fragments is a
/// duplicate-entity error.
#[derive(Debug)]
pub struct DeclarationTree {
    merged: Registry,
}

impl DeclarationTree {
    pub fn load(root: &Path) -> Result<Self> {
        let mut merged = Registry {
            source: root.display().to_string(),
            entities: BTreeMap::new(),
            members: BTreeMap::new(),
        };
        let mut files: Vec<PathBuf> = ignore::WalkBuilder::new(root)
            .hidden(true)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        for path in files {
            let fragment = Registry::load(&path)?;
            for (fqn, decl) in fragment.entities {
                merged.insert(fqn, decl)?;
            }
        }
        debug!(
            root = %root.display(),
            entities = merged.entities.len(),
            "declaration tree loaded"
        );
        Ok(DeclarationTree { merged })
    }
}

impl EntityProvider for DeclarationTree {
    fn find(&self, fqn: &str) -> Option<Arc<Declaration>> {
        self.merged.find(fqn)
    }

    fn module_members(&self, fqn: &str) -> Option<Vec<String>> {
        self.merged.module_members(fqn)
    }
}
