//! Entity providers.
//!
//! A provider is an opaque read-only source of declarations: it resolves
//! fully-qualified names and enumerates a module's direct children. The
//! generator consumes providers only through [`EntityProvider`]; their
//! storage format stays behind that seam.

pub mod registry;

pub use registry::{DeclarationTree, Registry};

use crate::error::{Error, Result};
use crate::idl::Declaration;
use std::path::Path;
use std::sync::Arc;

/// Read-only source of declarations.
pub trait EntityProvider {
    /// Resolve a fully-qualified name.
    fn find(&self, fqn: &str) -> Option<Arc<Declaration>>;

    /// Direct children of a module, as simple names. `""` addresses the
    /// root. `None` means the provider does not know the module at all.
    fn module_members(&self, fqn: &str) -> Option<Vec<String>>;
}

/// An ordered collection of providers acting as one.
///
/// Name resolution takes the first hit in registration order; module
/// enumeration is the union over all providers that know the module.
#[derive(Default)]
pub struct Manager {
    providers: Vec<Box<dyn EntityProvider>>,
}

impl Manager {
    pub fn new() -> Self {
        Manager::default()
    }

    pub fn add_provider(&mut self, provider: Box<dyn EntityProvider>) {
        self.providers.push(provider);
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl EntityProvider for Manager {
    fn find(&self, fqn: &str) -> Option<Arc<Declaration>> {
        self.providers.iter().find_map(|p| p.find(fqn))
    }

    fn module_members(&self, fqn: &str) -> Option<Vec<String>> {
        // Deliberately keeps a name exposed by two providers twice: the
        // graph build turns that into a duplicate-entity diagnostic
        // instead of silently preferring one source.
        let mut merged: Vec<String> = Vec::new();
        let mut known = false;
        for provider in &self.providers {
            if let Some(members) = provider.module_members(fqn) {
                known = true;
                merged.extend(members);
            }
        }
        known.then(|| {
            merged.sort();
            merged
        })
    }
}

/// Parse a scope file: line-oriented, space-separated fully-qualified
/// names defining the exact include set for a run.
pub fn read_scope_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(text
        .lines()
        .flat_map(|line| line.split(' '))
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_manager_first_hit_wins() {
        let a = Registry::from_json_str(
            "a",
            r#"{"entities": {"api.core.Any": {"published": true, "kind": "plain_struct"}}}"#,
        )
        .unwrap();
        let b = Registry::from_json_str(
            "b",
            r#"{"entities": {"api.core.Any": {"published": false, "kind": "plain_struct"}}}"#,
        )
        .unwrap();
        let mut manager = Manager::new();
        manager.add_provider(Box::new(a));
        manager.add_provider(Box::new(b));
        let decl = manager.find("api.core.Any").unwrap();
        assert!(decl.published);
    }

    #[test]
    fn test_manager_unions_module_members() {
        let a = Registry::from_json_str(
            "a",
            r#"{"entities": {"api.core.Any": {"kind": "plain_struct"}}}"#,
        )
        .unwrap();
        let b = Registry::from_json_str(
            "b",
            r#"{"entities": {"api.core.Type": {"kind": "plain_struct"}}}"#,
        )
        .unwrap();
        let mut manager = Manager::new();
        manager.add_provider(Box::new(a));
        manager.add_provider(Box::new(b));
        assert_eq!(
            manager.module_members("api.core").unwrap(),
            vec!["Any".to_string(), "Type".to_string()]
        );
        // A module known to both providers is listed once per provider;
        // enumeration descends it once, leaf duplicates become errors.
        assert_eq!(
            manager.module_members("").unwrap(),
            vec!["api".to_string(), "api".to_string()]
        );
        assert!(manager.module_members("api.draw").is_none());
    }

    #[test]
    fn test_read_scope_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api.core.XInterface api.draw.Shape").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "api.draw.XDrawable").unwrap();
        let names = read_scope_file(file.path()).unwrap();
        assert_eq!(
            names,
            vec![
                "api.core.XInterface".to_string(),
                "api.draw.Shape".to_string(),
                "api.draw.XDrawable".to_string(),
            ]
        );
    }
}
