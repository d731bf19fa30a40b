//! Textual type-reference decomposition.
//!
//! A type reference is a string like `[][]api.beans.Pair<string,long>`:
//! a run of array markers, a nucleus name, and an optional generic
//! argument list. Dependency extraction and every backend's type
//! renderer work on the decomposed form.

use crate::error::{Error, Result};

/// Nuclei that do not name an entity. Everything else does.
const SIMPLE_TYPES: &[&str] = &[
    "void",
    "boolean",
    "byte",
    "short",
    "unsigned short",
    "long",
    "unsigned long",
    "hyper",
    "unsigned hyper",
    "float",
    "double",
    "char",
    "string",
    "type",
    "any",
];

/// Whether `name` is one of the built-in simple types.
pub fn is_simple_type(name: &str) -> bool {
    SIMPLE_TYPES.contains(&name)
}

/// A decomposed type reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Number of leading `[]` array markers.
    pub rank: usize,
    /// Top-level generic arguments, each itself a type reference.
    pub type_arguments: Vec<String>,
    /// The remaining nucleus name.
    pub nucleus: String,
    /// Whether the nucleus names an entity rather than a simple type.
    pub is_entity: bool,
}

/// Decompose a textual type reference.
///
/// Strips the array markers, splits a `<...>` argument list at top-level
/// commas only (bracket depth is tracked so nested generics survive),
/// and classifies the nucleus. Type arguments may themselves need
/// decomposition; callers recurse as required.
pub fn decompose(reference: &str) -> Result<TypeDescriptor> {
    let malformed = |detail: &str| Error::MalformedType {
        reference: reference.to_string(),
        detail: detail.to_string(),
    };

    let mut nucleus = reference;
    let mut rank = 0usize;
    while let Some(rest) = nucleus.strip_prefix("[]") {
        rank += 1;
        nucleus = rest;
    }

    let mut type_arguments = Vec::new();
    if let Some(open) = nucleus.find('<') {
        if !nucleus.ends_with('>') {
            return Err(malformed("unterminated type argument list"));
        }
        let inner = &nucleus[open + 1..nucleus.len() - 1];
        let mut depth = 0i32;
        let mut start = 0usize;
        for (idx, c) in inner.char_indices() {
            match c {
                '<' => depth += 1,
                '>' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(malformed("unbalanced type argument list"));
                    }
                }
                ',' if depth == 0 => {
                    type_arguments.push(inner[start..idx].to_string());
                    start = idx + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(malformed("unbalanced type argument list"));
        }
        type_arguments.push(inner[start..].to_string());
        if type_arguments.iter().any(|a| a.is_empty()) {
            return Err(malformed("empty type argument"));
        }
        nucleus = &nucleus[..open];
    }

    if nucleus.is_empty() {
        return Err(malformed("empty nucleus"));
    }
    let is_entity = !is_simple_type(nucleus);
    if !is_entity && !type_arguments.is_empty() {
        return Err(malformed("simple type with type arguments"));
    }

    Ok(TypeDescriptor {
        rank,
        type_arguments,
        nucleus: nucleus.to_string(),
        is_entity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_type() {
        let d = decompose("long").unwrap();
        assert_eq!(d.rank, 0);
        assert!(d.type_arguments.is_empty());
        assert_eq!(d.nucleus, "long");
        assert!(!d.is_entity);
    }

    #[test]
    fn test_array_of_byte() {
        let d = decompose("[][]byte").unwrap();
        assert_eq!(d.rank, 2);
        assert_eq!(d.nucleus, "byte");
        assert!(!d.is_entity);
    }

    #[test]
    fn test_multi_word_simple_type() {
        let d = decompose("unsigned hyper").unwrap();
        assert_eq!(d.nucleus, "unsigned hyper");
        assert!(!d.is_entity);
    }

    #[test]
    fn test_entity_reference() {
        let d = decompose("api.draw.Shape").unwrap();
        assert_eq!(d.rank, 0);
        assert_eq!(d.nucleus, "api.draw.Shape");
        assert!(d.is_entity);
    }

    #[test]
    fn test_nested_generics_split_at_top_level_only() {
        let d = decompose("api.beans.Pair<api.beans.Pair<string,long>,long>").unwrap();
        assert_eq!(d.nucleus, "api.beans.Pair");
        assert_eq!(
            d.type_arguments,
            vec!["api.beans.Pair<string,long>".to_string(), "long".to_string()]
        );
        assert!(d.is_entity);
    }

    #[test]
    fn test_array_of_generic() {
        let d = decompose("[]api.beans.Optional<string>").unwrap();
        assert_eq!(d.rank, 1);
        assert_eq!(d.nucleus, "api.beans.Optional");
        assert_eq!(d.type_arguments, vec!["string".to_string()]);
    }

    #[test]
    fn test_unbalanced_arguments() {
        assert!(decompose("api.beans.Pair<string,long").is_err());
        assert!(decompose("api.beans.Pair<string,<long>").is_err());
    }

    #[test]
    fn test_empty_nucleus() {
        assert!(decompose("[]").is_err());
        assert!(decompose("<long>").is_err());
    }

    #[test]
    fn test_simple_type_with_arguments() {
        assert!(decompose("long<string>").is_err());
    }

    #[test]
    fn test_round_trip_reassembly() {
        let reference = "[]api.beans.Pair<string,[]long>";
        let d = decompose(reference).unwrap();
        let rebuilt = format!(
            "{}{}<{}>",
            "[]".repeat(d.rank),
            d.nucleus,
            d.type_arguments.join(",")
        );
        assert_eq!(rebuilt, reference);
    }
}
