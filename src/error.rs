//! Error types for idlbridge.
//!
//! Every variant is fatal: the generator is a build-time batch tool, so
//! the first error aborts the run with a diagnostic instead of producing
//! partial output.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A referenced fully-qualified name does not resolve via any provider.
    #[error("unknown entity `{name}` (referenced from {origin})")]
    UnknownEntity { name: String, origin: String },

    /// The same fully-qualified name was inserted into the graph twice.
    #[error("duplicate entity `{name}`")]
    DuplicateEntity { name: String },

    /// An explicit scope entry names a module instead of a concrete entity.
    #[error("module entity `{name}` listed in scope file {}", path.display())]
    ModuleInScope { name: String, path: PathBuf },

    /// The topological sort found a cycle of definition-order dependencies.
    #[error("entity `{name}` recursively depends on itself")]
    DependencyCycle { name: String },

    /// A forward-declaration target turned out not to be an interface.
    #[error("entity `{name}` should be an interface type")]
    NotAnInterface { name: String },

    /// A textual type reference could not be decomposed.
    #[error("malformed type reference `{reference}`: {detail}")]
    MalformedType { reference: String, detail: String },

    /// A registry or declaration file could not be parsed.
    #[error("bad input {}: {detail}", path.display())]
    BadRegistry { path: PathBuf, detail: String },

    /// Reading a provider source or writing an output file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The effective configuration is unusable (e.g. no output directory).
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Attach a path to a raw `std::io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
