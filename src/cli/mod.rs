//! CLI argument surface for idlbridge.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "idlbridge")]
#[command(about = "Generate TypeScript declarations and a C++ bridge from entity registries")]
pub struct Cli {
    /// Registry files (.json) or declaration-tree directories, in
    /// resolution order
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Output directory root
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// File listing the entities to include (space-separated names);
    /// defaults to everything the sources publish
    #[arg(short, long)]
    pub scope: Option<PathBuf>,

    /// Backends to run
    #[arg(short, long, value_enum)]
    pub backend: Vec<BackendChoice>,

    /// Config file (default: ./idlbridge.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    Typescript,
    Native,
}

impl BackendChoice {
    pub fn parse_name(name: &str) -> Option<Self> {
        match name {
            "typescript" => Some(BackendChoice::Typescript),
            "native" => Some(BackendChoice::Native),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let cli = Cli::try_parse_from(["idlbridge", "registry.json", "--out", "gen"]).unwrap();
        assert_eq!(cli.sources, vec![PathBuf::from("registry.json")]);
        assert_eq!(cli.out, Some(PathBuf::from("gen")));
        assert!(cli.backend.is_empty());
    }

    #[test]
    fn test_parse_backends_and_scope() {
        let cli = Cli::try_parse_from([
            "idlbridge",
            "a.json",
            "b.json",
            "--out",
            "gen",
            "--scope",
            "entities.lst",
            "--backend",
            "typescript",
            "--backend",
            "native",
        ])
        .unwrap();
        assert_eq!(cli.sources.len(), 2);
        assert_eq!(
            cli.backend,
            vec![BackendChoice::Typescript, BackendChoice::Native]
        );
        assert_eq!(cli.scope, Some(PathBuf::from("entities.lst")));
    }

    #[test]
    fn test_sources_required() {
        assert!(Cli::try_parse_from(["idlbridge", "--out", "gen"]).is_err());
    }
}
