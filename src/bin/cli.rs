//! idlbridge CLI - interface-definition compiler.
//!
//! Usage:
//!   idlbridge registry.json --out generated
//!   idlbridge core.json office.json --scope entities.lst --out generated
//!   idlbridge registries/ --backend typescript --out generated

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use idlbridge::cli::{BackendChoice, Cli};
use idlbridge::config::Config;
use idlbridge::{generate, GenerateOptions};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::discover(cli.config.as_deref())?;

    let out_dir = cli
        .out
        .or(config.out)
        .ok_or_else(|| anyhow::anyhow!("no output directory (pass --out or set it in config)"))?;

    // Flags win; the config only fills gaps.
    let backends = if cli.backend.is_empty() {
        config
            .backends
            .unwrap_or_default()
            .iter()
            .map(|name| {
                BackendChoice::parse_name(name)
                    .ok_or_else(|| anyhow::anyhow!("unknown backend `{name}` in config"))
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        cli.backend
    };

    generate(&GenerateOptions {
        sources: cli.sources,
        scope: cli.scope,
        out_dir,
        backends,
    })?;
    Ok(())
}
