//! Optional TOML configuration.
//!
//! `idlbridge.toml` supplies defaults for values the command line can
//! override; an explicit flag always wins over a file value.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "idlbridge.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Output directory root.
    pub out: Option<PathBuf>,
    /// Backend names to run ("typescript", "native").
    pub backends: Option<Vec<String>>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Load an explicitly named file, or `idlbridge.toml` from the
    /// working directory when present, or the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Config::load(path),
            None => {
                let fallback = Path::new(CONFIG_FILE);
                if fallback.exists() {
                    Config::load(fallback)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "out = \"generated\"").unwrap();
        writeln!(file, "backends = [\"typescript\"]").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.out, Some(PathBuf::from("generated")));
        assert_eq!(config.backends, Some(vec!["typescript".to_string()]));
    }

    #[test]
    fn test_malformed_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "out = [").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(Error::Config(_))
        ));
    }
}
