//! Output sinks.
//!
//! A sink owns the "current file" of an emission run: the driver opens a
//! target by relative path, the backend streams text into it, and the
//! driver closes it again. The filesystem sink creates parent
//! directories and truncates existing files; the in-memory sink backs
//! the tests.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Destination for generated text.
pub trait OutputSink {
    /// Open (and truncate) the target addressed by `rel_path`, closing
    /// any previously open target.
    fn create(&mut self, rel_path: &str) -> Result<()>;

    /// Append text to the open target.
    fn write(&mut self, text: &str) -> Result<()>;

    /// Flush and close the open target.
    fn close(&mut self) -> Result<()>;
}

/// Writes generated files below a root directory.
pub struct FsSink {
    root: PathBuf,
    current: Option<(PathBuf, fs::File)>,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsSink {
            root: root.into(),
            current: None,
        }
    }
}

impl OutputSink for FsSink {
    fn create(&mut self, rel_path: &str) -> Result<()> {
        self.close()?;
        let path = self.root.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = fs::File::create(&path).map_err(|e| Error::io(&path, e))?;
        self.current = Some((path, file));
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        match &mut self.current {
            Some((path, file)) => file
                .write_all(text.as_bytes())
                .map_err(|e| Error::io(path.clone(), e)),
            None => Err(Error::io(
                self.root.clone(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no open output file"),
            )),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some((path, mut file)) = self.current.take() {
            file.flush().map_err(|e| Error::io(path, e))?;
        }
        Ok(())
    }
}

/// Collects generated files in memory, for tests.
#[derive(Default)]
pub struct MemorySink {
    files: BTreeMap<String, String>,
    current: Option<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Content of a generated file, if present.
    pub fn file(&self, rel_path: &str) -> Option<&str> {
        self.files.get(rel_path).map(String::as_str)
    }

    /// All generated file paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }
}

impl OutputSink for MemorySink {
    fn create(&mut self, rel_path: &str) -> Result<()> {
        self.files.insert(rel_path.to_string(), String::new());
        self.current = Some(rel_path.to_string());
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let current = self.current.as_ref().expect("no open output file");
        self.files
            .get_mut(current)
            .expect("current file exists")
            .push_str(text);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }
}
