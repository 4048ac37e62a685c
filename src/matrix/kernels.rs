//! Kernel source loading

use crate::error::{BenchError, Result};
use std::path::{Path, PathBuf};

/// Kernel program text, read once before any device work.
#[derive(Debug, Clone)]
pub struct KernelSource {
    path: PathBuf,
    text: String,
}

impl KernelSource {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Self {
                text: String::from_utf8_lossy(&bytes).into_owned(),
                path,
            }),
            Err(source) => Err(BenchError::KernelSource { path, source }),
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            path: PathBuf::from("<inline>"),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
