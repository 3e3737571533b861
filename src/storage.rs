//! Byte storage addressed by uri.

use dashmap::DashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{LabelError, Result};

const FILE_SCHEME: &str = "file://";
const SCHEME_SEPARATOR: &str = "://";

/// Read, write and existence checks on label file contents.
pub trait FileStorage: Send + Sync {
    fn exists(&self, uri: &str) -> bool;

    /// Fails with [`LabelError::NotFound`] when nothing is stored at `uri`.
    fn read_bytes(&self, uri: &str) -> Result<Vec<u8>>;

    fn write_bytes(&self, uri: &str, data: &[u8]) -> Result<()>;
}

/// Local filesystem storage for plain paths and `file://` uris.
///
/// Any other scheme is treated as unreachable: it never exists and cannot be
/// written to.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn local_path(uri: &str) -> Option<PathBuf> {
        if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
            Some(PathBuf::from(path))
        } else if uri.contains(SCHEME_SEPARATOR) {
            None
        } else {
            Some(PathBuf::from(uri))
        }
    }
}

impl FileStorage for LocalStorage {
    fn exists(&self, uri: &str) -> bool {
        Self::local_path(uri).is_some_and(|path| path.is_file())
    }

    fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let not_found = || LabelError::NotFound {
            uri: uri.to_string(),
        };
        let path = Self::local_path(uri).ok_or_else(not_found)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => not_found(),
            _ => LabelError::Io(e),
        })
    }

    fn write_bytes(&self, uri: &str, data: &[u8]) -> Result<()> {
        let path =
            Self::local_path(uri).ok_or_else(|| LabelError::UnsupportedUri(uri.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_parent_dir(parent)?;
        }
        fs::write(&path, data)?;
        Ok(())
    }
}

fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    if !path.is_dir() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// In-process storage keyed by uri.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: DashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&self, uri: &str) -> Option<Vec<u8>> {
        self.files.remove(uri).map(|(_, data)| data)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileStorage for MemoryStorage {
    fn exists(&self, uri: &str) -> bool {
        self.files.contains_key(uri)
    }

    fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        self.files
            .get(uri)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LabelError::NotFound {
                uri: uri.to_string(),
            })
    }

    fn write_bytes(&self, uri: &str, data: &[u8]) -> Result<()> {
        self.files.insert(uri.to_string(), data.to_vec());
        Ok(())
    }
}
