//! Named text resources: schema documents, generated artifacts, payloads.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use ontoloom_foundation::{Error, ErrorKind, Result};
use parking_lot::Mutex;

/// A flat namespace of text resources.
pub trait BlobStore: Send + Sync {
    /// Resource names, sorted.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the store cannot be listed.
    fn list(&self) -> Result<Vec<String>>;

    /// Reads a resource.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if there is no such resource.
    fn read(&self, name: &str) -> Result<String>;

    /// Creates or replaces a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the write fails.
    fn write(&self, name: &str, text: &str) -> Result<()>;

    /// Removes a resource.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if there is no such resource.
    fn delete(&self, name: &str) -> Result<()>;
}

/// Blob store held in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, String>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource, builder style.
    #[must_use]
    pub fn with(self, name: &str, text: &str) -> Self {
        self.blobs.lock().insert(name.to_string(), text.to_string());
        self
    }
}

impl BlobStore for MemoryBlobStore {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.blobs.lock().keys().cloned().collect())
    }

    fn read(&self, name: &str) -> Result<String> {
        self.blobs
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::resource_not_found(name))
    }

    fn write(&self, name: &str, text: &str) -> Result<()> {
        check_name(name)?;
        self.blobs.lock().insert(name.to_string(), text.to_string());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.blobs
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::resource_not_found(name))
    }
}

/// Blob store backed by one directory; each resource is a file.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Uses `root`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| io_error(&format!("create {}", root.display()), &e))?;
        Ok(Self { root })
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        check_name(name)?;
        Ok(self.root.join(name))
    }
}

impl BlobStore for FsBlobStore {
    fn list(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| io_error(&format!("list {}", self.root.display()), &e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&format!("list {}", self.root.display()), &e))?;
            if entry.file_type().is_ok_and(|t| t.is_file()) {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, name: &str) -> Result<String> {
        fs::read_to_string(self.path(name)?).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::resource_not_found(name),
            _ => io_error(&format!("read {name}"), &e),
        })
    }

    fn write(&self, name: &str, text: &str) -> Result<()> {
        fs::write(self.path(name)?, text).map_err(|e| io_error(&format!("write {name}"), &e))
    }

    fn delete(&self, name: &str) -> Result<()> {
        fs::remove_file(self.path(name)?).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::resource_not_found(name),
            _ => io_error(&format!("delete {name}"), &e),
        })
    }
}

/// Names are plain file names: no separators, no parent references.
fn check_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(Error::new(ErrorKind::IoError(format!(
            "invalid resource name {name:?}"
        ))));
    }
    Ok(())
}

fn io_error(action: &str, err: &io::Error) -> Error {
    Error::new(ErrorKind::IoError(format!("failed to {action}: {err}")))
}
