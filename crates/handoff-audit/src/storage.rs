//! Audit storage backends.

use crate::error::AuditError;
use crate::event::AuditEvent;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Trait for audit storage backends.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Store an audit event.
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Console storage (JSON lines on stdout).
#[derive(Debug, Default)]
pub struct ConsoleStorage;

impl ConsoleStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for ConsoleStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;
        println!("{}", json);
        Ok(())
    }
}

/// File storage (appends JSON lines to a file).
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes appends so concurrent lines never interleave.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Create a new file storage, creating parent directories as needed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;

        let _guard = self
            .lock
            .lock()
            .map_err(|e| AuditError::StorageError(format!("Failed to acquire file lock: {}", e)))?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}

/// Fans each event out to several backends.
///
/// Every backend is attempted; the first error is returned.
pub struct MultiStorage {
    backends: Vec<Arc<dyn AuditStorage>>,
}

impl MultiStorage {
    pub fn new(backends: Vec<Arc<dyn AuditStorage>>) -> Self {
        Self { backends }
    }
}

#[async_trait]
impl AuditStorage for MultiStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut first_error = None;
        for backend in &self.backends {
            if let Err(e) = backend.store(event.clone()).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullStorage;

impl NullStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for NullStorage {
    async fn store(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Keeps events in memory. Useful for tests and local inspection.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events stored so far, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .map_err(|e| AuditError::StorageError(format!("Failed to acquire lock: {}", e)))?
            .push(event);
        Ok(())
    }
}
