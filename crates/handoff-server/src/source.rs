//! Where artifacts come from.
//!
//! The bridge only needs "bytes plus a content type for this subject".
//! [`DirectorySource`] serves pre-rendered files from a local directory.

use async_trait::async_trait;
use handoff_core::ArtifactConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A rendered artifact ready to be sealed.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// No artifact exists for the subject and no default is configured.
    #[error("no artifact for subject")]
    NotFound,

    /// The subject id cannot name a file inside the artifact directory.
    #[error("subject id is not a valid artifact name")]
    InvalidSubject,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces the artifact to deliver for a subject.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    async fn fetch(&self, subject_id: &str) -> Result<Artifact, SourceError>;
}

/// Serves `<directory>/<subject>.<ext>`, falling back to a default file.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    directory: PathBuf,
    default_file: Option<PathBuf>,
}

impl DirectorySource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            default_file: None,
        }
    }

    pub fn from_config(config: &ArtifactConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            default_file: config.default_file.clone(),
        }
    }

    /// File served when no subject-specific artifact exists. Relative paths
    /// are taken from the artifact directory.
    pub fn with_default_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_file = Some(path.into());
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Find the file whose stem equals the subject id. When several
    /// extensions exist, the lexicographically smallest name wins.
    async fn find_subject_file(&self, subject_id: &str) -> Result<Option<PathBuf>, SourceError> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    directory = %self.directory.display(),
                    "Artifact directory does not exist"
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut best: Option<PathBuf> = None;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) != Some(subject_id) {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if best.as_ref().is_none_or(|b| path < *b) {
                best = Some(path);
            }
        }
        Ok(best)
    }

    fn default_path(&self) -> Option<PathBuf> {
        self.default_file.as_ref().map(|file| {
            if file.is_absolute() {
                file.clone()
            } else {
                self.directory.join(file)
            }
        })
    }
}

/// Subject ids become file stems, so anything that could step outside the
/// directory is refused.
fn is_safe_stem(subject_id: &str) -> bool {
    !subject_id.is_empty()
        && !subject_id.starts_with('.')
        && !subject_id.contains(['/', '\\', '\0'])
}

#[async_trait]
impl ArtifactSource for DirectorySource {
    async fn fetch(&self, subject_id: &str) -> Result<Artifact, SourceError> {
        if !is_safe_stem(subject_id) {
            return Err(SourceError::InvalidSubject);
        }

        let path = match self.find_subject_file(subject_id).await? {
            Some(path) => path,
            None => self.default_path().ok_or(SourceError::NotFound)?,
        };

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Loaded artifact");
        Ok(Artifact {
            bytes,
            content_type,
        })
    }
}
