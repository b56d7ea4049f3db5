//! On-disk storage for uploaded documents.
//!
//! Each upload is written as `{id}{ext}` next to a `{id}.json` metadata file
//! inside the documents directory. Ids are random hex strings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{extension_of, DocumentReference, DEFAULT_CONTENT_TYPE};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid document metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Metadata persisted beside each stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    #[serde(default)]
    pub extension: String,
    pub stored_path: PathBuf,
}

impl StoredDocument {
    /// Reference used by the extractors.
    pub fn reference(&self) -> DocumentReference {
        let mut doc = DocumentReference::new(
            self.stored_path.clone(),
            &self.filename,
            Some(&self.content_type),
        )
        .with_id(self.id.clone());
        if !self.extension.is_empty() {
            doc.extension = self.extension.to_lowercase();
        }
        doc
    }

    pub fn is_pdf(&self) -> bool {
        self.extension.eq_ignore_ascii_case(".pdf")
    }
}

/// Ids are generated as hex; anything else cannot name a stored file and
/// must not be allowed to escape the documents directory.
fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Directory-backed document store.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    /// Persist an upload and its metadata.
    pub fn save(
        &self,
        filename: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredDocument, StorageError> {
        let id = Uuid::new_v4().simple().to_string();
        let extension = extension_of(Path::new(filename));
        let stored_path = self.root.join(format!("{}{}", id, extension));
        fs::write(&stored_path, bytes)?;

        let filename = if filename.is_empty() {
            stored_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            filename.to_string()
        };
        let record = StoredDocument {
            id: id.clone(),
            filename,
            content_type: content_type
                .filter(|ct| !ct.is_empty())
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
            extension,
            stored_path,
        };
        fs::write(
            self.metadata_path(&id),
            serde_json::to_string_pretty(&record)?,
        )?;

        debug!("stored {} as {}", record.filename, id);
        Ok(record)
    }

    /// Look up a stored document by id.
    ///
    /// Without a metadata file, the first `{id}.*` file in the store is used
    /// and its content type inferred from the extension.
    pub fn load(&self, id: &str) -> Result<StoredDocument, StorageError> {
        if !valid_id(id) {
            return Err(StorageError::NotFound(id.to_string()));
        }

        let meta_path = self.metadata_path(id);
        if meta_path.exists() {
            let record: StoredDocument = serde_json::from_str(&fs::read_to_string(meta_path)?)?;
            return Ok(record);
        }

        let prefix = format!("{}.", id);
        let mut matches: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && !n.ends_with(".json"))
            })
            .collect();
        matches.sort();

        let Some(stored_path) = matches.into_iter().next() else {
            return Err(StorageError::NotFound(id.to_string()));
        };
        warn!("no metadata for {}, using {}", id, stored_path.display());

        let extension = extension_of(&stored_path);
        let content_type = if extension == ".pdf" {
            "application/pdf"
        } else {
            DEFAULT_CONTENT_TYPE
        };
        Ok(StoredDocument {
            id: id.to_string(),
            filename: stored_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            content_type: content_type.to_string(),
            extension,
            stored_path,
        })
    }
}
