//! Document and Blob types.
//!
//! This module provides the `Document` and `Blob` types for storing text and
//! associated metadata, plus the [`DocumentLoader`] trait implemented by
//! loaders in this crate.
//!
//! # Documents
//!
//! A [`Document`] is the normalized output record of a load operation: text
//! content plus a metadata map. Documents are immutable value records, created
//! once per load call, with no persistence.
//!
//! # Blobs
//!
//! Blobs represent raw data by either reference (path) or value (in-memory
//! data). They decouple reading file bytes from partitioning, so a
//! [`Partitioner`](crate::partition::Partitioner) never touches the
//! filesystem itself.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Represents raw data by reference (path) or value (in-memory bytes).
///
/// # Example: Load from memory
///
/// ```
/// use unstructured_loader::Blob;
///
/// let blob = Blob::from_data("Hello, world!");
/// assert_eq!(blob.as_bytes().unwrap(), b"Hello, world!");
/// ```
///
/// # Example: Load from file
///
/// ```no_run
/// use unstructured_loader::Blob;
///
/// let blob = Blob::from_path("path/to/file.pdf");
/// let bytes = blob.as_bytes().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Raw bytes, or None if referencing a file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,

    /// MIME type (not to be confused with file extension).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,

    /// Path to the file (if loading from the filesystem).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Blob {
    /// Create a Blob from a file path (lazy - data not read until needed).
    ///
    /// The MIME type is guessed from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path_buf = path.as_ref().to_path_buf();
        let mimetype = mime_guess::from_path(&path_buf)
            .first()
            .map(|m| m.to_string());

        Self {
            data: None,
            mimetype,
            path: Some(path_buf),
        }
    }

    /// Create a Blob from in-memory string data.
    pub fn from_data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into().into_bytes()),
            mimetype: Some("text/plain".to_string()),
            path: None,
        }
    }

    /// Create a Blob from in-memory bytes.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            mimetype: Some("application/octet-stream".to_string()),
            path: None,
        }
    }

    /// Builder method to set the MIME type.
    #[must_use]
    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// Get the source location of the blob (its path, if any).
    #[must_use]
    pub fn source(&self) -> Option<String> {
        self.path.as_ref().map(|p| p.display().to_string())
    }

    /// File name component of the blob's path, if any.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
    }

    /// Read the blob as bytes.
    ///
    /// If the blob references a file, reads the file. If the blob contains
    /// in-memory data, returns a copy of it.
    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        match &self.data {
            Some(bytes) => Ok(bytes.clone()),
            None => {
                if let Some(path) = &self.path {
                    std::fs::read(path).map_err(std::convert::Into::into)
                } else {
                    Err(Error::InvalidInput(
                        "Blob has no data or path to read from".to_string(),
                    ))
                }
            }
        }
    }
}

impl std::fmt::Display for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Blob")?;
        if let Some(source) = self.source() {
            write!(f, " {source}")?;
        }
        Ok(())
    }
}

/// A document with text content and metadata.
///
/// Each document contains:
/// - `page_content`: the text content (empty for page-break markers)
/// - `metadata`: key-value pairs (`source`, `category`, `page_number`, ...)
/// - `id`: optional unique identifier
///
/// # Example
///
/// ```
/// use unstructured_loader::Document;
///
/// let doc = Document::new("Hello, world!")
///     .with_metadata("source", "example.txt".to_string())
///     .with_metadata("page_number", 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The text content of the document.
    pub page_content: String,

    /// Metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Optional unique identifier for the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Document {
    /// Create a new document with the given text content.
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: HashMap::new(),
            id: None,
        }
    }

    /// Add metadata to the document (builder pattern).
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the document ID (builder pattern).
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Get metadata value by key.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Set metadata value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.into(), value.into());
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.metadata.is_empty() {
            write!(f, "page_content='{}'", self.page_content)
        } else {
            write!(
                f,
                "page_content='{}' metadata={:?}",
                self.page_content, self.metadata
            )
        }
    }
}

/// Trait for loading documents from a source.
///
/// The lazy mode is the required method: implementations produce documents
/// incrementally through a stream, suspending between records while awaiting
/// engine output. Each call to [`lazy_load`](DocumentLoader::lazy_load)
/// starts a fresh, independent pass; dropping the stream stops further engine
/// calls. [`load`](DocumentLoader::load) is a convenience that collects the
/// stream into a `Vec`.
///
/// # Example
///
/// ```rust,ignore
/// use futures::StreamExt;
///
/// let loader = UnstructuredLoader::from_path("example.pdf");
/// let mut stream = loader.lazy_load();
/// while let Some(doc) = stream.next().await {
///     println!("{}", doc?.page_content);
/// }
/// ```
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Produce documents incrementally as a stream.
    ///
    /// The stream is finite and restartable: calling this again runs a fresh
    /// load. The whole operation fails on the first unrecoverable error; no
    /// partial-result-with-warning mode exists.
    fn lazy_load(&self) -> BoxStream<'_, Result<Document>>;

    /// Load all documents from the source into memory.
    async fn load(&self) -> Result<Vec<Document>> {
        self.lazy_load().try_collect().await
    }
}
