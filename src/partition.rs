//! Partitioning engine abstraction.
//!
//! Local-vs-remote engine selection is a polymorphic capability, not a flag
//! branched on deep in the call path: the [`Partitioner`] trait has one
//! variant per engine. [`ApiPartitioner`] delegates to the hosted Unstructured
//! partition API over HTTP; [`LocalPartitioner`] handles PDF, HTML, and plain
//! text in-process for workflows that cannot reach the API.
//!
//! The remote engine always returns per-element granularity regardless of the
//! loader's requested mode. That asymmetry is part of the public contract of
//! the service being wrapped and is surfaced through
//! [`Partitioner::supports_mode_aggregation`] rather than papered over.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::documents::Blob;
use crate::elements::{Coordinates, Element, ElementCategory, ElementMetadata};
use crate::error::{Error, Result};

/// Default endpoint of the hosted partition API.
pub const DEFAULT_API_URL: &str = "https://api.unstructuredapp.io/general/v0/general";

/// Environment variable consulted for the API key when none is set explicitly.
pub const API_KEY_ENV_VAR: &str = "UNSTRUCTURED_API_KEY";

/// Environment variable consulted for the server URL when none is set explicitly.
pub const API_URL_ENV_VAR: &str = "UNSTRUCTURED_URL";

/// Total request timeout for engine HTTP calls.
///
/// Partitioning large documents under hi-res strategies is slow, so this is
/// deliberately generous.
pub const DEFAULT_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connect timeout for engine HTTP calls.
pub const DEFAULT_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Create an HTTP client with standard timeouts.
fn create_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_REQUEST_TIMEOUT)
        .connect_timeout(DEFAULT_HTTP_CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Partitioning strategy hint passed through to the engine.
///
/// Affects extraction quality and whether tables/images are detected as
/// distinct categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// Let the engine pick per document type (default).
    #[default]
    Auto,
    /// Fast text-based extraction; no layout model, no table detection.
    Fast,
    /// High-resolution layout analysis; detects tables and images.
    HiRes,
    /// OCR everything, for scanned documents.
    OcrOnly,
}

impl PartitionStrategy {
    /// The wire string for this strategy.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            PartitionStrategy::Auto => "auto",
            PartitionStrategy::Fast => "fast",
            PartitionStrategy::HiRes => "hi_res",
            PartitionStrategy::OcrOnly => "ocr_only",
        }
    }
}

/// Recognized engine options, plus a typed escape hatch for everything else.
///
/// Replaces the dynamic keyword-passthrough of older wrappers: the options a
/// loader actually interprets are explicit fields, and `extra` carries opaque
/// engine-specific options forward verbatim.
#[derive(Debug, Clone, Default)]
pub struct PartitionOptions {
    /// Partitioning strategy hint.
    pub strategy: PartitionStrategy,
    /// Emit a zero-content `PageBreak` element after each page.
    pub include_page_breaks: bool,
    /// Ask the engine for layout coordinates on each element.
    pub coordinates: bool,
    /// Languages to assume/detect; defaults to `["eng"]` when empty.
    pub languages: Vec<String>,
    /// Opaque engine-specific options, sent to the remote engine as-is and
    /// ignored by the local one.
    pub extra: HashMap<String, serde_json::Value>,
}

impl PartitionOptions {
    /// Languages to report on elements, falling back to English.
    #[must_use]
    pub fn effective_languages(&self) -> Vec<String> {
        if self.languages.is_empty() {
            vec!["eng".to_string()]
        } else {
            self.languages.clone()
        }
    }
}

/// A partitioning engine: turns raw content into a sequence of elements.
///
/// Implementations must be pure with respect to their input - no mutation of
/// source files, no state carried between calls.
#[async_trait]
pub trait Partitioner: Send + Sync {
    /// Partition the content of a blob (a file's bytes plus its mimetype).
    async fn partition_blob(&self, blob: &Blob, options: &PartitionOptions)
        -> Result<Vec<Element>>;

    /// Partition the content behind a web URL.
    async fn partition_url(&self, url: &Url, options: &PartitionOptions) -> Result<Vec<Element>>;

    /// Whether the loader may re-aggregate this engine's elements by mode.
    ///
    /// The remote API always returns per-element granularity and ignores the
    /// requested mode; this reports that constraint so the loader can warn
    /// instead of silently diverging from the wrapped service's behavior.
    fn supports_mode_aggregation(&self) -> bool {
        true
    }
}

// ============================================================================
// Remote engine
// ============================================================================

/// Remote partitioning engine backed by the hosted Unstructured API.
///
/// # Example
///
/// ```no_run
/// use unstructured_loader::ApiPartitioner;
///
/// let engine = ApiPartitioner::new()
///     .with_api_key("my-key")
///     .with_server_url("https://api.unstructuredapp.io/general/v0/general");
/// ```
#[derive(Debug, Clone)]
pub struct ApiPartitioner {
    client: reqwest::Client,
    api_key: String,
    server_url: String,
}

impl Default for ApiPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiPartitioner {
    /// Create a partitioner pointed at the hosted API.
    ///
    /// The API key and server URL fall back to the `UNSTRUCTURED_API_KEY` and
    /// `UNSTRUCTURED_URL` environment variables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: create_http_client(),
            api_key: std::env::var(API_KEY_ENV_VAR).unwrap_or_default(),
            server_url: std::env::var(API_URL_ENV_VAR)
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        }
    }

    /// Set the API key (builder pattern).
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the partition endpoint URL (builder pattern).
    #[must_use]
    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    fn require_api_key(&self) -> Result<&str> {
        if self.api_key.is_empty() {
            return Err(Error::Authentication(format!(
                "remote partitioning requires an API key; pass one explicitly or set {API_KEY_ENV_VAR}"
            )));
        }
        Ok(&self.api_key)
    }

    /// Common option fields of the partition request form.
    fn options_form(options: &PartitionOptions) -> reqwest::multipart::Form {
        let mut form = reqwest::multipart::Form::new()
            .text("strategy", options.strategy.as_str().to_string());
        if options.include_page_breaks {
            form = form.text("include_page_breaks", "true");
        }
        if options.coordinates {
            form = form.text("coordinates", "true");
        }
        for language in &options.languages {
            form = form.text("languages", language.clone());
        }
        for (key, value) in &options.extra {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), rendered);
        }
        form
    }

    async fn send(&self, form: reqwest::multipart::Form) -> Result<Vec<Element>> {
        let api_key = self.require_api_key()?;
        tracing::debug!(url = %self.server_url, "dispatching partition request");

        let response = self
            .client
            .post(&self.server_url)
            .header("unstructured-api-key", api_key)
            .header("accept", "application/json")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Authentication(format!(
                "partition API rejected credentials (status {status}): {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Engine(format!(
                "partition API returned status {status}: {body}"
            )));
        }

        let body = response.text().await?;
        let elements: Vec<Element> = serde_json::from_str(&body)?;
        Ok(elements)
    }
}

#[async_trait]
impl Partitioner for ApiPartitioner {
    async fn partition_blob(
        &self,
        blob: &Blob,
        options: &PartitionOptions,
    ) -> Result<Vec<Element>> {
        let bytes = blob.as_bytes()?;
        let filename = blob.filename().unwrap_or_else(|| "file".to_string());

        let mut part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        if let Some(mimetype) = &blob.mimetype {
            part = part
                .mime_str(mimetype)
                .map_err(|e| Error::InvalidInput(format!("bad mimetype for upload: {e}")))?;
        }
        let form = Self::options_form(options).part("files", part);

        self.send(form).await
    }

    async fn partition_url(&self, url: &Url, options: &PartitionOptions) -> Result<Vec<Element>> {
        let form = Self::options_form(options).text("url", url.to_string());
        self.send(form).await
    }

    // The hosted API always partitions at element granularity.
    fn supports_mode_aggregation(&self) -> bool {
        false
    }
}

// ============================================================================
// Local engine
// ============================================================================

/// In-process partitioning engine for PDF, HTML, and plain text.
///
/// This is a deliberately simple engine: no layout model, no OCR. PDFs go
/// through `pdf-extract` with pages split on form feeds, HTML goes through
/// `scraper` with tag-based categories, and plain text is split into pages on
/// form feeds and into elements on blank lines. Strategy hints beyond `fast`
/// behave identically here.
#[derive(Debug, Clone)]
pub struct LocalPartitioner {
    client: reqwest::Client,
}

impl Default for LocalPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPartitioner {
    /// Create a local partitioner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: create_http_client(),
        }
    }

    /// Partition pre-extracted text, one `&str` per page.
    fn partition_pages<'a>(
        pages: impl Iterator<Item = &'a str>,
        options: &PartitionOptions,
        template: &ElementMetadata,
    ) -> Vec<Element> {
        let languages = options.effective_languages();
        let mut elements = Vec::new();
        let mut page_number: u32 = 0;

        for page in pages {
            if page.trim().is_empty() {
                continue;
            }
            page_number += 1;

            let layout_width = page.lines().map(str::len).max().unwrap_or(0) as f64;
            let layout_height = page.lines().count() as f64;
            let mut line: f64 = 0.0;

            for paragraph in page.split("\n\n") {
                let paragraph_lines = paragraph.lines().count().max(1) as f64;
                let text = paragraph.trim();
                if text.is_empty() {
                    line += paragraph_lines + 1.0;
                    continue;
                }
                let category = if is_title(text) {
                    ElementCategory::Title
                } else {
                    ElementCategory::NarrativeText
                };
                let width = text.lines().map(str::len).max().unwrap_or(0) as f64;
                let mut element = Element::new(category, text, page_number);
                element.metadata = ElementMetadata {
                    page_number: Some(page_number),
                    languages: Some(languages.clone()),
                    coordinates: Some(Coordinates {
                        points: vec![
                            (0.0, line),
                            (0.0, line + paragraph_lines),
                            (width, line + paragraph_lines),
                            (width, line),
                        ],
                        system: "TextSpace".to_string(),
                        layout_width: Some(layout_width),
                        layout_height: Some(layout_height),
                    }),
                    ..template.clone()
                };
                elements.push(element);
                line += paragraph_lines + 1.0;
            }

            if options.include_page_breaks {
                elements.push(page_break(page_number, template));
            }
        }

        elements
    }

    /// Partition an HTML document using tag-based categories.
    fn partition_html(
        html: &str,
        options: &PartitionOptions,
        template: &ElementMetadata,
    ) -> Result<Vec<Element>> {
        let document = scraper::Html::parse_document(html);
        let selector = scraper::Selector::parse("title, h1, h2, h3, h4, h5, h6, p, li")
            .map_err(|e| Error::Engine(format!("failed to build HTML selector: {e}")))?;

        let languages = options.effective_languages();
        let mut elements = Vec::new();

        for node in document.select(&selector) {
            let text = node.text().collect::<String>().trim().to_string();
            if text.is_empty() {
                continue;
            }
            let category = match node.value().name() {
                "p" => ElementCategory::NarrativeText,
                "li" => ElementCategory::ListItem,
                _ => ElementCategory::Title,
            };
            let mut element = Element::new(category, text, 1);
            element.metadata = ElementMetadata {
                page_number: Some(1),
                languages: Some(languages.clone()),
                ..template.clone()
            };
            elements.push(element);
        }

        if options.include_page_breaks && !elements.is_empty() {
            elements.push(page_break(1, template));
        }

        Ok(elements)
    }
}

#[async_trait]
impl Partitioner for LocalPartitioner {
    async fn partition_blob(
        &self,
        blob: &Blob,
        options: &PartitionOptions,
    ) -> Result<Vec<Element>> {
        let bytes = blob.as_bytes()?;
        let mimetype = blob.mimetype.clone();
        let template = ElementMetadata {
            filename: blob.filename(),
            filetype: mimetype.clone().or_else(|| Some("text/plain".to_string())),
            ..ElementMetadata::default()
        };
        let options = options.clone();

        // PDF extraction is CPU-bound; keep it off the async runtime.
        tokio::task::spawn_blocking(move || match mimetype.as_deref() {
            Some("application/pdf") => {
                let text = pdf_extract::extract_text_from_mem(&bytes)
                    .map_err(|e| Error::Engine(format!("failed to extract PDF text: {e}")))?;
                // pdf-extract separates pages with form feeds
                Ok(Self::partition_pages(text.split('\x0C'), &options, &template))
            }
            Some("text/html") => {
                let html = String::from_utf8_lossy(&bytes);
                Self::partition_html(&html, &options, &template)
            }
            _ => {
                let text = String::from_utf8_lossy(&bytes);
                Ok(Self::partition_pages(text.split('\x0C'), &options, &template))
            }
        })
        .await
        .map_err(|e| Error::Engine(format!("partition task failed: {e}")))?
    }

    async fn partition_url(&self, url: &Url, options: &PartitionOptions) -> Result<Vec<Element>> {
        tracing::debug!(%url, "fetching URL for local partitioning");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::SourceNotFound(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SourceNotFound(format!(
                "{url}: server returned status {status}"
            )));
        }

        let html = response.text().await?;
        let template = ElementMetadata {
            filetype: Some("text/html".to_string()),
            url: Some(url.to_string()),
            ..ElementMetadata::default()
        };
        Self::partition_html(&html, options, &template)
    }
}

/// Zero-content page-break marker carrying the page it closes.
fn page_break(page_number: u32, template: &ElementMetadata) -> Element {
    let mut element = Element::new(ElementCategory::PageBreak, "", page_number);
    element.metadata = ElementMetadata {
        page_number: Some(page_number),
        ..template.clone()
    };
    element
}

/// Heuristic title detection for plain-text partitioning: a short single
/// line without terminal punctuation.
fn is_title(text: &str) -> bool {
    !text.contains('\n')
        && text.len() <= 80
        && !text.ends_with(['.', '!', '?', ':', ';', ','])
}
