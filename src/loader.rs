//! The Unstructured document loader.
//!
//! [`UnstructuredLoader`] accepts a file path, a list of file paths, or a web
//! URL, hands each source to a [`Partitioner`], and normalizes the resulting
//! elements into [`Document`]s according to the configured [`Mode`].
//!
//! # Example
//!
//! ```no_run
//! use unstructured_loader::{DocumentLoader, Mode, UnstructuredLoader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = UnstructuredLoader::from_path("layout-parser-paper.pdf")
//!     .with_mode(Mode::Elements)
//!     .with_include_page_breaks(true);
//!
//! let documents = loader.load().await?;
//! println!("Loaded {} documents", documents.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Remote partitioning
//!
//! ```no_run
//! use unstructured_loader::{DocumentLoader, PartitionStrategy, UnstructuredLoader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = UnstructuredLoader::from_path("layout-parser-paper.pdf")
//!     .with_api_key("my-key")
//!     .with_strategy(PartitionStrategy::HiRes)
//!     .via_api();
//!
//! let documents = loader.load().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Under remote partitioning the API always returns per-element granularity;
//! a non-`Elements` mode is ignored with a warning. This mirrors the wrapped
//! service's behavior and is kept as a compatibility constraint.

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

use crate::documents::{Blob, Document, DocumentLoader};
use crate::elements::{element_id, Element, ElementCategory};
use crate::error::{Error, Result};
use crate::partition::{ApiPartitioner, LocalPartitioner, PartitionOptions, PartitionStrategy, Partitioner};

/// A text post-processor applied to each element's text after extraction.
pub type PostProcessor = dyn Fn(&str) -> String + Send + Sync;

/// What the loader reads from. Exactly one source kind is active per loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A single file path.
    File(PathBuf),
    /// An ordered list of file paths; output preserves this order.
    Files(Vec<PathBuf>),
    /// A web URL, fetched and partitioned by the engine.
    WebUrl(Url),
}

/// Aggregation granularity for engine output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Concatenate all element texts into one document per source file.
    #[default]
    Single,
    /// One document per detected element, tagged with its category.
    Elements,
    /// Group elements by page; one document per page.
    Page,
}

impl Mode {
    /// The configuration string for this mode.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Mode::Single => "single",
            Mode::Elements => "elements",
            Mode::Page => "page",
        }
    }
}

/// Document loader wrapping the Unstructured partitioning engine.
///
/// Construction is builder-style; see the [module docs](self) for examples.
/// The loader itself is a single-pass transform: each `load`/`lazy_load`
/// call resolves the source afresh, and documents are immutable value
/// records.
#[derive(Clone)]
pub struct UnstructuredLoader {
    source: Source,
    mode: Mode,
    options: PartitionOptions,
    partitioner: Arc<dyn Partitioner>,
    post_processors: Vec<Arc<PostProcessor>>,
    api_key: Option<String>,
}

impl std::fmt::Debug for UnstructuredLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnstructuredLoader")
            .field("source", &self.source)
            .field("mode", &self.mode)
            .field("options", &self.options)
            .field("post_processors", &self.post_processors.len())
            .finish_non_exhaustive()
    }
}

impl UnstructuredLoader {
    fn with_source(source: Source) -> Self {
        Self {
            source,
            mode: Mode::default(),
            options: PartitionOptions::default(),
            partitioner: Arc::new(LocalPartitioner::new()),
            post_processors: Vec::new(),
            api_key: None,
        }
    }

    /// Load from a single file path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::with_source(Source::File(path.as_ref().to_path_buf()))
    }

    /// Load from an ordered list of file paths.
    ///
    /// Output preserves this order: documents from the first file come
    /// first, each carrying that file's `filename` metadata.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::with_source(Source::Files(
            paths
                .into_iter()
                .map(|p| p.as_ref().to_path_buf())
                .collect(),
        ))
    }

    /// Load from a web URL.
    #[must_use]
    pub fn from_url(url: Url) -> Self {
        Self::with_source(Source::WebUrl(url))
    }

    /// Set the aggregation mode (builder pattern).
    ///
    /// Only honored by engines that support mode aggregation; the remote API
    /// engine always returns per-element granularity and a non-`Elements`
    /// mode is ignored with a warning.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the partitioning strategy hint (builder pattern).
    #[must_use]
    pub fn with_strategy(mut self, strategy: PartitionStrategy) -> Self {
        self.options.strategy = strategy;
        self
    }

    /// Insert zero-content `PageBreak` marker documents between pages
    /// (builder pattern). Not applicable in [`Mode::Single`].
    #[must_use]
    pub fn with_include_page_breaks(mut self, include: bool) -> Self {
        self.options.include_page_breaks = include;
        self
    }

    /// Request layout coordinates on each element (builder pattern).
    #[must_use]
    pub fn with_coordinates(mut self, coordinates: bool) -> Self {
        self.options.coordinates = coordinates;
        self
    }

    /// Set the languages the engine should assume (builder pattern).
    #[must_use]
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Pass an opaque engine-specific option through verbatim (builder
    /// pattern). The escape hatch for options this crate does not model.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.extra.insert(key.into(), value.into());
        self
    }

    /// Append a post-processor applied, in registration order, to each
    /// non-empty element text after extraction (builder pattern).
    /// Post-processors never touch metadata.
    #[must_use]
    pub fn with_post_processor(
        mut self,
        post_processor: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.post_processors.push(Arc::new(post_processor));
        self
    }

    /// Set the API key used when partitioning via the remote API (builder
    /// pattern).
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Partition via the hosted Unstructured API instead of in-process.
    ///
    /// Uses the key from [`with_api_key`](Self::with_api_key), falling back
    /// to the `UNSTRUCTURED_API_KEY` environment variable.
    #[must_use]
    pub fn via_api(mut self) -> Self {
        let mut engine = ApiPartitioner::new();
        if let Some(key) = &self.api_key {
            engine = engine.with_api_key(key.clone());
        }
        self.partitioner = Arc::new(engine);
        self
    }

    /// Replace the partitioning engine with a custom implementation
    /// (builder pattern).
    #[must_use]
    pub fn with_partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    /// The configured source descriptor.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The configured aggregation mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Reject configurations with conflicting page-granularity requests.
    fn validate(&self) -> Result<()> {
        if self.mode == Mode::Page
            && self.options.extra.get("chunking_strategy").and_then(Value::as_str)
                == Some("by_page")
        {
            return Err(Error::InvalidInput(
                "only one of `chunking_strategy=\"by_page\"` or `Mode::Page` may be set; \
                 `chunking_strategy` is preferred"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// The mode actually applied, given the engine's granularity contract.
    fn effective_mode(&self) -> Mode {
        if self.mode != Mode::Elements && !self.partitioner.supports_mode_aggregation() {
            tracing::warn!(
                mode = self.mode.as_str(),
                "mode is ignored under API partitioning; elements granularity is used"
            );
            return Mode::Elements;
        }
        self.mode
    }

    /// Apply post-processors, in order, to each non-empty element text.
    fn post_process(&self, elements: &mut [Element]) {
        if self.post_processors.is_empty() {
            return;
        }
        for element in elements.iter_mut() {
            if element.text.is_empty() {
                continue;
            }
            for post_processor in &self.post_processors {
                element.text = post_processor(&element.text);
            }
        }
    }

    /// Partition one file and normalize the result.
    async fn load_file(&self, path: &Path) -> Result<Vec<Document>> {
        if !path.is_file() {
            return Err(Error::SourceNotFound(path.display().to_string()));
        }

        let blob = Blob::from_path(path);
        let mut base = HashMap::new();
        base.insert("source".to_string(), Value::from(path.display().to_string()));
        if let Some(filename) = blob.filename() {
            base.insert("filename".to_string(), Value::from(filename));
        }
        if let Some(filetype) = &blob.mimetype {
            base.insert("filetype".to_string(), Value::from(filetype.clone()));
        }

        tracing::debug!(path = %path.display(), mode = self.mode.as_str(), "partitioning file");
        let mut elements = self.partitioner.partition_blob(&blob, &self.options).await?;
        self.post_process(&mut elements);
        Ok(self.documents_from_elements(elements, &base))
    }

    /// Partition a web URL and normalize the result.
    async fn load_url(&self, url: &Url) -> Result<Vec<Document>> {
        let mut base = HashMap::new();
        base.insert("source".to_string(), Value::from(url.to_string()));
        base.insert("url".to_string(), Value::from(url.to_string()));

        tracing::debug!(%url, mode = self.mode.as_str(), "partitioning URL");
        let mut elements = self.partitioner.partition_url(url, &self.options).await?;
        self.post_process(&mut elements);
        Ok(self.documents_from_elements(elements, &base))
    }

    /// Map engine elements into normalized documents per the effective mode.
    ///
    /// Output order is by page, then by element, as produced by the engine.
    fn documents_from_elements(
        &self,
        elements: Vec<Element>,
        base: &HashMap<String, Value>,
    ) -> Vec<Document> {
        match self.effective_mode() {
            Mode::Elements => elements
                .into_iter()
                .map(|element| element_document(&element, base))
                .collect(),
            Mode::Single => {
                let merged = merge_elements(
                    elements
                        .iter()
                        .filter(|e| e.category != ElementCategory::PageBreak),
                    base,
                );
                merged.into_iter().collect()
            }
            Mode::Page => {
                // group by page in first-seen order
                let mut page_order: Vec<u32> = Vec::new();
                let mut pages: HashMap<u32, Vec<&Element>> = HashMap::new();
                for element in &elements {
                    if element.category == ElementCategory::PageBreak {
                        continue;
                    }
                    let page = element.metadata.page_number.unwrap_or(1);
                    pages.entry(page).or_insert_with(|| {
                        page_order.push(page);
                        Vec::new()
                    });
                    if let Some(group) = pages.get_mut(&page) {
                        group.push(element);
                    }
                }

                let mut documents = Vec::new();
                for page in page_order {
                    let group = pages.remove(&page).unwrap_or_default();
                    if let Some(doc) = merge_elements(group.into_iter(), base) {
                        documents.push(doc);
                        if self.options.include_page_breaks {
                            documents.push(page_break_document(page, base));
                        }
                    }
                }
                documents
            }
        }
    }
}

#[async_trait::async_trait]
impl DocumentLoader for UnstructuredLoader {
    fn lazy_load(&self) -> BoxStream<'_, Result<Document>> {
        let stream = async_stream::try_stream! {
            self.validate()?;
            match &self.source {
                Source::File(path) => {
                    for document in self.load_file(path).await? {
                        yield document;
                    }
                }
                Source::Files(paths) => {
                    for path in paths {
                        for document in self.load_file(path).await? {
                            yield document;
                        }
                    }
                }
                Source::WebUrl(url) => {
                    for document in self.load_url(url).await? {
                        yield document;
                    }
                }
            }
        };
        stream.boxed()
    }
}

/// One normalized document per engine element.
///
/// Page-break elements become empty-content documents whose only job is to
/// carry `category == "PageBreak"` and the page they close.
fn element_document(element: &Element, base: &HashMap<String, Value>) -> Document {
    let mut document = Document::new(element.text.clone());
    document.metadata.extend(base.clone());

    merge_element_metadata(&mut document.metadata, element);
    document.metadata.insert(
        "category".to_string(),
        Value::from(element.category.as_str()),
    );
    document
        .metadata
        .insert("element_id".to_string(), Value::from(element.element_id.clone()));
    document
}

/// Aggregate a group of elements into one document.
///
/// Texts join with a blank line. The aggregate is tagged
/// `CompositeElement` with a deterministic id hashed from the joined text;
/// languages are the ordered union across elements, and element metadata
/// merges last-wins, mirroring how the wrapped service folds pages.
fn merge_elements<'a>(
    elements: impl Iterator<Item = &'a Element>,
    base: &HashMap<String, Value>,
) -> Option<Document> {
    let mut texts: Vec<&str> = Vec::new();
    let mut metadata = base.clone();
    let mut languages: Vec<String> = Vec::new();
    let mut page_number: Option<u32> = None;

    for element in elements {
        texts.push(&element.text);
        merge_element_metadata(&mut metadata, element);
        if let Some(element_languages) = &element.metadata.languages {
            for language in element_languages {
                if !languages.contains(language) {
                    languages.push(language.clone());
                }
            }
        }
        if page_number.is_none() {
            page_number = element.metadata.page_number;
        }
    }

    if texts.is_empty() {
        return None;
    }

    let text = texts.join("\n\n");
    let page = page_number.unwrap_or(1);
    metadata.insert("page_number".to_string(), Value::from(page));
    if !languages.is_empty() {
        metadata.insert("languages".to_string(), Value::from(languages));
    }
    metadata.insert(
        "category".to_string(),
        Value::from(ElementCategory::CompositeElement.as_str()),
    );
    metadata.insert(
        "element_id".to_string(),
        Value::from(element_id(&text, page)),
    );

    let mut document = Document::new(text);
    document.metadata = metadata;
    Some(document)
}

/// Fold one element's engine metadata into a document metadata map.
fn merge_element_metadata(metadata: &mut HashMap<String, Value>, element: &Element) {
    let em = &element.metadata;
    if let Some(filename) = &em.filename {
        metadata.insert("filename".to_string(), Value::from(filename.clone()));
    }
    if let Some(filetype) = &em.filetype {
        metadata.insert("filetype".to_string(), Value::from(filetype.clone()));
    }
    if let Some(page_number) = em.page_number {
        metadata.insert("page_number".to_string(), Value::from(page_number));
    }
    if let Some(languages) = &em.languages {
        metadata.insert("languages".to_string(), Value::from(languages.clone()));
    }
    if let Some(coordinates) = &em.coordinates {
        if let Ok(value) = serde_json::to_value(coordinates) {
            metadata.insert("coordinates".to_string(), value);
        }
    }
    if let Some(url) = &em.url {
        metadata.insert("url".to_string(), Value::from(url.clone()));
    }
    if let Some(parent_id) = &em.parent_id {
        metadata.insert("parent_id".to_string(), Value::from(parent_id.clone()));
    }
    for (key, value) in &em.extra {
        metadata.insert(key.clone(), value.clone());
    }
}

/// Synthetic zero-content marker document closing `page`.
fn page_break_document(page: u32, base: &HashMap<String, Value>) -> Document {
    let mut document = Document::new("");
    document.metadata.extend(base.clone());
    document
        .metadata
        .insert("page_number".to_string(), Value::from(page));
    document.metadata.insert(
        "category".to_string(),
        Value::from(ElementCategory::PageBreak.as_str()),
    );
    document
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::elements::ElementMetadata;

    fn element(category: ElementCategory, text: &str, page: u32) -> Element {
        let mut e = Element::new(category, text, page);
        e.metadata = ElementMetadata {
            page_number: Some(page),
            languages: Some(vec!["eng".to_string()]),
            filename: Some("fixture.txt".to_string()),
            filetype: Some("text/plain".to_string()),
            ..ElementMetadata::default()
        };
        e
    }

    fn base() -> HashMap<String, Value> {
        let mut map = HashMap::new();
        map.insert("source".to_string(), Value::from("fixture.txt"));
        map
    }

    fn loader(mode: Mode) -> UnstructuredLoader {
        UnstructuredLoader::from_path("fixture.txt").with_mode(mode)
    }

    #[test]
    fn test_elements_mode_one_document_per_element() {
        let elements = vec![
            element(ElementCategory::Title, "Heading", 1),
            element(ElementCategory::NarrativeText, "Body.", 1),
        ];
        let docs = loader(Mode::Elements).documents_from_elements(elements, &base());

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].page_content, "Heading");
        assert_eq!(
            docs[0].get_metadata("category").unwrap().as_str().unwrap(),
            "Title"
        );
        assert_eq!(
            docs[1].get_metadata("element_id").unwrap().as_str().unwrap(),
            element_id("Body.", 1)
        );
    }

    #[test]
    fn test_single_mode_joins_and_skips_breaks() {
        let elements = vec![
            element(ElementCategory::Title, "Heading", 1),
            element(ElementCategory::PageBreak, "", 1),
            element(ElementCategory::NarrativeText, "Body.", 2),
        ];
        let docs = loader(Mode::Single).documents_from_elements(elements, &base());

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].page_content, "Heading\n\nBody.");
        assert_eq!(
            docs[0].get_metadata("category").unwrap().as_str().unwrap(),
            "CompositeElement"
        );
        assert_eq!(docs[0].get_metadata("page_number").unwrap().as_u64().unwrap(), 1);
    }

    #[test]
    fn test_page_mode_groups_by_page_with_breaks() {
        let elements = vec![
            element(ElementCategory::Title, "Page one title", 1),
            element(ElementCategory::NarrativeText, "Page one body.", 1),
            element(ElementCategory::NarrativeText, "Page two body.", 2),
        ];
        let docs = loader(Mode::Page)
            .with_include_page_breaks(true)
            .documents_from_elements(elements, &base());

        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0].page_content, "Page one title\n\nPage one body.");
        assert_eq!(
            docs[1].get_metadata("category").unwrap().as_str().unwrap(),
            "PageBreak"
        );
        assert!(docs[1].page_content.is_empty());
        assert_eq!(docs[2].page_content, "Page two body.");
        assert_eq!(docs[2].get_metadata("page_number").unwrap().as_u64().unwrap(), 2);
    }

    #[test]
    fn test_page_mode_conflicts_with_by_page_chunking() {
        let loader = loader(Mode::Page).with_option("chunking_strategy", "by_page");
        let err = loader.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_mode_as_str() {
        assert_eq!(Mode::Single.as_str(), "single");
        assert_eq!(Mode::Elements.as_str(), "elements");
        assert_eq!(Mode::Page.as_str(), "page");
    }

    #[test]
    fn test_source_kinds_are_exclusive() {
        assert!(matches!(
            UnstructuredLoader::from_path("a.pdf").source(),
            Source::File(_)
        ));
        assert!(matches!(
            UnstructuredLoader::from_paths(["a.pdf", "b.pdf"]).source(),
            Source::Files(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_source_not_found() {
        let loader = UnstructuredLoader::from_path("/definitely/not/here.pdf");
        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }
}
