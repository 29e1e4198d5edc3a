//! # Unstructured Document Loader
//!
//! Load files and web pages through the [Unstructured] document-partitioning
//! engine and normalize the output into uniform [`Document`] records (text +
//! metadata) ready for RAG pipelines.
//!
//! The partitioning itself (layout analysis, OCR, table/image detection)
//! happens inside the engine - locally via [`LocalPartitioner`] or remotely
//! via [`ApiPartitioner`]. This crate's job is everything around it: source
//! resolution, engine dispatch, metadata shaping, page bookkeeping, and
//! post-processing hooks.
//!
//! ## Features
//!
//! - Load a file path, a list of file paths, or a web URL
//! - Local (in-process) or remote (hosted API) partitioning behind one trait
//! - `single` / `elements` / `page` aggregation modes
//! - Optional `PageBreak` marker documents between pages
//! - Ordered text post-processors applied to extracted content
//! - Lazy streaming via [`DocumentLoader::lazy_load`]
//!
//! ## Usage
//!
//! ```no_run
//! use unstructured_loader::{DocumentLoader, Mode, UnstructuredLoader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = UnstructuredLoader::from_path("layout-parser-paper.pdf")
//!     .with_mode(Mode::Elements)
//!     .with_include_page_breaks(true);
//!
//! for doc in loader.load().await? {
//!     println!("{}: {}", doc.get_metadata("category").unwrap(), doc.page_content);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Remote partitioning
//!
//! Set `UNSTRUCTURED_API_KEY` (or pass a key explicitly) and call
//! [`UnstructuredLoader::via_api`]. Note: the hosted API always partitions at
//! element granularity; a configured non-`Elements` mode is ignored with a
//! warning. This mirrors the wrapped service and is intentional.
//!
//! [Unstructured]: https://docs.unstructured.io/

pub mod documents;
pub mod elements;
pub mod error;
pub mod loader;
pub mod partition;

pub use documents::{Blob, Document, DocumentLoader};
pub use elements::{Coordinates, Element, ElementCategory, ElementMetadata};
pub use error::{Error, ErrorCategory, Result};
pub use loader::{Mode, Source, UnstructuredLoader};
pub use partition::{
    ApiPartitioner, LocalPartitioner, PartitionOptions, PartitionStrategy, Partitioner,
    DEFAULT_API_URL,
};
