//! Partition a local file and print the resulting documents.
//!
//! Usage: cargo run --example partition_file -- path/to/document.pdf

use unstructured_loader::{DocumentLoader, Mode, UnstructuredLoader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: partition_file <path>")?;

    let loader = UnstructuredLoader::from_path(&path)
        .with_mode(Mode::Elements)
        .with_include_page_breaks(true);

    for doc in loader.load().await? {
        let category = doc
            .get_metadata("category")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        let page = doc
            .get_metadata("page_number")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        println!("[page {page}] {category}: {}", doc.page_content);
    }

    Ok(())
}
