//! Partition a file through the hosted Unstructured API.
//!
//! Requires UNSTRUCTURED_API_KEY to be set.
//!
//! Usage: cargo run --example partition_via_api -- path/to/document.pdf

use unstructured_loader::{DocumentLoader, PartitionStrategy, UnstructuredLoader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: partition_via_api <path>")?;

    let loader = UnstructuredLoader::from_path(&path)
        .with_strategy(PartitionStrategy::Fast)
        .with_include_page_breaks(true)
        .via_api();

    let docs = loader.load().await?;
    println!("Partitioned into {} documents", docs.len());
    for doc in docs.iter().take(10) {
        let category = doc
            .get_metadata("category")
            .and_then(|v| v.as_str())
            .unwrap_or("?");
        println!("{category}: {}", doc.page_content);
    }

    Ok(())
}
