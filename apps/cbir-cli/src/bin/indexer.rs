use std::env;

use cbir_core::config::{expand_path, Config};
use cbir_index::CorpusIndex;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut dataset_dir = None;
    for arg in &args {
        if !arg.starts_with('-') { dataset_dir = Some(expand_path(arg)); }
    }
    let dataset_dir = dataset_dir.unwrap_or_else(|| {
        let dir: String = config.get("data.dataset_dir").unwrap_or_else(|_| "./dataset".to_string());
        expand_path(dir)
    });
    let cache: String = config
        .get("data.descriptor_cache")
        .unwrap_or_else(|_| "image_descriptors.json".to_string());
    let cache_path = expand_path(cache);

    println!("Descriptor Indexer\n==================");
    println!("Dataset directory: {}", dataset_dir.display());
    println!("Descriptor cache:  {}", cache_path.display());

    let index = CorpusIndex::load(&dataset_dir, &cache_path)?;

    println!("\n✅ Indexing completed successfully!");
    println!("📊 {} images in the corpus snapshot", index.len());
    println!("\n💡 To search, use: cargo run --bin cbir-search '<query image>'");
    Ok(())
}
