use std::{env, fs, path::PathBuf, process};

use cbir_core::config::{expand_path, Config};
use cbir_core::types::Feedback;
use cbir_feedback::FeedbackSession;
use cbir_index::CorpusIndex;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut query: Option<PathBuf> = None;
    let mut top_k: Option<usize> = None;
    let mut feedback_raw: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--feedback" | "-f" => {
                if i + 1 < args.len() {
                    feedback_raw = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: --feedback requires a JSON argument");
                    process::exit(1);
                }
            }
            arg if !arg.starts_with('-') => {
                if query.is_none() {
                    query = Some(expand_path(arg));
                } else if let Ok(k) = arg.parse::<usize>() {
                    top_k = Some(k);
                }
            }
            _ => {}
        }
        i += 1;
    }
    let Some(query) = query else {
        eprintln!("Usage: cbir-search <query image> [top_k] [--feedback '{{\"relevant\": [...], \"non_relevant\": [...]}}']");
        process::exit(1);
    };
    let top_k = top_k.unwrap_or_else(|| config.get("search.top_k").unwrap_or(5));

    let feedback = match feedback_raw {
        Some(raw) => Some(Feedback::from_json(&raw)?),
        None => None,
    };

    let dataset: String = config.get("data.dataset_dir").unwrap_or_else(|_| "./dataset".to_string());
    let cache: String = config
        .get("data.descriptor_cache")
        .unwrap_or_else(|_| "image_descriptors.json".to_string());
    let index = CorpusIndex::load(&expand_path(dataset), &expand_path(cache))?;
    println!("🔍 Corpus: {} images", index.len());

    let mut session = FeedbackSession::new(index)?;
    let payload = fs::read(&query)?;
    let hits = session.search(&payload, top_k, feedback.as_ref())?;

    println!("\nResults for {}:", query.display());
    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>2}. {:.6}  {}", rank + 1, hit.score, hit.id);
    }
    Ok(())
}
