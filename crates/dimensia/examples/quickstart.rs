//! Quickstart: open a database, insert documents and search them.
//!
//! Run with:
//! ```bash
//! cargo run --example quickstart -- ./dimensia_db "How transformers are applied in NLP"
//! ```

use anyhow::{Context, Result};
use dimensia::{Dimensia, DistanceMetric, NewDocument};
use std::env;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const COLLECTION: &str = "research_articles";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let db_path = args.get(1).map_or("dimensia_db", String::as_str);
    let query = args
        .get(2)
        .map_or("How transformers are applied in NLP", String::as_str);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let db = Dimensia::open(db_path)
        .await
        .with_context(|| format!("Failed to open {db_path}"))?;
    db.set_embedding_model("hashing").await?;

    if !db.get_collections().await?.contains(COLLECTION) {
        db.create_collection(COLLECTION).await?;
        let ids = db
            .add_documents(
                COLLECTION,
                vec![
                    NewDocument::new(
                        "The advancements in deep learning have revolutionized AI applications.",
                    )
                    .with_metadata("topic", "deep learning"),
                    NewDocument::new(
                        "Recent research shows that transformers outperform traditional neural networks in NLP.",
                    )
                    .with_metadata("topic", "nlp"),
                    NewDocument::new(
                        "Reinforcement learning is transforming robotics and autonomous systems.",
                    )
                    .with_metadata("topic", "robotics"),
                ],
            )
            .await?;
        info!("Inserted documents {:?}", ids);
    }

    let results = db.search(query, COLLECTION, 3, DistanceMetric::Cosine).await?;
    println!("Query: {query}\n");
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{}] {:.3}  {}",
            i + 1,
            result.document.id,
            result.score,
            result.document.content
        );
    }

    Ok(())
}
