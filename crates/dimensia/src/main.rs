//! # Dimensia CLI
//!
//! Command-line interface for the Dimensia vector database.
//!
//! ## Commands
//!
//! - `dimensia collections` - List collections
//! - `dimensia create <NAME>` - Create a collection
//! - `dimensia add <COLLECTION> --text <TEXT>...` - Embed and insert documents
//! - `dimensia search <COLLECTION> <QUERY>` - Similarity search
//! - `dimensia info <COLLECTION>` - Collection info and structure
//! - `dimensia demo` - Walk through every operation on sample data
//!
//! ## Examples
//!
//! ```bash
//! dimensia --db-path ./dimensia_db create research_articles
//! dimensia add research_articles --text "Transformers outperform RNNs in NLP."
//! dimensia search research_articles "transformers in NLP" --top-k 3 --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dimensia::{
    CollectionInfo, CollectionStructure, Dimensia, DimensiaConfig, DistanceMetric, Document,
    DocumentId, NewDocument, SearchResult,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Collection used by `dimensia demo`.
const DEMO_COLLECTION: &str = "research_articles";

const DEMO_DOCUMENTS: [&str; 5] = [
    "The advancements in deep learning have revolutionized AI applications.",
    "Natural Language Processing models are increasingly effective in understanding text.",
    "Recent research shows that transformers outperform traditional neural networks in NLP.",
    "Machine learning models are being used in healthcare for predictive analysis.",
    "Reinforcement learning is transforming robotics and autonomous systems.",
];

const DEMO_QUERY: &str = "How transformers are applied in NLP";

#[derive(Parser)]
#[command(name = "dimensia")]
#[command(about = "An embedded vector database")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ~/.config/dimensia/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database directory (overrides storage.db_path)
    #[arg(short, long, global = true)]
    db_path: Option<PathBuf>,

    /// Embedding model (overrides embedding.model)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List collections
    Collections,

    /// Create a collection
    Create {
        /// Collection name
        name: String,
    },

    /// Embed and insert documents
    Add {
        /// Target collection
        collection: String,

        /// Document text (repeatable)
        #[arg(short, long = "text", required_unless_present = "file")]
        texts: Vec<String>,

        /// JSON file holding an array of {"content", "metadata"} objects
        #[arg(long, conflicts_with = "texts")]
        file: Option<PathBuf>,
    },

    /// Show collection info and structure
    Info {
        /// Collection name
        collection: String,
    },

    /// Search a collection
    Search {
        /// Collection name
        collection: String,

        /// Query text
        query: String,

        /// Maximum results (default: search.default_top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Similarity metric: cosine, l2 or dot (default: search.metric)
        #[arg(long)]
        metric: Option<String>,
    },

    /// Fetch one document by id
    Get {
        /// Collection name
        collection: String,

        /// Document id
        id: DocumentId,
    },

    /// List every document in a collection
    Docs {
        /// Collection name
        collection: String,
    },

    /// Run every operation against sample data
    Demo,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Print sample configuration file
    Init,
    /// Show config file path
    Path,
}

/// Output structure for search results.
#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    collection: &'a str,
    metric: DistanceMetric,
    results: &'a [SearchResult],
}

/// Output structure for `info`.
#[derive(Serialize)]
struct InfoOutput {
    info: CollectionInfo,
    structure: CollectionStructure,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config from file or CLI-specified path
    let mut config = if let Some(ref path) = cli.config {
        DimensiaConfig::load_from(Some(path.clone()))
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        DimensiaConfig::load().context("Failed to load config")?
    };
    if let Some(db_path) = cli.db_path.clone() {
        config.storage.db_path = db_path;
    }
    if let Some(model) = cli.model.clone() {
        config.embedding.model = Some(model);
    }

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::from_str(&config.logging.level).unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    if let Commands::Config { action } = &cli.command {
        return run_config(action, &config, cli.format);
    }

    let db = Dimensia::open_with_config(&config).await.with_context(|| {
        format!(
            "Failed to open database at {}",
            config.storage.db_path.display()
        )
    })?;

    match cli.command {
        Commands::Collections => {
            let collections = db.get_collections().await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&collections)?),
                OutputFormat::Text => {
                    if collections.is_empty() {
                        println!("No collections.");
                    }
                    for name in collections {
                        println!("{name}");
                    }
                }
            }
        }

        Commands::Create { name } => {
            db.create_collection(&name)
                .await
                .with_context(|| format!("Failed to create collection {name}"))?;
            println!("Collection '{name}' created.");
        }

        Commands::Add {
            collection,
            texts,
            file,
        } => {
            let documents = match file {
                Some(path) => read_documents(&path)?,
                None => texts.into_iter().map(NewDocument::new).collect(),
            };
            let ids = db
                .add_documents(&collection, documents)
                .await
                .with_context(|| format!("Failed to add documents to {collection}"))?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ids)?),
                OutputFormat::Text => {
                    println!("Added {} documents to '{collection}': {ids:?}", ids.len());
                }
            }
        }

        Commands::Info { collection } => {
            let output = InfoOutput {
                info: db.get_collection_info(&collection).await?,
                structure: db.get_structure(&collection).await?,
            };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
                OutputFormat::Text => print_info(&output.info, &output.structure),
            }
        }

        Commands::Search {
            collection,
            query,
            top_k,
            metric,
        } => {
            let top_k = top_k.unwrap_or(config.search.default_top_k);
            let metric = match metric {
                Some(name) => DistanceMetric::from_str(&name)?,
                None => config.search.metric,
            };
            let results = db
                .search(&query, &collection, top_k, metric)
                .await
                .context("Search failed")?;

            match cli.format {
                OutputFormat::Json => {
                    let output = SearchOutput {
                        query: &query,
                        collection: &collection,
                        metric,
                        results: &results,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Text => print_results(&query, &results),
            }
        }

        Commands::Get { collection, id } => {
            let document = db.get_document(&collection, id).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
                OutputFormat::Text => match document {
                    Some(doc) => print_document(&doc),
                    None => println!("No document with id {id} in '{collection}'."),
                },
            }
        }

        Commands::Docs { collection } => {
            let listing = db.get_all_docs(&collection).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
                OutputFormat::Text => {
                    for doc in &listing.documents {
                        print_document(doc);
                    }
                }
            }
        }

        Commands::Demo => {
            let report = run_demo(&db).await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => print_demo(&report),
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

fn run_config(action: &ConfigAction, config: &DimensiaConfig, format: OutputFormat) -> Result<()> {
    match action {
        ConfigAction::Show => match format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(config).context("Failed to serialize config")?
                );
            }
            OutputFormat::Text => {
                println!(
                    "{}",
                    toml::to_string_pretty(config).context("Failed to serialize config")?
                );
            }
        },
        ConfigAction::Init => {
            println!("{}", DimensiaConfig::sample_toml());
        }
        ConfigAction::Path => {
            if let Some(path) = DimensiaConfig::config_path() {
                println!("{}", path.display());
            } else {
                println!("Could not determine config directory");
            }
        }
    }
    Ok(())
}

/// Read documents from a JSON array file.
fn read_documents(path: &Path) -> Result<Vec<NewDocument>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of documents", path.display()))
}

/// Everything `dimensia demo` did, for text or JSON output.
#[derive(Serialize)]
struct DemoReport {
    model: String,
    created: bool,
    inserted: Vec<DocumentId>,
    info: CollectionInfo,
    structure: CollectionStructure,
    vector_size: usize,
    query: &'static str,
    results: Vec<SearchResult>,
    first_document: Option<Document>,
    documents: Vec<Document>,
}

async fn run_demo(db: &Dimensia) -> Result<DemoReport> {
    let model = db
        .embedding_model()
        .await
        .context("No embedding model set; pass --model")?;

    let created = !db.get_collections().await?.contains(DEMO_COLLECTION);
    if created {
        db.create_collection(DEMO_COLLECTION).await?;
    }

    let documents = DEMO_DOCUMENTS.iter().map(|&text| NewDocument::new(text)).collect();
    let inserted = db.add_documents(DEMO_COLLECTION, documents).await?;
    info!("Inserted demo documents {:?}", inserted);

    Ok(DemoReport {
        model,
        created,
        inserted,
        info: db.get_collection_info(DEMO_COLLECTION).await?,
        structure: db.get_structure(DEMO_COLLECTION).await?,
        vector_size: db.get_vector_size(DEMO_COLLECTION).await?,
        query: DEMO_QUERY,
        results: db
            .search(DEMO_QUERY, DEMO_COLLECTION, 3, DistanceMetric::Cosine)
            .await?,
        first_document: db.get_document(DEMO_COLLECTION, 1).await?,
        documents: db.get_all_docs(DEMO_COLLECTION).await?.documents,
    })
}

fn print_demo(report: &DemoReport) {
    println!("Embedding model '{}' set.", report.model);
    if report.created {
        println!("Collection '{DEMO_COLLECTION}' created.");
    } else {
        println!("Collection '{DEMO_COLLECTION}' already exists.");
    }
    println!(
        "Added {} documents to '{DEMO_COLLECTION}'.\n",
        report.inserted.len()
    );

    print_info(&report.info, &report.structure);
    println!("Vector size: {}\n", report.vector_size);
    print_results(report.query, &report.results);

    match &report.first_document {
        Some(doc) => {
            println!("Document 1:");
            print_document(doc);
        }
        None => println!("Document 1 not found."),
    }

    println!("\nAll documents in '{DEMO_COLLECTION}':");
    for doc in &report.documents {
        print_document(doc);
    }
}

fn print_info(info: &CollectionInfo, structure: &CollectionStructure) {
    println!("Collection '{}'", info.name);
    println!("  Documents:   {}", info.document_count);
    match info.vector_size {
        Some(size) => println!("  Vector size: {size}"),
        None => println!("  Vector size: (not fixed yet)"),
    }
    if let Some(model) = &info.embedding_model {
        println!("  Model:       {model}");
    }
    println!("  Created:     {}", info.created_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(updated) = info.updated_at {
        println!("  Updated:     {}", updated.format("%Y-%m-%d %H:%M:%S"));
    }
    if let (Some(first), Some(last)) = (structure.first_id, structure.last_id) {
        println!("  Ids:         {first}..={last}");
    }
    if !structure.metadata_keys.is_empty() {
        let keys: Vec<&str> = structure.metadata_keys.iter().map(String::as_str).collect();
        println!("  Metadata:    {}", keys.join(", "));
    }
    println!();
}

fn print_results(query: &str, results: &[SearchResult]) {
    println!("Query: {query}\n");
    if results.is_empty() {
        println!("No results found.");
    }
    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{}] (score: {:.3})",
            i + 1,
            result.document.id,
            result.score
        );
        println!("   {}", truncate(&result.document.content, 100));
        println!();
    }
}

fn print_document(doc: &Document) {
    let metadata = serde_json::to_string(&doc.metadata).unwrap_or_default();
    println!("{:>4}  {}  {}", doc.id, truncate(&doc.content, 80), metadata);
}

/// Truncate a string to max characters, adding ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ").replace('\r', "");
    if s.chars().count() <= max_len {
        s
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
