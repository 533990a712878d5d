use sibyl::cli::{Cli, Commands, ConfigAction};
use sibyl::config::Config;
use sibyl::embedding::FastEmbedProvider;
use sibyl::error::{Result, SibylError};
use sibyl::generation::build_prompt;
use sibyl::index::{HnswVectorIndex, TantivyLexicalIndex};
use sibyl::ingest::{Ingestor, PlainTextExtractor};
use sibyl::retrieval::HybridRetriever;
use std::sync::Arc;

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Ingest { file, json } => {
            cmd_ingest(cli.config, &file, json)?;
        }
        Commands::Query { query, limit, json } => {
            cmd_query(cli.config, &query, limit, json)?;
        }
        Commands::Ask {
            question,
            context_size,
        } => {
            cmd_ask(cli.config, &question, context_size)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sibyl=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Everything a command needs: config plus the embedder, both indexes, and
/// the paths they persist under.
struct AppContext {
    config: Config,
    embedder: Arc<FastEmbedProvider>,
    dense: Arc<HnswVectorIndex>,
    lexical: Arc<TantivyLexicalIndex>,
    snapshot_path: std::path::PathBuf,
}

impl AppContext {
    fn open(config_path: Option<std::path::PathBuf>) -> Result<Self> {
        let mut config = load_config(config_path)?;
        config.apply_env_overrides();

        let data_dir = expand_path(&config.storage.data_dir)?;
        std::fs::create_dir_all(&data_dir).map_err(|e| SibylError::Io {
            source: e,
            context: format!("Failed to create data directory: {:?}", data_dir),
        })?;

        let embedder = Arc::new(FastEmbedProvider::new(&config.embedding.model)?);

        let snapshot_path = data_dir.join("vectors.json");
        let dense = Arc::new(HnswVectorIndex::load_or_create(
            &snapshot_path,
            config.indexing.vector_dim,
            config.indexing.hnsw_ef_construction,
            config.indexing.hnsw_m,
            config.indexing.hnsw_ef_search,
        )?);
        let lexical = Arc::new(TantivyLexicalIndex::new(data_dir.join("lexical"))?);

        Ok(Self {
            config,
            embedder,
            dense,
            lexical,
            snapshot_path,
        })
    }
}

fn cmd_ingest(
    config_path: Option<std::path::PathBuf>,
    file: &std::path::Path,
    json: bool,
) -> Result<()> {
    let ctx = AppContext::open(config_path)?;

    let chunker = sibyl::chunking::Chunker::new(
        ctx.config.chunking.chunk_size,
        ctx.config.chunking.overlap,
    )?;

    let ingestor = Ingestor::new(
        chunker,
        ctx.embedder.clone(),
        ctx.dense.clone(),
        ctx.lexical.clone(),
        ctx.config.embedding.batch_size,
        ctx.config.storage.max_upload_mb,
    );

    let receipt = ingestor.ingest_file(file, &PlainTextExtractor)?;
    ctx.dense.save(&ctx.snapshot_path)?;

    if json {
        let out = serde_json::to_string_pretty(&receipt).map_err(|e| SibylError::Json {
            source: e,
            context: "Failed to serialize ingest receipt".to_string(),
        })?;
        println!("{}", out);
    } else {
        println!("✓ Ingested {}", receipt.source_path);
        println!("  Document: {}", receipt.doc_id);
        println!("  Chunks:   {}", receipt.chunk_count);
    }

    Ok(())
}

fn cmd_query(
    config_path: Option<std::path::PathBuf>,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    let ctx = AppContext::open(config_path)?;

    let retriever = HybridRetriever::new(
        ctx.embedder.clone(),
        ctx.dense.clone(),
        ctx.lexical.clone(),
        ctx.config.retrieval.clone(),
    );

    let rt = tokio_runtime()?;
    let chunks = rt.block_on(retriever.retrieve(query, limit))?;

    if json {
        let out = serde_json::to_string_pretty(&chunks).map_err(|e| SibylError::Json {
            source: e,
            context: "Failed to serialize query results".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    if chunks.is_empty() {
        println!("No results");
        return Ok(());
    }

    for (i, chunk) in chunks.iter().enumerate() {
        println!("{}. {} (chunk {})", i + 1, chunk.source_path, chunk.chunk_index);
        println!("   {}", chunk.preview(160));
    }

    Ok(())
}

fn cmd_ask(
    config_path: Option<std::path::PathBuf>,
    question: &str,
    context_size: usize,
) -> Result<()> {
    let ctx = AppContext::open(config_path)?;

    let retriever = HybridRetriever::new(
        ctx.embedder.clone(),
        ctx.dense.clone(),
        ctx.lexical.clone(),
        ctx.config.retrieval.clone(),
    );

    let rt = tokio_runtime()?;
    let contexts = rt.block_on(retriever.retrieve(question, context_size))?;

    if contexts.is_empty() {
        println!("No relevant context found. Ingest documents first with 'sibyl ingest'.");
        return Ok(());
    }

    let (prompt, citations) = build_prompt(question, &contexts);

    // No generation backend is bundled; print the grounded prompt and the
    // citation table so the output can be piped to any LLM client.
    println!("--- system ---");
    println!("{}", prompt.system);
    println!("\n--- user ---");
    println!("{}", prompt.user);

    println!("\nCitations:");
    for c in &citations {
        println!(
            "  [{}] {} (doc {}, chunk {})",
            c.index, c.source_path, c.doc_id, c.chunk_index
        );
    }

    Ok(())
}

fn cmd_config(config_path: Option<std::path::PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| SibylError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Path => {
            let path = config_path
                .map(Ok)
                .unwrap_or_else(Config::default_path)?;
            println!("{}", path.display());
        }
        ConfigAction::Validate { file } => {
            let path = file.map(Ok).unwrap_or_else(Config::default_path)?;
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = Config::default_path()?;

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SibylError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    let path = config_path.map(Ok).unwrap_or_else(Config::default_path)?;

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'sibyl config init' to create one."
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}

fn tokio_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| SibylError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

fn expand_path(path: &std::path::Path) -> Result<std::path::PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| SibylError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| SibylError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
