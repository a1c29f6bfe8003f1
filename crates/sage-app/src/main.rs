//! Sage application binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Open the knowledge-base database
//! 3. Pick the embedding and generation backends once
//! 4. Build the chat orchestrator and run the requested command

mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use sage_chat::{
    ChatOrchestrator, GeminiBackend, GenerationBackend, NullGeneration, PromptComposer,
    RagResponse, ResponseGenerator,
};
use sage_core::config::SageConfig;
use sage_core::types::ChatTurn;
use sage_storage::{seed_knowledge_base, Database, KnowledgeStore, SqliteKnowledgeStore};
use sage_vector::{
    DynEmbeddingService, MockEmbedding, NullEmbedding, OnnxEmbeddingService, Retriever,
};

use cli::{CliArgs, Command};

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&path[2..])
    } else {
        PathBuf::from(path)
    }
}

/// Select the embedding backend named in the config.
///
/// A model that fails to load degrades to `NullEmbedding`, which turns
/// retrieval into a no-op instead of aborting startup.
fn build_embedder(config: &SageConfig) -> Box<dyn DynEmbeddingService> {
    let dims = config.embedding.dimensions;
    match config.embedding.backend.as_str() {
        "onnx" => {
            let model_dir = expand_home(&config.embedding.model_dir);
            match OnnxEmbeddingService::from_directory(&model_dir, dims) {
                Ok(service) => Box::new(service),
                Err(e) => {
                    tracing::warn!(
                        model = %config.embedding.model,
                        error = %e,
                        "Embedding model unavailable; retrieval disabled"
                    );
                    Box::new(NullEmbedding::new(dims))
                }
            }
        }
        "hashing" => Box::new(MockEmbedding::with_dimensions(dims)),
        _ => Box::new(NullEmbedding::new(dims)),
    }
}

/// Select the generation backend; without an API key every answer uses the
/// fallback path.
fn build_generator(config: &SageConfig) -> Arc<dyn GenerationBackend> {
    match GeminiBackend::from_config(&config.generation) {
        Ok(Some(backend)) => {
            tracing::info!(model = backend.model(), "Gemini generation enabled");
            Arc::new(backend)
        }
        Ok(None) => {
            tracing::info!("No generation backend configured; using fallback answers");
            Arc::new(NullGeneration)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Generation backend failed to start; using fallback answers");
            Arc::new(NullGeneration)
        }
    }
}

fn print_response(response: &RagResponse) {
    println!("{}", response.response_text);
    if !response.context.is_empty() {
        println!();
        println!("Sources:");
        for source in response.sources() {
            println!("  [{}] {} ({:.3})", source.kind, source.title, source.score);
        }
    }
}

async fn run_chat(
    orchestrator: &ChatOrchestrator,
    top_k: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut history: Vec<ChatTurn> = Vec::new();

    println!("Ask a question (type 'exit' to quit).");
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }

        let response = orchestrator.generate_response(query, &history, top_k).await;
        println!("{}\n", response.response_text);

        history.push(ChatTurn::user(query));
        history.push(ChatTurn::assistant(response.response_text));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Read before tracing so its log level applies.
    let config_file = args.resolve_config_path();
    let loaded = SageConfig::load(&config_file);
    let log_level = match &loaded {
        Ok(config) => args.resolve_log_level(&config.general.log_level),
        Err(_) => args.resolve_log_level("info"),
    };

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    let mut config = match loaded {
        Ok(config) => {
            tracing::debug!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Err(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid config; using defaults");
            SageConfig::default()
        }
        Err(_) => {
            tracing::debug!(path = %config_file.display(), "No config file; using defaults");
            SageConfig::default()
        }
    };
    config.general.data_dir = args.resolve_data_dir(&config.general.data_dir);
    config.general.log_level = log_level;
    config.validate()?;

    // Storage.
    let data_dir = expand_home(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db = Arc::new(Database::new(&data_dir.join("sage.db"))?);
    let store = Arc::new(SqliteKnowledgeStore::new(Arc::clone(&db)));

    // Commands that only touch the store.
    match &args.command {
        Command::Seed => {
            let report = seed_knowledge_base(Arc::clone(&db))?;
            println!(
                "Documents: {} created, {} existing",
                report.documents_created, report.documents_existing
            );
            println!(
                "FAQs: {} created, {} existing",
                report.faqs_created, report.faqs_existing
            );
            if report.created() == 0 {
                println!("Knowledge base already seeded.");
            }
            return Ok(());
        }
        Command::List => {
            for entry in store.list_documents()?.into_iter().chain(store.list_faqs()?) {
                println!(
                    "{:>4}  {:<8}  {:<14}  {}",
                    entry.id,
                    entry.kind.as_str(),
                    entry.category.as_deref().unwrap_or("-"),
                    entry.title
                );
            }
            println!(
                "{} documents, {} FAQs",
                store.count_documents()?,
                store.count_faqs()?
            );
            return Ok(());
        }
        _ => {}
    }

    // Pipeline.
    let retriever = Retriever::new_dyn(build_embedder(&config))
        .with_max_input_chars(config.embedding.max_input_chars);
    let generator = ResponseGenerator::new(
        build_generator(&config),
        Duration::from_secs(config.generation.timeout_secs),
    );
    let orchestrator = Arc::new(
        ChatOrchestrator::new(
            retriever,
            PromptComposer::new(&config.prompt),
            generator,
            store,
        )
        .with_default_top_k(config.retrieval.top_k),
    );
    tracing::info!(
        embedder = orchestrator.embedder_name(),
        generator = orchestrator.generator_name(),
        "Pipeline ready"
    );

    match args.command {
        Command::AddDocument {
            title,
            content,
            category,
        } => {
            let (entry, outcome) = orchestrator
                .create_document(&title, &content, &category)
                .await?;
            println!("Created document {} ({:?})", entry.id, outcome);
        }
        Command::AddFaq {
            question,
            answer,
            category,
        } => {
            let (entry, outcome) = orchestrator.create_faq(&question, &answer, &category).await?;
            println!("Created FAQ {} ({:?})", entry.id, outcome);
        }
        Command::Ask { query, top_k, json } => {
            orchestrator.load_documents_from_db().await?;
            let top_k = top_k.unwrap_or(orchestrator.default_top_k());
            let response = orchestrator.generate_response(&query, &[], top_k).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        }
        Command::Chat { top_k } => {
            orchestrator.load_documents_from_db().await?;
            let top_k = top_k.unwrap_or(orchestrator.default_top_k());
            run_chat(&orchestrator, top_k).await?;
        }
        Command::Search { query, top_k } => {
            orchestrator.load_documents_from_db().await?;
            let top_k = top_k.unwrap_or(orchestrator.default_top_k());
            let results = orchestrator.retrieve(&query, top_k).await;
            if results.is_empty() {
                println!("No matching entries.");
            }
            for (i, result) in results.iter().enumerate() {
                println!(
                    "{}. [{}] {} (score {:.4})",
                    i + 1,
                    result.entry.kind,
                    result.entry.title,
                    result.score
                );
            }
        }
        Command::Seed | Command::List => {}
    }

    Ok(())
}
