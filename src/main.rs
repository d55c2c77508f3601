//! Meetwise - Real-time meeting intelligence streaming pipeline
//!
//! The `replay` subcommand drives a full session pipeline from a recorded
//! stream: transcript chunks and raw stream objects as JSON lines, with
//! broadcast events printed back as JSON lines. Useful for debugging the
//! routing and discovery behavior without a live LLM.

use anyhow::Result;
use clap::{Parser, Subcommand};
use meetwise::config::MeetwiseConfig;
use meetwise::events::{EventTransport, MemoryTransport};
use meetwise::insight::{InsightStore, MemoryInsightStore};
use meetwise::knowledge::{CannedAnswerGenerator, MemoryKnowledgeBase};
use meetwise::session::{SessionRegistryBuilder, StoreBackedCache, TranscriptChunk};
use meetwise::stream::ScriptedStreamClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "meetwise")]
#[command(author = "Meetwise Team")]
#[command(version)]
#[command(about = "Real-time meeting intelligence streaming pipeline")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MEETWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded stream through a session pipeline
    ///
    /// Input is JSON lines: objects with a "text" field are transcript
    /// chunks; objects with a "type" field are the stream objects the
    /// analysis model would emit for the preceding chunk.
    Replay {
        /// Input file (defaults to stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Session ID to replay under
        #[arg(short, long, default_value = "replay")]
        session: String,

        /// How long to let discovery settle before reporting (ms)
        #[arg(long, default_value = "2000")]
        settle_ms: u64,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("meetwise={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        MeetwiseConfig::from_file(config_path)?
    } else {
        MeetwiseConfig::default()
    };

    match cli.command {
        Commands::Replay {
            file,
            session,
            settle_ms,
        } => {
            run_replay(config, file, &session, settle_ms).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

/// A parsed replay input line
enum ReplayLine {
    Chunk(TranscriptChunk),
    Object(serde_json::Value),
}

fn parse_replay_lines(input: &str) -> Vec<ReplayLine> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let value: serde_json::Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!("skipping unparseable replay line: {}", e);
                    return None;
                }
            };
            if value.get("type").is_some() {
                Some(ReplayLine::Object(value))
            } else if let Some(text) = value.get("text").and_then(|t| t.as_str()) {
                Some(ReplayLine::Chunk(TranscriptChunk {
                    text: text.to_string(),
                    is_final: value
                        .get("is_final")
                        .and_then(|f| f.as_bool())
                        .unwrap_or(true),
                    speaker: value
                        .get("speaker")
                        .and_then(|s| s.as_str())
                        .map(String::from),
                    timestamp: value
                        .get("timestamp")
                        .and_then(|t| t.as_f64())
                        .unwrap_or(0.0),
                }))
            } else {
                tracing::warn!("skipping replay line with neither \"type\" nor \"text\"");
                None
            }
        })
        .collect()
}

async fn run_replay(
    config: MeetwiseConfig,
    file: Option<PathBuf>,
    session: &str,
    settle_ms: u64,
) -> Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::io::read_to_string(std::io::stdin())?,
    };

    // Group the script: each chunk opens a batch; the stream objects that
    // follow it are what the "model" emits for that chunk.
    let mut chunks: Vec<TranscriptChunk> = Vec::new();
    let mut batches: Vec<Vec<serde_json::Value>> = Vec::new();
    for line in parse_replay_lines(&input) {
        match line {
            ReplayLine::Chunk(chunk) => {
                chunks.push(chunk);
                batches.push(Vec::new());
            }
            ReplayLine::Object(object) => {
                if batches.is_empty() {
                    // Objects before any chunk still need a driving chunk
                    chunks.push(TranscriptChunk {
                        text: "(replay)".to_string(),
                        is_final: true,
                        speaker: None,
                        timestamp: 0.0,
                    });
                    batches.push(Vec::new());
                }
                batches.last_mut().expect("just pushed").push(object);
            }
        }
    }

    let store = Arc::new(MemoryInsightStore::new());
    let transport = Arc::new(MemoryTransport::new());
    let registry = SessionRegistryBuilder::new(config)
        .store(store.clone() as Arc<dyn InsightStore>)
        .transport(transport.clone() as Arc<dyn EventTransport>)
        .llm(Arc::new(ScriptedStreamClient::new(batches)))
        .knowledge(Arc::new(MemoryKnowledgeBase::new()))
        .generator(Arc::new(CannedAnswerGenerator::silent()))
        .cache(Arc::new(StoreBackedCache::new(
            store.clone() as Arc<dyn InsightStore>
        )))
        .build()?;

    let pipeline = registry.get_or_create(session).await?;
    for chunk in chunks {
        if let Err(e) = pipeline.process_chunk(chunk).await {
            tracing::error!("chunk processing failed: {}", e);
        }
    }
    pipeline.segment_boundary().await?;

    tracing::info!("replay fed, letting discovery settle for {}ms", settle_ms);
    tokio::time::sleep(std::time::Duration::from_millis(settle_ms)).await;

    for event in transport.events().await {
        println!("{}", serde_json::to_string(&event)?);
    }
    let summary = serde_json::json!({
        "health": pipeline.health(),
        "router": pipeline.router_metrics(),
    });
    println!("{}", serde_json::to_string(&summary)?);

    registry.teardown(session).await;
    Ok(())
}

fn show_config(config: Option<&MeetwiseConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
