use anyhow::{Context, Result};
use chordcraft_server::config::{AppConfig, CliConfig, FileConfig};
use chordcraft_server::content_store::{ContentStore, SqliteContentStore};
use chordcraft_server::generation::{GenerationPipeline, PromptCompiler};
use chordcraft_server::library::LibraryService;
use chordcraft_server::llm::{ApiKeySource, LlmProvider, OpenAIProvider};
use chordcraft_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in it override the CLI.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding content.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Base URL of the OpenAI-compatible completion API.
    #[clap(long)]
    pub llm_base_url: Option<String>,

    /// Model name sent with every completion request.
    #[clap(long)]
    pub llm_model: Option<String>,

    /// Bearer token for the completion API.
    #[clap(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Shell command that prints the bearer token, run before each request.
    #[clap(long)]
    pub api_key_command: Option<String>,

    /// Timeout in seconds for completion requests.
    #[clap(long)]
    pub llm_timeout_secs: Option<u64>,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            llm_base_url: args.llm_base_url.clone(),
            llm_model: args.llm_model.clone(),
            api_key: args.api_key.clone(),
            api_key_command: args.api_key_command.clone(),
            llm_timeout_secs: args.llm_timeout_secs,
        }
    }
}

fn make_provider(config: &AppConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm = &config.llm;
    let provider = match &llm.credential {
        ApiKeySource::Static(key) => {
            OpenAIProvider::new(llm.base_url.clone(), llm.model.clone(), key.clone())
        }
        ApiKeySource::Command(cmd) => {
            OpenAIProvider::with_key_command(llm.base_url.clone(), llm.model.clone(), cmd.clone())
        }
    }
    .context("Failed to create completion provider")?;
    Ok(Arc::new(provider))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!(
        "Opening SQLite content database at {:?}...",
        config.content_db_path()
    );
    let store = Arc::new(SqliteContentStore::new(config.content_db_path())?);
    let stats = store.get_stats()?;
    metrics::set_library_size(stats.library_entries);
    info!(
        "Content store holds {} progressions, {} explanations, {} library entries",
        stats.progressions, stats.explanations, stats.library_entries
    );

    let provider = make_provider(&config)?;
    info!(
        "Using {} model {} at {}",
        provider.name(),
        provider.model(),
        config.llm.base_url
    );
    if let Err(e) = provider.health_check().await {
        warn!("Completion service health check failed: {}", e);
    }

    let pipeline = Arc::new(GenerationPipeline::new(
        PromptCompiler::new(config.llm.timeout()),
        provider,
        store.clone(),
    ));
    let library = Arc::new(LibraryService::new(store));

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        metrics_port: config.metrics_port,
        frontend_dir_path: config.frontend_dir_path.clone(),
    };

    tokio::select! {
        result = run_server(pipeline, library, server_config) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    }
}
