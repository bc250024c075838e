mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use threatscan_ai::{ChatClient, LanguageModel};
use threatscan_core::ClassifierConfig;
use threatscan_host::JobQueue;
use threatscan_store::ResultStore;
use threatscan_sync::Channel;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "threatscan", version, about = "Label text dumps for aggressive language")]
struct Cli {
    /// JSON configuration file. Flags below override its values.
    #[arg(long, global = true, env = "THREATSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Chat-completions base URL, e.g. http://host:8000/v1
    #[arg(long, global = true, env = "THREATSCAN_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, global = true, env = "THREATSCAN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true, env = "THREATSCAN_MODEL")]
    model: Option<String>,

    /// Directory source ids are resolved against.
    #[arg(long, global = true, env = "THREATSCAN_DATA_ROOT")]
    data_root: Option<PathBuf>,

    /// Where result sets are written. Defaults to <data-root>/processed.
    #[arg(long, global = true, env = "THREATSCAN_PROCESSED_DIR")]
    processed_dir: Option<PathBuf>,

    /// Output machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a source document (served from cache if already processed)
    Classify { source_id: String },
    /// Classify a single piece of text
    Predict { text: String },
    /// Generate mental-health outreach ad copy about a topic
    AdCopy { text: String },
    /// Queue several documents and process them one after another
    Batch {
        #[arg(required = true)]
        source_ids: Vec<String>,
        /// Push each finished result set to this webhook
        #[arg(long)]
        webhook: Option<String>,
    },
    /// List processed result files
    List,
    /// Print a processed result file
    Show { file_name: String },
    /// Copy a local document into <data-root>/raw/
    Upload { path: PathBuf },
    /// Inspect or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Print the configuration with one setting changed
    Set {
        name: String,
        value: String,
        /// Save the result back to the --config file
        #[arg(long, requires = "config")]
        write: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    tracing::debug!("threatscan v{}", env!("CARGO_PKG_VERSION"));

    let config = effective_config(&cli)?;
    let store = ResultStore::new(&config.layout);

    match cli.command {
        Command::Classify { ref source_id } => {
            let model = chat_client(&config)?;
            let report = threatscan_ai::classify(source_id, &config, &model, &store)
                .await
                .with_context(|| format!("classifying {source_id}"))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                display::print_report(&report);
            }
        }
        Command::Predict { ref text } => {
            let model = chat_client(&config)?;
            let verdict = threatscan_ai::predict_one(text, &config, &model).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                display::print_verdict(&verdict);
            }
        }
        Command::AdCopy { ref text } => {
            let model = chat_client(&config)?;
            let copy = threatscan_ai::generate_ad_copy(&model, text)
                .await
                .context("generating ad copy")?;
            if cli.json {
                println!("{}", serde_json::json!({ "copy": copy }));
            } else {
                println!("{copy}");
            }
        }
        Command::Batch {
            ref source_ids,
            ref webhook,
        } => {
            let mut config = config.clone();
            if let Some(url) = webhook {
                config = config.with_setting("webhook_url", url)?;
            }
            let channel = config.webhook_url.as_ref().map(|_| Channel::Webhook);
            let model: Arc<dyn LanguageModel> = Arc::new(chat_client(&config)?);

            let queue = JobQueue::start(config, model, store);
            for id in source_ids {
                queue.submit(id, channel)?;
            }
            let jobs = queue.shutdown().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
            } else {
                display::print_jobs(&jobs);
            }
        }
        Command::List => {
            let names = store.list_processed()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }
        Command::Show { ref file_name } => {
            let verdicts = store.get_processed(file_name)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&verdicts)?);
            } else {
                println!("=== {file_name} ===");
                display::print_verdicts(&verdicts);
                println!();
                display::print_summary(&verdicts);
            }
        }
        Command::Upload { ref path } => {
            let source_id = upload(&store, path)?;
            if cli.json {
                println!("{}", serde_json::json!({ "source_id": source_id }));
            } else {
                println!("stored as {source_id}");
            }
        }
        Command::Config { ref command } => match command {
            ConfigCommand::Show => println!("{}", serde_json::to_string_pretty(&config)?),
            ConfigCommand::Set { name, value, write } => {
                let next = config.with_setting(name, value)?;
                let rendered = serde_json::to_string_pretty(&next)?;
                if *write && let Some(path) = &cli.config {
                    std::fs::write(path, &rendered)
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), setting = %name, "configuration saved");
                }
                println!("{rendered}");
            }
        },
    }

    Ok(())
}

/// Config file (or defaults) with command-line and environment overrides applied.
fn effective_config(cli: &Cli) -> anyhow::Result<ClassifierConfig> {
    let mut config = match &cli.config {
        Some(path) => ClassifierConfig::from_json_file(path)?,
        None => ClassifierConfig::default(),
    };

    let overrides = [
        ("base_url", cli.base_url.clone()),
        ("api_key", cli.api_key.clone()),
        ("model", cli.model.clone()),
    ];
    for (name, value) in overrides {
        if let Some(value) = value {
            config = config.with_setting(name, &value)?;
        }
    }
    // Paths are not forced through UTF-8.
    if let Some(root) = &cli.data_root {
        config.layout.data_root = root.clone();
    }
    if let Some(dir) = &cli.processed_dir {
        config.layout.processed_dir = Some(dir.clone());
    }
    Ok(config)
}

fn chat_client(config: &ClassifierConfig) -> anyhow::Result<ChatClient> {
    ChatClient::new(&config.model).context("building chat client")
}

fn upload(store: &ResultStore, path: &Path) -> anyhow::Result<String> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let contents = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(store.save_upload(file_name, &contents)?)
}
