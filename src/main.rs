use clap::{Parser, Subcommand};

use mallama::backend::{BackendClient, BaseUrl};
use mallama::config::AppConfig;
use mallama::core::{ChatError, GenerationParams, Result};
use mallama::{logging, tui};

#[derive(Parser, Debug)]
#[command(name = "mallama")]
#[command(author, version, about = "Terminal chat client for a local model backend", long_about = None)]
struct Cli {
    /// Model to chat with (e.g. llama3, mistral)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// System prompt prepended to the conversation
    #[arg(short, long, global = true)]
    system: Option<String>,

    /// Sampling temperature
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Nucleus sampling cutoff
    #[arg(long, global = true)]
    top_p: Option<f32>,

    /// Maximum tokens per response
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// Verbose debug logging (requires the debug-log feature)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List models installed on the backend
    Models,
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigSubcommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    Init,
    Where,
}

fn resolve_params(cli: &Cli, config: &AppConfig) -> GenerationParams {
    let defaults = GenerationParams::default();
    GenerationParams {
        model: cli
            .model
            .clone()
            .or_else(|| config.model.clone())
            .unwrap_or_default(),
        system: cli.system.clone().or_else(|| config.system_prompt.clone()),
        temperature: cli
            .temperature
            .or(config.temperature)
            .unwrap_or(defaults.temperature),
        top_p: cli.top_p.or(config.top_p).unwrap_or(defaults.top_p),
        max_tokens: cli
            .max_tokens
            .or(config.max_tokens)
            .unwrap_or(defaults.max_tokens),
    }
}

fn resolve_base_url(cli: &Cli, config: &AppConfig) -> BaseUrl {
    cli.base_url
        .clone()
        .or_else(|| config.base_url.clone())
        .map_or_else(BaseUrl::default, BaseUrl::from)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose);

    let config = AppConfig::load();

    if let Some(Commands::Config { command }) = &cli.command {
        match command {
            ConfigSubcommands::Init => match AppConfig::init_default() {
                Ok(path) => {
                    println!("✓ Created config file at {}", path.display());
                }
                Err(e) => {
                    eprintln!("✗ Failed to create config: {e}");
                }
            },
            ConfigSubcommands::Where => match AppConfig::get_config_path() {
                Some(path) => println!("{}", path.display()),
                None => eprintln!("✗ Could not determine config path"),
            },
        }
        return Ok(());
    }

    let base_url = resolve_base_url(&cli, &config);
    let backend =
        BackendClient::new(base_url).map_err(|e| ChatError::Config(e.to_string()))?;

    if let Some(Commands::Models) = &cli.command {
        let models = backend
            .models()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        if models.is_empty() {
            println!("No models installed.");
        } else {
            for model in models {
                println!("{model}");
            }
        }
        return Ok(());
    }

    let params = resolve_params(&cli, &config);
    tui::run_tui(backend, params).await
}
