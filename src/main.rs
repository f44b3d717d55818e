mod cli;
mod core;
mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "usagedeck", about = "Gemini cost and Supabase free-tier usage dashboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: $XDG_CONFIG_HOME/usagedeck/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and display platform usage
    Usage {
        /// Platform to query: gemini, supabase or all
        #[arg(short, long)]
        platform: Option<String>,

        /// Time window for Gemini usage (24h|7d|30d)
        #[arg(short, long)]
        window: Option<String>,

        /// Override data source (auto|live|synthetic)
        #[arg(long)]
        source: Option<String>,
    },
    /// Serve the dashboard JSON API
    Serve {
        /// Address to listen on (default: settings.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
    /// Print the effective config with secrets masked
    Show,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();
    // Output defaults come from the file; a broken file is reported by the command itself.
    let settings = crate::core::config::AppConfig::load(config_path)
        .map(|c| c.settings)
        .unwrap_or_default();

    let output_opts = cli::output::OutputOptions {
        format: if cli.json {
            cli::output::OutputFormat::Json
        } else {
            match cli.format.as_deref().unwrap_or(settings.default_format.as_str()) {
                "json" => cli::output::OutputFormat::Json,
                _ => cli::output::OutputFormat::Text,
            }
        },
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color, &settings.color),
    };

    match cli.command {
        None => cli::usage_cmd::run(None, None, None, config_path, &output_opts).await?,
        Some(Commands::Usage {
            platform,
            window,
            source,
        }) => cli::usage_cmd::run(platform, window, source, config_path, &output_opts).await?,
        Some(Commands::Serve { bind }) => {
            let config = crate::core::config::AppConfig::load(config_path)?;
            let bind = bind.unwrap_or_else(|| config.settings.bind.clone());
            server::serve(config, &bind).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init => cli::config_cmd::init(config_path, &output_opts)?,
            ConfigAction::Check => cli::config_cmd::check(config_path, &output_opts)?,
            ConfigAction::Show => cli::config_cmd::show(config_path, &output_opts)?,
        },
    }

    Ok(())
}
