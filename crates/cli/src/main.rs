mod config_commands;
mod schema_file;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    configr_config::Loader,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "configr", about = "configr: typed JSON/YAML configuration files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Base directory for record files (default `_config`).
    #[arg(long, global = true, env = "CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered file formats.
    Formats,
    /// Parse a document and print it as JSON.
    Show {
        /// Path to a JSON or YAML document.
        file: PathBuf,
    },
    /// Load a document against record schemas and report problems.
    Check {
        /// Schema document declaring the records.
        #[arg(long)]
        schema: PathBuf,
        /// Record to load (defaults to the schema's root).
        #[arg(long)]
        record: Option<String>,
        /// Document to check. Defaults to the record's own file under the
        /// config directory.
        file: Option<PathBuf>,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries command output.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let loader = match &cli.config_dir {
        Some(dir) => Loader::with_base_dir(dir),
        None => Loader::new(),
    };
    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_dir = %loader.base_dir().display(),
        "configr starting"
    );

    match cli.command {
        Commands::Formats => {
            config_commands::formats(&loader);
            Ok(())
        },
        Commands::Show { file } => config_commands::show(&loader, &file),
        Commands::Check {
            schema,
            record,
            file,
        } => config_commands::check(&loader, &schema, record.as_deref(), file.as_deref()),
    }
}
