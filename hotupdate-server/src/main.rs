//! Hot update server CLI binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{builder::BoolishValueParser, Parser, Subcommand};
use hotupdate_logging::{init_subscriber, LogSettings};
use hotupdate_server::{
    config::ConfigOverrides, registry::StorageLayout, resolve, routes::updates::CheckResponse,
    run_server, Config,
};

#[derive(Parser)]
#[command(name = "hotupdate-server")]
#[command(about = "Hot update server - progressive update distribution for multiple apps")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the JSON config file
    #[arg(long, env = "CONFIG_PATH", default_value = "./config.json", global = true)]
    config: PathBuf,

    /// Upload directory holding the registries and packages
    #[arg(long = "upload", env = "UPLOAD_DIR", global = true)]
    upload_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, env = "PORT")]
        port: Option<u16>,

        /// Directory for log files
        #[arg(long = "log", env = "LOG_DIR")]
        log_dir: Option<PathBuf>,

        /// Enable debug logging (`--debug`, `--debug false`, `DEBUG_MODE=1`)
        #[arg(
            long,
            env = "DEBUG_MODE",
            num_args = 0..=1,
            default_missing_value = "true",
            value_parser = BoolishValueParser::new()
        )]
        debug: Option<bool>,
    },

    /// Resolve the next update for an app without starting the server
    Check {
        /// App id
        #[arg(long, default_value = hotupdate_server::DEFAULT_APP_ID)]
        app: String,

        /// Version the client currently runs
        #[arg(long)]
        version: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
        log_dir: None,
        debug: None,
    }) {
        Commands::Serve {
            host,
            port,
            log_dir,
            debug,
        } => {
            config.apply_overrides(ConfigOverrides {
                host,
                port,
                upload_dir: cli.upload_dir,
                log_dir,
                debug_mode: debug,
            });

            let settings =
                LogSettings::from_env(config.storage.log_dir.clone(), config.server.debug_mode);
            let _guard = init_subscriber(&settings);

            run_server(config).await
        }

        Commands::Check { app, version } => {
            config.apply_overrides(ConfigOverrides {
                upload_dir: cli.upload_dir,
                ..Default::default()
            });

            let layout = StorageLayout::new(config.storage.upload_dir.clone());
            let versions = layout.load_versions(&app).await?;
            let decision = resolve(&app, &version, &versions);

            let body = CheckResponse::from(decision);
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
    }
}
