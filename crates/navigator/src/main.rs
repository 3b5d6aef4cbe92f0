//! fsbrowse
//!
//! Command line front end for the file-browser panel engine.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use navigator::config::Config;
use navigator::reconciler::EngineEvent;
use navigator::session::BrowseSession;

/// fsbrowse - alias-based file browser engine.
#[derive(Parser, Debug)]
#[command(name = "fsbrowse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the registered locations after a device scan
    Locations {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Resolve an alias or absolute path against the registry
    Resolve {
        /// Path to resolve, e.g. `%ProjectDir%/data` or `/tmp`
        path: String,
    },

    /// Run the engine and print device and selection events
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        tracing::info!("Using config file: {:?}", config_path);
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Apply environment variable overrides
    config.apply_env_overrides();
    config.validate()?;

    match cli.command {
        Commands::Locations { json } => {
            let session = BrowseSession::new(&config)?;
            let locations = session.locations();
            if json {
                println!("{}", serde_json::to_string_pretty(&locations)?);
            } else {
                for location in locations {
                    println!(
                        "{:<12} {:<8} {}",
                        location.name,
                        location.kind,
                        location.root.display()
                    );
                }
            }
        }

        Commands::Resolve { path } => {
            let session = BrowseSession::new(&config)?;
            match session.resolve(&path) {
                Ok(resolved) => println!("{}", resolved.display()),
                Err(err) => {
                    eprintln!("Error: {}", err);
                    std::process::exit(1);
                }
            }
        }

        Commands::Watch => {
            let mut session = BrowseSession::new(&config)?;
            if !session.is_enabled() {
                anyhow::bail!("browsing is disabled under the current capabilities");
            }
            let mut events = session.subscribe();
            session.start();
            tracing::info!("watching for device changes, Ctrl-C to stop");

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    event = events.recv() => match event {
                        Ok(EngineEvent::LocationAdded { name }) => {
                            println!("location added: {}", name);
                        }
                        Ok(EngineEvent::LocationRemoved { name }) => {
                            println!("location removed: {}", name);
                        }
                        Ok(EngineEvent::DriveConnected { root }) => {
                            println!("drive connected: {}", root.display());
                        }
                        Ok(EngineEvent::DriveDisconnected { root }) => {
                            println!("drive disconnected: {}", root.display());
                        }
                        Ok(EngineEvent::SelectionInvalidated) => {
                            println!("selection invalidated, falling back to default");
                        }
                        Err(_) => break,
                    },
                }
            }

            session.stop().await;
        }
    }

    Ok(())
}
