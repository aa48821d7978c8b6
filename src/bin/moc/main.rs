//! moc CLI tool
//!
//! Command-line interface for maintaining map-of-contents links in a markdown vault.
//!
//! ## Commands
//!
//! - `init <vault> [folder]`: Create index files for folders that lack one
//! - `sync <vault>`: Refresh the links block of every index file once
//! - `show <vault> <document>`: Print the block a document would carry
//! - `insert <vault> <document>`: Append a fresh block below the document body
//! - `strip <vault> <document>`: Remove the block from a document
//! - `watch <vault>`: Keep every index file current until Ctrl-C
//!
//! Configuration is read from `<vault>/.moc/config.toml` unless `--config` points elsewhere.
//! A missing file means defaults.

use clap::{Parser, Subcommand};
use moc_core::{
    config::{ConfigProvider, MocConfig, TomlConfigProvider},
    engine::MocEngine,
    event::{Event, EventSink},
    paths::{os_path_to_string, to_vault_path},
    store::{DocumentStore, FsStore},
    watch::WatchService,
    MocError,
};
use std::{
    path::{Path, PathBuf},
    sync::{mpsc::channel, Arc},
    time::Duration,
};

#[derive(Parser)]
#[command(name = "moc")]
#[command(author, version, about = "Keeps map-of-contents links in a markdown vault up to date", long_about = None)]
struct Cli {
    /// Configuration file path (default: <vault>/.moc/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing index files, for one folder or for every folder of the vault
    Init {
        /// Vault root directory
        #[arg(default_value = ".")]
        vault: PathBuf,

        /// Folder to initialize, relative to the vault (default: every folder)
        folder: Option<String>,

        /// Write the effective configuration to the config file as well
        #[arg(long)]
        write_config: bool,
    },

    /// Refresh the links block of every index file once
    Sync {
        /// Vault root directory
        #[arg(default_value = ".")]
        vault: PathBuf,
    },

    /// Print the links block a document would carry, without writing it
    Show {
        /// Vault root directory
        vault: PathBuf,

        /// Document path, relative to the vault or absolute
        document: PathBuf,
    },

    /// Append a fresh links block below a document's body
    Insert {
        /// Vault root directory
        vault: PathBuf,

        /// Document path, relative to the vault or absolute
        document: PathBuf,
    },

    /// Remove the links block from a document
    Strip {
        /// Vault root directory
        vault: PathBuf,

        /// Document path, relative to the vault or absolute
        document: PathBuf,
    },

    /// Watch a vault and keep its index files current
    Watch {
        /// Vault root directory
        #[arg(default_value = ".")]
        vault: PathBuf,

        /// Print every event
        #[arg(short, long)]
        verbose: bool,
    },
}

fn config_provider(vault: &Path, config: Option<PathBuf>) -> TomlConfigProvider {
    match config {
        Some(path) => TomlConfigProvider::new(path),
        None => TomlConfigProvider::for_vault(vault),
    }
}

fn document_path(vault: &Path, document: &Path) -> Result<String, MocError> {
    if document.is_absolute() {
        to_vault_path(vault, document)
    } else {
        Ok(os_path_to_string(document))
    }
}

fn open_engine(vault: &Path, config: MocConfig) -> Result<MocEngine, MocError> {
    let store = Arc::new(FsStore::new(vault)?);
    let (tx, rx) = channel::<Event>();
    // print anomalies and failures as they are reported
    std::thread::spawn(move || {
        for event in rx {
            match event {
                Event::Anomaly { .. } | Event::Failure { .. } => eprintln!("{event}"),
                _ => {}
            }
        }
    });
    Ok(MocEngine::new(store, config, EventSink::new(tx)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            vault,
            folder,
            write_config,
        } => {
            let provider = config_provider(&vault, cli.config);
            let config = provider.get_config()?;
            if write_config {
                provider.set_config(&config)?;
                println!("Configuration written to {}", provider.path().display());
            }
            let engine = open_engine(&vault, config)?;
            let folders: Vec<String> = match folder {
                Some(folder) => vec![os_path_to_string(folder)],
                None => engine
                    .store()
                    .root()?
                    .all_folders()
                    .into_iter()
                    .filter(|folder| !folder.is_root())
                    .map(|folder| folder.path.clone())
                    .collect(),
            };
            let mut created = 0;
            for folder in folders {
                if let Some(path) = engine.create_index_file(&folder)? {
                    println!("Created {path}");
                    created += 1;
                }
            }
            println!("{created} index files created");
            Ok(())
        }

        Commands::Sync { vault } => {
            let config = config_provider(&vault, cli.config).get_config()?;
            let engine = open_engine(&vault, config)?;
            let report = engine.sync_all()?;
            for path in report.updated.iter() {
                println!("Updated {path}");
            }
            println!(
                "{} updated, {} unchanged, {} failed",
                report.updated.len(),
                report.unchanged,
                report.failed.len()
            );
            if !report.failed.is_empty() {
                for (path, e) in report.failed.iter() {
                    eprintln!("Error: {path}: {e}");
                }
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Show { vault, document } => {
            let config = config_provider(&vault, cli.config).get_config()?;
            let engine = open_engine(&vault, config)?;
            let path = document_path(&vault, &document)?;
            print!("{}", engine.render_block(&path)?);
            Ok(())
        }

        Commands::Insert { vault, document } => {
            let config = config_provider(&vault, cli.config).get_config()?;
            let engine = open_engine(&vault, config)?;
            let path = document_path(&vault, &document)?;
            engine.insert_links(&path)?;
            println!("Inserted MOC links into {path}");
            Ok(())
        }

        Commands::Strip { vault, document } => {
            let config = config_provider(&vault, cli.config).get_config()?;
            let engine = open_engine(&vault, config)?;
            let path = document_path(&vault, &document)?;
            if engine.strip_links(&path)? {
                println!("Removed MOC links from {path}");
            } else {
                println!("No MOC links block in {path}");
            }
            Ok(())
        }

        Commands::Watch { vault, verbose } => {
            let config = config_provider(&vault, cli.config).get_config()?;

            // Create event channel
            let (tx, rx) = channel::<Event>();
            let event_handle = std::thread::spawn(move || {
                for event in rx {
                    match event {
                        Event::Anomaly { .. } | Event::Failure { .. } => eprintln!("{event}"),
                        _ if verbose => println!("[Event] {event}"),
                        _ => {}
                    }
                }
            });

            let service = WatchService::new(tx)?;
            service.enable_vault(&vault, config)?;

            println!(
                "Watching {} for changes. Press Ctrl-C to stop.",
                vault.display()
            );

            // Set up Ctrl-C handler
            let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || {
                println!("\nShutting down...");
                r.store(false, std::sync::atomic::Ordering::SeqCst);
            })?;

            // Keep running until Ctrl-C
            while running.load(std::sync::atomic::Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(100));
            }

            // Cleanup
            service.disable_vault(&vault)?;
            drop(service);
            drop(event_handle);

            println!("Shutdown complete");
            Ok(())
        }
    }
}
