// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! tidyfile: AI-assisted directory tidying
//!
//! Command line front-end: one `organize` invocation is one run.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use tidyfile::categorizer::build_categorizer;
use tidyfile::config::{AppConfig, CollisionPolicy, OfflineStrategy, Provider};
use tidyfile::history::History;
use tidyfile::organizer::{ItemStatus, Organizer, RunReport};
use tidyfile::{Result, TidyError};

/// tidyfile CLI - sort a folder into category folders with an LLM
#[derive(Parser, Debug)]
#[command(name = "tidyfile")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "AI-assisted directory tidying", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "tidyfile.json", global = true)]
    config: PathBuf,

    /// Offline/debug mode: label files locally, never call the API
    #[arg(long, visible_alias = "debug", global = true)]
    offline: bool,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Categorize the items of a directory and move them into category folders
    Organize {
        /// Directory to organize
        dir: PathBuf,

        /// Show where items would go without moving anything
        #[arg(long)]
        dry_run: bool,

        /// Include files in subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Treat top-level folders as items too
        #[arg(long)]
        folders: bool,

        /// Send a short content excerpt along with each name
        #[arg(long)]
        excerpts: bool,

        /// What to do when the destination name is taken
        #[arg(long, value_enum)]
        on_collision: Option<CollisionPolicy>,

        /// Items per API request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Provider to use (overrides config)
        #[arg(long, value_enum)]
        provider: Option<Provider>,

        /// Model to use (overrides config)
        #[arg(long)]
        model: Option<String>,

        /// Offline labelling strategy
        #[arg(long, value_enum)]
        strategy: Option<OfflineStrategy>,

        /// Label for the fixed offline strategy (implies --strategy fixed)
        #[arg(long)]
        label: Option<String>,

        /// Seed for the random offline strategy
        #[arg(long)]
        seed: Option<u64>,
    },

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Check the categorization provider is reachable
    Status,
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent moves
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Undo recent moves
    Undo {
        /// Number of moves to undo (0 for all)
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "tidyfile.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Organize {
            dir,
            dry_run,
            recursive,
            folders,
            excerpts,
            on_collision,
            batch_size,
            provider,
            model,
            strategy,
            label,
            seed,
        } => {
            let mut config = config;
            config.scan.recursive |= recursive;
            config.scan.include_folders |= folders;
            config.scan.include_excerpts |= excerpts;
            if let Some(policy) = on_collision {
                config.rules.on_collision = policy;
            }
            if let Some(size) = batch_size {
                config.ai_engine.batch_size = size;
            }
            if let Some(provider) = provider {
                config.ai_engine.provider = provider;
            }
            if let Some(model) = model {
                config.ai_engine.model = model;
            }
            if let Some(label) = label {
                config.offline.label = label;
                config.offline.strategy = OfflineStrategy::Fixed;
            }
            if let Some(strategy) = strategy {
                config.offline.strategy = strategy;
            }
            if seed.is_some() {
                config.offline.seed = seed;
            }
            config.validate()?;

            run_organize(config, &dir, dry_run, cli.offline, &cli.config, &cli.format).await
        }
        Commands::History { action } => run_history_command(&config, action, &cli.format),
        Commands::Config { action } => run_config_command(config, action, &cli.config),
        Commands::Status => run_status(config, cli.offline).await,
    }
}

/// Run one organize pass over `dir`
async fn run_organize(
    config: AppConfig,
    dir: &Path,
    dry_run: bool,
    offline: bool,
    config_path: &Path,
    format: &str,
) -> Result<()> {
    if dry_run {
        warn!("DRY RUN MODE - nothing will be moved");
    }

    let categorizer = build_categorizer(&config, offline)?;
    let report = Organizer::new(config, categorizer)
        .dry_run(dry_run)
        .exclude(config_path.to_path_buf())
        .run(dir)
        .await?;

    print_report(&report, format)
}

fn print_report(report: &RunReport, format: &str) -> Result<()> {
    match format {
        "json" => {
            let output = serde_json::json!({
                "run_id": report.run_id,
                "root": report.root,
                "dry_run": report.dry_run,
                "summary": report.summary(),
                "items": report.items,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        "jsonl" => {
            for item in &report.items {
                println!("{}", serde_json::to_string(item)?);
            }
        }
        _ => {
            for item in &report.items {
                match &item.status {
                    ItemStatus::Moved { destination, .. } => {
                        println!("moved      {} -> {}", item.name, relative(&report.root, destination))
                    }
                    ItemStatus::Planned { destination, .. } => {
                        println!("would move {} -> {}", item.name, relative(&report.root, destination))
                    }
                    ItemStatus::Unchanged { .. } => println!("in place   {}", item.name),
                    ItemStatus::Uncategorized => println!("no label   {}", item.name),
                    ItemStatus::Failed { error, .. } => println!("failed     {}: {}", item.name, error),
                }
            }
            let s = report.summary();
            println!(
                "\n{} items: {} moved, {} planned, {} unchanged, {} uncategorized, {} failed",
                s.total, s.moved, s.planned, s.unchanged, s.uncategorized, s.failed
            );
        }
    }
    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Run history commands
fn run_history_command(config: &AppConfig, action: HistoryCommands, format: &str) -> Result<()> {
    let history = History::new(PathBuf::from(&config.history.path));

    match action {
        HistoryCommands::List { count } => {
            let records = history.get_recent(count)?;
            if format == "text" {
                println!("Recent history ({} entries):", records.len());
                for record in records {
                    let status = if record.undone { "[UNDONE]" } else { "" };
                    println!(
                        "  {} {} -> {} {}",
                        record.timestamp.format("%Y-%m-%d %H:%M"),
                        record.source.display(),
                        record.destination.display(),
                        status
                    );
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            let report = history.undo(count, dry_run)?;

            if report.restored.is_empty() && report.skipped.is_empty() {
                println!("No moves to undo");
                return Ok(());
            }

            let verb = if dry_run { "Would undo" } else { "Undone" };
            for record in &report.restored {
                println!(
                    "{}: {} -> {}",
                    verb,
                    record.destination.display(),
                    record.source.display()
                );
            }
            for (record, reason) in &report.skipped {
                println!("Skipped: {} ({})", record.destination.display(), reason);
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Generate { output, force } => {
            if output.exists() && !force {
                return Err(TidyError::Config(format!(
                    "{} already exists. Use --force to overwrite",
                    output.display()
                )));
            }
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Provider: {:?}", config.ai_engine.provider);
            println!("  Model: {}", config.ai_engine.model);
            println!("  Batch size: {}", config.ai_engine.batch_size);
            println!("  History: {}", config.history.path);
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig, offline: bool) -> Result<()> {
    println!("tidyfile v{} Status", env!("CARGO_PKG_VERSION"));
    println!("====================");

    let categorizer = build_categorizer(&config, offline)?;
    match categorizer.health_check().await {
        Ok(()) => println!("{}: Ready", categorizer.name()),
        Err(e) => println!("{}: Error - {}", categorizer.name(), e),
    }

    println!("\nConfiguration:");
    println!("  Provider: {:?}", config.ai_engine.provider);
    println!("  Endpoint: {}", config.ai_engine.resolved_base_url());
    println!("  Model: {}", config.ai_engine.model);
    if config.ai_engine.provider == Provider::Gemini {
        let key = if config.ai_engine.resolved_api_key().is_some() { "set" } else { "missing" };
        println!("  API key ({}): {}", config.ai_engine.api_key_env, key);
    }
    info!("History file: {}", config.history.path);

    Ok(())
}
