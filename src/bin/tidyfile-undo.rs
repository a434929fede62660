// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! tidyfile Undo Utility
//!
//! Moves files back to where they were before an organize run.

use clap::Parser;
use std::path::PathBuf;

use tidyfile::history::History;

#[derive(Parser, Debug)]
#[command(name = "tidyfile-undo")]
#[command(version)]
#[command(about = "Undo tidyfile moves")]
struct Args {
    /// Path to history file
    #[arg(short = 'f', long, default_value = "tidyfile_history.jsonl")]
    history_file: PathBuf,

    /// Number of moves to undo (default: 1, use 0 for all)
    #[arg(short, long, default_value = "1")]
    count: usize,

    /// Only undo moves from this run
    #[arg(long)]
    run: Option<String>,

    /// Dry run - show what would be undone without doing it
    #[arg(long)]
    dry_run: bool,

    /// List all entries in history
    #[arg(long)]
    list: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if !args.history_file.exists() {
        eprintln!("History file not found: {:?}", args.history_file);
        eprintln!("No moves to undo.");
        return Ok(());
    }

    let history = History::new(args.history_file.clone());

    if args.list {
        let records = history.get_recent(usize::MAX)?;
        if records.is_empty() {
            println!("No history entries found.");
            return Ok(());
        }
        println!("Move History ({} entries):", records.len());
        println!("{:-<80}", "");
        for (i, record) in records.iter().enumerate() {
            println!(
                "{:3}. [{}] {} -> {}{}",
                i + 1,
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.source.display(),
                record.destination.display(),
                if record.undone { " [UNDONE]" } else { "" }
            );
            println!("     Category: {}  Run: {}", record.category, record.run_id);
        }
        return Ok(());
    }

    let count = match &args.run {
        // Everything undoable from that run, newest first
        Some(run) => {
            let pending = history.get_undoable()?;
            let newest_other = pending.iter().rposition(|r| &r.run_id != run);
            let in_run = pending.iter().filter(|r| &r.run_id == run).count();
            if in_run == 0 {
                println!("No undoable moves recorded for run {}", run);
                return Ok(());
            }
            if let Some(pos) = newest_other {
                if pending[..=pos].iter().any(|r| &r.run_id == run) {
                    eprintln!("Run {} is not the most recent run; undo later runs first.", run);
                    return Ok(());
                }
            }
            in_run
        }
        None => args.count,
    };

    println!(
        "{}Undoing {} move(s)...",
        if args.dry_run { "[DRY RUN] " } else { "" },
        if count == 0 { "all".to_string() } else { count.to_string() }
    );

    let report = history.undo(count, args.dry_run)?;

    for record in &report.restored {
        let verb = if args.dry_run { "Would move" } else { "Undone" };
        println!(
            "  {}: {} -> {}",
            verb,
            record.destination.display(),
            record.source.display()
        );
    }
    for (record, reason) in &report.skipped {
        eprintln!("  Skip: {} ({})", record.destination.display(), reason);
    }

    println!();
    if args.dry_run {
        println!("Dry run complete. {} move(s) would be undone.", report.restored.len());
    } else {
        println!(
            "Done. {} undone, {} failed/skipped.",
            report.restored.len(),
            report.skipped.len()
        );
    }

    Ok(())
}
