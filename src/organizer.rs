// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! One organize run: scan, categorize in batches, move

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::categorizer::{CategoryResult, Categorizer};
use crate::category::Category;
use crate::config::AppConfig;
use crate::history::History;
use crate::mover::{MoveOutcome, Mover};
use crate::scanner::{FileItem, Scanner};
use crate::{Result, TidyError};

/// Where an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Categorize,
    Move,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemStatus {
    Moved { category: Category, destination: PathBuf },
    Planned { category: Category, destination: PathBuf },
    Unchanged { category: Category, destination: PathBuf },
    /// The provider answered but gave no label for this item
    Uncategorized,
    Failed { stage: Stage, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub name: String,
    pub source: PathBuf,
    #[serde(flatten)]
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub moved: usize,
    pub planned: usize,
    pub unchanged: usize,
    pub uncategorized: usize,
    pub failed: usize,
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub root: PathBuf,
    pub dry_run: bool,
    pub items: Vec<ItemReport>,
}

impl RunReport {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.items.len(),
            ..Summary::default()
        };
        for item in &self.items {
            match item.status {
                ItemStatus::Moved { .. } => summary.moved += 1,
                ItemStatus::Planned { .. } => summary.planned += 1,
                ItemStatus::Unchanged { .. } => summary.unchanged += 1,
                ItemStatus::Uncategorized => summary.uncategorized += 1,
                ItemStatus::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemReport> {
        self.items
            .iter()
            .filter(|i| matches!(i.status, ItemStatus::Failed { .. }))
    }
}

pub struct Organizer {
    config: AppConfig,
    categorizer: Box<dyn Categorizer>,
    dry_run: bool,
    excluded: Vec<PathBuf>,
}

impl Organizer {
    pub fn new(config: AppConfig, categorizer: Box<dyn Categorizer>) -> Self {
        Self {
            config,
            categorizer,
            dry_run: false,
            excluded: Vec::new(),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Extra paths the scan must never pick up
    pub fn exclude(mut self, path: PathBuf) -> Self {
        self.excluded.push(path);
        self
    }

    fn history(&self) -> Option<History> {
        (self.config.history.enabled && !self.dry_run)
            .then(|| History::new(PathBuf::from(&self.config.history.path)))
    }

    fn scanner(&self) -> Result<Scanner> {
        let reserved: Vec<String> = self
            .config
            .categories
            .iter()
            .filter_map(|c| Category::parse(c).segments().next().map(String::from))
            .collect();

        let mut excluded = self.excluded.clone();
        excluded.push(PathBuf::from(&self.config.history.path));

        Ok(Scanner::new(self.config.scan.clone())?
            .with_reserved_folders(reserved)
            .with_excluded(excluded))
    }

    /// Organize `root` once
    pub async fn run(&self, root: &Path) -> Result<RunReport> {
        // History must hold absolute paths so undo works from any directory
        let root = root
            .canonicalize()
            .map_err(|e| TidyError::Scan(format!("{} is not a valid directory: {}", root.display(), e)))?;
        let root = root.as_path();
        let items = self.scanner()?.scan(root)?;

        let mut mover = Mover::new(root, self.config.rules.on_collision).dry_run(self.dry_run);
        if let Some(history) = self.history() {
            mover = mover.with_history(history);
        }

        let mut report = RunReport {
            run_id: mover.run_id().to_string(),
            root: root.to_path_buf(),
            dry_run: self.dry_run,
            items: Vec::with_capacity(items.len()),
        };

        if items.is_empty() {
            info!("No files found to organize.");
            return Ok(report);
        }

        let batch_size = self.config.ai_engine.batch_size.max(1);
        let batches = items.len().div_ceil(batch_size);
        info!(
            "Categorizing {} items with {} in {} batch(es)",
            items.len(),
            self.categorizer.name(),
            batches
        );

        for (n, batch) in items.chunks(batch_size).enumerate() {
            info!("Processing batch {}/{}...", n + 1, batches);

            match self.categorizer.categorize(batch).await {
                Ok(results) => {
                    let by_id: HashMap<usize, &CategoryResult> =
                        results.iter().map(|r| (r.item_id, r)).collect();
                    for item in batch {
                        let status = match by_id.get(&item.id) {
                            Some(result) => self.move_one(&mover, item, &result.category),
                            None => {
                                warn!("No category returned for '{}'", item.name);
                                ItemStatus::Uncategorized
                            }
                        };
                        report.items.push(item_report(item, status));
                    }
                }
                Err(e) => {
                    error!("Batch {} categorization failed: {}", n + 1, e);
                    let message = e.to_string();
                    for item in batch {
                        report.items.push(item_report(
                            item,
                            ItemStatus::Failed {
                                stage: Stage::Categorize,
                                error: message.clone(),
                            },
                        ));
                    }
                }
            }
        }

        let summary = report.summary();
        info!(
            "Done: {} moved, {} planned, {} unchanged, {} uncategorized, {} failed",
            summary.moved, summary.planned, summary.unchanged, summary.uncategorized, summary.failed
        );
        Ok(report)
    }

    fn move_one(&self, mover: &Mover, item: &FileItem, category: &Category) -> ItemStatus {
        info!("File: '{}' -> Category: '{}'", item.name, category);
        match mover.move_item(item, category) {
            Ok(MoveOutcome::Moved(destination)) => ItemStatus::Moved {
                category: category.clone(),
                destination,
            },
            Ok(MoveOutcome::Planned(destination)) => ItemStatus::Planned {
                category: category.clone(),
                destination,
            },
            Ok(MoveOutcome::Unchanged(destination)) => ItemStatus::Unchanged {
                category: category.clone(),
                destination,
            },
            Err(e) => {
                error!("Error moving '{}': {}", item.name, e);
                ItemStatus::Failed {
                    stage: Stage::Move,
                    error: e.to_string(),
                }
            }
        }
    }
}

fn item_report(item: &FileItem, status: ItemStatus) -> ItemReport {
    ItemReport {
        name: item.name.clone(),
        source: item.path.clone(),
        status,
    }
}
