// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Moves categorized items into `<root>/<category>/`

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::config::CollisionPolicy;
use crate::error::MoveError;
use crate::history::{hash_file, History, MoveRecord};
use crate::scanner::{FileItem, ItemKind};

/// errno for a rename across filesystems (Linux and macOS agree)
#[cfg(unix)]
const EXDEV: i32 = 18;

/// What happened to one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(PathBuf),
    /// Dry run: where the item would go
    Planned(PathBuf),
    /// Already where its category puts it
    Unchanged(PathBuf),
}

impl MoveOutcome {
    pub fn destination(&self) -> &Path {
        match self {
            MoveOutcome::Moved(p) | MoveOutcome::Planned(p) | MoveOutcome::Unchanged(p) => p,
        }
    }
}

pub struct Mover {
    root: PathBuf,
    policy: CollisionPolicy,
    dry_run: bool,
    history: Option<History>,
    run_id: String,
    /// Destinations handed out during a dry run, so later items plan around them
    planned: Mutex<HashSet<PathBuf>>,
}

impl Mover {
    pub fn new(root: &Path, policy: CollisionPolicy) -> Self {
        Self {
            root: root.to_path_buf(),
            policy,
            dry_run: false,
            history: None,
            run_id: uuid::Uuid::new_v4().to_string(),
            planned: Mutex::new(HashSet::new()),
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Record every successful move in `history`
    pub fn with_history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Move `item` into the folder for `category`
    pub fn move_item(&self, item: &FileItem, category: &Category) -> Result<MoveOutcome, MoveError> {
        let dest_dir = self.root.join(category.relative_path());
        let natural = dest_dir.join(&item.name);

        if item.path == natural {
            debug!("'{}' already in {}", item.name, category);
            return Ok(MoveOutcome::Unchanged(natural));
        }

        if fs::symlink_metadata(&item.path).is_err() {
            return Err(MoveError::SourceMissing(item.path.clone()));
        }

        if item.kind == ItemKind::Folder && dest_dir.starts_with(&item.path) {
            return Err(MoveError::IntoItself(item.path.clone()));
        }

        let destination = self.resolve_collision(natural)?;

        if self.dry_run {
            self.planned
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(destination.clone());
            info!("DRY RUN: Would move '{}' -> {:?}", item.name, destination);
            return Ok(MoveOutcome::Planned(destination));
        }

        let created_dirs = self.missing_dirs(category);
        fs::create_dir_all(&dest_dir).map_err(|e| MoveError::from_io(dest_dir.clone(), e))?;

        let content_hash = if self.history.is_some() && item.kind == ItemKind::File {
            hash_file(&item.path).unwrap_or_else(|e| {
                warn!("Cannot hash {:?}, undo will not verify it: {}", item.path, e);
                String::new()
            })
        } else {
            String::new()
        };

        if let Err(e) = relocate(&item.path, &destination, item.kind) {
            remove_if_empty(&created_dirs);
            return Err(e);
        }
        info!("'{}' -> {:?}", item.name, destination);

        if let Some(history) = &self.history {
            let record = MoveRecord::new(
                &self.run_id,
                item.path.clone(),
                destination.clone(),
                category.to_string(),
                content_hash,
                created_dirs,
            );
            if let Err(e) = history.append(&record) {
                warn!("Moved {:?} but could not record it in history: {}", item.path, e);
            }
        }

        Ok(MoveOutcome::Moved(destination))
    }

    fn resolve_collision(&self, natural: PathBuf) -> Result<PathBuf, MoveError> {
        let planned = self.planned.lock().unwrap_or_else(|e| e.into_inner());
        let taken = |p: &Path| planned.contains(p) || fs::symlink_metadata(p).is_ok();
        if !taken(natural.as_path()) {
            return Ok(natural);
        }
        match self.policy {
            CollisionPolicy::Skip => Err(MoveError::Collision(natural)),
            CollisionPolicy::Rename => Ok(next_free_name(&natural, taken)),
        }
    }

    /// Category folders that do not exist yet, outermost first
    fn missing_dirs(&self, category: &Category) -> Vec<PathBuf> {
        let mut dir = self.root.clone();
        let mut missing = Vec::new();
        for segment in category.segments() {
            dir.push(segment);
            if !dir.exists() {
                missing.push(dir.clone());
            }
        }
        missing
    }
}

/// `report.pdf` -> `report_1.pdf`, `report_2.pdf`, ... whichever is free first
fn next_free_name(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());

    (1..)
        .map(|n| {
            let name = match &ext {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            };
            parent.join(name)
        })
        .find(|candidate| !taken(candidate.as_path()))
        .unwrap_or_else(|| path.to_path_buf())
}

fn relocate(from: &Path, to: &Path, kind: ItemKind) -> Result<(), MoveError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) && kind == ItemKind::File => {
            debug!("Cross-device move of {:?}, copying instead", from);
            fs::copy(from, to).map_err(|e| MoveError::from_io(from.to_path_buf(), e))?;
            fs::remove_file(from).map_err(|e| MoveError::from_io(from.to_path_buf(), e))
        }
        Err(e) => Err(MoveError::from_io(from.to_path_buf(), e)),
    }
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    err.raw_os_error() == Some(EXDEV)
}

#[cfg(not(unix))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}

fn remove_if_empty(dirs: &[PathBuf]) {
    for dir in dirs.iter().rev() {
        if fs::remove_dir(dir).is_err() {
            break;
        }
    }
}
