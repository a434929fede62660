// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Move history for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Result, TidyError};

/// A single move recorded in history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoveRecord {
    pub id: String,
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: String,
    /// blake3 of the file content; empty for folders
    #[serde(default)]
    pub content_hash: String,
    /// Category folders this move had to create, outermost first
    #[serde(default)]
    pub created_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub undone: bool,
}

impl MoveRecord {
    pub fn new(
        run_id: &str,
        source: PathBuf,
        destination: PathBuf,
        category: String,
        content_hash: String,
        created_dirs: Vec<PathBuf>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            source,
            destination,
            category,
            content_hash,
            created_dirs,
            undone: false,
        }
    }
}

/// History manager backed by a JSONL file
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append a record to the history
    pub fn append(&self, record: &MoveRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// Read all records, oldest first
    pub fn read_all(&self) -> Result<Vec<MoveRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);

        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Failed to parse history entry: {}", e),
            }
        }

        Ok(records)
    }

    /// Get the most recent N records (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<MoveRecord>> {
        let mut records = self.read_all()?;
        records.reverse();
        records.truncate(count);
        Ok(records)
    }

    /// Records that haven't been undone, oldest first
    pub fn get_undoable(&self) -> Result<Vec<MoveRecord>> {
        Ok(self.read_all()?.into_iter().filter(|r| !r.undone).collect())
    }

    /// Mark a record as undone
    pub fn mark_undone(&self, id: &str) -> Result<()> {
        let records = self.read_all()?;
        if !records.iter().any(|r| r.id == id) {
            return Err(TidyError::History(format!("No history entry with id {}", id)));
        }

        // Rewrite through a sibling file so a crash never truncates the log
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for mut record in records {
                if record.id == id {
                    record.undone = true;
                }
                writeln!(writer, "{}", serde_json::to_string(&record)?)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reverse the `count` most recent moves (0 means all)
    pub fn undo(&self, count: usize, dry_run: bool) -> Result<UndoReport> {
        let mut pending = self.get_undoable()?;
        pending.reverse();
        if count > 0 {
            pending.truncate(count);
        }

        let mut report = UndoReport::default();

        for record in pending {
            if let Some(reason) = undo_blocker(&record) {
                warn!("Skip: {:?} ({})", record.destination, reason);
                report.skipped.push((record, reason));
                continue;
            }

            if dry_run {
                info!("Would move {:?} -> {:?}", record.destination, record.source);
                report.restored.push(record);
                continue;
            }

            if let Err(e) = restore(&record) {
                warn!("Failed: {:?} ({})", record.destination, e);
                report.skipped.push((record, e.to_string()));
                continue;
            }

            self.mark_undone(&record.id)?;
            info!("Undone: {:?} -> {:?}", record.destination, record.source);
            report.restored.push(record);
        }

        Ok(report)
    }
}

/// Outcome of an undo pass
#[derive(Debug, Default)]
pub struct UndoReport {
    pub restored: Vec<MoveRecord>,
    /// Records left alone, with the reason
    pub skipped: Vec<(MoveRecord, String)>,
}

fn undo_blocker(record: &MoveRecord) -> Option<String> {
    if !record.destination.exists() {
        return Some("file not found, may have been moved/deleted".to_string());
    }
    if record.source.exists() {
        return Some("original path already exists".to_string());
    }
    if !record.content_hash.is_empty() {
        match hash_file(&record.destination) {
            Ok(hash) if hash == record.content_hash => {}
            Ok(_) => return Some("content changed since it was moved".to_string()),
            Err(e) => return Some(format!("cannot read file: {}", e)),
        }
    }
    None
}

fn restore(record: &MoveRecord) -> Result<()> {
    if let Some(parent) = record.source.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(&record.destination, &record.source)?;
    remove_created_dirs(&record.created_dirs);
    Ok(())
}

/// Innermost first; stop at the first folder that still has content.
/// The file is already back at this point, so failures here only warn.
fn remove_created_dirs(dirs: &[PathBuf]) {
    for dir in dirs.iter().rev() {
        match fs::read_dir(dir) {
            Ok(mut entries) => {
                if entries.next().is_some() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!("Leaving {:?} in place: {}", dir, e);
                break;
            }
        }
        if let Err(e) = fs::remove_dir(dir) {
            warn!("Could not remove {:?}: {}", dir, e);
            break;
        }
    }
}

/// blake3 hex digest of a file's content
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut file = File::open(path)?;
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, History) {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));
        (dir, history)
    }

    /// Simulate a move of `name` into `category/`, as the mover would
    fn moved(dir: &Path, history: &History, name: &str, category: &str) -> MoveRecord {
        let source = dir.join(name);
        fs::write(&source, name.as_bytes()).unwrap();
        let folder = dir.join(category);
        let created = if folder.exists() { vec![] } else { vec![folder.clone()] };
        fs::create_dir_all(&folder).unwrap();
        let destination = folder.join(name);
        let hash = hash_file(&source).unwrap();
        fs::rename(&source, &destination).unwrap();

        let record = MoveRecord::new("run", source, destination, category.to_string(), hash, created);
        history.append(&record).unwrap();
        record
    }

    #[test]
    fn test_append_and_recent() {
        let (dir, history) = setup();
        moved(dir.path(), &history, "a.txt", "Documents");
        moved(dir.path(), &history, "b.jpg", "Images");

        let recent = history.get_recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].category, "Images");
        assert_eq!(history.read_all().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (dir, history) = setup();
        moved(dir.path(), &history, "a.txt", "Documents");
        let mut file = OpenOptions::new().append(true).open(history.path()).unwrap();
        writeln!(file, "not json").unwrap();

        assert_eq!(history.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_mark_undone() {
        let (dir, history) = setup();
        let record = moved(dir.path(), &history, "a.txt", "Documents");
        history.mark_undone(&record.id).unwrap();

        assert!(history.get_undoable().unwrap().is_empty());
        assert!(history.read_all().unwrap()[0].undone);
        assert!(history.mark_undone("missing").is_err());
    }

    #[test]
    fn test_undo_restores_and_removes_created_folder() {
        let (dir, history) = setup();
        moved(dir.path(), &history, "a.txt", "Documents");
        moved(dir.path(), &history, "b.txt", "Documents");

        let report = history.undo(0, false).unwrap();
        assert_eq!(report.restored.len(), 2);
        assert!(dir.path().join("a.txt").exists());
        assert!(dir.path().join("b.txt").exists());
        assert!(!dir.path().join("Documents").exists());
        assert!(history.get_undoable().unwrap().is_empty());
    }

    #[test]
    fn test_undo_keeps_folder_with_other_content() {
        let (dir, history) = setup();
        moved(dir.path(), &history, "a.txt", "Documents");
        fs::write(dir.path().join("Documents").join("keep.txt"), b"mine").unwrap();

        history.undo(1, false).unwrap();
        assert!(dir.path().join("a.txt").exists());
        assert!(dir.path().join("Documents").join("keep.txt").exists());
    }

    #[test]
    fn test_undo_counts_restore_when_cleanup_fails() {
        let (dir, history) = setup();
        let source = dir.path().join("a.txt");
        fs::write(&source, b"a").unwrap();
        let folder = dir.path().join("Documents");
        fs::create_dir(&folder).unwrap();
        let destination = folder.join("a.txt");
        let hash = hash_file(&source).unwrap();
        fs::rename(&source, &destination).unwrap();

        // A "created folder" that cannot be removed as one
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();
        let record = MoveRecord::new(
            "run",
            source.clone(),
            destination,
            "Documents".to_string(),
            hash,
            vec![folder.clone(), blocker.clone()],
        );
        history.append(&record).unwrap();

        let report = history.undo(1, false).unwrap();
        assert_eq!(report.restored.len(), 1);
        assert!(report.skipped.is_empty());
        assert!(source.exists());
        assert!(blocker.exists());
        assert!(history.get_undoable().unwrap().is_empty());
    }

    #[test]
    fn test_undo_dry_run_changes_nothing() {
        let (dir, history) = setup();
        let record = moved(dir.path(), &history, "a.txt", "Documents");

        let report = history.undo(1, true).unwrap();
        assert_eq!(report.restored.len(), 1);
        assert!(record.destination.exists());
        assert_eq!(history.get_undoable().unwrap().len(), 1);
    }

    #[test]
    fn test_undo_skips_changed_or_blocked() {
        let (dir, history) = setup();
        let changed = moved(dir.path(), &history, "a.txt", "Documents");
        fs::write(&changed.destination, b"edited").unwrap();
        let blocked = moved(dir.path(), &history, "b.txt", "Images");
        fs::write(&blocked.source, b"new file with same name").unwrap();

        let report = history.undo(0, false).unwrap();
        assert!(report.restored.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(changed.destination.exists());
    }
}
