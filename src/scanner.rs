// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Directory scanning: turns a folder into the list of items to categorize

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::{Result, TidyError};

/// Files larger than this never get an excerpt
pub const MAX_CONTENT_SIZE: u64 = 1024 * 1024;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "py", "js", "rs", "json", "csv", "log"];
const TEMP_EXTENSIONS: &[&str] = &[".tmp", ".part", ".crdownload", ".partial", ".download"];
const SYSTEM_NAMES: &[&str] = &["desktop.ini", "thumbs.db", ".ds_store"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
}

/// One entry found by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    /// Unique within a single run
    pub id: usize,
    pub path: PathBuf,
    pub name: String,
    /// Lower-cased, without the dot; empty when there is none
    pub extension: String,
    pub kind: ItemKind,
    pub excerpt: Option<String>,
}

impl FileItem {
    pub fn new(id: usize, path: PathBuf, kind: ItemKind) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = match kind {
            ItemKind::File => path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
            ItemKind::Folder => String::new(),
        };
        Self {
            id,
            path,
            name,
            extension,
            kind,
            excerpt: None,
        }
    }
}

/// Lists the items of a directory according to [`ScanConfig`]
pub struct Scanner {
    config: ScanConfig,
    ignore: Vec<glob::Pattern>,
    reserved_folders: HashSet<String>,
    excluded: Vec<PathBuf>,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let ignore = config
            .ignore
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| TidyError::Config(format!("Invalid ignore pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            ignore,
            reserved_folders: HashSet::new(),
            excluded: Vec::new(),
        })
    }

    /// Top-level folder names that are previous outputs and never items themselves
    pub fn with_reserved_folders<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reserved_folders = names
            .into_iter()
            .map(|n| n.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Paths the tool owns (history log, config) that must stay put
    pub fn with_excluded(mut self, paths: Vec<PathBuf>) -> Self {
        self.excluded = paths
            .into_iter()
            .map(|p| p.canonicalize().unwrap_or(p))
            .collect();
        self
    }

    /// Scan `root` and return its items with ids assigned in path order
    pub fn scan(&self, root: &Path) -> Result<Vec<FileItem>> {
        if !root.is_dir() {
            return Err(TidyError::Scan(format!("{} is not a valid directory", root.display())));
        }

        info!(
            "Scanning {:?}{}",
            root,
            if self.config.recursive { " recursively" } else { "" }
        );

        let mut found = Vec::new();
        self.collect(root, true, &mut found)?;
        found.sort_by(|a, b| a.0.cmp(&b.0));

        let items: Vec<FileItem> = found
            .into_iter()
            .enumerate()
            .map(|(id, (path, kind))| {
                let mut item = FileItem::new(id, path, kind);
                if self.config.include_excerpts && kind == ItemKind::File {
                    item.excerpt = read_excerpt(&item.path, self.config.excerpt_chars);
                }
                item
            })
            .collect();

        info!("Found {} items to process", items.len());
        Ok(items)
    }

    fn collect(&self, dir: &Path, top: bool, out: &mut Vec<(PathBuf, ItemKind)>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    warn!("Cannot stat {:?}: {}", path, e);
                    continue;
                }
            };

            if !should_process(&path) || self.is_ignored(&path) {
                debug!("Skipping {:?}", path);
                continue;
            }

            if file_type.is_dir() {
                if self.config.recursive {
                    self.collect(&path, false, out)?;
                } else if top && self.config.include_folders && !self.is_reserved(&path) {
                    out.push((path, ItemKind::Folder));
                }
            } else if file_type.is_file() {
                out.push((path, ItemKind::File));
            }
        }
        Ok(())
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if self.ignore.iter().any(|p| p.matches(name)) {
            return true;
        }
        if self.excluded.is_empty() {
            return false;
        }
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.excluded.contains(&canonical)
    }

    fn is_reserved(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| self.reserved_folders.contains(&n.to_lowercase()))
            .unwrap_or(false)
    }
}

/// Check if an entry should be considered at all
pub fn should_process(path: &Path) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    // Hidden files
    if filename.starts_with('.') {
        return false;
    }

    // In-progress downloads
    let lower = filename.to_lowercase();
    if TEMP_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return false;
    }

    // OS metadata
    if SYSTEM_NAMES.iter().any(|n| lower == *n) {
        return false;
    }

    true
}

/// Short text excerpt of a file, when its type supports one
pub fn read_excerpt(path: &Path, max_chars: usize) -> Option<String> {
    let size = std::fs::metadata(path).ok()?.len();
    if size > MAX_CONTENT_SIZE || max_chars == 0 {
        return None;
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let text = if ext == "pdf" {
        let bytes = std::fs::read(path).ok()?;
        match pdf_extract::extract_text_from_mem(&bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!("PDF text extraction failed for {:?}: {}", path, e);
                return None;
            }
        }
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        let bytes = std::fs::read(path).ok()?;
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        return None;
    };

    let excerpt: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let excerpt: String = excerpt.chars().take(max_chars).collect();
    if excerpt.is_empty() {
        None
    } else {
        Some(excerpt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("invoice.pdf"), b"not really a pdf").unwrap();
        fs::write(dir.path().join("photo.JPG"), b"jpeg").unwrap();
        fs::write(dir.path().join("notes.txt"), "meeting   notes\nfor monday").unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        fs::write(dir.path().join("movie.mp4.part"), b"x").unwrap();
        fs::write(dir.path().join("Thumbs.db"), b"x").unwrap();
        fs::create_dir(dir.path().join("projects")).unwrap();
        fs::write(dir.path().join("projects").join("plan.md"), "# plan").unwrap();
        fs::create_dir(dir.path().join("Images")).unwrap();
        dir
    }

    fn names(items: &[FileItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_flat_scan_skips_junk_and_folders() {
        let dir = fixture();
        let scanner = Scanner::new(ScanConfig::default()).unwrap();
        let items = scanner.scan(dir.path()).unwrap();

        assert_eq!(names(&items), vec!["invoice.pdf", "notes.txt", "photo.JPG"]);
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(items[2].extension, "jpg");
        assert!(items.iter().all(|i| i.excerpt.is_none()));
    }

    #[test]
    fn test_recursive_scan_includes_nested_files() {
        let dir = fixture();
        let config = ScanConfig {
            recursive: true,
            ..ScanConfig::default()
        };
        let items = Scanner::new(config).unwrap().scan(dir.path()).unwrap();
        assert!(names(&items).contains(&"plan.md"));
        assert!(items.iter().all(|i| i.kind == ItemKind::File));
    }

    #[test]
    fn test_folders_exclude_reserved() {
        let dir = fixture();
        let config = ScanConfig {
            include_folders: true,
            ..ScanConfig::default()
        };
        let items = Scanner::new(config)
            .unwrap()
            .with_reserved_folders(["images", "documents"])
            .scan(dir.path())
            .unwrap();

        let folders: Vec<_> = items
            .iter()
            .filter(|i| i.kind == ItemKind::Folder)
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(folders, vec!["projects"]);
    }

    #[test]
    fn test_ignore_patterns_and_exclusions() {
        let dir = fixture();
        let config = ScanConfig {
            ignore: vec!["*.pdf".to_string()],
            ..ScanConfig::default()
        };
        let items = Scanner::new(config)
            .unwrap()
            .with_excluded(vec![dir.path().join("notes.txt")])
            .scan(dir.path())
            .unwrap();
        assert_eq!(names(&items), vec!["photo.JPG"]);
    }

    #[test]
    fn test_excerpts() {
        let dir = fixture();
        let config = ScanConfig {
            include_excerpts: true,
            excerpt_chars: 13,
            ..ScanConfig::default()
        };
        let items = Scanner::new(config).unwrap().scan(dir.path()).unwrap();
        let notes = items.iter().find(|i| i.name == "notes.txt").unwrap();
        assert_eq!(notes.excerpt.as_deref(), Some("meeting notes"));
        let photo = items.iter().find(|i| i.name == "photo.JPG").unwrap();
        assert!(photo.excerpt.is_none());
    }

    #[test]
    fn test_not_a_directory() {
        let dir = fixture();
        let scanner = Scanner::new(ScanConfig::default()).unwrap();
        let err = scanner.scan(&dir.path().join("notes.txt")).unwrap_err();
        assert!(matches!(err, TidyError::Scan(_)));
    }

    #[test]
    fn test_should_process() {
        assert!(should_process(Path::new("/tmp/report.pdf")));
        assert!(!should_process(Path::new("/tmp/.DS_Store")));
        assert!(!should_process(Path::new("/tmp/setup.exe.crdownload")));
        assert!(!should_process(Path::new("/tmp/desktop.ini")));
    }
}
