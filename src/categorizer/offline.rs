// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Offline categorizer for debug runs: never touches the network

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;

use super::{CategoryResult, Categorizer};
use crate::category::{Category, FALLBACK};
use crate::config::{OfflineConfig, OfflineStrategy};
use crate::error::RequestError;
use crate::scanner::{FileItem, ItemKind};

pub struct OfflineCategorizer {
    strategy: OfflineStrategy,
    label: String,
    categories: Vec<String>,
    rng: Mutex<StdRng>,
}

impl OfflineCategorizer {
    pub fn new(config: &OfflineConfig, categories: &[String]) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            strategy: config.strategy,
            label: config.label.clone(),
            categories: categories.to_vec(),
            rng: Mutex::new(rng),
        }
    }

    fn label_for(&self, item: &FileItem) -> String {
        match self.strategy {
            OfflineStrategy::Fixed => self.label.clone(),
            OfflineStrategy::Extension => infer_category(item).to_string(),
            OfflineStrategy::Random => {
                let mut rng = match self.rng.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                self.categories
                    .choose(&mut *rng)
                    .cloned()
                    .unwrap_or_else(|| FALLBACK.to_string())
            }
        }
    }
}

#[async_trait]
impl Categorizer for OfflineCategorizer {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn categorize(&self, items: &[FileItem]) -> Result<Vec<CategoryResult>, RequestError> {
        Ok(items
            .iter()
            .map(|item| {
                let raw_label = self.label_for(item);
                CategoryResult {
                    item_id: item.id,
                    category: Category::parse(&raw_label),
                    raw_label,
                }
            })
            .collect())
    }
}

/// Guess a category from the item's extension and name
pub fn infer_category(item: &FileItem) -> &'static str {
    if item.kind == ItemKind::Folder {
        return FALLBACK;
    }

    let name = item.name.to_lowercase();
    match item.extension.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "heic" | "bmp" | "tiff" | "svg" => "Images",
        "pdf" | "doc" | "docx" | "odt" | "txt" | "md" | "rtf" => {
            if name.contains("tax") || name.contains("w2") || name.contains("1099") {
                "Documents/Taxes"
            } else if name.contains("statement") {
                "Documents/Statements"
            } else {
                "Documents"
            }
        }
        "xls" | "xlsx" | "csv" | "ods" => "Documents/Spreadsheets",
        "ppt" | "pptx" | "odp" => "Documents/Presentations",
        "package" | "ts4script" | "sims3pack" => "Sims/Mods",
        "save" => "Sims/Saves",
        "stl" | "3mf" | "gcode" => "3D_Assets/Prints",
        "obj" | "fbx" | "blend" | "glb" | "gltf" => "3D_Assets/Models",
        "exe" | "msi" | "dmg" | "pkg" | "deb" | "rpm" | "appimage" => "Software",
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" => "Archives",
        "torrent" => "Torrents",
        "vcf" => "Contacts",
        "mp3" | "wav" | "flac" | "ogg" | "m4a" => "Audio",
        "mp4" | "mkv" | "webm" | "avi" | "mov" => "Videos",
        "rs" | "py" | "js" | "ts" | "go" | "java" | "c" | "cpp" | "h" => "Code",
        _ => FALLBACK,
    }
}
