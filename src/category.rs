// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Category labels and their folder-safe form

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Deepest folder nesting a label may produce
pub const MAX_DEPTH: usize = 2;

/// Label used when nothing usable survives sanitizing
pub const FALLBACK: &str = "Misc";

const FORBIDDEN: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

/// A sanitized category: one or two folder segments joined by `/`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// Sanitize a raw label returned by a categorizer
    pub fn parse(raw: &str) -> Self {
        let segments: Vec<String> = raw
            .split('/')
            .map(clean_segment)
            .filter(|s| !s.is_empty())
            .take(MAX_DEPTH)
            .collect();

        if segments.is_empty() {
            Self(FALLBACK.to_string())
        } else {
            Self(segments.join("/"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Folder segments, outermost first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Relative folder path for this category
    pub fn relative_path(&self) -> PathBuf {
        self.segments().collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn clean_segment(part: &str) -> String {
    let stripped: String = part.chars().filter(|c| !FORBIDDEN.contains(c)).collect();
    let trimmed = stripped.trim().trim_matches('.').trim();

    // Collapse whitespace runs into a single underscore
    let joined = trimmed.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("_")
}

/// `documents` -> `Documents`; words with digits (`3D`) keep their case
fn capitalize(word: &str) -> String {
    if word.chars().any(|c| c.is_ascii_digit()) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_label() {
        assert_eq!(Category::parse("documents").as_str(), "Documents");
        assert_eq!(Category::parse("Images").as_str(), "Images");
    }

    #[test]
    fn test_two_levels() {
        assert_eq!(Category::parse("documents/taxes").as_str(), "Documents/Taxes");
        assert_eq!(Category::parse("Sims/Custom_Content").as_str(), "Sims/Custom_Content");
    }

    #[test]
    fn test_deeper_paths_are_truncated() {
        assert_eq!(Category::parse("a/b/c/d").as_str(), "A/B");
    }

    #[test]
    fn test_whitespace_and_forbidden_chars() {
        assert_eq!(Category::parse("  tax   returns?  ").as_str(), "Tax_Returns");
        assert_eq!(Category::parse("bank: \"statements\"").as_str(), "Bank_Statements");
    }

    #[test]
    fn test_digit_words_keep_case() {
        assert_eq!(Category::parse("3D_Assets/Models").as_str(), "3D_Assets/Models");
    }

    #[test]
    fn test_empty_and_traversal_fall_back() {
        assert_eq!(Category::parse("").as_str(), FALLBACK);
        assert_eq!(Category::parse("   ").as_str(), FALLBACK);
        assert_eq!(Category::parse("../..").as_str(), FALLBACK);
        assert_eq!(Category::parse("../etc").as_str(), "Etc");
        assert_eq!(Category::parse("/Documents/").as_str(), "Documents");
    }

    #[test]
    fn test_relative_path() {
        let cat = Category::parse("documents/taxes");
        assert_eq!(cat.relative_path(), PathBuf::from("Documents").join("Taxes"));
    }
}
