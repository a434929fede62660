#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::{Component, PathBuf};
use tidyfile::categorizer::parse_response;
use tidyfile::category::{Category, MAX_DEPTH};
use tidyfile::scanner::{FileItem, ItemKind};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Labels must never escape the root or nest deeper than allowed
    let category = Category::parse(text);
    let rel = category.relative_path();
    assert!(rel.components().count() <= MAX_DEPTH);
    assert!(rel.components().all(|c| matches!(c, Component::Normal(_))));

    let items = vec![
        FileItem::new(0, PathBuf::from("/r/a.pdf"), ItemKind::File),
        FileItem::new(1, PathBuf::from("/r/b.jpg"), ItemKind::File),
    ];
    if let Ok(results) = parse_response(text, &items) {
        assert!(results.len() <= items.len());
    }
});
