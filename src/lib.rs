// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! tidyfile: AI-assisted directory tidying
//!
//! Scans a folder, asks a hosted language model for a category per item and
//! moves each item into `<root>/<category>/`. Every move is logged so a run
//! can be undone.

pub mod categorizer;
pub mod category;
pub mod config;
pub mod error;
pub mod history;
pub mod mover;
pub mod organizer;
pub mod scanner;

pub use config::AppConfig;
pub use error::{MoveError, RequestError, Result, TidyError};
