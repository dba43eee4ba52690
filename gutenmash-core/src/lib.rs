//! Word-level Markov text generation library.
//!
//! This crate turns Project Gutenberg books into hours of fun. It provides:
//! - A tokenizer for Gutenberg-style plain text
//! - Window-to-successor reference tables with frequency counts
//! - Probabilistic generation by weighted random sampling
//! - Non-destructive table merging (mashing two books together)
//! - Compact binary persistence of built tables
//!
//! Only the high-level API is exposed publicly. Low-level components
//! are kept internal to ensure consistency and prevent misuse.

/// Core reference tables and generation logic.
///
/// This module exposes the table and generator interface while keeping
/// internal distribution representations private.
pub mod model;

/// Tokenization and rendering of raw text.
///
/// Converts Gutenberg plain text into token streams, and generated token
/// streams back into readable prose.
pub mod text;

/// Error types shared across the crate.
pub mod error;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;

use std::path::Path;

/// Lists the corpus names (file stems of `.txt` files) directly under a
/// directory, sorted.
///
/// # Errors
/// Returns an `Io` error if the directory cannot be read.
pub fn list_corpora<P: AsRef<Path>>(dir: P) -> error::Result<Vec<String>> {
	let files = io::list_files(dir, "txt")?;
	Ok(files
		.iter()
		.map(|f| f.strip_suffix(".txt").unwrap_or(f).to_owned())
		.collect())
}
