//! Top-level module for the Markov text generation system.
//!
//! This crate provides a window-based Markov chain generator, including:
//! - Frequency distributions over successor tokens (`Distribution`)
//! - Window-to-successor reference tables (`ReferenceTable`)
//! - A high-level multi-corpus interface (`Generator`)

/// High-level interface for generating prose from one or more corpora.
///
/// Exposes corpus loading, table mashing, and generate-and-render in a
/// single call.
pub mod generator;

/// Reference tables built from token streams.
///
/// Supports building, chain walking, merging, and compact binary
/// persistence with a cache for corpus files.
pub mod reference;

/// Frequency distribution over the successors of a single window.
///
/// Tracks observation counts and supports weighted random sampling.
pub mod distribution;
