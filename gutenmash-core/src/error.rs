use thiserror::Error;

/// Errors produced while building, merging, persisting or walking a
/// reference table.
///
/// The three generation errors (`EmptyDistribution`, `EmptyTable`,
/// `BrokenChain`) are unrecoverable for the current generation attempt and
/// are always surfaced to the caller; the core never retries and never
/// substitutes a default token.
#[derive(Error, Debug)]
pub enum MashError {
	/// A distribution with no recorded successors was sampled.
	///
	/// Should not occur on a well-formed table, since every window
	/// discovered during a build always has a successor.
	#[error("Cannot sample from an empty distribution")]
	EmptyDistribution,

	/// Generation was seeded from a table with zero windows.
	#[error("Cannot seed generation from an empty table")]
	EmptyTable,

	/// The trailing window fell outside the table during extension.
	///
	/// Legitimately reachable after merging tables with disjoint
	/// vocabularies, or at stream boundaries.
	#[error("Chain broken: window {0:?} not present in the table")]
	BrokenChain(Vec<String>),

	/// A table was requested with a window length of zero.
	#[error("Window length must be >= 1")]
	ZeroWindowLen,

	/// Two tables with different window lengths were merged.
	#[error("Window length mismatch: {0} != {1}")]
	WindowLenMismatch(usize, usize),

	/// A caller-supplied seed window has the wrong length.
	#[error("Seed window has length {got}, table expects {expected}")]
	SeedLenMismatch {
		expected: usize,
		got: usize,
	},

	/// A generation request named a corpus that was never loaded.
	#[error("No corpus named '{0}' is loaded")]
	UnknownCorpus(String),

	/// The corpus directory given to the generator is not a directory.
	#[error("Expected a directory, got: {0}")]
	NotADirectory(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Postcard(#[from] postcard::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MashError>;
