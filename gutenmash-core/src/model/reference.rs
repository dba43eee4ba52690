use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use rand::Rng;

use serde::{Deserialize, Serialize};

use super::distribution::Distribution;
use crate::error::{MashError, Result};
use crate::io::{corpus_name, read_lines, sibling_with_extension};
use crate::text;

/// Tokens that end a generated sentence unit.
pub const TERMINATORS: [&str; 3] = [".", "?", "!"];

/// A fixed-length ordered sequence of consecutive tokens, used as the
/// lookup key of a reference table.
///
/// Two windows are equal iff their token sequences are equal, position
/// by position.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Window(Vec<String>);

impl Window {
	/// Creates a window from an owned token sequence.
	pub fn new(tokens: Vec<String>) -> Self {
		Self(tokens)
	}

	/// Creates a window from borrowed tokens.
	pub fn from_tokens(tokens: &[&str]) -> Self {
		Self(tokens.iter().map(|t| (*t).to_owned()).collect())
	}

	/// Returns the tokens of this window in order.
	pub fn tokens(&self) -> &[String] {
		&self.0
	}

	/// Returns the window length.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` if the window holds no tokens.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Vec<String>> for Window {
	fn from(tokens: Vec<String>) -> Self {
		Self(tokens)
	}
}

/// Strategy used to select the starting window when generating a stream.
///
/// # Variants
/// - `Random`: pick a window uniformly at random from the table's keys.
/// - `Window(w)`: start from a caller-chosen window.
#[derive(Clone, Debug, PartialEq)]
pub enum Seed {
	Random,
	Window(Window),
}

/// Mapping from token windows to the frequency distribution of the token
/// that follows each window.
///
/// Built once from a source token stream and read-only thereafter, except
/// when merged with another table (merging is non-destructive and yields a
/// new table).
///
/// ## Responsibilities
/// - Build window-to-successor counts from a token stream
/// - Walk the chain to generate new token streams
/// - Merge with another table of the same window length
/// - Persist to and load from a compact binary blob
///
/// ## Invariants
/// - `window_len` is always >= 1
/// - Every key has length exactly `window_len`
/// - Every window present in the table has at least one recorded successor
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReferenceTable {
	/// Number of tokens in every window key.
	window_len: usize,

	/// Mapping from a window to its successor distribution.
	windows: HashMap<Window, Distribution>,

	/// Names of the corpus files this table was built from.
	corpus_names: Vec<String>,
}

/// Tables compare by window length, key set and per-token counts.
///
/// Corpus name bookkeeping is ignored, so merged tables compare equal
/// regardless of the order their corpora were combined in.
impl PartialEq for ReferenceTable {
	fn eq(&self, other: &Self) -> bool {
		self.window_len == other.window_len && self.windows == other.windows
	}
}

impl Eq for ReferenceTable {}

impl ReferenceTable {
	/// Creates a new empty table with the given window length.
	///
	/// # Errors
	/// Returns `ZeroWindowLen` if `window_len` is 0.
	pub fn new(window_len: usize) -> Result<Self> {
		if window_len == 0 {
			return Err(MashError::ZeroWindowLen);
		}
		Ok(Self {
			window_len,
			windows: HashMap::new(),
			corpus_names: Vec::new(),
		})
	}

	/// Builds a table by sliding a window of `window_len` across `tokens`
	/// with stride 1.
	///
	/// Each position contributes one observation: the `window_len` tokens
	/// starting there form the key, and the token right after them is the
	/// recorded successor. By construction every window in the table has a
	/// successor, so there is no failing update case to handle.
	///
	/// # Notes
	/// - Deterministic for a given token sequence.
	/// - Inputs shorter than `window_len + 1` yield an empty table; no
	///   window can be formed, which is not an error.
	///
	/// # Errors
	/// Returns `ZeroWindowLen` if `window_len` is 0.
	pub fn build(window_len: usize, tokens: &[String]) -> Result<Self> {
		let mut table = Self::new(window_len)?;
		table.add_tokens(tokens);
		Ok(table)
	}

	/// Records every window-to-successor observation found in `tokens`.
	fn add_tokens(&mut self, tokens: &[String]) {
		if tokens.len() < self.window_len + 1 {
			return;
		}

		for i in 0..tokens.len() - self.window_len {
			let window = Window::new(tokens[i..i + self.window_len].to_vec());
			let next_token = &tokens[i + self.window_len];

			self.windows
				.entry(window)
				.or_insert_with(Distribution::new)
				.observe(next_token);
		}
	}

	/// Returns the window length of this table.
	pub fn window_len(&self) -> usize {
		self.window_len
	}

	/// Returns the number of distinct windows.
	pub fn len(&self) -> usize {
		self.windows.len()
	}

	/// Returns `true` if the table has no windows.
	pub fn is_empty(&self) -> bool {
		self.windows.is_empty()
	}

	/// Returns the successor distribution for `window`, if present.
	pub fn distribution(&self, window: &Window) -> Option<&Distribution> {
		self.windows.get(window)
	}

	/// Iterates over `(window, distribution)` pairs in unspecified order.
	pub fn windows(&self) -> impl Iterator<Item = (&Window, &Distribution)> {
		self.windows.iter()
	}

	/// Returns the names of the corpus files this table was built from.
	pub fn corpus_names(&self) -> &[String] {
		&self.corpus_names
	}

	/// Picks a window uniformly at random from the table's keys.
	///
	/// The keys are materialized into a sorted list before drawing, so the
	/// choice is reproducible under a fixed rng seed.
	///
	/// # Errors
	/// Returns `EmptyTable` if the table has no windows.
	pub fn random_window<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Window> {
		if self.windows.is_empty() {
			return Err(MashError::EmptyTable);
		}

		let mut keys: Vec<&Window> = self.windows.keys().collect();
		keys.sort_unstable();

		let index = rng.random_range(0..keys.len());
		Ok(keys[index].clone())
	}

	/// Generates a token stream by walking the chain.
	///
	/// Seeds the stream with a starting window, then repeatedly looks up
	/// the trailing window, samples a successor from its distribution and
	/// appends it, until `target_terminators` sentence-ending tokens
	/// (`.` `?` `!`) have been sampled.
	///
	/// # Notes
	/// - The terminator counter starts at zero after seeding; terminators
	///   that happen to sit inside the seed window are not counted.
	/// - `target_terminators == 0` returns the seed window alone.
	/// - The returned stream runs from the seed through the final
	///   terminator, inclusive.
	///
	/// # Errors
	/// - `EmptyTable` if `Seed::Random` is used on a table with no windows.
	/// - `SeedLenMismatch` if a caller-chosen window has the wrong length.
	/// - `BrokenChain` if the trailing window is absent from the table;
	///   this can legitimately occur after merging tables with disjoint
	///   vocabularies.
	pub fn generate<R: Rng + ?Sized>(
		&self,
		seed: Seed,
		target_terminators: usize,
		rng: &mut R,
	) -> Result<Vec<String>> {
		let start = match seed {
			Seed::Random => self.random_window(rng)?,
			Seed::Window(window) => {
				if window.len() != self.window_len {
					return Err(MashError::SeedLenMismatch {
						expected: self.window_len,
						got: window.len(),
					});
				}
				window
			}
		};

		let mut stream: Vec<String> = start.tokens().to_vec();
		let mut stops = 0;

		while stops < target_terminators {
			let trailing = Window::new(stream[stream.len() - self.window_len..].to_vec());

			let distribution = self
				.windows
				.get(&trailing)
				.ok_or_else(|| MashError::BrokenChain(trailing.tokens().to_vec()))?;

			let next = distribution.sample(rng)?.to_owned();
			if TERMINATORS.contains(&next.as_str()) {
				stops += 1;
			}
			stream.push(next);
		}

		Ok(stream)
	}

	/// Returns a new table combining this one with `other`.
	///
	/// The result contains the union of both key sets; for a window present
	/// on both sides, the successor counts are summed per token. Neither
	/// input is modified. The operation is commutative and associative, and
	/// merging with an empty table of the same window length is an identity.
	///
	/// # Errors
	/// Returns `WindowLenMismatch` if the window lengths differ.
	pub fn merge(&self, other: &Self) -> Result<Self> {
		let mut merged = self.clone();
		merged.merge_from(other)?;
		Ok(merged)
	}

	/// Adds all of `other`'s observations into this table.
	///
	/// Existing distributions are summed in place; windows exclusive to
	/// `other` are cloned over. Corpus names are appended.
	///
	/// # Errors
	/// Returns `WindowLenMismatch` if the window lengths differ.
	pub fn merge_from(&mut self, other: &Self) -> Result<()> {
		if self.window_len != other.window_len {
			return Err(MashError::WindowLenMismatch(self.window_len, other.window_len));
		}

		for (window, distribution) in &other.windows {
			if let Some(existing) = self.windows.get_mut(window) {
				existing.absorb(distribution);
			} else {
				self.windows.insert(window.clone(), distribution.clone());
			}
		}

		self.corpus_names.extend(other.corpus_names.iter().cloned());

		Ok(())
	}

	/// Serializes this table into a compact binary blob.
	///
	/// # Errors
	/// Returns a `Postcard` error if encoding fails.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(postcard::to_stdvec(self)?)
	}

	/// Deserializes a table previously produced by `to_bytes`.
	///
	/// # Errors
	/// Returns a `Postcard` error if the blob is malformed or truncated.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		Ok(postcard::from_bytes(bytes)?)
	}

	/// Writes this table to `path` as a binary blob.
	///
	/// The file handle is closed on all exit paths, including failure.
	///
	/// # Errors
	/// Returns an `Io` or `Postcard` error on failure.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		std::fs::write(path, self.to_bytes()?)?;
		Ok(())
	}

	/// Reads a table previously written by `save`.
	///
	/// Round-trip fidelity: the loaded table has the same key set and the
	/// same per-token counts as the saved one.
	///
	/// # Errors
	/// Returns an `Io` or `Postcard` error on failure.
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		Self::from_bytes(&bytes)
	}

	/// Loads a table for a corpus text file, building and caching it on
	/// first use.
	///
	/// # Behavior
	/// - If a sibling `.bin` blob exists and was built with the requested
	///   `window_len`, it is loaded directly.
	/// - Otherwise the text file is read, tokenized, built in parallel
	///   line-chunks, and the result is written to the `.bin` blob for
	///   future fast loading. A cache built for another window length is
	///   stale and gets rebuilt and overwritten.
	/// - The corpus name (file stem) is recorded on the returned table.
	///
	/// # Errors
	/// Returns an error on I/O failure, on a malformed cache blob, or if
	/// `window_len` is 0.
	pub fn from_corpus_file<P: AsRef<Path>>(path: P, window_len: usize) -> Result<Self> {
		let cache_path = sibling_with_extension(&path, "bin")?;

		let mut cached = None;
		if cache_path.exists() {
			let table = Self::load(&cache_path)?;
			if table.window_len == window_len {
				cached = Some(table);
			}
		}

		let mut table = match cached {
			Some(table) => table,
			None => {
				let lines = read_lines(&path)?;
				let tokens = text::tokenize(&lines);
				let built = Self::build_parallel(window_len, &tokens)?;
				built.save(&cache_path)?;
				built
			}
		};

		table.corpus_names.push(corpus_name(&path)?);
		Ok(table)
	}

	/// Builds a table from `tokens` using one worker thread per chunk,
	/// then merges the partial tables.
	///
	/// # Behavior
	/// - Splits the token stream into chunks (based on CPU cores * factor).
	/// - Consecutive chunks overlap by `window_len` tokens so that every
	///   window-to-successor observation lands in exactly one partial
	///   table; the merged result is identical to a sequential build.
	/// - Partial tables are collected over an MPSC channel and merged
	///   sequentially.
	///
	/// # Errors
	/// Returns `ZeroWindowLen` if `window_len` is 0.
	fn build_parallel(window_len: usize, tokens: &[String]) -> Result<Self> {
		let mut table = Self::new(window_len)?;
		if tokens.len() < window_len + 1 {
			return Ok(table);
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = tokens.len().div_ceil(chunks).max(window_len + 1);

		let (tx, rx) = mpsc::channel();
		for start in (0..tokens.len()).step_by(chunk_size) {
			let end = (start + chunk_size + window_len).min(tokens.len());
			let chunk: Vec<String> = tokens[start..end].to_vec();
			let tx = tx.clone();

			thread::spawn(move || {
				let partial = Self::build(window_len, &chunk);
				tx.send(partial).expect("Failed to send from thread");
			});
		}
		drop(tx);

		for partial in rx.iter() {
			table.merge_from(&partial?)?;
		}

		Ok(table)
	}
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	use super::{ReferenceTable, Seed, TERMINATORS, Window};
	use crate::error::MashError;

	fn tokens(raw: &[&str]) -> Vec<String> {
		raw.iter().map(|t| (*t).to_owned()).collect()
	}

	fn three_sentences() -> Vec<String> {
		tokens(&[
			"the", "cat", "sat", "down", ".", "the", "dog", "ran", ".", "the", "cat", "slept", ".",
		])
	}

	#[test]
	fn zero_window_len_is_rejected() {
		assert!(matches!(
			ReferenceTable::new(0),
			Err(MashError::ZeroWindowLen)
		));
	}

	#[test]
	fn short_input_yields_empty_table() {
		let table = ReferenceTable::build(2, &tokens(&["one", "two"])).unwrap();
		assert!(table.is_empty());
	}

	#[test]
	fn build_observes_every_position_once() {
		let stream = three_sentences();
		let table = ReferenceTable::build(2, &stream).unwrap();

		// Every window key has the table's window length
		for window in table.windows.keys() {
			assert_eq!(window.len(), 2);
		}

		// The total count over all distributions is len(tokens) - W
		let total: usize = table.windows.values().map(|d| d.total()).sum();
		assert_eq!(total, stream.len() - 2);
	}

	#[test]
	fn build_records_both_successors_of_a_shared_window() {
		let table = ReferenceTable::build(2, &three_sentences()).unwrap();

		let distribution = table
			.distribution(&Window::from_tokens(&["the", "cat"]))
			.unwrap();
		assert_eq!(distribution.count("sat"), 1);
		assert_eq!(distribution.count("slept"), 1);
		assert_eq!(distribution.len(), 2);
	}

	#[test]
	fn random_window_on_empty_table_fails() {
		let table = ReferenceTable::new(2).unwrap();
		let mut rng = StdRng::seed_from_u64(0);
		assert!(matches!(
			table.random_window(&mut rng),
			Err(MashError::EmptyTable)
		));
	}

	#[test]
	fn generate_on_empty_table_fails() {
		let table = ReferenceTable::new(2).unwrap();
		let mut rng = StdRng::seed_from_u64(0);
		assert!(matches!(
			table.generate(Seed::Random, 1, &mut rng),
			Err(MashError::EmptyTable)
		));
	}

	#[test]
	fn generate_stops_at_one_terminator_and_stays_in_vocabulary() {
		let stream = three_sentences();
		let table = ReferenceTable::build(2, &stream).unwrap();
		let mut rng = StdRng::seed_from_u64(3);

		let seed = Seed::Window(Window::from_tokens(&["the", "cat"]));
		let generated = table.generate(seed, 1, &mut rng).unwrap();

		// Ends with exactly one terminator
		assert_eq!(generated.last().map(String::as_str), Some("."));
		let terminators = generated
			.iter()
			.filter(|t| TERMINATORS.contains(&t.as_str()))
			.count();
		assert_eq!(terminators, 1);

		// Never leaves the vocabulary present in the source stream
		for token in &generated {
			assert!(stream.contains(token), "unknown token {token}");
		}
	}

	#[test]
	fn generate_always_terminates_on_single_sentence_input() {
		let stream = tokens(&["the", "cat", "sat", "."]);
		let table = ReferenceTable::build(2, &stream).unwrap();

		// The chain from any window reaches the terminator
		for seed_attempt in 0..20 {
			let mut rng = StdRng::seed_from_u64(seed_attempt);
			let generated = table.generate(Seed::Random, 1, &mut rng).unwrap();
			assert_eq!(generated.last().map(String::as_str), Some("."));
		}
	}

	#[test]
	fn zero_target_returns_seed_window_alone() {
		let table = ReferenceTable::build(2, &three_sentences()).unwrap();
		let mut rng = StdRng::seed_from_u64(0);

		let seed = Seed::Window(Window::from_tokens(&["the", "cat"]));
		let generated = table.generate(seed, 0, &mut rng).unwrap();
		assert_eq!(generated, tokens(&["the", "cat"]));
	}

	#[test]
	fn seed_terminators_are_not_counted() {
		// Seed window contains "." but the counter must start at zero
		let stream = tokens(&["sat", ".", "the", "cat", "sat", ".", "the", "end", "."]);
		let table = ReferenceTable::build(2, &stream).unwrap();
		let mut rng = StdRng::seed_from_u64(1);

		let seed = Seed::Window(Window::from_tokens(&["sat", "."]));
		let generated = table.generate(seed, 1, &mut rng).unwrap();

		// One terminator sampled during extension, beyond the seeded one
		let sampled_terminators = generated[2..]
			.iter()
			.filter(|t| TERMINATORS.contains(&t.as_str()))
			.count();
		assert_eq!(sampled_terminators, 1);
	}

	#[test]
	fn walking_off_the_table_breaks_the_chain() {
		// Single observation: ("a", "b") -> "c"; the trailing window
		// ("b", "c") has no entry, so extension past it must fail
		let table = ReferenceTable::build(2, &tokens(&["a", "b", "c"])).unwrap();
		let mut rng = StdRng::seed_from_u64(0);

		let result = table.generate(Seed::Random, 1, &mut rng);
		assert!(matches!(result, Err(MashError::BrokenChain(_))));
	}

	#[test]
	fn seed_window_of_wrong_length_is_rejected() {
		let table = ReferenceTable::build(2, &three_sentences()).unwrap();
		let mut rng = StdRng::seed_from_u64(0);

		let seed = Seed::Window(Window::from_tokens(&["the"]));
		assert!(matches!(
			table.generate(seed, 1, &mut rng),
			Err(MashError::SeedLenMismatch { expected: 2, got: 1 })
		));
	}

	#[test]
	fn merge_is_commutative() {
		let a = ReferenceTable::build(2, &three_sentences()).unwrap();
		let b = ReferenceTable::build(2, &tokens(&["the", "cat", "ran", "!", "again"])).unwrap();

		assert_eq!(a.merge(&b).unwrap(), b.merge(&a).unwrap());
	}

	#[test]
	fn merge_commutes_for_tables_with_corpus_names() {
		let mut a = ReferenceTable::build(2, &three_sentences()).unwrap();
		a.corpus_names.push("huck".to_owned());
		let mut b = ReferenceTable::build(2, &tokens(&["the", "cat", "ran", "!", "again"])).unwrap();
		b.corpus_names.push("critique".to_owned());

		// Name bookkeeping keeps argument order, but equality only looks
		// at the observations
		assert_eq!(a.merge(&b).unwrap(), b.merge(&a).unwrap());
	}

	#[test]
	fn merge_is_associative() {
		let a = ReferenceTable::build(2, &three_sentences()).unwrap();
		let b = ReferenceTable::build(2, &tokens(&["the", "cat", "ran", "!", "again"])).unwrap();
		let c = ReferenceTable::build(2, &tokens(&["a", "dog", "ran", ".", "home"])).unwrap();

		let left = a.merge(&b).unwrap().merge(&c).unwrap();
		let right = a.merge(&b.merge(&c).unwrap()).unwrap();
		assert_eq!(left, right);
	}

	#[test]
	fn merge_with_empty_table_is_identity() {
		let a = ReferenceTable::build(2, &three_sentences()).unwrap();
		let empty = ReferenceTable::new(2).unwrap();

		assert_eq!(a.merge(&empty).unwrap(), a);
	}

	#[test]
	fn merge_sums_counts_on_shared_windows() {
		let a = ReferenceTable::build(2, &tokens(&["the", "cat", "sat"])).unwrap();
		let b = ReferenceTable::build(2, &tokens(&["the", "cat", "sat", "again"])).unwrap();

		let merged = a.merge(&b).unwrap();
		let distribution = merged
			.distribution(&Window::from_tokens(&["the", "cat"]))
			.unwrap();
		assert_eq!(distribution.count("sat"), 2);
	}

	#[test]
	fn merge_does_not_mutate_inputs() {
		let a = ReferenceTable::build(2, &tokens(&["the", "cat", "sat"])).unwrap();
		let b = ReferenceTable::build(2, &tokens(&["the", "cat", "sat", "again"])).unwrap();
		let a_before = a.clone();
		let b_before = b.clone();

		let _ = a.merge(&b).unwrap();

		assert_eq!(a, a_before);
		assert_eq!(b, b_before);
	}

	#[test]
	fn merge_rejects_mismatched_window_lengths() {
		let a = ReferenceTable::build(2, &three_sentences()).unwrap();
		let b = ReferenceTable::build(3, &three_sentences()).unwrap();

		assert!(matches!(
			a.merge(&b),
			Err(MashError::WindowLenMismatch(2, 3))
		));
	}

	#[test]
	fn byte_round_trip_preserves_the_table() {
		let table = ReferenceTable::build(2, &three_sentences()).unwrap();

		let bytes = table.to_bytes().unwrap();
		let restored = ReferenceTable::from_bytes(&bytes).unwrap();
		assert_eq!(restored, table);
	}
}
