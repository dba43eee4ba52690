use std::collections::HashMap;

use rand::Rng;

use serde::{Deserialize, Serialize};

use crate::error::{MashError, Result};

/// Frequency distribution over the tokens observed after one window.
///
/// A `Distribution` stores, for a fixed window, how many times each token
/// was seen immediately following it. Conceptually this is a node in a
/// Markov chain whose outgoing edges are weighted by observation counts.
///
/// ## Responsibilities
/// - Accumulate successor occurrences during a build
/// - Draw the next token using frequency-weighted random sampling
/// - Sum counts with another distribution during a merge
///
/// ## Invariants
/// - Every stored count is >= 1 (zero-count entries are never stored)
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Distribution {
	/// Successor counts indexed by token.
	/// Example: { "sat" => 3, "slept" => 1 }
	counts: HashMap<String, usize>,
}

impl Distribution {
	/// Creates an empty distribution.
	pub(crate) fn new() -> Self {
		Self { counts: HashMap::new() }
	}

	/// Records one occurrence of `token` as a successor.
	///
	/// - If the token was already seen, its count is increased.
	/// - Otherwise a new entry is created with a count of 1.
	pub(crate) fn observe(&mut self, token: &str) {
		*self.counts.entry(token.to_owned()).or_insert(0) += 1;
	}

	/// Returns the recorded count for `token` (0 if never observed).
	pub fn count(&self, token: &str) -> usize {
		self.counts.get(token).copied().unwrap_or(0)
	}

	/// Returns the sum of all counts.
	pub fn total(&self) -> usize {
		self.counts.values().sum()
	}

	/// Returns `true` if no successor was ever recorded.
	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	/// Returns the number of distinct successor tokens.
	pub fn len(&self) -> usize {
		self.counts.len()
	}

	/// Iterates over `(token, count)` pairs in unspecified order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
		self.counts.iter().map(|(token, count)| (token.as_str(), *count))
	}

	/// Draws one token using frequency-weighted random sampling.
	///
	/// The probability of a token is `count / total`: each recorded unit of
	/// count is one equally-likely draw, so a token seen three times is
	/// three times as likely as a token seen once. This is not uniform
	/// sampling over distinct keys.
	///
	/// Tokens are scanned in sorted order over an explicitly materialized
	/// key list, so the draw is reproducible under a fixed rng seed.
	///
	/// # Errors
	/// Returns `EmptyDistribution` if no successor was ever recorded.
	pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&str> {
		let total = self.total();
		if total == 0 {
			return Err(MashError::EmptyDistribution);
		}

		let mut entries: Vec<(&str, usize)> = self.iter().collect();
		entries.sort_unstable_by_key(|(token, _)| *token);

		// Randomly select a count unit, then find its bucket
		let mut r = rng.random_range(0..total);
		for (token, count) in entries {
			if r < count {
				return Ok(token);
			}
			r -= count;
		}

		// Unreachable: r < total and the counts sum to total
		Err(MashError::EmptyDistribution)
	}

	/// Adds another distribution's counts into this one.
	///
	/// Counts for shared tokens are summed; tokens exclusive to `other`
	/// are inserted with their counts unchanged.
	pub(crate) fn absorb(&mut self, other: &Self) {
		for (token, count) in &other.counts {
			*self.counts.entry(token.clone()).or_insert(0) += *count;
		}
	}
}
