use std::collections::HashMap;
use std::path::Path;

use rand::Rng;

use crate::error::{MashError, Result};
use crate::io;
use crate::model::reference::{ReferenceTable, Seed};
use crate::text;

/// High-level generator managing one reference table per corpus.
///
/// # Responsibilities
/// - Load every corpus text file found in a directory
/// - Mash selected tables into a combined table on demand
/// - Generate token streams and render them to prose
#[derive(Debug)]
pub struct Generator {
	window_len: usize,
	tables: HashMap<String, ReferenceTable>,
}

impl Generator {
	/// Creates a generator by loading all `.txt` corpora from a directory.
	///
	/// # Parameters
	/// - `filepath`: Path to a directory containing corpus files.
	///   Both `"folder"` and `"folder/"` are accepted.
	/// - `window_len`: Window length used for every table.
	///
	/// # Behavior
	/// - Lists all files with the `.txt` extension in the given directory.
	/// - Builds (or loads from the `.bin` cache) a table for each corpus.
	/// - The corpus name is derived from the file name (without extension).
	///
	/// # Errors
	/// - Returns `NotADirectory` if the path does not exist or is not a
	///   directory.
	/// - Returns an error if a corpus fails to load.
	///
	/// # Notes
	/// - Only files directly contained in the directory are loaded
	///   (subdirectories are ignored).
	pub fn new<P: AsRef<Path>>(filepath: P, window_len: usize) -> Result<Self> {
		let mut generator = Self {
			window_len,
			tables: HashMap::new(),
		};

		let string_path = filepath
			.as_ref()
			.to_str()
			.ok_or_else(|| MashError::NotADirectory(filepath.as_ref().display().to_string()))?;
		// Normalize "folder" / "folder/"
		let folder = io::normalize_folder(string_path);

		if !folder.is_dir() {
			return Err(MashError::NotADirectory(folder.display().to_string()));
		}

		for file in io::list_files(&folder, "txt")? {
			let full_path = folder.join(&file);
			generator.load_corpus(&full_path)?;
		}

		Ok(generator)
	}

	/// Returns the list of loaded corpus names, sorted.
	pub fn corpus_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.tables.keys().cloned().collect();
		names.sort();
		names
	}

	/// Returns the table built for `name`, if loaded.
	pub fn table(&self, name: &str) -> Option<&ReferenceTable> {
		self.tables.get(name)
	}

	/// Builds (or loads) the table for one corpus file and registers it
	/// under its file stem.
	fn load_corpus<P: AsRef<Path>>(&mut self, filepath: P) -> Result<()> {
		let key = io::corpus_name(&filepath)?;
		let table = ReferenceTable::from_corpus_file(&filepath, self.window_len)?;
		self.tables.insert(key, table);
		Ok(())
	}

	/// Returns a new table combining the named corpora.
	///
	/// The inputs are left untouched; counts are summed where windows are
	/// shared. Mashing a single name yields a copy of that corpus's table.
	///
	/// # Errors
	/// Returns `UnknownCorpus` if any name was never loaded.
	pub fn mash(&self, names: &[&str]) -> Result<ReferenceTable> {
		let mut mashed = ReferenceTable::new(self.window_len)?;

		for name in names {
			let table = self
				.tables
				.get(*name)
				.ok_or_else(|| MashError::UnknownCorpus((*name).to_owned()))?;
			mashed.merge_from(table)?;
		}

		Ok(mashed)
	}

	/// Generates `sentences` sentence units from the named corpora and
	/// renders them as prose.
	///
	/// # Behavior
	/// - Mashes the named tables into one.
	/// - Walks the chain from a random window until `sentences` terminator
	///   tokens have been sampled.
	/// - Joins the stream into readable text.
	///
	/// # Errors
	/// - `UnknownCorpus` if a name was never loaded.
	/// - `EmptyTable` if the mashed table has no windows.
	/// - `BrokenChain` if the walk falls outside the mashed table, which
	///   can happen when the corpora share no vocabulary.
	pub fn generate_text<R: Rng + ?Sized>(
		&self,
		names: &[&str],
		sentences: usize,
		rng: &mut R,
	) -> Result<String> {
		let mashed = self.mash(names)?;
		let stream = mashed.generate(Seed::Random, sentences, rng)?;
		Ok(text::render(&stream))
	}
}
