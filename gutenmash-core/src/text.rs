//! Tokenization of Gutenberg plain text and rendering of generated streams.

/// Marker line preceding the actual text in a Project Gutenberg book.
const START_MARKER: &str = "START OF THIS PROJECT GUTENBERG EBOOK";

/// Marker line following the actual text in a Project Gutenberg book.
const END_MARKER: &str = "END OF THIS PROJECT GUTENBERG EBOOK";

/// Characters stripped from every line before splitting into words.
const UNWANTED_CHARS: [char; 3] = ['_', '\\', '"'];

/// Returns the slice of `lines` strictly between the Gutenberg front-matter
/// and end-matter markers.
///
/// The first line containing the start marker and the last line containing
/// the end marker are both excluded. If either marker is missing, the whole
/// input is returned unchanged.
fn strip_matter(lines: &[String]) -> &[String] {
	let start = lines.iter().position(|l| l.contains(START_MARKER));
	let end = lines.iter().rposition(|l| l.contains(END_MARKER));

	match (start, end) {
		(Some(s), Some(e)) if s < e => &lines[s + 1..e],
		_ => lines,
	}
}

/// Splits raw book lines into an ordered stream of tokens.
///
/// A token is a lowercased word or a single punctuation mark.
///
/// # Behavior
/// - Strips Gutenberg front/end matter via `strip_matter`.
/// - Removes `_`, `\` and `"` and lowercases each line.
/// - Splits on whitespace.
/// - A trailing punctuation character (other than an apostrophe) becomes
///   its own token, detached from the word.
/// - Words containing `--` split into three tokens: left part, `--`,
///   right part.
/// - Empty tokens are discarded.
pub fn tokenize(lines: &[String]) -> Vec<String> {
	let mut tokens = Vec::new();

	for line in strip_matter(lines) {
		let cleaned: String = line
			.chars()
			.filter(|c| !UNWANTED_CHARS.contains(c))
			.flat_map(char::to_lowercase)
			.collect();

		for word in cleaned.split_whitespace() {
			match word.char_indices().last() {
				// Detach trailing punctuation from words of length >= 2
				Some((idx, last)) if idx > 0 && last.is_ascii_punctuation() && last != '\'' => {
					tokens.push(word[..idx].to_owned());
					tokens.push(last.to_string());
				}
				_ => match word.split_once("--") {
					Some((left, right)) => {
						tokens.push(left.to_owned());
						tokens.push("--".to_owned());
						tokens.push(right.to_owned());
					}
					None => tokens.push(word.to_owned()),
				},
			}
		}
	}

	tokens.retain(|t| !t.is_empty());
	tokens
}

/// Joins a generated token stream into readable prose.
///
/// Tokens are joined with single spaces, then every `space + punctuation`
/// pair collapses so the punctuation attaches to the preceding token. The
/// opening parenthesis is excluded from the collapsing rule, since it
/// belongs to the token that follows it.
pub fn render(tokens: &[String]) -> String {
	let mut prose = tokens.join(" ");

	for p in (0x21u8..=0x7e).map(char::from) {
		if p.is_ascii_punctuation() && p != '(' {
			prose = prose.replace(&format!(" {p}"), &p.to_string());
		}
	}

	prose
}

#[cfg(test)]
mod tests {
	use super::{render, tokenize};

	fn lines(raw: &[&str]) -> Vec<String> {
		raw.iter().map(|l| (*l).to_owned()).collect()
	}

	#[test]
	fn detaches_trailing_punctuation() {
		let tokens = tokenize(&lines(&["The cat sat down."]));
		assert_eq!(tokens, vec!["the", "cat", "sat", "down", "."]);
	}

	#[test]
	fn keeps_trailing_apostrophe() {
		let tokens = tokenize(&lines(&["the dogs' bones"]));
		assert_eq!(tokens, vec!["the", "dogs'", "bones"]);
	}

	#[test]
	fn splits_em_dash_into_three_tokens() {
		let tokens = tokenize(&lines(&["wait--no"]));
		assert_eq!(tokens, vec!["wait", "--", "no"]);
	}

	#[test]
	fn discards_empty_tokens_from_dash_split() {
		// A leading "--" produces an empty left-side token
		let tokens = tokenize(&lines(&["--no"]));
		assert_eq!(tokens, vec!["--", "no"]);
	}

	#[test]
	fn strips_unwanted_characters_and_lowercases() {
		let tokens = tokenize(&lines(&["\"Hello_ World\\\""]));
		assert_eq!(tokens, vec!["hello", "world"]);
	}

	#[test]
	fn strips_gutenberg_front_and_end_matter() {
		let tokens = tokenize(&lines(&[
			"Produced by volunteers",
			"*** START OF THIS PROJECT GUTENBERG EBOOK HUCK FINN ***",
			"actual text here",
			"*** END OF THIS PROJECT GUTENBERG EBOOK HUCK FINN ***",
			"End of the Project Gutenberg EBook",
		]));
		assert_eq!(tokens, vec!["actual", "text", "here"]);
	}

	#[test]
	fn missing_markers_keep_whole_input() {
		let tokens = tokenize(&lines(&["no markers here"]));
		assert_eq!(tokens, vec!["no", "markers", "here"]);
	}

	#[test]
	fn render_attaches_punctuation() {
		let tokens = lines(&["the", "cat", "sat", ",", "then", "slept", "."]);
		assert_eq!(render(&tokens), "the cat sat, then slept.");
	}

	#[test]
	fn render_keeps_opening_parenthesis_detached() {
		let tokens = lines(&["a", "(", "quiet", ")", "word"]);
		assert_eq!(render(&tokens), "a ( quiet) word");
	}
}
