//! Pluggable tokenization: turning raw text into the normalized tokens the
//! store indexes.
//!
//! The default splitting rule is intentionally simple and is kept exactly
//! as naive as the spec calls for, quirks included — see
//! [`DefaultTokenizer`].

use crate::types::Token;

/// Stateful per-file tokenization session. A [`Tokenizer`] hands one of
/// these out per file being processed so that a streaming processor can
/// feed it successive chunks of text without losing a token split across
/// a chunk boundary.
pub trait TokenizationSession: Send {
    /// Tokenize another chunk of this file's content, in order. The session
    /// is responsible for stitching together a token that straddles the
    /// boundary between this chunk and the previous one.
    fn feed(&mut self, chunk: &str) -> Vec<Token>;

    /// Flush any token left pending after the final chunk.
    fn finish(&mut self) -> Vec<Token>;
}

/// Factory for [`TokenizationSession`]s, injectable so callers can swap in
/// language-aware or stopword-filtering tokenizers without touching the
/// rest of the pipeline.
pub trait Tokenizer: Send + Sync {
    fn start_session(&self) -> Box<dyn TokenizationSession>;
}

/// Splits on any character that is not alphanumeric or `_`, lowercases the
/// result, and drops empty fragments.
///
/// This is a naive, locale-insensitive ASCII-ish split: the alphanumeric
/// test is Unicode-aware (`char::is_alphanumeric`), but there's no concept
/// of a word boundary beyond "not alphanumeric and not underscore". A
/// consequence worth knowing: `"2.0"` tokenizes to `["2", "0"]`, not
/// `["2.0"]`, because `.` is a split character. Kept as-is because nothing
/// downstream depends on numeric-literal tokens staying whole.
#[derive(Default)]
pub struct DefaultTokenizer;

impl DefaultTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for DefaultTokenizer {
    fn start_session(&self) -> Box<dyn TokenizationSession> {
        Box::new(DefaultSession { carry: String::new() })
    }
}

struct DefaultSession {
    /// Partial token accumulated at the end of the previous chunk, carried
    /// forward in case the next chunk continues the same word.
    carry: String,
}

impl DefaultSession {
    fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }
}

impl TokenizationSession for DefaultSession {
    fn feed(&mut self, chunk: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut current = std::mem::take(&mut self.carry);

        for c in chunk.chars() {
            if Self::is_word_char(c) {
                current.push(c.to_ascii_lowercase());
            } else if !current.is_empty() {
                tokens.push(crate::types::intern(&current));
                current.clear();
            }
        }

        // `current` may still be growing a token that continues into the
        // next chunk; hold onto it rather than emitting it prematurely.
        self.carry = current;
        tokens
    }

    fn finish(&mut self) -> Vec<Token> {
        if self.carry.is_empty() {
            Vec::new()
        } else {
            vec![crate::types::intern(&std::mem::take(&mut self.carry))]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize_whole(text: &str) -> Vec<String> {
        let tokenizer = DefaultTokenizer::new();
        let mut session = tokenizer.start_session();
        let mut out: Vec<String> = session.feed(text).iter().map(|t| t.to_string()).collect();
        out.extend(session.finish().iter().map(|t| t.to_string()));
        out
    }

    #[test]
    fn splits_on_whitespace_and_lowercases() {
        assert_eq!(tokenize_whole("The Quick Brown"), vec!["the", "quick", "brown"]);
    }

    #[test]
    fn underscores_stay_inside_a_token() {
        assert_eq!(tokenize_whole("file_index rocks"), vec!["file_index", "rocks"]);
    }

    #[test]
    fn punctuation_splits_numeric_literals() {
        // Deliberate quirk: "2.0" is two tokens, not one.
        assert_eq!(tokenize_whole("version 2.0 released"), vec!["version", "2", "0", "released"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize_whole("").is_empty());
        assert!(tokenize_whole("   \n\t  ").is_empty());
    }

    #[test]
    fn chunk_boundary_does_not_split_a_word() {
        let tokenizer = DefaultTokenizer::new();
        let mut session = tokenizer.start_session();
        let mut tokens: Vec<String> = session.feed("hel").iter().map(|t| t.to_string()).collect();
        tokens.extend(session.feed("lo wor").iter().map(|t| t.to_string()));
        tokens.extend(session.finish().iter().map(|t| t.to_string()));
        assert_eq!(tokens, vec!["hello", "wor"]);
    }

    #[test]
    fn unicode_letters_count_as_word_characters() {
        assert_eq!(tokenize_whole("caf\u{e9} expos\u{e9}"), vec!["caf\u{e9}", "expos\u{e9}"]);
    }
}
