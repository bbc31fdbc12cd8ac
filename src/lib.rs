//! A from-scratch regular expression engine: an explicit LL(1) parse
//! straight into a Thompson-style NFA, evaluated with parallel
//! epsilon-closure simulation rather than backtracking.
//!
//! No capture groups, no back-references, no Unicode classes, no anchors
//! beyond implicit start-anchoring, no DFA compilation. `Regex::compile`
//! takes a pattern over bytes and returns something you can run either as
//! an anchored whole-input match or a longest-prefix search.

mod builder;
mod error;
mod grammar;
mod lexer;
mod nfa;
mod simulator;
mod stream;
mod token;

pub use error::Error;
pub use stream::{PatternSource, StrSource};

/// Compile-time tuning constants, surfaced by name rather than left as
/// magic numbers buried in `stream`/`builder`.
pub mod config {
    /// Ring-buffer capacity for the lexer's input stream (`B` in the
    /// original design: a power of two greater than two).
    pub const BUFFER_CAPACITY: usize = crate::stream::BUFFER_CAPACITY;
    /// Below this many arena states, `{m,n}` cloning remaps state ids with
    /// a flat array; at or above it, with a hash map.
    pub const CLONE_ARRAY_THRESHOLD: usize = crate::builder::CLONE_ARRAY_THRESHOLD;
}

use simulator::Program;

/// A compiled pattern, ready to match or search byte input.
pub struct Regex {
    program: Program,
}

impl Regex {
    /// Compiles `pattern` (read as a single in-memory byte slice) into a
    /// runnable `Regex`.
    pub fn compile(pattern: &str) -> Result<Regex, Error> {
        Self::compile_from(StrSource::new(pattern.as_bytes()))
    }

    /// Compiles a pattern read from any `PatternSource`, for callers that
    /// don't already have it as a contiguous byte slice.
    pub fn compile_from<S: PatternSource>(source: S) -> Result<Regex, Error> {
        let (states, start, accept) = builder::Builder::compile(source)?;
        Ok(Regex {
            program: Program { states, start, accept },
        })
    }

    /// Anchored match: `success` fires with the input length if the whole
    /// of `input` satisfies the pattern; otherwise `failure` fires with the
    /// offset where matching first got stuck.
    pub fn match_in<U>(
        &self,
        input: &[u8],
        success: impl FnMut(usize) -> U,
        failure: impl FnMut(usize) -> U,
    ) -> U {
        self.program.match_in(input, success, failure)
    }

    /// Longest-prefix search: `success` fires with the length of the
    /// longest matching prefix of `input`; `failure` fires (with the
    /// offset search got stuck at) if no non-empty prefix matches.
    pub fn search_in<U>(
        &self,
        input: &[u8],
        success: impl FnMut(usize) -> U,
        failure: impl FnMut(usize) -> U,
    ) -> U {
        self.program.search_in(input, success, failure)
    }

    /// Convenience wrapper over [`Regex::match_in`] for the common case of
    /// just wanting a bool.
    pub fn is_match(&self, input: &[u8]) -> bool {
        self.match_in(input, |_| true, |_| false)
    }

    /// Convenience wrapper over [`Regex::search_in`] returning the length
    /// of the longest matching prefix, or `None`.
    pub fn find(&self, input: &[u8]) -> Option<usize> {
        self.search_in(input, Some, |_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_concatenation() {
        let re = Regex::compile("abc").unwrap();
        assert!(re.is_match(b"abc"));
        assert!(!re.is_match(b"ab"));
        assert!(!re.is_match(b"abcd"));
    }

    #[test]
    fn alternation() {
        let re = Regex::compile("cat|dog").unwrap();
        assert!(re.is_match(b"cat"));
        assert!(re.is_match(b"dog"));
        assert!(!re.is_match(b"cow"));
    }

    #[test]
    fn star_matches_empty_and_many() {
        let re = Regex::compile("a*").unwrap();
        assert!(re.is_match(b""));
        assert!(re.is_match(b"aaaa"));
    }

    #[test]
    fn plus_requires_at_least_one() {
        let re = Regex::compile("a+").unwrap();
        assert!(!re.is_match(b""));
        assert!(re.is_match(b"a"));
        assert!(re.is_match(b"aaa"));
    }

    #[test]
    fn question_is_zero_or_one() {
        let re = Regex::compile("colou?r").unwrap();
        assert!(re.is_match(b"color"));
        assert!(re.is_match(b"colour"));
        assert!(!re.is_match(b"colouur"));
    }

    #[test]
    fn dot_matches_any_byte() {
        let re = Regex::compile("a.c").unwrap();
        assert!(re.is_match(b"abc"));
        assert!(re.is_match(b"azc"));
        assert!(!re.is_match(b"ac"));
    }

    #[test]
    fn character_class_and_negation() {
        let re = Regex::compile("[a-c]").unwrap();
        assert!(re.is_match(b"a"));
        assert!(re.is_match(b"c"));
        assert!(!re.is_match(b"d"));

        let re = Regex::compile("[^a-c]").unwrap();
        assert!(!re.is_match(b"a"));
        assert!(re.is_match(b"d"));
    }

    #[test]
    fn escaped_metacharacter_is_literal() {
        let re = Regex::compile(r"a\.c").unwrap();
        assert!(re.is_match(b"a.c"));
        assert!(!re.is_match(b"abc"));
    }

    #[test]
    fn bounded_repetition_exact() {
        let re = Regex::compile("(ab[e-h]){3,3}").unwrap();
        assert!(re.is_match(b"abeabfabh"));
        assert!(!re.is_match(b"abeabf"));
        assert!(!re.is_match(b"abeabfabhabe"));
    }

    #[test]
    fn bounded_repetition_range_and_search() {
        let re = Regex::compile("[^a-zA-Z0-9]*([x-zep]|RE)+").unwrap();
        assert!(re.find(b"$&^#xxyzyyeREREREepyyp").is_some());
        let found = re.find(b"$&^#xxyzyyepREREREepyypARE").unwrap();
        assert!(found < "$&^#xxyzyyepREREREepyypARE".len());
    }

    #[test]
    fn malformed_pattern_reports_parse_error() {
        assert!(Regex::compile("(ab|(c+d|[e-h]+z)e").is_err());
    }

    #[test]
    fn find_returns_none_on_no_match() {
        let re = Regex::compile("xyz").unwrap();
        assert_eq!(re.find(b"abc"), None);
    }
}
