//! Crate-level error type (C8).

/// Everything that can go wrong compiling or evaluating a pattern.
///
/// `Lex` and `Parse` cover malformed input; `BuilderInvariant` means the
/// parser drove the NFA builder into a state its own grammar should have
/// made unreachable, a bug, reported as data rather than a panic so an
/// embedding caller doesn't see an abort.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lexical error at byte {offset}: {reason}")]
    Lex { offset: usize, reason: &'static str },

    #[error("parse error at byte {offset}: {reason}")]
    Parse { offset: usize, reason: &'static str },

    #[error("builder invariant violated: {reason}")]
    BuilderInvariant { reason: &'static str },
}
