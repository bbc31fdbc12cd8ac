//! Tokenizer (C3): turns a `PatternSource` byte stream into `Token`s,
//! resolving `\`-escapes against the metacharacter set in `token.rs`.

use crate::stream::{PatternSource, StreamBuffer};
use crate::token::{resolve_escape, sign_for_byte, Sign, Token};
use crate::Error;

pub(crate) struct Lexer<S> {
    buf: StreamBuffer<S>,
    offset: usize,
}

impl<S: PatternSource> Lexer<S> {
    pub(crate) fn new(source: S) -> Self {
        Lexer {
            buf: StreamBuffer::new(source),
            offset: 0,
        }
    }

    /// Byte offset of the last token returned, for error messages.
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    /// Reads the current cell, transparently refilling the stream buffer
    /// across an EOF sentinel that turns out not to be the real end.
    fn read_cell(&mut self) -> Option<u8> {
        let mut c = self.buf.current();
        self.buf.advance();
        if c.is_none() && self.buf.has_more() {
            self.buf.fill();
            c = self.buf.current();
            self.buf.advance();
        }
        c
    }

    pub(crate) fn next_token(&mut self) -> Result<Token, Error> {
        self.offset += 1;
        let c = match self.read_cell() {
            None => return Ok(Token::Sign(Sign::End)),
            Some(b) => b,
        };

        if let Some(sign) = sign_for_byte(c) {
            return Ok(Token::Sign(sign));
        }

        if c == b'\\' {
            let esc = self.read_cell().ok_or(Error::Lex {
                offset: self.offset,
                reason: "pattern ends with a trailing backslash",
            })?;
            return resolve_escape(esc)
                .map(Token::Char)
                .ok_or(Error::Lex {
                    offset: self.offset,
                    reason: "invalid escape sequence",
                });
        }

        Ok(Token::Char(c))
    }
}
