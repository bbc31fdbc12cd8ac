//! Pattern source abstraction and the half-page double-buffered reader
//! (C2, C10).
//!
//! `StreamBuffer` mirrors `Stream_buff`/`Buffer<Char_t, SIZE>` from the
//! original source: a ring of `BUFFER_CAPACITY` cells split into two
//! halves. Reading refills one half at a time so that stepping back one
//! position after crossing a half boundary is always into bytes that are
//! still valid, without re-reading from the source.

/// Supplies raw pattern bytes. A file-backed implementation is out of
/// scope; `StrSource` below is the only one this crate ships.
pub trait PatternSource {
    /// Best-effort bulk read into `buf`; returns the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> usize;
    /// True once no more bytes will ever be available.
    fn eof(&self) -> bool;
}

/// Wraps an in-memory byte slice as a `PatternSource`.
pub struct StrSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> StrSource<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        StrSource { bytes, pos: 0 }
    }
}

impl<'a> PatternSource for StrSource<'a> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.bytes.len() - self.pos);
        buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    fn eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

/// `B` from spec.md §4.1: total ring capacity, a power of two greater than
/// two. Each refill tops up exactly one `HALF`-sized half of the ring.
pub(crate) const BUFFER_CAPACITY: usize = 256;
const HALF: usize = BUFFER_CAPACITY / 2;

/// A ring of `Option<u8>` cells: `None` marks the one-past-the-last-valid-byte
/// EOF sentinel the original buffer writes in place of a literal `EOF` char.
pub(crate) struct StreamBuffer<S> {
    source: S,
    cells: [Option<u8>; BUFFER_CAPACITY],
    cur: usize,
}

impl<S: PatternSource> StreamBuffer<S> {
    pub(crate) fn new(source: S) -> Self {
        let mut sb = StreamBuffer {
            source,
            cells: [None; BUFFER_CAPACITY],
            cur: 0,
        };
        sb.fill();
        sb
    }

    /// The byte under the cursor, or `None` if this is the EOF sentinel.
    pub(crate) fn current(&self) -> Option<u8> {
        self.cells[self.cur]
    }

    pub(crate) fn advance(&mut self) {
        self.cur = (self.cur + 1) % BUFFER_CAPACITY;
    }

    pub(crate) fn retreat(&mut self) {
        self.cur = (self.cur + BUFFER_CAPACITY - 1) % BUFFER_CAPACITY;
    }

    /// Whether the underlying source might still produce bytes beyond the
    /// sentinel currently sitting in the buffer.
    pub(crate) fn has_more(&self) -> bool {
        !self.source.eof()
    }

    /// Refills the half-page the cursor is *not* currently inside, following
    /// `fill_buff`/`fill_char`/`fill_buff_aux`: step back one cell, read a
    /// single byte there (completing the previous half-page boundary), step
    /// forward, then bulk-read the rest of the new half and stamp the EOF
    /// sentinel one past the last byte actually read.
    pub(crate) fn fill(&mut self) {
        self.retreat();
        self.fill_one();
        self.advance();
        self.fill_rest();
        self.retreat();
    }

    fn fill_one(&mut self) {
        let mut tmp = [0u8; 1];
        let n = self.source.read(&mut tmp);
        self.cells[self.cur] = if n == 1 { Some(tmp[0]) } else { None };
    }

    fn fill_rest(&mut self) {
        debug_assert!(self.cur == 0 || self.cur == HALF);
        let mut tmp = vec![0u8; HALF - 1];
        let n = self.source.read(&mut tmp);
        for (i, &b) in tmp[..n].iter().enumerate() {
            self.cells[(self.cur + i) % BUFFER_CAPACITY] = Some(b);
        }
        self.cells[(self.cur + n) % BUFFER_CAPACITY] = None;
    }
}
