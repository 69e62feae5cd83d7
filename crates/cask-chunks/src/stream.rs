//! Streaming chunker over any byte reader

use std::io::Read;

use cask_core::{CaskResult, ChunkRead, Error, Secret};

use crate::gear::{cut_point, ChunkSizes, GearTable};

/// Splits a byte reader into content-defined chunks.
///
/// One internal buffer of `sizes.max` bytes is reused for every chunk: the
/// slice returned by [`next_chunk`](ChunkRead::next_chunk) is only valid
/// until the next call, and callers that dispatch chunks elsewhere must copy
/// first. The chunker is single-reader and not restartable.
pub struct StreamChunker<R> {
    reader: R,
    table: GearTable,
    sizes: ChunkSizes,
    buf: Vec<u8>,
    filled: usize,
    consumed: usize,
    eof: bool,
}

impl<R: Read> StreamChunker<R> {
    /// Chunk `reader` with the default size bounds, boundaries keyed by
    /// `secret`.
    pub fn new(reader: R, secret: &Secret) -> StreamChunker<R> {
        StreamChunker::with_sizes(reader, secret, ChunkSizes::DEFAULT)
    }

    pub fn with_sizes(reader: R, secret: &Secret, sizes: ChunkSizes) -> StreamChunker<R> {
        StreamChunker {
            reader,
            table: GearTable::derive(secret.polynomial()),
            sizes,
            buf: vec![0u8; sizes.max],
            filled: 0,
            consumed: 0,
            eof: false,
        }
    }

    /// Top up the buffer until it is full or the reader is exhausted, so
    /// `cut_point` always sees either `max` bytes or the stream's tail.
    fn fill(&mut self) -> CaskResult<()> {
        if self.consumed > 0 {
            self.buf.copy_within(self.consumed..self.filled, 0);
            self.filled -= self.consumed;
            self.consumed = 0;
        }
        while !self.eof && self.filled < self.buf.len() {
            match self.reader.read(&mut self.buf[self.filled..]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Chunker(e.to_string())),
            }
        }
        Ok(())
    }
}

impl<R: Read> ChunkRead for StreamChunker<R> {
    fn next_chunk(&mut self) -> CaskResult<Option<&[u8]>> {
        self.fill()?;
        if self.filled == 0 {
            return Ok(None);
        }
        let cut = cut_point(&self.table, &self.sizes, &self.buf[..self.filled]);
        self.consumed = cut;
        Ok(Some(&self.buf[..cut]))
    }
}
