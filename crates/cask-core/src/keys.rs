//! Key reader/writer implementations
//!
//! `MemKeys` buffers keys in memory and is the resettable source used when a
//! pipeline may re-run its input. The text types carry one base-64 key per
//! line; that is the CLI's wire format on stdin and stdout.

use std::io::{BufRead, Seek, SeekFrom, Write};

use crate::error::{CaskResult, Error};
use crate::key::Key;
use crate::traits::{KeyRead, KeyWrite};

/// In-memory key list that reads and writes; writes go to the tail, reads
/// advance a cursor that `reset` rewinds.
#[derive(Debug, Default)]
pub struct MemKeys {
    keys: Vec<Key>,
    cursor: usize,
}

impl MemKeys {
    pub fn new() -> MemKeys {
        MemKeys::default()
    }

    pub fn from_keys(keys: Vec<Key>) -> MemKeys {
        MemKeys { keys, cursor: 0 }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyRead for MemKeys {
    fn read_key(&mut self) -> CaskResult<Option<Key>> {
        match self.keys.get(self.cursor) {
            Some(key) => {
                self.cursor += 1;
                Ok(Some(*key))
            }
            None => Ok(None),
        }
    }

    fn reset(&mut self) -> CaskResult<()> {
        self.cursor = 0;
        Ok(())
    }
}

impl KeyWrite for MemKeys {
    fn write_key(&mut self, key: Key) -> CaskResult<()> {
        self.keys.push(key);
        Ok(())
    }
}

/// Reads newline-delimited base-64 keys; blank lines are skipped. `Seek` is
/// required so the reader can honor `reset`.
pub struct TextKeyReader<R> {
    reader: R,
    line: String,
}

impl<R: BufRead + Seek> TextKeyReader<R> {
    pub fn new(reader: R) -> TextKeyReader<R> {
        TextKeyReader {
            reader,
            line: String::new(),
        }
    }
}

impl<R: BufRead + Seek> KeyRead for TextKeyReader<R> {
    fn read_key(&mut self) -> CaskResult<Option<Key>> {
        loop {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .map_err(|e| Error::Reader(e.to_string()))?;
            if n == 0 {
                return Ok(None);
            }
            let text = self.line.trim();
            if text.is_empty() {
                continue;
            }
            return Ok(Some(Key::decode(text)?));
        }
    }

    fn reset(&mut self) -> CaskResult<()> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map(|_| ())
            .map_err(|e| Error::Reader(e.to_string()))
    }
}

/// Writes one base-64 key per line.
pub struct TextKeyWriter<W> {
    writer: W,
}

impl<W: Write> TextKeyWriter<W> {
    pub fn new(writer: W) -> TextKeyWriter<W> {
        TextKeyWriter { writer }
    }

    pub fn flush(&mut self) -> CaskResult<()> {
        self.writer
            .flush()
            .map_err(|e| Error::Writer(e.to_string()))
    }
}

impl<W: Write> KeyWrite for TextKeyWriter<W> {
    fn write_key(&mut self, key: Key) -> CaskResult<()> {
        writeln!(self.writer, "{key}").map_err(|e| Error::Writer(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_keys() -> Vec<Key> {
        (0u8..4).map(|i| Key::of(&[i])).collect()
    }

    #[test]
    fn mem_keys_read_in_write_order() {
        let mut keys = MemKeys::new();
        for key in sample_keys() {
            keys.write_key(key).unwrap();
        }
        let mut seen = Vec::new();
        while let Some(key) = keys.read_key().unwrap() {
            seen.push(key);
        }
        assert_eq!(seen, sample_keys());
    }

    #[test]
    fn mem_keys_reset_re_yields_same_sequence() {
        let mut keys = MemKeys::from_keys(sample_keys());
        while keys.read_key().unwrap().is_some() {}
        assert_eq!(keys.read_key().unwrap(), None);

        keys.reset().unwrap();
        let mut seen = Vec::new();
        while let Some(key) = keys.read_key().unwrap() {
            seen.push(key);
        }
        assert_eq!(seen, sample_keys());
    }

    #[test]
    fn text_roundtrip() {
        let mut buf = Vec::new();
        let mut writer = TextKeyWriter::new(&mut buf);
        for key in sample_keys() {
            writer.write_key(key).unwrap();
        }
        writer.flush().unwrap();

        let mut reader = TextKeyReader::new(Cursor::new(buf));
        let mut seen = Vec::new();
        while let Some(key) = reader.read_key().unwrap() {
            seen.push(key);
        }
        assert_eq!(seen, sample_keys());
    }

    #[test]
    fn text_reader_resets_to_start() {
        let mut buf = Vec::new();
        let mut writer = TextKeyWriter::new(&mut buf);
        writer.write_key(Key::of(b"x")).unwrap();

        let mut reader = TextKeyReader::new(Cursor::new(buf));
        assert!(reader.read_key().unwrap().is_some());
        assert!(reader.read_key().unwrap().is_none());
        reader.reset().unwrap();
        assert_eq!(reader.read_key().unwrap(), Some(Key::of(b"x")));
    }

    #[test]
    fn text_reader_skips_blank_lines() {
        let text = format!("\n{}\n\n{}\n", Key::of(b"a"), Key::of(b"b"));
        let mut reader = TextKeyReader::new(Cursor::new(text.into_bytes()));
        assert_eq!(reader.read_key().unwrap(), Some(Key::of(b"a")));
        assert_eq!(reader.read_key().unwrap(), Some(Key::of(b"b")));
        assert_eq!(reader.read_key().unwrap(), None);
    }

    #[test]
    fn text_reader_surfaces_bad_keys() {
        let mut reader = TextKeyReader::new(Cursor::new(b"definitely not a key\n".to_vec()));
        assert!(reader.read_key().is_err());
    }
}
