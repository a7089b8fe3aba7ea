//! Purpose: Read little-endian packed 32-bit integer streams.
//! Exports: `PackedIntReader`, `SuffixArrayParts`, `read_suffix_array_parts`, `ALPHABET_SIZE`.
//! Role: Binary counterpart of the text codec; yields raw parts for an external index builder.
//! Invariants: Every read is exact; a short stream is Corrupt with the byte offset it stopped at.
//! Invariants: Buffers grow with the bytes read, never with a count taken from the header.
//! Notes: The reader never seeks; offsets count bytes consumed since construction.

use std::io::{ErrorKind as IoErrorKind, Read};

use crate::core::error::{Error, ErrorKind};

/// Nucleotide alphabet used by the occurrence table.
pub const ALPHABET_SIZE: usize = 4;

const WORD: usize = 4;
const CHUNK_WORDS: usize = 4096;

pub struct PackedIntReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> PackedIntReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        let mut buf = [0u8; WORD];
        self.fill(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_into(&mut self, out: &mut [i32]) -> Result<(), Error> {
        let mut buf = [0u8; CHUNK_WORDS * WORD];
        for words in out.chunks_mut(CHUNK_WORDS) {
            let bytes = &mut buf[..words.len() * WORD];
            self.fill(bytes)?;
            for (slot, chunk) in words.iter_mut().zip(bytes.chunks_exact(WORD)) {
                *slot = i32::from_le_bytes(read_4(chunk));
            }
        }
        Ok(())
    }

    /// Reads `count` words; memory grows only as words actually arrive.
    pub fn read_vec(&mut self, count: usize) -> Result<Vec<i32>, Error> {
        let mut out = Vec::with_capacity(count.min(CHUNK_WORDS));
        let mut chunk = [0i32; CHUNK_WORDS];
        while out.len() < count {
            let take = (count - out.len()).min(CHUNK_WORDS);
            self.read_into(&mut chunk[..take])?;
            out.extend_from_slice(&chunk[..take]);
        }
        Ok(out)
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(Error::new(ErrorKind::Corrupt)
                        .with_message(format!(
                            "packed stream ended early; wanted {} more bytes",
                            buf.len() - filled
                        ))
                        .with_offset(self.offset + filled as u64));
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == IoErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(Error::new(ErrorKind::Io)
                        .with_message("failed to read packed stream")
                        .with_offset(self.offset + filled as u64)
                        .with_source(err));
                }
            }
        }
        self.offset += buf.len() as u64;
        Ok(())
    }
}

fn read_4(buf: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(&buf[..4]);
    out
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SuffixArrayParts {
    pub inverse_sa0: i32,
    /// Cumulative counts; the last entry is the sequence length.
    pub occurrences: [i32; ALPHABET_SIZE],
    pub interval: i32,
    pub samples: Vec<i32>,
}

/// Reads `inverse_sa0`, the occurrence table, the sampling interval, then
/// `total / interval + 1` sampled positions.
pub fn read_suffix_array_parts<R: Read>(
    reader: &mut PackedIntReader<R>,
) -> Result<SuffixArrayParts, Error> {
    let inverse_sa0 = reader.read_i32()?;
    let mut occurrences = [0i32; ALPHABET_SIZE];
    reader.read_into(&mut occurrences)?;

    let interval_offset = reader.offset();
    let interval = reader.read_i32()?;
    if interval <= 0 {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("suffix array interval must be positive, got {interval}"))
            .with_offset(interval_offset));
    }
    let total = occurrences[ALPHABET_SIZE - 1];
    if total < 0 {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message(format!("occurrence total must not be negative, got {total}"))
            .with_offset(interval_offset - WORD as u64));
    }

    let samples = reader.read_vec((total / interval) as usize + 1)?;
    Ok(SuffixArrayParts {
        inverse_sa0,
        occurrences,
        interval,
        samples,
    })
}
