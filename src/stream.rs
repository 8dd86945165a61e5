//! Bounded chunk streaming over container sections
//!
//! L and H sections can be gigabytes for large circuits, so verification never
//! materializes them. This module owns the chunk arithmetic (how many chunks,
//! which element range each one covers) and [`SectionStream`], an owned cursor
//! that yields decoded points one chunk at a time from a section of a
//! [`BinFile`].
//!
//! The cursor is explicit state on the stream value; callers thread it through
//! `next_chunk` calls instead of sharing a mutable position.

#![forbid(unsafe_code)]

use std::io::{Read, Seek};

use crate::container::BinFile;
use crate::error::FormatError;
use crate::group_codec::{self, G1_SIZE};
use crate::G1;

/// Errors from chunk arithmetic.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Zero chunk size
    #[error("chunk size must be positive (got {0})")]
    BadChunkSize(usize),
    /// Chunk index past the last chunk
    #[error("chunk index {t} out of range ({count} chunks)")]
    ChunkOutOfRange {
        /// Requested chunk.
        t: usize,
        /// Chunks available.
        count: usize,
    },
}

/// Number of chunks covering `n` elements with `chunk` elements each.
#[inline]
pub fn chunk_count(n: usize, chunk: usize) -> Result<usize, StreamError> {
    if chunk == 0 {
        return Err(StreamError::BadChunkSize(chunk));
    }
    Ok(n.div_ceil(chunk))
}

/// Half-open element range `[start, end)` of chunk `t`.
#[inline]
pub fn chunk_bounds(t: usize, n: usize, chunk: usize) -> Result<(usize, usize), StreamError> {
    let count = chunk_count(n, chunk)?;
    if t >= count {
        return Err(StreamError::ChunkOutOfRange { t, count });
    }
    Ok((t * chunk, ((t + 1) * chunk).min(n)))
}

/// Iterator over every chunk range; validates `chunk` up front so iteration cannot fail.
pub fn chunks(n: usize, chunk: usize) -> Result<impl Iterator<Item = (usize, usize)>, StreamError> {
    let count = chunk_count(n, chunk)?;
    Ok((0..count).map(move |t| (t * chunk, ((t + 1) * chunk).min(n))))
}

/// Owned cursor over `len` G1 points starting `first` elements into a section.
pub struct SectionStream<'a, R> {
    file: &'a mut BinFile<R>,
    section: u32,
    first: usize,
    len: usize,
    chunk: usize,
    cursor: usize,
}

impl<'a, R: Read + Seek> SectionStream<'a, R> {
    /// Stream the whole of section `id`, which must hold a whole number of G1 points.
    pub fn open(file: &'a mut BinFile<R>, id: u32, chunk: usize) -> Result<Self, FormatError> {
        let size = file.section_size(id)?;
        if size % G1_SIZE as u64 != 0 {
            return Err(FormatError::RaggedSection { len: size, elem: G1_SIZE });
        }
        let len = (size / G1_SIZE as u64) as usize;
        Self::window(file, id, 0, len, chunk)
    }

    /// Stream points `[first, first + len)` of section `id`.
    pub fn window(
        file: &'a mut BinFile<R>,
        id: u32,
        first: usize,
        len: usize,
        chunk: usize,
    ) -> Result<Self, FormatError> {
        let size = file.section_size(id)?;
        let end = ((first + len) * G1_SIZE) as u64;
        if end > size {
            return Err(FormatError::SectionOverrun { id, len: end - size });
        }
        Ok(Self { file, section: id, first, len, chunk: chunk.max(1), cursor: 0 })
    }

    /// Total points this stream covers.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when the window holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Points already yielded.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Next chunk of decoded points, or `None` once the window is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<G1>>, FormatError> {
        if self.cursor >= self.len {
            return Ok(None);
        }
        let n = self.chunk.min(self.len - self.cursor);
        let offset = ((self.first + self.cursor) * G1_SIZE) as u64;
        let bytes = self.file.read_at(self.section, offset, n * G1_SIZE)?;
        self.cursor += n;
        group_codec::read_g1_batch(&bytes).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::BinFileWriter;
    use ark_ec::{AffineRepr, CurveGroup};
    use std::io::Cursor;

    #[test]
    fn chunk_arithmetic_covers_every_element_once() {
        assert_eq!(chunk_count(10, 4).unwrap(), 3);
        assert_eq!(chunk_bounds(2, 10, 4).unwrap(), (8, 10));
        assert!(matches!(chunk_count(10, 0), Err(StreamError::BadChunkSize(0))));
        assert!(matches!(chunk_bounds(3, 10, 4), Err(StreamError::ChunkOutOfRange { t: 3, count: 3 })));
        let covered: usize = chunks(10, 4).unwrap().map(|(s, e)| e - s).sum();
        assert_eq!(covered, 10);
        assert_eq!(chunks(0, 4).unwrap().count(), 0);
    }

    #[test]
    fn section_stream_yields_windowed_chunks() {
        let g = G1::generator();
        let points: Vec<G1> = (1..=7u64)
            .map(|k| (g * ark_bn254::Fr::from(k)).into_affine())
            .collect();
        let mut w = BinFileWriter::create(Cursor::new(Vec::new()), b"test", 1, 1).unwrap();
        w.start_section(4).unwrap();
        for p in &points {
            w.write_bytes(&group_codec::encode_g1(p)).unwrap();
        }
        w.end_section().unwrap();
        let bytes = w.finish().unwrap().into_inner();
        let mut f = BinFile::open(Cursor::new(bytes), b"test", 1).unwrap();

        let mut s = SectionStream::open(&mut f, 4, 3).unwrap();
        assert_eq!(s.len(), 7);
        let mut seen = Vec::new();
        while let Some(c) = s.next_chunk().unwrap() {
            assert!(c.len() <= 3);
            seen.extend(c);
        }
        assert_eq!(seen, points);

        let mut s = SectionStream::window(&mut f, 4, 2, 4, 8).unwrap();
        assert_eq!(s.next_chunk().unwrap().unwrap(), points[2..6].to_vec());
        assert!(s.next_chunk().unwrap().is_none());
        assert_eq!(s.position(), 4);

        assert!(SectionStream::window(&mut f, 4, 5, 3, 8).is_err());
    }
}
