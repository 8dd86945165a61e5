//! Section-tagged binary container
//!
//! Both bundle (`zkey`) and powers-of-tau (`ptau`) artifacts share one layout:
//!
//! ```text
//! magic[4] | u32 version | u32 n_sections |
//!   ( u32 id | u64 len | payload[len] ) * n_sections
//! ```
//!
//! All integers are little-endian. Every section records its own byte length,
//! so a reader can index the whole file on open and later seek to any section,
//! validate its size, or compare it byte-for-byte with another file without
//! decoding it.
//!
//! The reader keeps at most one section *active*. Reads are bounded by the
//! active section, and closing it checks that exactly the declared number of
//! bytes was consumed.

#![forbid(unsafe_code)]

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_bigint::BigUint;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::FormatError;

/// Location of one section payload inside a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Section {
    /// Absolute offset of the first payload byte.
    pub position: u64,
    /// Declared payload length in bytes.
    pub size: u64,
}

#[derive(Clone, Copy, Debug)]
struct Active {
    id: u32,
    start: u64,
    end: u64,
}

/// Indexed reader over a container.
#[derive(Debug)]
pub struct BinFile<R> {
    reader: R,
    version: u32,
    sections: HashMap<u32, Vec<Section>>,
    pos: u64,
    active: Option<Active>,
}

impl BinFile<BufReader<File>> {
    /// Open a container file from disk.
    pub fn open_path(
        path: impl AsRef<Path>,
        magic: &[u8; 4],
        max_version: u32,
    ) -> Result<Self, FormatError> {
        let f = File::open(path.as_ref())?;
        Self::open(BufReader::new(f), magic, max_version)
    }
}

impl<R: Read + Seek> BinFile<R> {
    /// Parse the container header and index every section.
    pub fn open(mut reader: R, magic: &[u8; 4], max_version: u32) -> Result<Self, FormatError> {
        reader.seek(SeekFrom::Start(0))?;
        let mut found = [0u8; 4];
        reader.read_exact(&mut found)?;
        if &found != magic {
            return Err(FormatError::BadMagic { expected: *magic, found });
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version == 0 || version > max_version {
            return Err(FormatError::UnsupportedVersion { found: version, max: max_version });
        }
        let n_sections = reader.read_u32::<LittleEndian>()?;

        let mut sections: HashMap<u32, Vec<Section>> = HashMap::new();
        let mut pos = 12u64;
        for _ in 0..n_sections {
            let id = reader.read_u32::<LittleEndian>()?;
            let size = reader.read_u64::<LittleEndian>()?;
            pos += 12;
            sections.entry(id).or_default().push(Section { position: pos, size });
            pos = pos
                .checked_add(size)
                .ok_or(FormatError::SectionOverrun { id, len: size })?;
            reader.seek(SeekFrom::Start(pos))?;
        }
        // A section whose declared length runs past EOF is truncated.
        let eof = reader.seek(SeekFrom::End(0))?;
        if pos > eof {
            let last = sections
                .iter()
                .flat_map(|(id, v)| v.iter().map(move |s| (*id, *s)))
                .max_by_key(|(_, s)| s.position)
                .map(|(id, _)| id)
                .unwrap_or(0);
            return Err(FormatError::SectionOverrun { id: last, len: pos - eof });
        }
        reader.seek(SeekFrom::Start(0))?;

        Ok(Self { reader, version, sections, pos: 0, active: None })
    }

    /// Container version from the header.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The unique section `id`, or a format error if it is missing or duplicated.
    pub fn unique_section(&self, id: u32) -> Result<Section, FormatError> {
        match self.sections.get(&id).map(|v| v.as_slice()) {
            None | Some([]) => Err(FormatError::MissingSection(id)),
            Some([s]) => Ok(*s),
            Some(_) => Err(FormatError::DuplicateSection(id)),
        }
    }

    /// Check that every id in `ids` appears exactly once.
    pub fn ensure_unique_sections(&self, ids: impl IntoIterator<Item = u32>) -> Result<(), FormatError> {
        for id in ids {
            self.unique_section(id)?;
        }
        Ok(())
    }

    /// Declared byte length of the unique section `id`.
    pub fn section_size(&self, id: u32) -> Result<u64, FormatError> {
        Ok(self.unique_section(id)?.size)
    }

    /// Seek to the start of section `id` and make it the active section.
    pub fn start_read_unique_section(&mut self, id: u32) -> Result<Section, FormatError> {
        if let Some(a) = self.active {
            return Err(FormatError::SectionAlreadyOpen(a.id));
        }
        let s = self.unique_section(id)?;
        self.seek_to(s.position)?;
        self.active = Some(Active { id, start: s.position, end: s.position + s.size });
        Ok(s)
    }

    /// Close the active section, checking that it was consumed exactly.
    pub fn end_read_section(&mut self) -> Result<(), FormatError> {
        let a = self.active.take().ok_or(FormatError::NoActiveSection)?;
        if self.pos != a.end {
            return Err(FormatError::SectionSizeMismatch {
                id: a.id,
                consumed: self.pos.saturating_sub(a.start),
                declared: a.end - a.start,
            });
        }
        Ok(())
    }

    /// Bytes left in the active section.
    pub fn remaining_in_section(&self) -> Result<u64, FormatError> {
        let a = self.active.ok_or(FormatError::NoActiveSection)?;
        Ok(a.end.saturating_sub(self.pos))
    }

    fn check_bounds(&self, len: u64) -> Result<(), FormatError> {
        if let Some(a) = self.active {
            if self.pos + len > a.end {
                return Err(FormatError::SectionOverrun { id: a.id, len });
            }
        }
        Ok(())
    }

    fn seek_to(&mut self, pos: u64) -> Result<(), FormatError> {
        if pos != self.pos {
            self.reader.seek(SeekFrom::Start(pos))?;
            self.pos = pos;
        }
        Ok(())
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        self.check_bounds(1)?;
        let v = self.reader.read_u8()?;
        self.pos += 1;
        Ok(v)
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        self.check_bounds(4)?;
        let v = self.reader.read_u32::<LittleEndian>()?;
        self.pos += 4;
        Ok(v)
    }

    /// Read exactly `len` bytes from the current position.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, FormatError> {
        self.check_bounds(len as u64)?;
        let mut buf = vec![0u8; len];
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` from the current position.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<(), FormatError> {
        self.check_bounds(buf.len() as u64)?;
        self.reader.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Read `len` bytes starting `offset` bytes into section `id`.
    ///
    /// Leaves the cursor after the read; the active section (if any) is not
    /// affected, so positioned reads are meant for files used in random-access
    /// mode only.
    pub fn read_at(&mut self, id: u32, offset: u64, len: usize) -> Result<Vec<u8>, FormatError> {
        let s = self.unique_section(id)?;
        if offset + len as u64 > s.size {
            return Err(FormatError::SectionOverrun { id, len: len as u64 });
        }
        if self.active.is_some() {
            return Err(FormatError::SectionAlreadyOpen(id));
        }
        self.seek_to(s.position + offset)?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        self.pos += len as u64;
        Ok(buf)
    }

    /// Little-endian unsigned integer of width `n8` bytes.
    pub fn read_big_int(&mut self, n8: usize) -> Result<BigUint, FormatError> {
        let bytes = self.read_bytes(n8)?;
        Ok(BigUint::from_bytes_le(&bytes))
    }

    /// Byte-compare section `id` of two containers, streaming `chunk` bytes at a time.
    pub fn section_is_equal<S: Read + Seek>(
        &mut self,
        other: &mut BinFile<S>,
        id: u32,
        chunk: usize,
    ) -> Result<bool, FormatError> {
        let a = self.start_read_unique_section(id)?;
        let b = other.start_read_unique_section(id)?;
        if a.size != b.size {
            self.active = None;
            other.active = None;
            return Ok(false);
        }
        let chunk = chunk.max(1) as u64;
        let mut left = a.size;
        let mut equal = true;
        while left > 0 {
            let n = left.min(chunk) as usize;
            let x = self.read_bytes(n)?;
            let y = other.read_bytes(n)?;
            if x != y {
                equal = false;
                break;
            }
            left -= n as u64;
        }
        if equal {
            self.end_read_section()?;
            other.end_read_section()?;
        } else {
            self.active = None;
            other.active = None;
        }
        Ok(equal)
    }
}

/// Container writer. Section lengths are back-patched on [`end_section`](Self::end_section).
pub struct BinFileWriter<W: Write + Seek> {
    writer: W,
    open: Option<(u32, u64)>,
    n_sections: u32,
    declared_sections: u32,
}

impl BinFileWriter<BufWriter<File>> {
    /// Create (truncate) a container file on disk.
    pub fn create_path(
        path: impl AsRef<Path>,
        magic: &[u8; 4],
        version: u32,
        n_sections: u32,
    ) -> Result<Self, FormatError> {
        let f = File::create(path.as_ref())?;
        Self::create(BufWriter::new(f), magic, version, n_sections)
    }
}

impl<W: Write + Seek> BinFileWriter<W> {
    /// Write the container header; sections follow.
    pub fn create(
        mut writer: W,
        magic: &[u8; 4],
        version: u32,
        n_sections: u32,
    ) -> Result<Self, FormatError> {
        writer.write_all(magic)?;
        writer.write_u32::<LittleEndian>(version)?;
        writer.write_u32::<LittleEndian>(n_sections)?;
        Ok(Self { writer, open: None, n_sections: 0, declared_sections: n_sections })
    }

    /// Begin section `id`; the length field is a placeholder until closed.
    pub fn start_section(&mut self, id: u32) -> Result<(), FormatError> {
        if let Some((open, _)) = self.open {
            return Err(FormatError::SectionAlreadyOpen(open));
        }
        self.writer.write_u32::<LittleEndian>(id)?;
        self.writer.write_u64::<LittleEndian>(0)?;
        let start = self.writer.stream_position()?;
        self.open = Some((id, start));
        Ok(())
    }

    /// Close the open section and backpatch its length.
    pub fn end_section(&mut self) -> Result<(), FormatError> {
        let (_, start) = self.open.take().ok_or(FormatError::NoActiveSection)?;
        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(start - 8))?;
        self.writer.write_u64::<LittleEndian>(end - start)?;
        self.writer.seek(SeekFrom::Start(end))?;
        self.n_sections += 1;
        Ok(())
    }

    /// Write one byte.
    pub fn write_u8(&mut self, v: u8) -> Result<(), FormatError> {
        self.writer.write_u8(v)?;
        Ok(())
    }

    /// Write a little-endian `u32`.
    pub fn write_u32(&mut self, v: u32) -> Result<(), FormatError> {
        self.writer.write_u32::<LittleEndian>(v)?;
        Ok(())
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), FormatError> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    /// Little-endian unsigned integer zero-padded to `n8` bytes.
    pub fn write_big_int(&mut self, v: &BigUint, n8: usize) -> Result<(), FormatError> {
        let mut bytes = v.to_bytes_le();
        if bytes.len() > n8 {
            return Err(FormatError::IntegerTooWide { n8 });
        }
        bytes.resize(n8, 0);
        self.write_bytes(&bytes)
    }

    /// Flush and hand back the underlying writer.
    ///
    /// Fails if a section is still open or fewer sections were written than
    /// announced in the header.
    pub fn finish(mut self) -> Result<W, FormatError> {
        if let Some((id, _)) = self.open {
            return Err(FormatError::SectionAlreadyOpen(id));
        }
        if self.n_sections != self.declared_sections {
            return Err(FormatError::ShapeMismatch {
                what: "sections written",
                expected: self.declared_sections as usize,
                got: self.n_sections as usize,
            });
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}
