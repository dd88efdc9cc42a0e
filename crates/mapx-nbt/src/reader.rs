use std::borrow::Cow;

use byteorder::{BigEndian, ByteOrder};
use mapx_common::{MapError, Result};

use crate::kind::TagKind;
use crate::Tag;

/// Nesting limit for lists and compounds. Deeper input is rejected instead of
/// exhausting the stack.
pub const MAX_DEPTH: usize = 512;

/// Bounds-checked cursor over an immutable tag buffer.
///
/// Every read either advances by exactly the size of what it consumed or fails
/// with `MalformedData` carrying the offset of the failing field. Byte arrays and
/// names are borrowed from the buffer.
#[derive(Debug, Clone)]
pub struct NbtReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> NbtReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        NbtReader { buf, pos: 0 }
    }

    pub fn at(buf: &'a [u8], offset: usize) -> Self {
        NbtReader { buf, pos: offset }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                MapError::malformed(
                    self.pos,
                    format!("needs {} bytes, {} remain", len, self.remaining()),
                )
            })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    pub fn read_kind(&mut self) -> Result<TagKind> {
        let offset = self.pos;
        let id = self.read_u8()?;
        TagKind::from_id(id)
            .ok_or_else(|| MapError::malformed(offset, format!("unknown tag kind {}", id)))
    }

    /// Reads a signed 32-bit length or count. Negative values are rejected.
    fn read_len(&mut self) -> Result<usize> {
        let offset = self.pos;
        let len = self.read_i32()?;
        usize::try_from(len)
            .map_err(|_| MapError::malformed(offset, format!("negative length {}", len)))
    }

    /// Length-prefixed string. Invalid UTF-8 is replaced rather than rejected so
    /// that skipping over odd names never fails.
    pub fn read_string(&mut self) -> Result<Cow<'a, str>> {
        let len = self.read_u16()? as usize;
        Ok(String::from_utf8_lossy(self.take(len)?))
    }

    /// Kind and name of the next tag. A bare End byte has no name.
    pub fn read_tag_header(&mut self) -> Result<(TagKind, Cow<'a, str>)> {
        let kind = self.read_kind()?;
        if kind == TagKind::End {
            return Ok((kind, Cow::Borrowed("")));
        }
        let name = self.read_string()?;
        Ok((kind, name))
    }

    /// Payload of a ByteArray, borrowed from the buffer.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8]> {
        let len = self.read_len()?;
        self.take(len)
    }

    pub fn skip_value(&mut self, kind: TagKind) -> Result<()> {
        self.skip_value_at_depth(kind, 0)
    }

    /// Skips a List payload: element kind, count, then the elements.
    pub fn skip_list(&mut self) -> Result<()> {
        self.skip_list_at_depth(0)
    }

    /// Skips a Compound payload up to and including its End byte.
    pub fn skip_compound(&mut self) -> Result<()> {
        self.skip_compound_at_depth(0)
    }

    fn skip_value_at_depth(&mut self, kind: TagKind, depth: usize) -> Result<()> {
        if let Some(width) = kind.fixed_width() {
            self.take(width)?;
            return Ok(());
        }
        match kind {
            TagKind::String => {
                let len = self.read_u16()? as usize;
                self.take(len)?;
            }
            TagKind::ByteArray | TagKind::IntArray | TagKind::LongArray => {
                let offset = self.pos;
                let count = self.read_len()?;
                let width = kind.array_element_width().unwrap_or(1);
                let len = count.checked_mul(width).ok_or_else(|| {
                    MapError::malformed(offset, format!("array of {} elements overflows", count))
                })?;
                self.take(len)?;
            }
            TagKind::List => self.skip_list_at_depth(depth + 1)?,
            TagKind::Compound => self.skip_compound_at_depth(depth + 1)?,
            _ => unreachable!("fixed-width kinds are handled above"),
        }
        Ok(())
    }

    fn skip_list_at_depth(&mut self, depth: usize) -> Result<()> {
        self.check_depth(depth)?;
        let (element, count) = self.read_list_header()?;
        match element.fixed_width() {
            Some(width) => {
                let offset = self.pos;
                let len = count.checked_mul(width).ok_or_else(|| {
                    MapError::malformed(offset, format!("list of {} elements overflows", count))
                })?;
                self.take(len)?;
            }
            None => {
                for _ in 0..count {
                    self.skip_value_at_depth(element, depth)?;
                }
            }
        }
        Ok(())
    }

    fn skip_compound_at_depth(&mut self, depth: usize) -> Result<()> {
        self.check_depth(depth)?;
        loop {
            let (kind, _) = self.read_tag_header()?;
            if kind == TagKind::End {
                return Ok(());
            }
            self.skip_value_at_depth(kind, depth)?;
        }
    }

    /// Element kind and count of a list. A non-empty list of End is malformed.
    pub fn read_list_header(&mut self) -> Result<(TagKind, usize)> {
        let offset = self.pos;
        let element = self.read_kind()?;
        let count = self.read_len()?;
        if element == TagKind::End && count > 0 {
            return Err(MapError::malformed(
                offset,
                format!("list of {} End elements", count),
            ));
        }
        Ok((element, count))
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(MapError::malformed(
                self.pos,
                format!("nesting deeper than {}", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    /// Reads a full named tag into an owned tree.
    pub fn read_named_tag(&mut self) -> Result<(String, Tag)> {
        let (kind, name) = self.read_tag_header()?;
        let name = name.into_owned();
        if kind == TagKind::End {
            return Ok((name, Tag::End));
        }
        let tag = self.read_payload(kind)?;
        Ok((name, tag))
    }

    pub fn read_payload(&mut self, kind: TagKind) -> Result<Tag> {
        self.read_payload_at_depth(kind, 0)
    }

    fn read_payload_at_depth(&mut self, kind: TagKind, depth: usize) -> Result<Tag> {
        self.check_depth(depth)?;
        let tag = match kind {
            TagKind::End => Tag::End,
            TagKind::Byte => Tag::Byte(self.read_i8()?),
            TagKind::Short => Tag::Short(self.read_i16()?),
            TagKind::Int => Tag::Int(self.read_i32()?),
            TagKind::Long => Tag::Long(self.read_i64()?),
            TagKind::Float => Tag::Float(self.read_f32()?),
            TagKind::Double => Tag::Double(self.read_f64()?),
            TagKind::ByteArray => Tag::ByteArray(self.read_byte_array()?.to_vec()),
            TagKind::String => Tag::String(self.read_string()?.into_owned()),
            TagKind::List => {
                let (element, count) = self.read_list_header()?;
                // Cap the preallocation by what the buffer could possibly hold.
                let mut list = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    list.push(self.read_payload_at_depth(element, depth + 1)?);
                }
                Tag::List(element, list)
            }
            TagKind::Compound => {
                let mut entries = Vec::new();
                loop {
                    let (kind, name) = self.read_tag_header()?;
                    if kind == TagKind::End {
                        break;
                    }
                    let name = name.into_owned();
                    let value = self.read_payload_at_depth(kind, depth + 1)?;
                    entries.push((name, value));
                }
                Tag::Compound(entries)
            }
            TagKind::IntArray => {
                let count = self.read_len()?;
                let bytes = self.take_elements(count, 4)?;
                Tag::IntArray(bytes.chunks_exact(4).map(BigEndian::read_i32).collect())
            }
            TagKind::LongArray => {
                let count = self.read_len()?;
                let bytes = self.take_elements(count, 8)?;
                Tag::LongArray(bytes.chunks_exact(8).map(BigEndian::read_i64).collect())
            }
        };
        Ok(tag)
    }

    fn take_elements(&mut self, count: usize, width: usize) -> Result<&'a [u8]> {
        let offset = self.pos;
        let len = count.checked_mul(width).ok_or_else(|| {
            MapError::malformed(offset, format!("array of {} elements overflows", count))
        })?;
        self.take(len)
    }
}

/// Reads the kind and name of the tag at `offset`, returning the offset of its
/// payload.
pub fn read_tag_header(buf: &[u8], offset: usize) -> Result<(TagKind, String, usize)> {
    let mut reader = NbtReader::at(buf, offset);
    let (kind, name) = reader.read_tag_header()?;
    Ok((kind, name.into_owned(), reader.position()))
}

/// Returns the offset just past a payload of `kind` starting at `offset`.
pub fn skip_value(buf: &[u8], kind: TagKind, offset: usize) -> Result<usize> {
    let mut reader = NbtReader::at(buf, offset);
    reader.skip_value(kind)?;
    Ok(reader.position())
}

pub fn skip_list(buf: &[u8], offset: usize) -> Result<usize> {
    let mut reader = NbtReader::at(buf, offset);
    reader.skip_list()?;
    Ok(reader.position())
}

pub fn skip_compound(buf: &[u8], offset: usize) -> Result<usize> {
    let mut reader = NbtReader::at(buf, offset);
    reader.skip_compound()?;
    Ok(reader.position())
}
