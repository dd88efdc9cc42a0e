pub mod compression;
pub mod file;
pub mod kind;
pub mod reader;
pub mod writer;

use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

use mapx_common::Result;

pub use compression::{compress, compress_framed, compress_to, decompress, Framing};
pub use file::NbtFile;
pub use kind::TagKind;
pub use reader::{read_tag_header, skip_compound, skip_list, skip_value, NbtReader};
pub use writer::write_tag;

/// In-memory tag tree. Compounds keep their entries in insertion order so that
/// serialized output is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<u8>),
    String(String),
    List(TagKind, Vec<Tag>),
    Compound(Vec<(String, Tag)>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn kind(&self) -> TagKind {
        match self {
            Tag::End => TagKind::End,
            Tag::Byte(_) => TagKind::Byte,
            Tag::Short(_) => TagKind::Short,
            Tag::Int(_) => TagKind::Int,
            Tag::Long(_) => TagKind::Long,
            Tag::Float(_) => TagKind::Float,
            Tag::Double(_) => TagKind::Double,
            Tag::ByteArray(_) => TagKind::ByteArray,
            Tag::String(_) => TagKind::String,
            Tag::List(..) => TagKind::List,
            Tag::Compound(_) => TagKind::Compound,
            Tag::IntArray(_) => TagKind::IntArray,
            Tag::LongArray(_) => TagKind::LongArray,
        }
    }

    pub fn get_type_id(&self) -> u8 {
        self.kind().id()
    }

    /// Parses one named tag from the start of `buf`.
    pub fn read(buf: &[u8]) -> Result<(String, Tag)> {
        NbtReader::new(buf).read_named_tag()
    }

    pub fn write<W: Write>(&self, writer: &mut W, name: &str) -> io::Result<()> {
        writer.write_u8(self.get_type_id())?;

        if !matches!(self, Tag::End) {
            write_string(writer, name)?;
        }

        self.write_payload(writer)
    }

    /// Number of bytes `write` produces for this tag under `name`.
    pub fn encoded_len(&self, name: &str) -> usize {
        match self {
            Tag::End => 1,
            _ => 1 + 2 + name.len() + self.payload_len(),
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) | Tag::Float(_) => 4,
            Tag::Long(_) | Tag::Double(_) => 8,
            Tag::ByteArray(v) => 4 + v.len(),
            Tag::String(v) => 2 + v.len(),
            Tag::List(_, v) => 1 + 4 + v.iter().map(Tag::payload_len).sum::<usize>(),
            Tag::Compound(v) => {
                v.iter().map(|(name, tag)| tag.encoded_len(name)).sum::<usize>() + 1
            }
            Tag::IntArray(v) => 4 + v.len() * 4,
            Tag::LongArray(v) => 4 + v.len() * 8,
        }
    }

    fn write_payload<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => writer.write_i8(*v),
            Tag::Short(v) => writer.write_i16::<BigEndian>(*v),
            Tag::Int(v) => writer.write_i32::<BigEndian>(*v),
            Tag::Long(v) => writer.write_i64::<BigEndian>(*v),
            Tag::Float(v) => writer.write_f32::<BigEndian>(*v),
            Tag::Double(v) => writer.write_f64::<BigEndian>(*v),
            Tag::ByteArray(v) => {
                write_len(writer, v.len())?;
                writer.write_all(v)
            }
            Tag::String(v) => write_string(writer, v),
            Tag::List(element, v) => {
                if let Some(bad) = v.iter().find(|tag| tag.kind() != *element) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{} element in a list of {}", bad.kind(), element),
                    ));
                }
                if *element == TagKind::End && !v.is_empty() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "non-empty list of TAG_End",
                    ));
                }
                writer.write_u8(element.id())?;
                write_len(writer, v.len())?;
                for tag in v {
                    tag.write_payload(writer)?;
                }
                Ok(())
            }
            Tag::Compound(v) => {
                for (name, tag) in v {
                    if matches!(tag, Tag::End) {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidInput,
                            format!("TAG_End stored under name {:?}", name),
                        ));
                    }
                    tag.write(writer, name)?;
                }
                Tag::End.write(writer, "")
            }
            Tag::IntArray(v) => {
                write_len(writer, v.len())?;
                for &i in v {
                    writer.write_i32::<BigEndian>(i)?;
                }
                Ok(())
            }
            Tag::LongArray(v) => {
                write_len(writer, v.len())?;
                for &l in v {
                    writer.write_i64::<BigEndian>(l)?;
                }
                Ok(())
            }
        }
    }

    /// Looks up an entry of a compound by name.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.as_compound()?
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, tag)| tag)
    }

    pub fn as_compound(&self) -> Option<&[(String, Tag)]> {
        match self {
            Tag::Compound(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Tag]> {
        match self {
            Tag::List(_, list) => Some(list),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[u8]> {
        match self {
            Tag::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Tag::Short(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Tag::Byte(n) => Some(*n),
            _ => None,
        }
    }
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("string of {} bytes exceeds the 16-bit length prefix", value.len()),
        )
    })?;
    writer.write_u16::<BigEndian>(len)?;
    writer.write_all(value.as_bytes())
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> io::Result<()> {
    let len = i32::try_from(len).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("length {} exceeds i32", len))
    })?;
    writer.write_i32::<BigEndian>(len)
}
