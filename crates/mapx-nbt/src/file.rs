use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use mapx_common::{MapError, Result};

use crate::compression::{self, Framing};
use crate::Tag;

/// A complete tag file: one named root tag, usually a compound.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtFile {
    pub name: String,
    pub root: Tag,
}

impl NbtFile {
    pub fn new(name: impl Into<String>, root: Tag) -> Self {
        NbtFile {
            name: name.into(),
            root,
        }
    }

    /// Parses an uncompressed tag buffer. Trailing bytes after the root are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (name, root) = Tag::read(bytes)?;
        Ok(NbtFile { name, root })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(self.root.encoded_len(&self.name));
        self.root
            .write(&mut buffer, &self.name)
            .map_err(|e| MapError::malformed(0, e.to_string()))?;
        Ok(buffer)
    }

    pub fn read_compressed<R: Read>(reader: R, framing: Framing) -> Result<Self> {
        let bytes = compression::decompress(reader, framing)?;
        Self::from_bytes(&bytes)
    }

    pub fn write_compressed<W: Write>(&self, writer: W, framing: Framing, level: u32) -> Result<W> {
        let bytes = self.to_bytes()?;
        compression::compress_to(&bytes, level, framing, writer)
    }

    /// Loads a compressed file, detecting gzip or zlib framing from its header.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut bytes = Vec::new();
        BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
        Self::read_compressed(&bytes[..], Framing::detect(&bytes))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, framing: Framing, level: u32) -> Result<()> {
        let writer = self.write_compressed(BufWriter::new(File::create(path)?), framing, level)?;
        writer.into_inner().map_err(|e| e.into_error())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TagKind;

    fn sample() -> NbtFile {
        NbtFile::new(
            "test",
            Tag::Compound(vec![
                ("name".to_string(), Tag::String("Test".to_string())),
                ("value".to_string(), Tag::Int(42)),
                (
                    "list".to_string(),
                    Tag::List(TagKind::Double, vec![Tag::Double(0.5)]),
                ),
            ]),
        )
    }

    #[test]
    fn test_nbt_file_plain_round_trip() {
        let expected = sample();
        let bytes = expected.to_bytes().unwrap();
        assert_eq!(NbtFile::from_bytes(&bytes).unwrap(), expected);
    }

    #[test]
    fn test_nbt_file_compressed_round_trip() {
        let expected = sample();
        for framing in [Framing::Gzip, Framing::Zlib] {
            let packed = expected.write_compressed(Vec::new(), framing, 6).unwrap();
            let read = NbtFile::read_compressed(&packed[..], framing).unwrap();
            assert_eq!(read, expected);
        }
    }

    #[test]
    fn test_nbt_file_on_disk() {
        let path = std::env::temp_dir().join(format!("mapx-nbt-file-{}.dat", std::process::id()));
        let expected = sample();
        expected.save(&path, Framing::Gzip, 9).unwrap();
        let loaded = NbtFile::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, expected);
    }
}
