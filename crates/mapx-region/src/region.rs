//! The region container: a 32x32 group of chunks behind an 8 KiB header of
//! sector locations and timestamps.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use mapx_common::{MapError, Result};
use mapx_nbt::{compress_framed, decompress, Framing, NbtFile};

/// Chunks along one side of a region.
pub const REGION_WIDTH: usize = 32;
/// Chunks in a region.
pub const REGION_CHUNKS: usize = REGION_WIDTH * REGION_WIDTH;
pub const SECTOR_BYTES: usize = 4096;
/// Location table followed by the timestamp table.
pub const HEADER_BYTES: usize = 2 * SECTOR_BYTES;

const HEADER_SECTORS: u32 = (HEADER_BYTES / SECTOR_BYTES) as u32;
const MAX_CHUNK_SECTORS: usize = u8::MAX as usize;

/// `r.<x>.<z>.mca` inside `dir`.
pub fn region_path<P: AsRef<Path>>(dir: P, region_x: i32, region_z: i32) -> PathBuf {
    dir.as_ref().join(format!("r.{}.{}.mca", region_x, region_z))
}

/// Header slot of a chunk.
pub fn slot(local_x: usize, local_z: usize) -> usize {
    local_x + local_z * REGION_WIDTH
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkLocation {
    /// First sector of the chunk, counted from the start of the file.
    pub sector_offset: u32,
    pub sector_count: u8,
    pub timestamp: u32,
}

impl ChunkLocation {
    fn from_words(location: u32, timestamp: u32) -> Self {
        ChunkLocation {
            sector_offset: location >> 8,
            sector_count: (location & 0xFF) as u8,
            timestamp,
        }
    }

    fn location_word(&self) -> u32 {
        (self.sector_offset << 8) | self.sector_count as u32
    }

    /// An all-zero entry marks a chunk that was never generated.
    pub fn is_present(&self) -> bool {
        self.sector_offset != 0
    }

    fn byte_offset(&self) -> u64 {
        self.sector_offset as u64 * SECTOR_BYTES as u64
    }
}

/// Read access to one region.
#[derive(Debug)]
pub struct RegionFile<S> {
    source: S,
    locations: Vec<ChunkLocation>,
}

impl RegionFile<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_stream(BufReader::new(File::open(path)?))
    }
}

impl<S: Read + Seek> RegionFile<S> {
    pub fn from_stream(mut source: S) -> Result<Self> {
        let mut header = vec![0u8; HEADER_BYTES];
        source.seek(SeekFrom::Start(0))?;
        source.read_exact(&mut header).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                MapError::malformed(0, format!("region header shorter than {} bytes", HEADER_BYTES))
            }
            _ => MapError::IoError(err),
        })?;

        let (location_words, timestamp_words) = header.split_at(SECTOR_BYTES);
        let locations = location_words
            .chunks_exact(4)
            .zip(timestamp_words.chunks_exact(4))
            .map(|(location, timestamp)| {
                ChunkLocation::from_words(BigEndian::read_u32(location), BigEndian::read_u32(timestamp))
            })
            .collect();

        Ok(RegionFile { source, locations })
    }

    pub fn location(&self, local_x: usize, local_z: usize) -> ChunkLocation {
        self.locations[slot(local_x, local_z)]
    }

    /// Number of chunks present in the header.
    pub fn chunk_count(&self) -> usize {
        self.locations.iter().filter(|l| l.is_present()).count()
    }

    /// Reads and inflates the tag bytes of one chunk, or `None` if the chunk
    /// was never generated.
    pub fn read_chunk(&mut self, local_x: usize, local_z: usize) -> Result<Option<Vec<u8>>> {
        let location = self.location(local_x, local_z);
        if !location.is_present() {
            return Ok(None);
        }

        let start = location.byte_offset();
        self.source.seek(SeekFrom::Start(start))?;
        let length = self.source.read_u32::<BigEndian>().map_err(|err| truncated(err, start))? as usize;
        let capacity = location.sector_count as usize * SECTOR_BYTES;
        if length == 0 || length + 4 > capacity {
            return Err(MapError::malformed(
                start as usize,
                format!("chunk length {} does not fit in {} sectors", length, location.sector_count),
            ));
        }

        let method = self.source.read_u8().map_err(|err| truncated(err, start + 4))?;
        let framing = Framing::from_region_method(method).ok_or_else(|| {
            MapError::CompressionError(format!("unsupported chunk compression method {}", method))
        })?;

        let payload = (&mut self.source).take(length as u64 - 1);
        decompress(payload, framing).map(Some)
    }
}

fn truncated(err: io::Error, offset: u64) -> MapError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => MapError::malformed(offset as usize, "chunk header past end of file"),
        _ => MapError::IoError(err),
    }
}

/// Builds a region file in memory, one compressed chunk per slot.
#[derive(Debug)]
pub struct RegionWriter {
    framing: Framing,
    level: u32,
    chunks: Vec<Option<(u8, Vec<u8>, u32)>>,
}

impl Default for RegionWriter {
    fn default() -> Self {
        RegionWriter::new(Framing::Zlib, 6)
    }
}

impl RegionWriter {
    pub fn new(framing: Framing, level: u32) -> Self {
        RegionWriter {
            framing,
            level,
            chunks: vec![None; REGION_CHUNKS],
        }
    }

    pub fn insert_chunk(&mut self, local_x: usize, local_z: usize, chunk: &NbtFile, timestamp: u32) -> Result<()> {
        let payload = compress_framed(&chunk.to_bytes()?, self.level, self.framing)?;
        self.insert_raw(local_x, local_z, self.framing.region_method(), payload, timestamp)
    }

    /// Stores an already-compressed payload under an explicit method byte.
    pub fn insert_raw(
        &mut self,
        local_x: usize,
        local_z: usize,
        method: u8,
        payload: Vec<u8>,
        timestamp: u32,
    ) -> Result<()> {
        if local_x >= REGION_WIDTH || local_z >= REGION_WIDTH {
            return Err(MapError::InvalidDimensions {
                expected: format!("local chunk coordinates below {}", REGION_WIDTH),
                actual: format!("({}, {})", local_x, local_z),
            });
        }
        if sectors_for(payload.len()) > MAX_CHUNK_SECTORS {
            return Err(MapError::InvalidDimensions {
                expected: format!("at most {} sectors per chunk", MAX_CHUNK_SECTORS),
                actual: format!("{} sectors", sectors_for(payload.len())),
            });
        }
        self.chunks[slot(local_x, local_z)] = Some((method, payload, timestamp));
        Ok(())
    }

    /// Writes the header and sector-aligned chunk data in slot order.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<W> {
        let mut locations = vec![ChunkLocation::default(); REGION_CHUNKS];
        let mut next_sector = HEADER_SECTORS;
        for (location, chunk) in locations.iter_mut().zip(&self.chunks) {
            if let Some((_, payload, timestamp)) = chunk {
                let sectors = sectors_for(payload.len()) as u8;
                *location = ChunkLocation {
                    sector_offset: next_sector,
                    sector_count: sectors,
                    timestamp: *timestamp,
                };
                next_sector += sectors as u32;
            }
        }

        for location in &locations {
            writer.write_u32::<BigEndian>(location.location_word())?;
        }
        for location in &locations {
            writer.write_u32::<BigEndian>(location.timestamp)?;
        }

        for (location, chunk) in locations.iter().zip(&self.chunks) {
            if let Some((method, payload, _)) = chunk {
                writer.write_u32::<BigEndian>(payload.len() as u32 + 1)?;
                writer.write_u8(*method)?;
                writer.write_all(payload)?;
                let padding = location.sector_count as usize * SECTOR_BYTES - payload.len() - 5;
                writer.write_all(&vec![0u8; padding])?;
            }
        }
        Ok(writer)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = self.write_to(BufWriter::new(File::create(path)?))?;
        writer.into_inner().map_err(|e| e.into_error())?;
        Ok(())
    }
}

/// Sectors needed for a payload plus its length and method prefix.
fn sectors_for(payload_len: usize) -> usize {
    (payload_len + 5 + SECTOR_BYTES - 1) / SECTOR_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::tests::{chunk_tag, section};
    use crate::chunk::read_sections;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    fn region_with(chunks: &[(usize, usize)]) -> Vec<u8> {
        let mut writer = RegionWriter::default();
        for &(x, z) in chunks {
            let chunk = chunk_tag(&[section(0, move |_, y, _| if y == 0 { (x + z) as u8 + 1 } else { 0 })]);
            writer.insert_chunk(x, z, &chunk, 1234).unwrap();
        }
        writer.write_to(Vec::new()).unwrap()
    }

    #[test]
    fn test_written_region_is_sector_aligned() {
        let bytes = region_with(&[(0, 0), (31, 31)]);
        assert_eq!(bytes.len() % SECTOR_BYTES, 0);
        assert!(bytes.len() >= HEADER_BYTES + 2 * SECTOR_BYTES);
    }

    #[test]
    fn test_header_locations_and_timestamps() {
        let bytes = region_with(&[(1, 0), (0, 2)]);
        let region = RegionFile::from_stream(Cursor::new(bytes)).unwrap();
        assert_eq!(region.chunk_count(), 2);

        let first = region.location(1, 0);
        assert_eq!(first.sector_offset, 2);
        assert_eq!(first.timestamp, 1234);
        assert!(region.location(0, 2).sector_offset > first.sector_offset);
        assert!(!region.location(5, 5).is_present());
    }

    #[test]
    fn test_read_chunk_round_trip() {
        let bytes = region_with(&[(3, 4)]);
        let mut region = RegionFile::from_stream(Cursor::new(bytes)).unwrap();
        assert_eq!(region.read_chunk(0, 0).unwrap(), None);

        let payload = region.read_chunk(3, 4).unwrap().unwrap();
        let sections = read_sections(&payload).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].block(0, 0, 0), 8);
    }

    #[test]
    fn test_uniform_zlib_chunk_is_readable() {
        // several sections of a single block compress to a few hundred bytes
        let sections: Vec<_> = (0..4).rev().map(|y| section(y, |_, _, _| 1)).collect();
        let mut writer = RegionWriter::new(Framing::Zlib, 9);
        writer.insert_chunk(0, 0, &chunk_tag(&sections), 0).unwrap();
        let mut region = RegionFile::from_stream(Cursor::new(writer.write_to(Vec::new()).unwrap())).unwrap();

        let payload = region.read_chunk(0, 0).unwrap().unwrap();
        assert_eq!(read_sections(&payload).unwrap(), sections);
    }

    #[test]
    fn test_gzip_chunks_are_readable() {
        let mut writer = RegionWriter::new(Framing::Gzip, 9);
        writer
            .insert_chunk(0, 0, &chunk_tag(&[section(0, |_, _, _| 1)]), 0)
            .unwrap();
        let mut region = RegionFile::from_stream(Cursor::new(writer.write_to(Vec::new()).unwrap())).unwrap();
        assert!(region.read_chunk(0, 0).unwrap().is_some());
    }

    #[test]
    fn test_unknown_method_is_compression_error() {
        let mut writer = RegionWriter::default();
        writer.insert_raw(0, 0, 7, vec![1, 2, 3], 0).unwrap();
        let mut region = RegionFile::from_stream(Cursor::new(writer.write_to(Vec::new()).unwrap())).unwrap();
        assert_matches!(region.read_chunk(0, 0), Err(MapError::CompressionError(_)));
    }

    #[test]
    fn test_corrupt_payload_is_compression_error() {
        let mut writer = RegionWriter::default();
        writer.insert_raw(2, 0, 2, b"not a zlib stream".to_vec(), 0).unwrap();
        let mut region = RegionFile::from_stream(Cursor::new(writer.write_to(Vec::new()).unwrap())).unwrap();
        assert_matches!(region.read_chunk(2, 0), Err(MapError::CompressionError(_)));
    }

    #[test]
    fn test_short_header_is_malformed() {
        assert_matches!(
            RegionFile::from_stream(Cursor::new(vec![0u8; 100])),
            Err(MapError::MalformedData { offset: 0, .. })
        );
    }

    #[test]
    fn test_location_past_end_of_file_is_malformed() {
        let mut bytes = vec![0u8; HEADER_BYTES];
        BigEndian::write_u32(&mut bytes[0..4], (9 << 8) | 1);
        let mut region = RegionFile::from_stream(Cursor::new(bytes)).unwrap();
        assert_matches!(region.read_chunk(0, 0), Err(MapError::MalformedData { .. }));
    }

    #[test]
    fn test_out_of_range_slot_is_rejected() {
        let mut writer = RegionWriter::default();
        assert_matches!(
            writer.insert_raw(32, 0, 2, vec![], 0),
            Err(MapError::InvalidDimensions { .. })
        );
    }

    #[test]
    fn test_region_path_naming() {
        let path = region_path("world/region", -1, 2);
        assert!(path.ends_with("r.-1.2.mca"));
    }
}
