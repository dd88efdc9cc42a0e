//! Streaming zlib and gzip framing around tag buffers.
//!
//! Both directions move data in `CHUNK`-sized pieces, so the working memory of a
//! transform is bounded by the chunk size plus the growing output buffer.

use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::{Compression, Decompress, FlushDecompress, Status};
use mapx_common::{MapError, Result};

/// Bytes moved per streaming step.
pub const CHUNK: usize = 1024;

/// Default level used for map files.
pub const BEST_COMPRESSION: u32 = 9;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Framing {
    Gzip,
    Zlib,
}

impl Framing {
    /// Compression method byte used in region chunk headers.
    pub fn from_region_method(method: u8) -> Option<Framing> {
        match method {
            1 => Some(Framing::Gzip),
            2 => Some(Framing::Zlib),
            _ => None,
        }
    }

    pub fn region_method(self) -> u8 {
        match self {
            Framing::Gzip => 1,
            Framing::Zlib => 2,
        }
    }

    /// Guesses the framing from the first bytes of a compressed stream.
    pub fn detect(bytes: &[u8]) -> Framing {
        if bytes.starts_with(&GZIP_MAGIC) {
            Framing::Gzip
        } else {
            Framing::Zlib
        }
    }
}

/// Zlib-compresses `bytes`.
pub fn compress(bytes: &[u8], level: u32) -> Result<Vec<u8>> {
    compress_framed(bytes, level, Framing::Zlib)
}

pub fn compress_framed(bytes: &[u8], level: u32, framing: Framing) -> Result<Vec<u8>> {
    compress_to(bytes, level, framing, Vec::with_capacity(bytes.len() / 2 + CHUNK))
}

/// Compresses `bytes` into `sink`, finishing the stream, and hands the sink back.
pub fn compress_to<W: Write>(bytes: &[u8], level: u32, framing: Framing, sink: W) -> Result<W> {
    let level = Compression::new(level.min(BEST_COMPRESSION));
    match framing {
        Framing::Zlib => {
            let mut encoder = ZlibEncoder::new(sink, level);
            for piece in bytes.chunks(CHUNK) {
                encoder.write_all(piece)?;
            }
            Ok(encoder.finish()?)
        }
        Framing::Gzip => {
            let mut encoder = GzEncoder::new(sink, level);
            for piece in bytes.chunks(CHUNK) {
                encoder.write_all(piece)?;
            }
            Ok(encoder.finish()?)
        }
    }
}

/// Inflates a complete stream read from `source`.
///
/// A stream that ends before its terminator, or whose data does not decode, is a
/// `CompressionError`. Failures of `source` itself surface as `IoError`.
pub fn decompress<R: Read>(source: R, framing: Framing) -> Result<Vec<u8>> {
    let mut source = TrackedReader::new(source);
    let result = match framing {
        Framing::Zlib => inflate_zlib(&mut source),
        Framing::Gzip => inflate_gzip(&mut source),
    };
    result.map_err(|err| match (source.failure.take(), err) {
        (Some(io_err), _) => MapError::IoError(io_err),
        (None, err) => err,
    })
}

fn inflate_zlib<R: Read>(source: &mut R) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut input = [0u8; CHUNK];
    let mut inflated = Vec::with_capacity(CHUNK * 4);

    loop {
        let read = source.read(&mut input)?;
        if read == 0 {
            return finish_zlib(&mut inflater, inflated);
        }

        let mut consumed = 0;
        while consumed < read {
            inflated.reserve(CHUNK);
            let before_in = inflater.total_in();
            let before_out = inflater.total_out();
            let status = inflater
                .decompress_vec(&input[consumed..read], &mut inflated, FlushDecompress::None)
                .map_err(|e| MapError::CompressionError(format!("corrupt zlib stream: {}", e)))?;
            consumed += (inflater.total_in() - before_in) as usize;

            match status {
                Status::StreamEnd => return Ok(inflated),
                Status::Ok | Status::BufError => {
                    if inflater.total_in() == before_in && inflater.total_out() == before_out {
                        return Err(MapError::CompressionError(
                            "zlib stream made no progress".to_string(),
                        ));
                    }
                }
            }
        }
    }
}

/// Drains output the inflater still holds once the source is exhausted.
fn finish_zlib(inflater: &mut Decompress, mut inflated: Vec<u8>) -> Result<Vec<u8>> {
    loop {
        inflated.reserve(CHUNK);
        let before_out = inflater.total_out();
        let status = inflater
            .decompress_vec(&[], &mut inflated, FlushDecompress::Finish)
            .map_err(|e| MapError::CompressionError(format!("corrupt zlib stream: {}", e)))?;
        if status == Status::StreamEnd {
            return Ok(inflated);
        }
        if inflater.total_out() == before_out {
            return Err(MapError::CompressionError(format!(
                "zlib stream ended after {} bytes without a terminator",
                inflater.total_in()
            )));
        }
    }
}

fn inflate_gzip<R: Read>(source: &mut R) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(source);
    let mut out = [0u8; CHUNK];
    let mut inflated = Vec::with_capacity(CHUNK * 4);

    loop {
        let read = decoder
            .read(&mut out)
            .map_err(|e| MapError::CompressionError(format!("corrupt gzip stream: {}", e)))?;
        if read == 0 {
            break;
        }
        inflated.extend_from_slice(&out[..read]);
    }

    if decoder.header().is_none() {
        return Err(MapError::CompressionError("missing gzip header".to_string()));
    }
    Ok(inflated)
}

/// Remembers the first error raised by the wrapped reader so that decoder
/// failures can be told apart from source failures.
struct TrackedReader<R> {
    inner: R,
    failure: Option<io::Error>,
}

impl<R> TrackedReader<R> {
    fn new(inner: R) -> Self {
        TrackedReader {
            inner,
            failure: None,
        }
    }
}

impl<R: Read> Read for TrackedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.inner.read(buf) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    let copy = io::Error::new(err.kind(), err.to_string());
                    self.failure.get_or_insert(err);
                    return Err(copy);
                }
                Ok(read) => return Ok(read),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn test_zlib_round_trip_spans_many_chunks() {
        let data = sample(CHUNK * 20 + 17);
        let packed = compress(&data, 9).unwrap();
        assert_eq!(Framing::detect(&packed), Framing::Zlib);
        assert_eq!(decompress(&packed[..], Framing::Zlib).unwrap(), data);
    }

    #[test]
    fn test_highly_compressible_zlib_round_trip() {
        for len in [1024, 4096, 16384, 65536] {
            let data = vec![0u8; len];
            let packed = compress(&data, 9).unwrap();
            assert!(packed.len() < CHUNK);
            assert_eq!(decompress(&packed[..], Framing::Zlib).unwrap(), data, "{} zero bytes", len);
        }
        let plane = vec![34u8; 16384];
        assert_eq!(decompress(&compress(&plane, 6).unwrap()[..], Framing::Zlib).unwrap(), plane);
    }

    #[test]
    fn test_highly_compressible_gzip_round_trip() {
        let data = vec![0u8; 16384];
        let packed = compress_framed(&data, 9, Framing::Gzip).unwrap();
        assert_eq!(decompress(&packed[..], Framing::Gzip).unwrap(), data);
    }

    #[test]
    fn test_gzip_round_trip() {
        let data = sample(5000);
        let packed = compress_framed(&data, 6, Framing::Gzip).unwrap();
        assert_eq!(Framing::detect(&packed), Framing::Gzip);
        assert_eq!(decompress(&packed[..], Framing::Gzip).unwrap(), data);
    }

    #[test]
    fn test_empty_payload_round_trip() {
        let packed = compress(&[], 9).unwrap();
        assert_eq!(decompress(&packed[..], Framing::Zlib).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_truncated_zlib_stream_is_an_error() {
        let packed = compress(&sample(4096), 9).unwrap();
        let err = decompress(&packed[..packed.len() - 6], Framing::Zlib).unwrap_err();
        assert_matches!(err, MapError::CompressionError(_));
    }

    #[test]
    fn test_wrong_framing_is_an_error() {
        let packed = compress(&sample(100), 9).unwrap();
        assert_matches!(
            decompress(&packed[..], Framing::Gzip),
            Err(MapError::CompressionError(_))
        );
        assert_matches!(
            decompress(&b"definitely not zlib"[..], Framing::Zlib),
            Err(MapError::CompressionError(_))
        );
    }

    #[test]
    fn test_source_failure_is_io_error() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            }
        }
        assert_matches!(decompress(Failing, Framing::Zlib), Err(MapError::IoError(_)));
        assert_matches!(decompress(Failing, Framing::Gzip), Err(MapError::IoError(_)));
    }

    #[test]
    fn test_region_method_bytes() {
        assert_eq!(Framing::from_region_method(1), Some(Framing::Gzip));
        assert_eq!(Framing::from_region_method(2), Some(Framing::Zlib));
        assert_eq!(Framing::from_region_method(3), None);
        assert_eq!(Framing::Zlib.region_method(), 2);
    }
}
