use std::io::{self, Cursor};

use mapx_common::{MapError, Result};

use crate::Tag;

/// Writes `value` as a named tag into the fixed buffer `buf` at `offset` and
/// returns the offset just past it.
///
/// The buffer never grows: a tag that does not fit fails with `MalformedData`
/// and the bytes from `offset` onward are left in an unspecified state.
pub fn write_tag(buf: &mut [u8], name: &str, value: &Tag, offset: usize) -> Result<usize> {
    if offset > buf.len() {
        return Err(MapError::malformed(
            offset,
            format!("offset past the end of a {} byte buffer", buf.len()),
        ));
    }

    let mut cursor = Cursor::new(buf);
    cursor.set_position(offset as u64);
    match value.write(&mut cursor, name) {
        Ok(()) => Ok(cursor.position() as usize),
        Err(err) => Err(match err.kind() {
            io::ErrorKind::WriteZero => MapError::malformed(
                offset,
                format!("{:?} needs {} bytes, buffer is full", name, value.encoded_len(name)),
            ),
            io::ErrorKind::InvalidInput => MapError::malformed(offset, err.to_string()),
            _ => MapError::IoError(err),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{read_tag_header, skip_value};
    use crate::TagKind;
    use assert_matches::assert_matches;

    #[test]
    fn test_sequential_writes_advance_offset() {
        let mut buf = [0u8; 32];
        let next = write_tag(&mut buf, "a", &Tag::Byte(5), 0).unwrap();
        assert_eq!(next, 1 + 2 + 1 + 1);
        let next = write_tag(&mut buf, "bb", &Tag::Int(-1), next).unwrap();
        assert_eq!(next, 5 + 1 + 2 + 2 + 4);

        let (kind, name, payload) = read_tag_header(&buf, 5).unwrap();
        assert_eq!((kind, name.as_str()), (TagKind::Int, "bb"));
        assert_eq!(skip_value(&buf, kind, payload).unwrap(), next);
    }

    #[test]
    fn test_overflow_is_reported_not_written_past_end() {
        let mut buf = [0u8; 8];
        let err = write_tag(&mut buf, "long", &Tag::Long(1), 0).unwrap_err();
        assert_matches!(err, MapError::MalformedData { offset: 0, .. });

        let err = write_tag(&mut buf, "x", &Tag::Byte(1), 9).unwrap_err();
        assert_matches!(err, MapError::MalformedData { offset: 9, .. });
    }

    #[test]
    fn test_invalid_list_is_malformed() {
        let mut buf = [0u8; 64];
        let bad = Tag::List(TagKind::Byte, vec![Tag::Short(1)]);
        assert_matches!(
            write_tag(&mut buf, "l", &bad, 0),
            Err(MapError::MalformedData { .. })
        );
    }
}
