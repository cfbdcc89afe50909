//! Expands a packed buffer into an alignment-padded concatenation of
//! sub-buffers (per `buffer_infos`), and reverses that transform.

use crate::error::{Result, SavestreamError};
use crate::savestate::BufferInfo;

fn malformed(reason: &'static str, detail: impl Into<String>) -> SavestreamError {
    SavestreamError::MalformedSavestate {
        reason,
        detail: detail.into(),
    }
}

fn pad_len(length: u64, block_size: u32) -> u64 {
    let block_size = block_size as u64;
    (block_size - (length % block_size)) % block_size
}

/// Expand `buffer` into the alignment-padded concatenation of its
/// sub-buffers, each padded with NULs to a multiple of `block_size`.
///
/// The result depends only on sub-buffer contents and lengths, not on
/// their offsets (the tiling invariant guarantees offsets are implied by
/// prior lengths, but this function trusts the caller's `buffer_infos`
/// rather than recomputing offsets itself).
pub fn align(buffer_infos: &[BufferInfo], buffer: &[u8], block_size: u32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for info in buffer_infos {
        let start = info.offset as usize;
        let end = start
            .checked_add(info.length as usize)
            .ok_or_else(|| malformed("sub-buffer overflow", format!("{info:?}")))?;
        let slice = buffer.get(start..end).ok_or_else(|| {
            malformed(
                "buffer shorter than tiling requires",
                format!("need [{start}..{end}), have {} bytes", buffer.len()),
            )
        })?;
        out.extend_from_slice(slice);
        out.resize(out.len() + pad_len(info.length, block_size) as usize, 0);
    }
    Ok(out)
}

/// Reverse [`align`]: walk `buffer_infos` in order, pulling `length` bytes
/// from the aligned cursor and advancing it by `length` rounded up to
/// `block_size`. Any trailing super-block padding in `aligned` beyond what
/// the tiling requires is naturally ignored.
pub fn unalign(buffer_infos: &[BufferInfo], aligned: &[u8], block_size: u32) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut cursor: usize = 0;
    for info in buffer_infos {
        let length = info.length as usize;
        let end = cursor
            .checked_add(length)
            .ok_or_else(|| malformed("sub-buffer overflow", format!("{info:?}")))?;
        let slice = aligned.get(cursor..end).ok_or_else(|| {
            malformed(
                "aligned buffer shorter than tiling requires",
                format!("need [{cursor}..{end}), have {} bytes", aligned.len()),
            )
        })?;
        out.extend_from_slice(slice);
        cursor += length + pad_len(info.length, block_size) as usize;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infos(pairs: &[(u64, u64)]) -> Vec<BufferInfo> {
        pairs
            .iter()
            .map(|&(offset, length)| BufferInfo { offset, length })
            .collect()
    }

    #[test]
    fn round_trip_with_padding() {
        let buffer_infos = infos(&[(0, 5), (5, 3)]);
        let buffer = b"ABCDEFGH".to_vec(); // 5 bytes + 3 bytes
        let aligned = align(&buffer_infos, &buffer, 4).unwrap();
        // "ABCDE" padded to 8, "FGH" padded to 4 -> 12 bytes total
        assert_eq!(aligned.len(), 12);
        let unaligned = unalign(&buffer_infos, &aligned, 4).unwrap();
        assert_eq!(unaligned, buffer);
    }

    #[test]
    fn zero_length_sub_buffer_contributes_nothing() {
        let buffer_infos = infos(&[(0, 0), (0, 4)]);
        let buffer = b"WXYZ".to_vec();
        let aligned = align(&buffer_infos, &buffer, 4).unwrap();
        assert_eq!(aligned, b"WXYZ");
        let unaligned = unalign(&buffer_infos, &aligned, 4).unwrap();
        assert_eq!(unaligned, buffer);
    }

    #[test]
    fn exact_multiple_length_has_no_padding() {
        let buffer_infos = infos(&[(0, 8)]);
        let buffer = b"ABCDEFGH".to_vec();
        let aligned = align(&buffer_infos, &buffer, 4).unwrap();
        assert_eq!(aligned, buffer);
    }

    #[test]
    fn unalign_ignores_trailing_super_block_padding() {
        let buffer_infos = infos(&[(0, 4)]);
        let mut aligned = b"ABCD".to_vec();
        aligned.extend(std::iter::repeat(0u8).take(60)); // simulate super-block padding
        let unaligned = unalign(&buffer_infos, &aligned, 4).unwrap();
        assert_eq!(unaligned, b"ABCD");
    }

    #[test]
    fn short_buffer_is_malformed() {
        let buffer_infos = infos(&[(0, 10)]);
        let buffer = b"short".to_vec();
        assert!(align(&buffer_infos, &buffer, 4).is_err());
    }
}
