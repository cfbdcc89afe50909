//! Splits a raw v86 savestate into its three regions and recombines them.
//!
//! Layout (little-endian throughout): a 16-byte header whose last four
//! bytes are a signed 32-bit info length `L`, followed by `L` bytes of
//! UTF-8 JSON, zero to three NUL pad bytes bringing the next region to a
//! 4-byte boundary, then the raw buffer region.

use serde_json::Value;

use crate::error::{Result, SavestreamError};

pub const HEADER_LEN: usize = 16;

pub type Header = [u8; HEADER_LEN];

fn malformed(reason: &'static str, detail: impl Into<String>) -> SavestreamError {
    SavestreamError::MalformedSavestate {
        reason,
        detail: detail.into(),
    }
}

/// Round `n` up to the next multiple of 4.
fn align4(n: usize) -> usize {
    (n + 3) & !3
}

/// Read the info length (bytes `[12..16)`, little-endian signed i32) from a header.
fn info_len(header: &Header) -> Result<usize> {
    let raw = i32::from_le_bytes([header[12], header[13], header[14], header[15]]);
    if raw < 0 {
        return Err(malformed(
            "negative info length",
            format!("header encodes L={raw}"),
        ));
    }
    Ok(raw as usize)
}

/// Split a savestate into `(header, info bytes, buffer)`.
///
/// `info` is returned without its trailing NUL padding. Fails with
/// [`SavestreamError::MalformedSavestate`] if the savestate is too short,
/// `L` is negative or overruns the input, or the info region is not
/// valid UTF-8 JSON with a well-formed `buffer_infos` array.
pub fn split(savestate: &[u8]) -> Result<(Header, Vec<u8>, &[u8])> {
    if savestate.len() < HEADER_LEN {
        return Err(malformed(
            "header too short",
            format!("got {} bytes, need at least {HEADER_LEN}", savestate.len()),
        ));
    }

    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&savestate[..HEADER_LEN]);

    let len = info_len(&header)?;
    if HEADER_LEN + len > savestate.len() {
        return Err(malformed(
            "info length overruns savestate",
            format!("16 + {len} > {}", savestate.len()),
        ));
    }

    let info = &savestate[HEADER_LEN..HEADER_LEN + len];
    parse_info(info)?;

    let buffer_start = align4(HEADER_LEN + len);
    let buffer = savestate.get(buffer_start..).unwrap_or(&[]);

    Ok((header, info.to_vec(), buffer))
}

/// Recombine `(header, info, buffer)` into a complete savestate.
///
/// `info` is padded with NULs up to a multiple of 4 bytes before being
/// concatenated with `buffer`. The header is written back verbatim; the
/// caller is responsible for the header's `L` field matching `info.len()`.
pub fn recombine(header: Header, info: &[u8], buffer: &[u8]) -> Vec<u8> {
    let padded_len = align4(info.len());
    let mut out = Vec::with_capacity(HEADER_LEN + padded_len + buffer.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(info);
    out.resize(HEADER_LEN + padded_len, 0);
    out.extend_from_slice(buffer);
    out
}

/// A single sub-buffer descriptor from `buffer_infos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub offset: u64,
    pub length: u64,
}

/// Extract and validate the `buffer_infos` array from parsed info JSON.
pub fn buffer_infos(info: &Value) -> Result<Vec<BufferInfo>> {
    let entries = info
        .get("buffer_infos")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing buffer_infos", "expected a JSON array"))?;

    entries
        .iter()
        .map(|entry| {
            let offset = entry
                .get("offset")
                .and_then(Value::as_u64)
                .ok_or_else(|| malformed("malformed buffer_infos entry", format!("{entry}")))?;
            let length = entry
                .get("length")
                .and_then(Value::as_u64)
                .ok_or_else(|| malformed("malformed buffer_infos entry", format!("{entry}")))?;
            Ok(BufferInfo { offset, length })
        })
        .collect()
}

/// Parse info bytes into a JSON value, validating `buffer_infos`.
pub fn parse_info(info: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(info)
        .map_err(|e| malformed("info is not valid UTF-8", e.to_string()))?;
    let value: Value = serde_json::from_str(text)
        .map_err(|e| malformed("info is not valid JSON", e.to_string()))?;
    buffer_infos(&value)?;
    Ok(value)
}

/// Build a 16-byte header with `L` set to `info_len`, all other bytes zero.
/// Exposed for tests and callers constructing synthetic savestates.
pub fn make_header(info_len: i32) -> Header {
    let mut header = [0u8; HEADER_LEN];
    header[12..16].copy_from_slice(&info_len.to_le_bytes());
    header
}

/// Return `header` with bytes `[12..16)` rewritten to `info_len`, leaving
/// the opaque bytes `[0..12)` untouched.
///
/// Used on decode: the info JSON is re-serialized after a patch is
/// applied, and its byte length need not match the `L` the original
/// encoder observed (key order or whitespace can differ). Rather than
/// require byte-identical re-serialization, this crate rewrites `L` at
/// the point it reconstructs the savestate.
pub fn with_info_len(mut header: Header, info_len: i32) -> Header {
    header[12..16].copy_from_slice(&info_len.to_le_bytes());
    header
}
