//! Random-access and trimming operations over a packed savestream.
//!
//! Because the running dictionary and `prev_info` are stream-wide state,
//! decoding savestate `i` requires walking frames `0..=i` cumulatively —
//! there is no snapshot-per-frame shortcut. `decode_all` exposes this as
//! a single-pass iterator so callers never need to materialize the whole
//! decoded sequence at once.
//!
//! Block/super-block sizing is a format constant, not carried in the
//! stream, so every decode-side operation here assumes
//! `Config::default()`; only `encode` accepts a caller-supplied
//! `Config`.

use serde_json::{Map, Value};

use crate::config::Config;
use crate::dict::BlockDictionary;
use crate::error::{Result, SavestreamError};
use crate::frame::{self, Frame};
use crate::stream;

fn empty_info() -> Value {
    Value::Object(Map::new())
}

/// Encode a sequence of savestates into a packed savestream.
pub fn encode(savestates: &[impl AsRef<[u8]>], config: Config) -> Result<Vec<u8>> {
    config.validate()?;
    let mut dict = BlockDictionary::new(config);
    let mut prev_info = empty_info();
    let frames = savestates
        .iter()
        .map(|savestate| frame::assemble_frame(savestate.as_ref(), config, &mut dict, &mut prev_info))
        .collect::<Result<Vec<Frame>>>()?;
    Ok(stream::pack_frames(&frames))
}

/// Number of savestates contained in a packed savestream, without
/// reconstructing any of their buffers.
pub fn decode_len(packed_stream: &[u8]) -> Result<usize> {
    Ok(stream::unpack_frames(packed_stream)?.len())
}

/// Decode all frames `0..=index` cumulatively and return only the
/// savestate at `index`. Assumes `Config::default()`, matching
/// `encode`'s default: block/super-block sizing is a format constant,
/// not carried in the stream, so decode-side operations never need a
/// caller-supplied `Config`.
pub fn decode_one(packed_stream: &[u8], index: i64) -> Result<Vec<u8>> {
    let config = Config::default();
    let frames = stream::unpack_frames(packed_stream)?;
    if index < 0 || index as usize >= frames.len() {
        return Err(SavestreamError::IndexOutOfRange {
            index,
            len: frames.len(),
        });
    }

    let mut dict = BlockDictionary::new(config);
    let mut prev_info = empty_info();
    let mut result = None;
    for (i, f) in frames.iter().enumerate().take(index as usize + 1) {
        let savestate = frame::disassemble_frame(f, config, &mut dict, &mut prev_info)?;
        if i == index as usize {
            result = Some(savestate);
        }
    }
    Ok(result.expect("loop covers index by the bounds check above"))
}

/// A single-pass, finite iterator yielding decoded savestates in order.
pub struct DecodeIter {
    frames: std::vec::IntoIter<Frame>,
    config: Config,
    dict: BlockDictionary,
    prev_info: Value,
}

impl Iterator for DecodeIter {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.frames.next()?;
        Some(frame::disassemble_frame(
            &frame,
            self.config,
            &mut self.dict,
            &mut self.prev_info,
        ))
    }
}

/// Decode an entire savestream, yielding each savestate as soon as its
/// frame is processed. Assumes `Config::default()`, for the same reason
/// as [`decode_one`].
pub fn decode_all(packed_stream: &[u8]) -> Result<DecodeIter> {
    let config = Config::default();
    let frames = stream::unpack_frames(packed_stream)?;
    Ok(DecodeIter {
        frames: frames.into_iter(),
        config,
        dict: BlockDictionary::new(config),
        prev_info: empty_info(),
    })
}

/// Materialize savestates `[start, end]` (inclusive; `end: None` means to
/// the last) and re-encode them as a new, independent stream. Assumes
/// `Config::default()`, for the same reason as [`decode_one`].
///
/// This necessarily resets the dictionary: the returned stream's first
/// frame carries the full contents of the original `start` savestate and
/// has an empty `prev_info`, since no earlier frame's dictionary state is
/// carried forward.
pub fn trim(packed_stream: &[u8], start: i64, end: Option<i64>) -> Result<Vec<u8>> {
    let len = decode_len(packed_stream)?;
    let resolved_end = end.unwrap_or(len as i64 - 1);

    if start < 0 || resolved_end < start || resolved_end >= len as i64 || len == 0 {
        return Err(SavestreamError::InvalidRange { start, end });
    }

    let mut selected = Vec::with_capacity((resolved_end - start + 1) as usize);
    for (i, savestate) in decode_all(packed_stream)?.enumerate() {
        let savestate = savestate?;
        let i = i as i64;
        if i > resolved_end {
            break;
        }
        if i >= start {
            selected.push(savestate);
        }
    }

    encode(&selected, Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mock_savestate(state_id: i32, buffer: &[u8]) -> Vec<u8> {
        let info = serde_json::to_vec(&json!({
            "buffer_infos": [{"offset": 0, "length": buffer.len()}],
            "state_id": state_id,
        }))
        .unwrap();
        let header = crate::savestate::make_header(info.len() as i32);
        crate::savestate::recombine(header, &info, buffer)
    }

    #[test]
    fn empty_input_yields_zero_frames() {
        let stream = encode::<Vec<u8>>(&[], Config::default()).unwrap();
        assert_eq!(decode_len(&stream).unwrap(), 0);
        assert!(decode_all(&stream).unwrap().next().is_none());
    }

    #[test]
    fn round_trip_many_savestates() {
        let states: Vec<Vec<u8>> = (0..5).map(|i| mock_savestate(i, b"hello world!")).collect();
        let stream = encode(&states, Config::default()).unwrap();
        assert_eq!(decode_len(&stream).unwrap(), states.len());

        let decoded: Vec<Vec<u8>> = decode_all(&stream)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(decoded, states);

        for (i, expected) in states.iter().enumerate() {
            let one = decode_one(&stream, i as i64).unwrap();
            assert_eq!(&one, expected);
        }
    }

    #[test]
    fn decode_one_out_of_range() {
        let states = vec![mock_savestate(0, b"x")];
        let stream = encode(&states, Config::default()).unwrap();
        assert!(matches!(
            decode_one(&stream, -1),
            Err(SavestreamError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            decode_one(&stream, 1),
            Err(SavestreamError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn trim_middle_selects_inclusive_range() {
        let states: Vec<Vec<u8>> = (0..3).map(|i| mock_savestate(i, b"distinct!!!!")).collect();
        let stream = encode(&states, Config::default()).unwrap();
        let trimmed = trim(&stream, 1, Some(1)).unwrap();
        let decoded: Vec<Vec<u8>> = decode_all(&trimmed)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(decoded, vec![states[1].clone()]);
    }

    #[test]
    fn trim_without_end_goes_to_last() {
        let states: Vec<Vec<u8>> = (0..4).map(|i| mock_savestate(i, b"abcd")).collect();
        let stream = encode(&states, Config::default()).unwrap();
        let trimmed = trim(&stream, 2, None).unwrap();
        let decoded: Vec<Vec<u8>> = decode_all(&trimmed)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(decoded, states[2..].to_vec());
    }

    #[test]
    fn trim_rejects_invalid_ranges() {
        let states = vec![mock_savestate(0, b"x"), mock_savestate(1, b"y")];
        let stream = encode(&states, Config::default()).unwrap();
        assert!(trim(&stream, -1, None).is_err());
        assert!(trim(&stream, 1, Some(0)).is_err());
        assert!(trim(&stream, 5, None).is_err());
    }

    #[test]
    fn trim_on_empty_stream_is_invalid_range() {
        let stream = encode::<Vec<u8>>(&[], Config::default()).unwrap();
        assert!(trim(&stream, 0, None).is_err());
    }
}
