//! Packs an ordered list of [`Frame`]s into a single self-describing
//! binary document, and unpacks it back.
//!
//! MessagePack is the wire format: it is the one format in this crate's
//! lineage that natively distinguishes binary from text and supports
//! non-string (unsigned integer) map keys, which `new_blocks` and
//! `new_super_blocks` require. This mirrors
//! `examples/original_source/v86_savestreams/__init__.py`, which packs
//! the same frame shape with Python's `msgpack` library.

use rmpv::Value as Msg;

use crate::error::{Result, SavestreamError};
use crate::frame::Frame;
use crate::savestate::HEADER_LEN;

fn malformed(detail: impl Into<String>) -> SavestreamError {
    SavestreamError::MalformedStream {
        reason: "container unparseable",
        detail: detail.into(),
    }
}

fn frame_to_msg(frame: &Frame) -> Msg {
    let new_blocks = Msg::Map(
        frame
            .new_blocks
            .iter()
            .map(|(id, block)| (Msg::Integer((*id).into()), Msg::Binary(block.clone())))
            .collect(),
    );
    let new_super_blocks = Msg::Map(
        frame
            .new_super_blocks
            .iter()
            .map(|(id, block_ids)| {
                let ids = Msg::Array(
                    block_ids
                        .iter()
                        .map(|bid| Msg::Integer((*bid).into()))
                        .collect(),
                );
                (Msg::Integer((*id).into()), ids)
            })
            .collect(),
    );
    let super_sequence = Msg::Array(
        frame
            .super_sequence
            .iter()
            .map(|sid| Msg::Integer((*sid).into()))
            .collect(),
    );

    Msg::Map(vec![
        (
            Msg::String("header_block".into()),
            Msg::Binary(frame.header_block.to_vec()),
        ),
        (
            Msg::String("info_patch".into()),
            Msg::Binary(frame.info_patch.clone()),
        ),
        (Msg::String("super_sequence".into()), super_sequence),
        (Msg::String("new_blocks".into()), new_blocks),
        (Msg::String("new_super_blocks".into()), new_super_blocks),
    ])
}

fn map_get<'a>(map: &'a [(Msg, Msg)], key: &str) -> Result<&'a Msg> {
    map.iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
        .ok_or_else(|| malformed(format!("frame missing field {key:?}")))
}

fn as_binary(value: &Msg, field: &str) -> Result<Vec<u8>> {
    value
        .as_slice()
        .map(<[u8]>::to_vec)
        .ok_or_else(|| malformed(format!("field {field:?} is not binary")))
}

fn as_u64(value: &Msg, field: &str) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| malformed(format!("field {field:?} is not an unsigned integer")))
}

fn msg_to_frame(msg: &Msg) -> Result<Frame> {
    let map = msg
        .as_map()
        .ok_or_else(|| malformed("frame is not a map"))?;

    let header_bytes = as_binary(map_get(map, "header_block")?, "header_block")?;
    if header_bytes.len() != HEADER_LEN {
        return Err(malformed(format!(
            "header_block has length {}, expected {HEADER_LEN}",
            header_bytes.len()
        )));
    }
    let mut header_block = [0u8; HEADER_LEN];
    header_block.copy_from_slice(&header_bytes);

    let info_patch = as_binary(map_get(map, "info_patch")?, "info_patch")?;

    let super_sequence = map_get(map, "super_sequence")?
        .as_array()
        .ok_or_else(|| malformed("super_sequence is not an array"))?
        .iter()
        .map(|v| as_u64(v, "super_sequence[]"))
        .collect::<Result<Vec<_>>>()?;

    let new_blocks = map_get(map, "new_blocks")?
        .as_map()
        .ok_or_else(|| malformed("new_blocks is not a map"))?
        .iter()
        .map(|(k, v)| Ok((as_u64(k, "new_blocks key")?, as_binary(v, "new_blocks value")?)))
        .collect::<Result<Vec<_>>>()?;

    let new_super_blocks = map_get(map, "new_super_blocks")?
        .as_map()
        .ok_or_else(|| malformed("new_super_blocks is not a map"))?
        .iter()
        .map(|(k, v)| {
            let id = as_u64(k, "new_super_blocks key")?;
            let block_ids = v
                .as_array()
                .ok_or_else(|| malformed("new_super_blocks value is not an array"))?
                .iter()
                .map(|bid| as_u64(bid, "new_super_blocks value[]"))
                .collect::<Result<Vec<_>>>()?;
            Ok((id, block_ids))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Frame {
        header_block,
        info_patch,
        super_sequence,
        new_blocks,
        new_super_blocks,
    })
}

/// Serialize an ordered list of frames as a single MessagePack document:
/// a top-level array of frame maps.
pub fn pack_frames(frames: &[Frame]) -> Vec<u8> {
    let doc = Msg::Array(frames.iter().map(frame_to_msg).collect());
    let mut out = Vec::new();
    rmpv::encode::write_value(&mut out, &doc).expect("writing to a Vec cannot fail");
    out
}

/// Parse a packed savestream into its ordered list of frames, without
/// reconstructing any savestate contents.
pub fn unpack_frames(stream: &[u8]) -> Result<Vec<Frame>> {
    let mut cursor = stream;
    let doc = rmpv::decode::read_value(&mut cursor).map_err(|e| malformed(e.to_string()))?;
    let frames = doc
        .as_array()
        .ok_or_else(|| malformed("top-level document is not an array"))?;
    frames.iter().map(msg_to_frame).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Frame {
        Frame {
            header_block: [7u8; HEADER_LEN],
            info_patch: b"[]".to_vec(),
            super_sequence: vec![0, 1, 1],
            new_blocks: vec![(1, vec![1, 2, 3, 4])],
            new_super_blocks: vec![(1, vec![0, 1])],
        }
    }

    #[test]
    fn pack_unpack_round_trip() {
        let frames = vec![sample_frame(), sample_frame()];
        let packed = pack_frames(&frames);
        let unpacked = unpack_frames(&packed).unwrap();
        assert_eq!(unpacked.len(), 2);
        assert_eq!(unpacked[0].header_block, frames[0].header_block);
        assert_eq!(unpacked[0].super_sequence, frames[0].super_sequence);
        assert_eq!(unpacked[0].new_blocks, frames[0].new_blocks);
        assert_eq!(unpacked[0].new_super_blocks, frames[0].new_super_blocks);
    }

    #[test]
    fn empty_stream_packs_as_empty_array() {
        let packed = pack_frames(&[]);
        let unpacked = unpack_frames(&packed).unwrap();
        assert!(unpacked.is_empty());
    }

    #[test]
    fn malformed_container_is_rejected() {
        assert!(unpack_frames(b"not msgpack \xff\xff").is_err());
    }

    #[test]
    fn missing_field_is_malformed_stream() {
        let doc = Msg::Array(vec![Msg::Map(vec![(
            Msg::String("header_block".into()),
            Msg::Binary(vec![0u8; HEADER_LEN]),
        )])]);
        let mut bytes = Vec::new();
        rmpv::encode::write_value(&mut bytes, &doc).unwrap();
        assert!(matches!(
            unpack_frames(&bytes),
            Err(SavestreamError::MalformedStream { .. })
        ));
    }
}
