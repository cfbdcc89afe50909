//! Per-savestate frame assembly and disassembly.
//!
//! A [`Frame`] carries the retained header, the info patch against the
//! previous frame's info, the super-block id sequence covering the
//! padded aligned buffer, and whatever blocks/super-blocks this frame
//! introduces to the running dictionary. Encoding and decoding a frame
//! both thread a [`BlockDictionary`] and a `prev_info` value across
//! calls, since neither is self-contained per frame.

use serde_json::Value;

use crate::align;
use crate::config::Config;
use crate::dict::BlockDictionary;
use crate::diff::{self, InfoPatch};
use crate::error::{Result, SavestreamError};
use crate::savestate::{self, BufferInfo, Header};

/// A single savestate's encoded record within a savestream.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header_block: Header,
    pub info_patch: Vec<u8>,
    pub super_sequence: Vec<u64>,
    pub new_blocks: Vec<(u64, Vec<u8>)>,
    pub new_super_blocks: Vec<(u64, Vec<u64>)>,
}

fn pad_to_multiple(buffer: &mut Vec<u8>, multiple: usize) {
    if multiple == 0 {
        return;
    }
    let remainder = buffer.len() % multiple;
    if remainder != 0 {
        buffer.resize(buffer.len() + (multiple - remainder), 0);
    }
}

/// Split, align and chunk `savestate_bytes`, interning each super-block
/// into `dict` and diffing its info against `prev_info`. Advances
/// `prev_info` to the savestate's info on return.
pub fn assemble_frame(
    savestate_bytes: &[u8],
    config: Config,
    dict: &mut BlockDictionary,
    prev_info: &mut Value,
) -> Result<Frame> {
    let (header, info_bytes, buffer) = savestate::split(savestate_bytes)?;
    let info_value = savestate::parse_info(&info_bytes)?;
    let buffer_infos = savestate::buffer_infos(&info_value)?;

    let mut aligned = align::align(&buffer_infos, buffer, config.block_size)?;
    pad_to_multiple(&mut aligned, config.super_block_size as usize);

    let mut super_sequence = Vec::new();
    let mut new_blocks = Vec::new();
    let mut new_super_blocks = Vec::new();
    for chunk in aligned.chunks(config.super_block_size as usize) {
        let result = dict.intern_super(chunk);
        super_sequence.push(result.id);
        new_blocks.extend(result.new_blocks);
        if let Some(entry) = result.new_super_block {
            new_super_blocks.push(entry);
        }
    }

    let patch = diff::diff(prev_info, &info_value);
    *prev_info = info_value;

    Ok(Frame {
        header_block: header,
        info_patch: patch.to_bytes(),
        super_sequence,
        new_blocks,
        new_super_blocks,
    })
}

/// Reverse [`assemble_frame`]: merge the frame's newly declared
/// dictionary entries, reconstruct the padded aligned buffer, apply the
/// info patch against `prev_info`, and recombine into a savestate.
/// Advances `prev_info` to the frame's info on return.
pub fn disassemble_frame(
    frame: &Frame,
    config: Config,
    dict: &mut BlockDictionary,
    prev_info: &mut Value,
) -> Result<Vec<u8>> {
    dict.merge_blocks(frame.new_blocks.iter().cloned());
    dict.merge_super_blocks(frame.new_super_blocks.iter().cloned());

    let mut aligned =
        Vec::with_capacity(frame.super_sequence.len() * config.super_block_size as usize);
    for &sid in &frame.super_sequence {
        let expanded = dict.expand_super(sid).ok_or_else(|| {
            SavestreamError::MalformedStream {
                reason: "undefined super_block id",
                detail: format!("super_sequence references id {sid} with no prior definition"),
            }
        })?;
        aligned.extend_from_slice(&expanded);
    }

    let patch = InfoPatch::from_bytes(&frame.info_patch)?;
    let current_info = diff::apply(&patch, prev_info)?;
    *prev_info = current_info.clone();

    let info_bytes =
        serde_json::to_vec(&current_info).map_err(|e| SavestreamError::MalformedStream {
            reason: "info did not re-serialize",
            detail: e.to_string(),
        })?;
    let buffer_infos: Vec<BufferInfo> = savestate::buffer_infos(&current_info)?;
    let buffer = align::unalign(&buffer_infos, &aligned, config.block_size)?;

    let header = savestate::with_info_len(frame.header_block, info_bytes.len() as i32);
    Ok(savestate::recombine(header, &info_bytes, &buffer))
}
