//! The running, stream-wide content-addressed dictionary: fixed-size
//! blocks, and fixed-size super-blocks composed of block sequences.
//!
//! Both `blocks` and `super_blocks` start with a reserved all-zero entry
//! at id 0. Ids are assigned densely in first-seen order; a given byte
//! content is interned at exactly one id for the lifetime of the
//! encode/decode pass that owns this dictionary.

use std::collections::HashMap;

use crate::config::Config;

/// A block newly allocated by an [`BlockDictionary::intern_super`] call.
pub type NewBlock = (u64, Vec<u8>);

/// Result of interning one super-block's worth of bytes.
#[derive(Debug, Clone)]
pub struct InternResult {
    pub id: u64,
    pub new_blocks: Vec<NewBlock>,
    pub new_super_block: Option<(u64, Vec<u64>)>,
}

pub struct BlockDictionary {
    block_size: usize,
    blocks_by_content: HashMap<Vec<u8>, u64>,
    blocks_by_id: Vec<Vec<u8>>,
    super_blocks_by_content: HashMap<Vec<u8>, u64>,
    super_blocks_by_id: Vec<Vec<u64>>,
}

impl BlockDictionary {
    pub fn new(config: Config) -> Self {
        let block_size = config.block_size as usize;
        let blocks_per_super = config.blocks_per_super() as usize;

        BlockDictionary {
            block_size,
            blocks_by_content: HashMap::from([(vec![0u8; block_size], 0)]),
            blocks_by_id: vec![vec![0u8; block_size]],
            super_blocks_by_content: HashMap::from([(vec![0u8; block_size * blocks_per_super], 0)]),
            super_blocks_by_id: vec![vec![0u64; blocks_per_super]],
        }
    }

    pub fn block(&self, id: u64) -> Option<&[u8]> {
        self.blocks_by_id.get(id as usize).map(Vec::as_slice)
    }

    pub fn super_block(&self, id: u64) -> Option<&[u64]> {
        self.super_blocks_by_id.get(id as usize).map(Vec::as_slice)
    }

    fn intern_block(&mut self, block: &[u8]) -> (u64, Option<NewBlock>) {
        if let Some(&id) = self.blocks_by_content.get(block) {
            return (id, None);
        }
        let id = self.blocks_by_id.len() as u64;
        self.blocks_by_id.push(block.to_vec());
        self.blocks_by_content.insert(block.to_vec(), id);
        (id, Some((id, block.to_vec())))
    }

    /// Intern a super-block's raw bytes: if already known, return its id
    /// with no newly allocated entries. Otherwise allocate a fresh
    /// super-block id, decompose the bytes into fixed-size blocks,
    /// interning any not already known, and record the block-id sequence
    /// as a new super-block entry.
    pub fn intern_super(&mut self, sb: &[u8]) -> InternResult {
        if let Some(&id) = self.super_blocks_by_content.get(sb) {
            return InternResult {
                id,
                new_blocks: Vec::new(),
                new_super_block: None,
            };
        }

        let sid = self.super_blocks_by_id.len() as u64;
        let mut block_ids = Vec::with_capacity(sb.len() / self.block_size);
        let mut new_blocks = Vec::new();
        for chunk in sb.chunks(self.block_size) {
            let (bid, maybe_new) = self.intern_block(chunk);
            block_ids.push(bid);
            if let Some(new_block) = maybe_new {
                new_blocks.push(new_block);
            }
        }

        self.super_blocks_by_id.push(block_ids.clone());
        self.super_blocks_by_content.insert(sb.to_vec(), sid);

        InternResult {
            id: sid,
            new_blocks,
            new_super_block: Some((sid, block_ids)),
        }
    }

    /// Merge externally-declared blocks (decode-side: a frame's
    /// `new_blocks`) into the dictionary without re-deriving ids.
    pub fn merge_blocks(&mut self, entries: impl IntoIterator<Item = (u64, Vec<u8>)>) {
        for (id, block) in entries {
            let idx = id as usize;
            if idx >= self.blocks_by_id.len() {
                self.blocks_by_id.resize(idx + 1, Vec::new());
            }
            self.blocks_by_id[idx] = block.clone();
            self.blocks_by_content.insert(block, id);
        }
    }

    /// Merge externally-declared super-blocks (decode-side: a frame's
    /// `new_super_blocks`) into the dictionary.
    pub fn merge_super_blocks(&mut self, entries: impl IntoIterator<Item = (u64, Vec<u64>)>) {
        for (id, block_ids) in entries {
            let idx = id as usize;
            if idx >= self.super_blocks_by_id.len() {
                self.super_blocks_by_id.resize(idx + 1, Vec::new());
            }
            self.super_blocks_by_id[idx] = block_ids;
        }
    }

    /// Reconstruct a super-block's raw bytes by concatenating its blocks.
    pub fn expand_super(&self, sid: u64) -> Option<Vec<u8>> {
        let block_ids = self.super_block(sid)?;
        let mut out = Vec::with_capacity(block_ids.len() * self.block_size);
        for &bid in block_ids {
            out.extend_from_slice(self.block(bid)?);
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_zero_entries() {
        let dict = BlockDictionary::new(Config {
            block_size: 4,
            super_block_size: 16,
        });
        assert_eq!(dict.block(0), Some([0u8; 4].as_slice()));
        assert_eq!(dict.super_block(0), Some([0u64; 4].as_slice()));
    }

    #[test]
    fn repeated_content_reuses_id() {
        let mut dict = BlockDictionary::new(Config {
            block_size: 4,
            super_block_size: 8,
        });
        let sb = b"ABCDEFGH";
        let first = dict.intern_super(sb);
        let second = dict.intern_super(sb);
        assert_eq!(first.id, second.id);
        assert!(second.new_blocks.is_empty());
        assert!(second.new_super_block.is_none());
    }

    #[test]
    fn zero_super_block_is_reused_without_allocation() {
        let mut dict = BlockDictionary::new(Config {
            block_size: 4,
            super_block_size: 8,
        });
        let zero_sb = vec![0u8; 8];
        let result = dict.intern_super(&zero_sb);
        assert_eq!(result.id, 0);
        assert!(result.new_blocks.is_empty());
        assert!(result.new_super_block.is_none());
    }

    #[test]
    fn new_content_allocates_densely() {
        let mut dict = BlockDictionary::new(Config {
            block_size: 4,
            super_block_size: 8,
        });
        let first = dict.intern_super(b"AAAABBBB");
        assert_eq!(first.id, 1);
        assert_eq!(first.new_blocks.len(), 2);
        assert_eq!(first.new_blocks[0].0, 1);
        assert_eq!(first.new_blocks[1].0, 2);

        let second = dict.intern_super(b"AAAACCCC");
        assert_eq!(second.id, 2);
        // "AAAA" block (id 1) is reused; only "CCCC" is new.
        assert_eq!(second.new_blocks.len(), 1);
        assert_eq!(second.new_blocks[0].0, 3);
    }

    #[test]
    fn expand_super_round_trips() {
        let mut dict = BlockDictionary::new(Config {
            block_size: 4,
            super_block_size: 8,
        });
        let sb = b"AAAABBBB";
        let result = dict.intern_super(sb);
        assert_eq!(dict.expand_super(result.id).unwrap(), sb);
    }

    #[test]
    fn decode_side_merge_reconstructs_without_reinterning() {
        let cfg = Config {
            block_size: 4,
            super_block_size: 8,
        };
        let mut encoder = BlockDictionary::new(cfg);
        let encoded = encoder.intern_super(b"AAAABBBB");

        let mut decoder = BlockDictionary::new(cfg);
        decoder.merge_blocks(encoded.new_blocks.clone());
        decoder.merge_super_blocks(encoded.new_super_block.clone());
        assert_eq!(decoder.expand_super(encoded.id).unwrap(), b"AAAABBBB");
    }
}
