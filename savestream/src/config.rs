use crate::error::{Result, SavestreamError};

/// Block and super-block sizing used to chunk an aligned buffer for
/// dictionary lookups.
///
/// These are format-level constants (see module docs on [`crate::dict`]):
/// a decoder must use the same sizes an encoder used, since neither is
/// carried in the stream itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub block_size: u32,
    pub super_block_size: u32,
}

impl Config {
    pub const DEFAULT_BLOCK_SIZE: u32 = 256;
    pub const DEFAULT_SUPER_BLOCK_SIZE: u32 = 256 * Self::DEFAULT_BLOCK_SIZE;

    pub fn validate(&self) -> Result<()> {
        let bad = self.block_size == 0
            || self.super_block_size == 0
            || self.super_block_size % self.block_size != 0;
        if bad {
            return Err(SavestreamError::InvalidConfig {
                block_size: self.block_size,
                super_block_size: self.super_block_size,
            });
        }
        Ok(())
    }

    /// Number of blocks per super-block (`S / B`).
    pub fn blocks_per_super(&self) -> u32 {
        self.super_block_size / self.block_size
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            block_size: Self::DEFAULT_BLOCK_SIZE,
            super_block_size: Self::DEFAULT_SUPER_BLOCK_SIZE,
        }
    }
}
