use thiserror::Error;

#[derive(Error, Debug)]
pub enum SavestreamError {
    #[error("malformed savestate ({reason}): {detail}")]
    MalformedSavestate {
        reason: &'static str,
        detail: String,
    },

    #[error("malformed savestream ({reason}): {detail}")]
    MalformedStream {
        reason: &'static str,
        detail: String,
    },

    #[error("index {index} out of range for stream with {len} savestates")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("invalid trim range start={start}, end={end:?}")]
    InvalidRange { start: i64, end: Option<i64> },

    #[error(
        "invalid config: block_size={block_size}, super_block_size={super_block_size}"
    )]
    InvalidConfig {
        block_size: u32,
        super_block_size: u32,
    },
}

pub type Result<T> = std::result::Result<T, SavestreamError>;
