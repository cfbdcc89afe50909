//! Content-addressed dictionary codec for sequences of v86 virtual
//! machine savestates.
//!
//! A savestate is a raw byte blob: a fixed header, a JSON info document
//! describing sub-buffer tiling, and a flat buffer. Encoding a
//! temporally-ordered sequence of savestates produces a single packed
//! stream in which repeated buffer content and repeated info structure
//! across savestates are stored once. Decoding any prefix of the stream
//! reproduces the original savestates bit-for-bit.
//!
//! ```
//! use savestream::{encode, decode, Config};
//!
//! # fn sample(n: u8) -> Vec<u8> {
//! #     let info = format!(r#"{{"buffer_infos":[{{"offset":0,"length":1}}],"n":{n}}}"#);
//! #     let mut header = [0u8; 16];
//! #     header[12..16].copy_from_slice(&(info.len() as i32).to_le_bytes());
//! #     let mut out = header.to_vec();
//! #     out.extend_from_slice(info.as_bytes());
//! #     while out.len() % 4 != 0 { out.push(0); }
//! #     out.push(n);
//! #     out
//! # }
//! let savestates = vec![sample(1), sample(2), sample(3)];
//! let packed = encode(&savestates, Config::default()).unwrap();
//! let decoded: Vec<_> = decode(&packed)
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(decoded, savestates);
//! ```
//!
//! Non-goals: this crate has no opinion on where savestates come from or
//! go to. There is no file I/O, no CLI, no argument parsing — callers own
//! that. Encoding does not support unbounded streaming input (the full
//! sequence is encoded in one call), compression is lossless only, and
//! there is no concurrent encode/decode of a single stream or migration
//! between dictionary configurations.

pub mod align;
pub mod config;
pub mod dict;
pub mod diff;
pub mod error;
pub mod frame;
pub mod ops;
pub mod savestate;
pub mod stream;

pub use config::Config;
pub use error::{Result, SavestreamError};
pub use ops::{decode_len, decode_one, encode, trim, DecodeIter};

/// Decode an entire savestream, lazily. Re-exported under this name
/// (rather than `ops`'s internal `decode_all`) as the crate's public
/// entry point for whole-stream decoding.
pub use ops::decode_all as decode;
