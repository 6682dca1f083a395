//! Compact binary codec for the order aggregate.
//!
//! The layout is little-endian and self-describing: strings carry a u32
//! length prefix, floats are stored as their raw IEEE-754 bit pattern (so
//! monetary values round-trip bit-exactly), and each nested value object is
//! encoded standalone and embedded behind its own u32 length prefix. This is
//! the format cached order values are stored in.

pub mod order;

mod bytes;

pub use order::{decode_order, encode_order};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated input: needed {needed} more bytes while reading {context}")]
    Truncated {
        context: &'static str,
        needed: usize,
    },

    #[error("invalid utf-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    #[error("trailing bytes after {context}: {remaining} left over")]
    TrailingBytes {
        context: &'static str,
        remaining: usize,
    },
}
