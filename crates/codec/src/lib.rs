//! Wire-format primitives for Robust Header Compression (RFC 3095).
//!
//! This crate is stateless: every function here operates on bytes and
//! explicit parameters, never on a remembered compressor or decompressor
//! context. The stateful engines live in `rohc-core`, one layer up.

pub mod cid;
pub mod crc;
pub mod feedback;
pub mod ip;
pub mod packet;
pub mod sdvl;
pub mod wlsb;

/// Errors produced while encoding or decoding ROHC wire primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A W-LSB window has not yet seen any reference value.
    EmptyWindow,
    /// No `k` up to the field width decodes every window entry unambiguously.
    LsbOutOfRange,
    /// An SDVL value does not fit in the requested (or any) octet count.
    SdvlDoesNotFit,
    /// The `1111xxxx` SDVL first-octet pattern is reserved.
    SdvlReserved,
    /// A buffer ended before a multi-octet field could be read in full.
    Truncated,
    /// A parameter was out of the range its caller is required to respect.
    InvalidInput,
    /// The leading octet did not match any known ROHC packet-type prefix.
    UnknownPacketType,
    /// A feedback option carried an unrecognized type octet.
    UnknownFeedbackOption,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}
