//! Error taxonomy and decompressor status, RFC 3095 as profiled by the
//! endpoint-level contracts.

use std::fmt;

/// Failure kinds surfaced by a [`crate::compressor::Compressor`] or
/// [`crate::decompressor::Decompressor`]. Mirrors the taxonomy of kinds
/// (not concrete types) used throughout the endpoint contracts: malformed
/// input, missing context, CRC failure, non-compressibility, capacity, and
/// caller programming errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The uncompressed packet is not a valid IP packet, or the ROHC
    /// packet had an unknown prefix, a truncated option, a reserved SDVL
    /// code, or an LSB decode failure.
    Malformed(String),
    /// The decompressor received a non-IR packet for an unknown CID.
    NoContext,
    /// The packet parsed but its CRC does not match the reconstruction.
    CrcFailure,
    /// No enabled profile's `check_applicability` accepted the packet.
    NotCompressible,
    /// Output buffer too small, feedback queue full, or context table
    /// pressured beyond `max_cid`.
    Capacity(&'static str),
    /// Null/out-of-range/invalid argument at the API boundary.
    ProgrammingError(&'static str),
}

impl From<codec::Error> for Error {
    fn from(value: codec::Error) -> Self {
        Error::Malformed(value.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

/// Outcome of [`crate::decompressor::Decompressor::decompress`]. A status
/// rather than a plain `Result` because `NoContext`/`MalformedPacket` are
/// routine and carry no payload, while `Ok` carries the reconstructed
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok(Vec<u8>),
    OutputTooSmall,
    NoContext,
    MalformedPacket,
    Error(Error),
}
