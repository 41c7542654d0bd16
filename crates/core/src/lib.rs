//! Stateful ROHC (RFC 3095) compressor/decompressor context engines built
//! on top of the stateless wire primitives in `rohc-codec`.
//!
//! `rohc-core` owns everything that remembers something between packets:
//! per-flow contexts, their IR/FO/SO and NC/SC/FC state machines, profile
//! dispatch, and statistics/tracing. The public endpoint types
//! ([`compressor::Compressor`], [`decompressor::Decompressor`]) are
//! re-exported one layer up, in the `rohc` crate.

pub mod compressor;
pub mod config;
pub mod decompressor;
pub mod error;
pub mod profile;
pub mod scaled_ts;
pub mod stats;
pub mod table;
pub mod trace;
mod wire;

pub use error::{Error, Status};
