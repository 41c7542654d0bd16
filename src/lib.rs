//! Robust Header Compression (RFC 3095): public `Compressor` / `Decompressor`
//! endpoint API.
//!
//! This crate is a thin facade over `engine` (package `rohc-core`)'s stateful
//! engines and `codec` (package `rohc-codec`)'s wire primitives, the way the
//! teacher's root package composes its `codec` and `service` crates around
//! one user-facing surface. Nothing here carries state of its own beyond the
//! feedback queue described below; everything else is delegated straight to
//! `engine`.

pub use codec;
pub use engine as core;

pub use codec::cid::CidSpace;
pub use codec::feedback::Mode;
pub use engine::compressor::{CompState, PacketInfo};
pub use engine::config::{Features, RateLimit};
pub use engine::decompressor::DecompState;
pub use engine::error::{Error, Status};
pub use engine::profile::ProfileId;
pub use engine::stats::Stats;
pub use engine::trace::{Entity, TraceEvent, TraceHandler, TraceLevel};

use engine::compressor::Compressor as Engine;
use engine::config::{CompressorConfig, DecompressorConfig};
use engine::decompressor::Decompressor as DecompEngine;

/// Outgoing feedback a local decompressor wants forwarded to the remote
/// compressor is queued here by [`Compressor::queue_feedback`] and drained by
/// [`Compressor::flush_feedback`]; capped so a caller that never flushes
/// fails loudly (`Error::Capacity`) instead of growing the queue without
/// bound, per the "feedback queue full" member of the capacity taxonomy
/// (spec.md §7).
const MAX_QUEUED_FEEDBACK: usize = 16 * codec::feedback::MAX_FEEDBACK_LEN;

/// Compresses outgoing IP packets into ROHC, one context per flow.
pub struct Compressor {
    engine: Engine,
    feedback_out: Vec<u8>,
}

impl Compressor {
    /// `features` is validated against the known flag set (spec.md §6:
    /// "unknown flags fail the call") but otherwise unused here: both known
    /// flags, `COMPAT_1_6_X` and `CRC_REPAIR`, only change decompressor
    /// behavior. Kept for constructor-signature parity with the
    /// decompressor and so a caller configuring both endpoints from the
    /// same bitset doesn't need a special case.
    pub fn new(cid_type: CidSpace, max_cid: u16, mode: Mode, features: u32) -> Result<Self, Error> {
        let features = Features::from_bits(features)
            .ok_or(Error::ProgrammingError("unknown compressor feature bits"))?;
        let mut cfg = CompressorConfig::new(cid_type, max_cid, mode);
        cfg.features = features;
        Ok(Self {
            engine: Engine::new(cfg),
            feedback_out: Vec::new(),
        })
    }

    pub fn enable_profile(&mut self, id: ProfileId) {
        self.engine.enable_profile(id);
    }

    pub fn set_rtp_ports(&mut self, ports: Vec<u16>) {
        self.engine.set_rtp_ports(ports);
    }

    pub fn set_wlsb_width(&mut self, width: usize) {
        self.engine.set_wlsb_width(width);
    }

    pub fn set_periodic_refreshes(&mut self, ir_refresh: u32, fo_refresh: u32) {
        self.engine.set_periodic_refreshes(ir_refresh, fo_refresh);
    }

    pub fn set_mrru(&mut self, mrru: u16) {
        self.engine.set_mrru(mrru);
    }

    pub fn set_trace_cb(&mut self, handler: Box<dyn TraceHandler>) {
        self.engine.set_trace_cb(handler);
    }

    /// Compresses one uncompressed IP packet, returning the CID-prefixed
    /// ROHC bytes and a description of the packet type emitted.
    pub fn compress(&mut self, input: &[u8]) -> Result<(Vec<u8>, PacketInfo), Error> {
        self.engine.compress(input)
    }

    /// Decodes feedback received (out-of-band) from the remote decompressor
    /// and applies it to the matching context immediately.
    pub fn piggyback_feedback(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.engine.piggyback_feedback(bytes)
    }

    /// Queues feedback bytes (e.g. produced by a co-located
    /// [`Decompressor::decompress`] call on the return path of a bidirectional
    /// link) for the caller to forward to the remote compressor on its next
    /// send opportunity.
    pub fn queue_feedback(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.feedback_out.len() + bytes.len() > MAX_QUEUED_FEEDBACK {
            return Err(Error::Capacity("feedback queue full"));
        }
        self.feedback_out.extend_from_slice(bytes);
        Ok(())
    }

    /// Drains the queued feedback built by [`Self::queue_feedback`] into
    /// `buf`, returning how many bytes were appended.
    pub fn flush_feedback(&mut self, buf: &mut Vec<u8>) -> usize {
        let n = self.feedback_out.len();
        buf.extend_from_slice(&self.feedback_out);
        self.feedback_out.clear();
        n
    }

    /// Returns the context currently allocated for `cid`, if any (for
    /// inspection and tests; not part of the wire protocol).
    pub fn context(&mut self, cid: u16) -> Option<&engine::compressor::CompressorContext> {
        self.engine.context(cid)
    }
}

/// Decompresses incoming ROHC packets back into the original IP packets,
/// one context per CID.
pub struct Decompressor {
    engine: DecompEngine,
}

impl Decompressor {
    pub fn new(cid_type: CidSpace, max_cid: u16, mode: Mode) -> Self {
        Self {
            engine: DecompEngine::new(DecompressorConfig::new(cid_type, max_cid, mode)),
        }
    }

    pub fn enable_profile(&mut self, id: ProfileId) {
        self.engine.enable_profile(id);
    }

    pub fn set_mrru(&mut self, mrru: u16) {
        self.engine.set_mrru(mrru);
    }

    /// `(k, n, k_1, n_1, k_2, n_2)` in the language-neutral interface maps
    /// to the FC->SC and SC->NC [`RateLimit`] pairs.
    pub fn set_rate_limits(&mut self, fc_to_sc: RateLimit, sc_to_nc: RateLimit) {
        self.engine.set_rate_limits(fc_to_sc, sc_to_nc);
    }

    pub fn set_features(&mut self, bits: u32) -> Result<(), Error> {
        self.engine.set_features(bits)
    }

    pub fn set_trace_cb(&mut self, handler: Box<dyn TraceHandler>) {
        self.engine.set_trace_cb(handler);
    }

    /// Decodes one ROHC packet. `send_feedback`, if provided, receives any
    /// ACK/NACK this call generates; forward those bytes to the remote
    /// compressor, e.g. via [`Compressor::piggyback_feedback`] directly, or
    /// [`Compressor::queue_feedback`] if the transport batches sends.
    pub fn decompress(
        &mut self,
        rohc_bytes: &[u8],
        rcvd_feedback: Option<&[u8]>,
        send_feedback: Option<&mut Vec<u8>>,
    ) -> Status {
        self.engine.decompress(rohc_bytes, rcvd_feedback, send_feedback)
    }

    /// Returns the context currently allocated for `cid`, if any (for
    /// inspection and tests; not part of the wire protocol).
    pub fn context(&mut self, cid: u16) -> Option<&engine::decompressor::DecompressorContext> {
        self.engine.context(cid)
    }
}
