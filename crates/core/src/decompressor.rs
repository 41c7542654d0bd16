//! Decompressor context state machine (NC / SC / FC) and packet decode
//! pipeline, RFC 3095 §4.5 / §5.
//!
//! Unlike the compressor, a decompressor context keeps only a single
//! reference value per tracked field (no sliding window) — robustness
//! against reordering/loss is the *compressor's* job when it picks `k`;
//! the decompressor just needs one point to anchor `codec::wlsb::decode`.

use std::collections::VecDeque;

use codec::feedback::{AckType, Mode};
use codec::{crc, ip, packet, wlsb};

use crate::config::{DecompressorConfig, Features, RateLimit};
use crate::error::{Error, Status};
use crate::profile::{AnyProfile, FieldSet, ProfileId};
use crate::stats::Stats;
use crate::table::ContextTable;
use crate::trace::{self, Entity, NullTraceHandler, TraceHandler, TraceLevel};
use crate::wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecompState {
    #[default]
    Nc,
    Sc,
    Fc,
}

pub struct DecompressorContext {
    cid: u16,
    profile: AnyProfile,
    state: DecompState,
    reference: Option<FieldSet>,
    recent_outcomes: VecDeque<bool>,
    recv_counter: u64,
    stats: Stats,
}

impl DecompressorContext {
    fn new(cid: u16, profile: AnyProfile) -> Self {
        Self {
            cid,
            profile,
            state: DecompState::Nc,
            reference: None,
            recent_outcomes: VecDeque::new(),
            recv_counter: 0,
            stats: Stats::new(),
        }
    }

    pub fn state(&self) -> DecompState {
        self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Decodes the SN (and, for UOR-2, every other tracked field) against
    /// the current reference and returns the rebuilt header bytes. Does not
    /// mutate the context — callers only commit the result once its CRC
    /// has been checked.
    ///
    /// `assume_sn_wrapped` retries the repair path of `Features::CRC_REPAIR`:
    /// instead of the SN candidate closest to the reference, it takes the
    /// next one a full `sn_bits`-wide cycle further around the SN's modulus,
    /// the only other candidate a wrapped SN could plausibly decode to.
    fn reconstruct_candidate(
        &self,
        sn_lsb: u32,
        sn_bits: u32,
        extra: &[u8],
        assume_sn_wrapped: bool,
    ) -> Result<(FieldSet, Vec<u8>), Error> {
        let reference = self.reference.as_ref().ok_or(Error::NoContext)?;
        let mut fields = reference.clone();

        let sn_name = self.profile.sn_field_name();
        let sn_idx = fields
            .lsb_fields
            .iter()
            .position(|f| f.name == sn_name)
            .ok_or_else(|| Error::Malformed("reference is missing its SN field".into()))?;
        let sn_ref = reference.lsb_fields[sn_idx];
        let mut decoded_sn =
            wlsb::decode(sn_lsb, sn_bits, sn_ref.value, sn_ref.shift, sn_ref.width)?;
        if assume_sn_wrapped {
            let modulus = 1u64 << sn_ref.width.min(32);
            decoded_sn = ((decoded_sn as u64 + (1u64 << sn_bits)) % modulus) as u32;
        }
        fields.lsb_fields[sn_idx].value = decoded_sn;
        fields.sn = decoded_sn;

        let extra_indices: Vec<usize> = reference
            .lsb_fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name != sn_name)
            .map(|(i, _)| i)
            .collect();

        if !extra.is_empty() {
            if extra.len() != extra_indices.len() {
                return Err(Error::Malformed(
                    "UOR-2 carried a different number of extra fields than this profile tracks".into(),
                ));
            }
            for (&idx, &byte) in extra_indices.iter().zip(extra) {
                let f = reference.lsb_fields[idx];
                let decoded = wlsb::decode(byte as u32, 8, f.value, f.shift, f.width)?;
                fields.lsb_fields[idx].value = decoded;
            }
        }

        let header_bytes = self.profile.reconstruct(&fields);
        Ok((fields, header_bytes))
    }

    fn record_outcome(&mut self, success: bool, fc_to_sc: &RateLimit, sc_to_nc: &RateLimit) {
        let max_n = fc_to_sc.n.max(sc_to_nc.n) as usize;
        self.recent_outcomes.push_back(success);
        while self.recent_outcomes.len() > max_n {
            self.recent_outcomes.pop_front();
        }

        if success {
            if self.state == DecompState::Sc {
                self.state = DecompState::Fc;
                self.stats.record_transition();
            }
            return;
        }

        if self.state == DecompState::Fc && self.failures_in_last(fc_to_sc.n) >= fc_to_sc.k {
            self.state = DecompState::Sc;
            self.stats.record_transition();
        }
        if self.state == DecompState::Sc && self.failures_in_last(sc_to_nc.n) >= sc_to_nc.k {
            self.state = DecompState::Nc;
            self.reference = None;
            self.stats.record_transition();
        }
    }

    fn failures_in_last(&self, n: u32) -> u32 {
        let n = n as usize;
        let skip = self.recent_outcomes.len().saturating_sub(n);
        self.recent_outcomes.iter().skip(skip).filter(|ok| !**ok).count() as u32
    }
}

/// Top-level decompressor endpoint: context table, packet-family dispatch,
/// and the public `decompress` surface (spec.md §6).
pub struct Decompressor {
    cfg: DecompressorConfig,
    table: ContextTable<DecompressorContext>,
    trace: Box<dyn TraceHandler>,
}

impl Decompressor {
    pub fn new(cfg: DecompressorConfig) -> Self {
        let max_cid = cfg.max_cid;
        Self {
            cfg,
            table: ContextTable::new(max_cid),
            trace: Box::new(NullTraceHandler),
        }
    }

    pub fn set_trace_cb(&mut self, handler: Box<dyn TraceHandler>) {
        self.trace = handler;
    }

    pub fn enable_profile(&mut self, id: ProfileId) {
        if !self.cfg.enabled_profiles.contains(&id) {
            self.cfg.enabled_profiles.push(id);
        }
    }

    pub fn set_mrru(&mut self, mrru: u16) {
        self.cfg.mrru = mrru;
    }

    pub fn set_rate_limits(&mut self, fc_to_sc: RateLimit, sc_to_nc: RateLimit) {
        self.cfg.fc_to_sc = fc_to_sc;
        self.cfg.sc_to_nc = sc_to_nc;
    }

    pub fn set_features(&mut self, bits: u32) -> Result<(), Error> {
        self.cfg.features = crate::config::Features::from_bits(bits)
            .ok_or(Error::ProgrammingError("unknown decompressor feature bits"))?;
        Ok(())
    }

    /// Returns the context currently allocated for `cid`, if any (for
    /// inspection and tests; not part of the wire protocol).
    pub fn context(&mut self, cid: u16) -> Option<&DecompressorContext> {
        self.table.get(cid)
    }

    fn handle_full(
        &mut self,
        cid: u16,
        family: packet::Family,
        payload: &[u8],
    ) -> Result<(Vec<u8>, &'static str), Error> {
        let ir = wire::decode_ir(payload)?;
        let profile_id = ProfileId::try_from(ir.profile_id as u16)
            .map_err(|_| Error::Malformed("unknown profile id in IR packet".into()))?;
        if !self.cfg.enabled_profiles.contains(&profile_id) {
            return Err(Error::Malformed("profile not enabled on this decompressor".into()));
        }

        let computed_crc = crc::CRC8.compute(&ir.template);
        if computed_crc != ir.crc8 {
            if let Some(ctx) = self.table.get_mut(cid) {
                ctx.record_outcome(false, &self.cfg.fc_to_sc, &self.cfg.sc_to_nc);
                ctx.stats.record_crc_failure();
            }
            return Err(Error::CrcFailure);
        }

        let mut profile = AnyProfile::for_id(profile_id);
        let view = ip::PacketView::parse(&ir.template);
        let fields = profile.extract(&view)?;

        if !self.table.contains(cid) {
            self.table
                .insert(cid, DecompressorContext::new(cid, AnyProfile::for_id(profile_id)));
        }
        let ctx = self.table.get_mut(cid).expect("just ensured present");
        ctx.profile = profile;
        ctx.reference = Some(fields);
        ctx.state = DecompState::Fc;
        ctx.record_outcome(true, &self.cfg.fc_to_sc, &self.cfg.sc_to_nc);

        let consumed = 7 + ir.template.len();
        let mut full = ir.template;
        full.extend_from_slice(&payload[consumed..]);

        Ok((full, if family == packet::Family::Ir { "IR" } else { "IR-DYN" }))
    }

    fn finish_uo(
        &mut self,
        cid: u16,
        sn_lsb: u32,
        sn_bits: u32,
        extra: &[u8],
        crc_received: u8,
        engine: &crc::Crc,
        trailing: &[u8],
        packet_type: &'static str,
    ) -> Result<(Vec<u8>, &'static str), Error> {
        let ctx = self.table.get_mut(cid).ok_or(Error::NoContext)?;
        if ctx.state == DecompState::Nc || ctx.reference.is_none() {
            return Err(Error::NoContext);
        }

        let (fields, header_bytes) = ctx.reconstruct_candidate(sn_lsb, sn_bits, extra, false)?;
        if engine.compute(&header_bytes) == crc_received {
            ctx.reference = Some(fields);
            ctx.record_outcome(true, &self.cfg.fc_to_sc, &self.cfg.sc_to_nc);
            let mut full = header_bytes;
            full.extend_from_slice(trailing);
            return Ok((full, packet_type));
        }

        // The straightforward decode's CRC didn't match; if the only
        // plausible cause is the SN having wrapped since the reference, try
        // the wrapped candidate once before giving up (RFC 3095 §4.5 CRC
        // repair). At most this one extra attempt is made per failure.
        if self.cfg.features.contains(Features::CRC_REPAIR) {
            if let Ok((fields, header_bytes)) =
                ctx.reconstruct_candidate(sn_lsb, sn_bits, extra, true)
            {
                if engine.compute(&header_bytes) == crc_received {
                    ctx.reference = Some(fields);
                    ctx.record_outcome(true, &self.cfg.fc_to_sc, &self.cfg.sc_to_nc);
                    ctx.stats.record_crc_repair();
                    let mut full = header_bytes;
                    full.extend_from_slice(trailing);
                    return Ok((full, packet_type));
                }
            }
        }

        ctx.record_outcome(false, &self.cfg.fc_to_sc, &self.cfg.sc_to_nc);
        ctx.stats.record_crc_failure();
        Err(Error::CrcFailure)
    }

    fn handle_uo0(&mut self, cid: u16, payload: &[u8]) -> Result<(Vec<u8>, &'static str), Error> {
        let byte0 = *payload
            .first()
            .ok_or_else(|| Error::Malformed("UO-0 packet truncated".into()))?;
        let (sn_lsb, crc3) = wire::decode_uo0(byte0);
        self.finish_uo(cid, sn_lsb as u32, 4, &[], crc3, &crc::CRC3, &payload[1..], "UO-0")
    }

    fn handle_uo1(&mut self, cid: u16, payload: &[u8]) -> Result<(Vec<u8>, &'static str), Error> {
        let (sn_lsb, crc3) = wire::decode_uo1(payload)?;
        self.finish_uo(cid, sn_lsb as u32, 6, &[], crc3, &crc::CRC3, &payload[2..], "UO-1")
    }

    /// Number of non-SN fields the context's profile tracks, i.e. how many
    /// extra LSB octets a UOR-2 for this context carries ahead of its CRC-7.
    fn extra_field_count(&self, cid: u16) -> Result<usize, Error> {
        let ctx = self.table.get(cid).ok_or(Error::NoContext)?;
        let reference = ctx.reference.as_ref().ok_or(Error::NoContext)?;
        let sn_name = ctx.profile.sn_field_name();
        Ok(reference
            .lsb_fields
            .iter()
            .filter(|f| f.name != sn_name)
            .count())
    }

    fn handle_uor2(&mut self, cid: u16, payload: &[u8]) -> Result<(Vec<u8>, &'static str), Error> {
        let extra_len = self.extra_field_count(cid)?;
        let (sn_lsb, extra, crc7) = wire::decode_uor2(payload, extra_len)?;
        let consumed = 2 + extra.len();
        self.finish_uo(
            cid,
            sn_lsb as u32,
            5,
            extra,
            crc7,
            &crc::CRC7,
            &payload[consumed..],
            "UOR-2",
        )
    }

    fn queue_ack(&self, cid: u16, sn: u64, buf: &mut Vec<u8>) {
        if let Ok(bytes) = codec::feedback::encode2(AckType::Ack, self.cfg.mode, sn, false, &[]) {
            if let Ok(wired) = codec::feedback::with_cid(&bytes, self.cfg.cid_type, cid) {
                buf.extend_from_slice(&wired);
            }
        }
    }

    fn queue_nack(&self, cid: u16, sn: u64, buf: &mut Vec<u8>) {
        if let Ok(bytes) = codec::feedback::encode2(AckType::Nack, self.cfg.mode, sn, false, &[]) {
            if let Ok(wired) = codec::feedback::with_cid(&bytes, self.cfg.cid_type, cid) {
                buf.extend_from_slice(&wired);
            }
        }
    }

    /// Decodes one ROHC packet. `send_feedback`, if provided, receives any
    /// ACK/NACK this call generates (suppressed entirely in
    /// [`Mode::Unidirectional`](codec::feedback::Mode::Unidirectional));
    /// `rcvd_feedback` is accepted for symmetry with the compressor's
    /// [`crate::compressor::Compressor::piggyback_feedback`] but this
    /// endpoint has no feedback of its own to apply.
    pub fn decompress(
        &mut self,
        bytes: &[u8],
        _rcvd_feedback: Option<&[u8]>,
        send_feedback: Option<&mut Vec<u8>>,
    ) -> Status {
        let header = match packet::parse_header(self.cfg.cid_type, bytes) {
            Ok(h) => h,
            Err(_) => return Status::MalformedPacket,
        };

        if header.cid > self.cfg.max_cid {
            return Status::Error(Error::Capacity("cid exceeds max_cid"));
        }

        let cid = header.cid;
        let payload = &bytes[header.payload_offset..];

        let result = match header.family {
            packet::Family::Ir | packet::Family::IrDyn => {
                self.handle_full(cid, header.family, payload)
            }
            packet::Family::Uo0 => self.handle_uo0(cid, payload),
            packet::Family::Uo1 => self.handle_uo1(cid, payload),
            packet::Family::Uor2 => self.handle_uor2(cid, payload),
            packet::Family::Feedback | packet::Family::Segment | packet::Family::Padding => {
                return Status::MalformedPacket;
            }
        };

        let recv_sn = self
            .table
            .get_mut(cid)
            .map(|ctx| {
                ctx.recv_counter = ctx.recv_counter.wrapping_add(1);
                ctx.recv_counter
            })
            .unwrap_or(0);

        match result {
            Ok((packet_bytes, packet_type)) => {
                if let Some(ctx) = self.table.get_mut(cid) {
                    ctx.stats.record_received(packet_type);
                }
                if let Some(buf) = send_feedback {
                    if self.cfg.mode != Mode::Unidirectional {
                        self.queue_ack(cid, recv_sn, buf);
                    }
                }
                trace::emit(
                    self.trace.as_ref(),
                    TraceLevel::Debug,
                    Entity::Decomp,
                    None,
                    format!("cid {cid} decoded {packet_type}"),
                );
                Status::Ok(packet_bytes)
            }
            Err(Error::NoContext) => Status::NoContext,
            Err(Error::CrcFailure) => {
                if let Some(buf) = send_feedback {
                    if self.cfg.mode == Mode::Reliable {
                        self.queue_nack(cid, recv_sn, buf);
                    }
                }
                Status::Error(Error::CrcFailure)
            }
            Err(Error::Malformed(m)) => {
                trace::emit(
                    self.trace.as_ref(),
                    TraceLevel::Warning,
                    Entity::Decomp,
                    None,
                    format!("cid {cid} malformed: {m}"),
                );
                Status::MalformedPacket
            }
            Err(other) => Status::Error(other),
        }
    }
}
