//! Compressor context state machine (IR / FO / SO) and packet-type
//! selection, RFC 3095 §4.4 / §5.
//!
//! One [`CompressorContext`] tracks one flow; [`Compressor`] is the
//! endpoint-level facade that classifies incoming packets into a profile,
//! finds or allocates a context for them by `context_key`, and drives it.

use ahash::HashMap;
use codec::{crc, packet, wlsb};

use crate::config::CompressorConfig;
use crate::error::Error;
use crate::profile::{AnyProfile, FieldSet, LsbField, ProfileId};
use crate::stats::Stats;
use crate::table::ContextTable;
use crate::trace::{self, Entity, NullTraceHandler, TraceHandler, TraceLevel};
use crate::wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompState {
    Ir,
    Fo,
    So,
}

/// Describes the packet just produced by [`Compressor::compress`].
#[derive(Debug, Clone, Copy)]
pub struct PacketInfo {
    pub cid: u16,
    pub profile: ProfileId,
    pub packet_type: &'static str,
}

/// One flow's compressor-side state: current phase, refresh counters, the
/// last fields successfully committed as the decompressor's assumed
/// reference, and a W-LSB window per tracked field.
pub struct CompressorContext {
    cid: u16,
    context_key: u64,
    profile: AnyProfile,
    state: CompState,
    ir_successes: u32,
    ir_refresh_counter: u32,
    fo_refresh_counter: u32,
    stable_streak: u32,
    reference: Option<FieldSet>,
    windows: HashMap<&'static str, wlsb::Window>,
    send_counter: u16,
    stats: Stats,
}

impl CompressorContext {
    fn new(cid: u16, context_key: u64, profile: AnyProfile) -> Self {
        Self {
            cid,
            context_key,
            profile,
            state: CompState::Ir,
            ir_successes: 0,
            ir_refresh_counter: 0,
            fo_refresh_counter: 0,
            stable_streak: 0,
            reference: None,
            windows: HashMap::default(),
            send_counter: 0,
            stats: Stats::new(),
        }
    }

    pub fn state(&self) -> CompState {
        self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn context_key(&self) -> u64 {
        self.context_key
    }

    fn window_for(&mut self, name: &'static str, width: usize) -> &mut wlsb::Window {
        self.windows
            .entry(name)
            .or_insert_with(|| wlsb::Window::new(width))
    }

    /// True if `field` can no longer be folded into a UO/UOR-2 packet's
    /// fixed 8-bit LSB fragment for non-SN fields: either the field has no
    /// window yet (it wasn't tracked on the previous packet, e.g. RTP's
    /// `ts`/`ts_scaled` name switch when stride locks in) or its value has
    /// drifted outside what 8 bits can resolve against the window's
    /// remembered references. A field whose smallest unambiguous `k` is
    /// still `<= 8` round-trips fine through that fixed-width fragment even
    /// though it isn't bit-identical to its last committed value.
    fn non_sn_field_forces_ir_dyn(&mut self, field: &LsbField, cfg: &CompressorConfig) -> bool {
        let window = self.window_for(field.name, cfg.wlsb_width);
        match window.encode_k(field.value, field.width, |_| field.shift) {
            Ok(k) => k > 8,
            Err(_) => true,
        }
    }

    fn commit(&mut self, fields: &FieldSet, cfg: &CompressorConfig) {
        for field in &fields.lsb_fields {
            let masked = wlsb::mask(field.value, field.width.min(32));
            self.window_for(field.name, cfg.wlsb_width)
                .add(masked, self.send_counter);
        }
        self.reference = Some(fields.clone());
    }

    fn encode_full(&mut self, prefix: u8, fields: &FieldSet) -> Vec<u8> {
        let template = self.profile.reconstruct(fields);
        let crc8 = crc::CRC8.compute(&template);
        wire::encode_ir(prefix, profile_id_byte(self.profile.id()), self.send_counter, crc8, &template)
    }

    /// `fields.template` only ever covers the header this profile tracks
    /// (the whole packet, for [`crate::profile::UncompressedProfile`]), so
    /// anything past it is payload the wire body must carry unmodified.
    fn trailing<'a>(&self, fields: &FieldSet, input: &'a [u8]) -> &'a [u8] {
        &input[fields.template.len().min(input.len())..]
    }

    /// Selects and encodes UO-0, UO-1, or UOR-2 depending on how many bits
    /// the SN needs against its W-LSB window; any non-SN field whose new
    /// value no longer fits an 8-bit LSB fragment forces an IR-DYN instead
    /// of reaching this branch (see [`Self::non_sn_field_forces_ir_dyn`]).
    fn encode_uo(&mut self, fields: &FieldSet, cfg: &CompressorConfig) -> (Vec<u8>, &'static str) {
        let sn_name = self.profile.sn_field_name();
        let sn_field = *fields
            .lsb(sn_name)
            .expect("a profile that reaches steady state always extracts its own SN field");

        let k = {
            let window = self.window_for(sn_name, cfg.wlsb_width);
            window
                .encode_k(sn_field.value, sn_field.width, |_| sn_field.shift)
                .unwrap_or(sn_field.width)
        };

        let template = self.profile.reconstruct(fields);

        if k <= 4 {
            let crc3 = crc::CRC3.compute(&template);
            let sn_lsb = wlsb::mask(sn_field.value, 4) as u8;
            (wire::encode_uo0(sn_lsb, crc3).to_vec(), "UO-0")
        } else if k <= 6 {
            let crc3 = crc::CRC3.compute(&template);
            let sn_lsb = wlsb::mask(sn_field.value, 6) as u8;
            (wire::encode_uo1(sn_lsb, crc3).to_vec(), "UO-1")
        } else {
            let crc7 = crc::CRC7.compute(&template);
            let sn_lsb = wlsb::mask(sn_field.value, 5) as u8;
            let extra: Vec<u8> = fields
                .lsb_fields
                .iter()
                .filter(|f| f.name != sn_name)
                .map(|f| wlsb::mask(f.value, 8) as u8)
                .collect();
            (wire::encode_uor2(sn_lsb, &extra, crc7), "UOR-2")
        }
    }

    /// Runs one packet through the IR/FO/SO state machine, returning the
    /// ROHC-encoded body (the caller prefixes the CID) with the original
    /// packet's trailing payload bytes already appended.
    fn compress(
        &mut self,
        fields: FieldSet,
        input: &[u8],
        cfg: &CompressorConfig,
        trace: &dyn TraceHandler,
    ) -> (Vec<u8>, &'static str) {
        let trailing = self.trailing(&fields, input).to_vec();
        self.send_counter = self.send_counter.wrapping_add(1);
        self.ir_refresh_counter = self.ir_refresh_counter.saturating_sub(1);
        self.fo_refresh_counter = self.fo_refresh_counter.saturating_sub(1);

        let static_changed = self
            .reference
            .as_ref()
            .map_or(true, |r| r.static_key != fields.static_key);
        let must_ir = self.reference.is_none()
            || self.state == CompState::Ir
            || self.ir_refresh_counter == 0
            || static_changed;

        if must_ir {
            let mut out = self.encode_full(packet::IR, &fields);
            out.extend_from_slice(&trailing);
            self.ir_successes += 1;
            self.ir_refresh_counter = cfg.ir_refresh_period;
            self.fo_refresh_counter = cfg.fo_refresh_period;
            self.stable_streak = 0;
            if self.state == CompState::Ir && self.ir_successes >= cfg.ir_count {
                self.state = CompState::Fo;
            }
            self.commit(&fields, cfg);
            self.stats.record_sent("IR");
            trace::emit(
                trace,
                TraceLevel::Debug,
                Entity::Comp,
                Some(self.profile.id()),
                format!("cid {} sent IR (state now {:?})", self.cid, self.state),
            );
            return (out, "IR");
        }

        let sn_name = self.profile.sn_field_name();
        let non_sn_changed = fields
            .lsb_fields
            .iter()
            .filter(|f| f.name != sn_name)
            .any(|f| self.non_sn_field_forces_ir_dyn(f, cfg));

        if non_sn_changed || self.fo_refresh_counter == 0 {
            let mut out = self.encode_full(packet::IR_DYN, &fields);
            out.extend_from_slice(&trailing);
            self.state = CompState::Fo;
            self.fo_refresh_counter = cfg.fo_refresh_period;
            self.stable_streak = 0;
            self.commit(&fields, cfg);
            self.stats.record_sent("IR-DYN");
            trace::emit(
                trace,
                TraceLevel::Debug,
                Entity::Comp,
                Some(self.profile.id()),
                format!("cid {} sent IR-DYN", self.cid),
            );
            return (out, "IR-DYN");
        }

        self.stable_streak += 1;
        if self.state == CompState::Fo && self.stable_streak as usize >= cfg.wlsb_width {
            self.state = CompState::So;
        }

        let (mut out, packet_type) = self.encode_uo(&fields, cfg);
        out.extend_from_slice(&trailing);
        self.commit(&fields, cfg);
        self.stats.record_sent(packet_type);
        trace::emit(
            trace,
            TraceLevel::Debug,
            Entity::Comp,
            Some(self.profile.id()),
            format!("cid {} sent {}", self.cid, packet_type),
        );
        (out, packet_type)
    }

    /// Applies decompressor feedback: an ACK prunes acknowledged W-LSB
    /// window entries, a NACK forces the next packet to be an IR, and a
    /// STATIC-NACK also drops the reference outright.
    pub fn handle_feedback(&mut self, feedback: &codec::feedback::Feedback2) {
        use codec::feedback::AckType;
        match feedback.ack_type {
            AckType::Ack => {
                let sn = feedback.sn as u16;
                for window in self.windows.values_mut() {
                    window.ack(sn);
                }
            }
            AckType::Nack => {
                self.ir_refresh_counter = 0;
            }
            AckType::StaticNack => {
                self.ir_refresh_counter = 0;
                self.state = CompState::Ir;
                self.reference = None;
            }
        }
    }
}

fn profile_id_byte(id: ProfileId) -> u8 {
    id as u16 as u8
}

/// Most-specific-first profile priority: an RTP match wins over a plain UDP
/// match on the same packet, and so on down to Uncompressed as the catch-all.
const PROFILE_PRIORITY: [ProfileId; 6] = [
    ProfileId::Rtp,
    ProfileId::Esp,
    ProfileId::UdpLite,
    ProfileId::Udp,
    ProfileId::IpOnly,
    ProfileId::Uncompressed,
];

/// Top-level compressor endpoint: profile dispatch, context allocation and
/// eviction, and the public `compress`/feedback surface (spec.md §6).
pub struct Compressor {
    cfg: CompressorConfig,
    table: ContextTable<CompressorContext>,
    flow_index: HashMap<u64, u16>,
    next_cid: u16,
    trace: Box<dyn TraceHandler>,
}

impl Compressor {
    pub fn new(cfg: CompressorConfig) -> Self {
        let max_cid = cfg.max_cid;
        Self {
            cfg,
            table: ContextTable::new(max_cid),
            flow_index: HashMap::default(),
            next_cid: 0,
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

    pub fn set_rtp_ports(&mut self, ports: Vec<u16>) {
        self.cfg.rtp_ports = ports;
    }

    pub fn set_wlsb_width(&mut self, width: usize) {
        self.cfg.wlsb_width = width;
    }

    pub fn set_periodic_refreshes(&mut self, ir_refresh: u32, fo_refresh: u32) {
        self.cfg.ir_refresh_period = ir_refresh;
        self.cfg.fo_refresh_period = fo_refresh;
    }

    pub fn set_mrru(&mut self, mrru: u16) {
        self.cfg.mrru = mrru;
    }

    fn select_profile(&self, view: &codec::ip::PacketView) -> Option<ProfileId> {
        PROFILE_PRIORITY.into_iter().find(|id| {
            self.cfg.enabled_profiles.contains(id)
                && AnyProfile::for_id(*id).check_applicability(view, &self.cfg.rtp_ports)
        })
    }

    fn allocate_cid(&mut self) -> u16 {
        let cid = self.next_cid;
        self.next_cid = if self.next_cid >= self.cfg.max_cid {
            0
        } else {
            self.next_cid + 1
        };
        cid
    }

    /// Compresses one uncompressed IP packet, returning the CID-prefixed
    /// ROHC bytes and a description of the packet emitted.
    pub fn compress(&mut self, input: &[u8]) -> Result<(Vec<u8>, PacketInfo), Error> {
        if input.is_empty() {
            return Err(Error::ProgrammingError("compress() called with empty input"));
        }

        let view = codec::ip::PacketView::parse(input);
        let profile_id = self.select_profile(&view).ok_or(Error::NotCompressible)?;
        let mut profile = AnyProfile::for_id(profile_id);
        let context_key = profile.context_key(&view);
        let fields = profile.extract(&view)?;

        let cid = match self.flow_index.get(&context_key) {
            Some(&cid) => cid,
            None => {
                let cid = self.allocate_cid();
                self.flow_index.insert(context_key, cid);
                if let Some((evicted_cid, _)) = self
                    .table
                    .insert(cid, CompressorContext::new(cid, context_key, profile))
                {
                    self.flow_index.retain(|_, v| *v != evicted_cid);
                }
                cid
            }
        };

        let ctx = self
            .table
            .get_mut(cid)
            .ok_or(Error::ProgrammingError("context vanished right after insertion"))?;
        let (body, packet_type) = ctx.compress(fields, input, &self.cfg, self.trace.as_ref());

        let mut out = codec::cid::encode_prefix(self.cfg.cid_type, cid)?;
        out.extend_from_slice(&body);

        Ok((
            out,
            PacketInfo {
                cid,
                profile: profile_id,
                packet_type,
            },
        ))
    }

    /// Decodes and applies feedback received from the remote decompressor
    /// (FEEDBACK-1 implies ACK; FEEDBACK-2 carries an explicit ack type).
    pub fn piggyback_feedback(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let (cid, consumed) = codec::cid::decode_prefix(self.cfg.cid_type, bytes)?;
        let rest = &bytes[consumed..];
        if rest.is_empty() {
            return Err(Error::Malformed("empty feedback packet".into()));
        }

        let feedback = if rest.len() == 1 {
            codec::feedback::Feedback2 {
                ack_type: codec::feedback::AckType::Ack,
                mode: self.cfg.mode,
                sn: codec::feedback::decode1(rest)? as u64,
                crc8: None,
                options: Vec::new(),
            }
        } else {
            codec::feedback::decode2(rest)?
        };

        if let Some(ctx) = self.table.get_mut(cid) {
            ctx.handle_feedback(&feedback);
        }
        Ok(())
    }

    /// Returns the context currently allocated for `cid`, if any (for
    /// inspection and tests; not part of the wire protocol).
    pub fn context(&mut self, cid: u16) -> Option<&CompressorContext> {
        self.table.get(cid)
    }
}
