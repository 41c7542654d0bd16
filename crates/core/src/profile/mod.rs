//! Profile dispatch, RFC 3095 §5.7 / §5.8 / §5.9 per-protocol rules.
//!
//! The profile set is closed by IANA registration, so dispatch is a tagged
//! enum over the seven concrete profiles rather than a trait object —
//! static dispatch, no heap allocation per context, and an exhaustive
//! match at every call site instead of a fallible downcast.

mod esp;
mod ip_only;
mod rtp;
mod udp;
mod udp_lite;
mod uncompressed;

pub use esp::EspProfile;
pub use ip_only::IpOnlyProfile;
pub use rtp::RtpProfile;
pub use udp::UdpProfile;
pub use udp_lite::UdpLiteProfile;
pub use uncompressed::UncompressedProfile;

use codec::ip::PacketView;
use num_enum::TryFromPrimitive;

use crate::error::Error;

/// IANA-reserved ROHC profile identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u16)]
pub enum ProfileId {
    Uncompressed = 0x0000,
    Rtp = 0x0001,
    Udp = 0x0002,
    Esp = 0x0003,
    IpOnly = 0x0004,
    Tcp = 0x0006,
    UdpLite = 0x0008,
}

/// One field the compressor tracks across packets. `offset`/`byte_len`
/// locate it within [`FieldSet::template`]; `width`/`shift` feed straight
/// into `codec::wlsb`. `name` is used only for trace messages and test
/// assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LsbField {
    pub name: &'static str,
    pub value: u32,
    pub width: u32,
    pub shift: i64,
    pub offset: usize,
    pub byte_len: u8,
}

/// A profile's view of one packet.
///
/// `template` holds the full uncompressed header bytes (IP header, any
/// extension headers, and the transport header) exactly as seen on the
/// wire; `lsb_fields` names the byte ranges within it that are compressed
/// incrementally via W-LSB rather than treated as static/dynamic chain
/// bytes. [`Profile::reconstruct`] rebuilds a header by patching a
/// reference template's `lsb_fields` byte ranges with freshly decoded
/// values — this is simpler than an RFC-exact static/dynamic chain split
/// and is explicitly permitted (bit-exact private layout is a Non-goal).
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    pub template: Vec<u8>,
    pub lsb_fields: Vec<LsbField>,
    pub sn: u32,
    /// Context-key bits beyond `context_key()` that a profile wants
    /// remembered verbatim (e.g. ESP SPI) to detect a silent flow change.
    pub static_key: u64,
    pub is_ipv4: bool,
}

impl FieldSet {
    pub fn lsb(&self, name: &str) -> Option<&LsbField> {
        self.lsb_fields.iter().find(|f| f.name == name)
    }

    /// Writes `value`'s low `byte_len` bytes (network order) into
    /// `template` at `offset`.
    pub fn patch(&mut self, field: &LsbField) {
        let bytes = field.value.to_be_bytes();
        let start = 4 - field.byte_len as usize;
        let src = &bytes[start..];
        self.template[field.offset..field.offset + field.byte_len as usize].copy_from_slice(src);
    }
}

/// The capability set every profile exposes (RFC 3095 §3): recognize a
/// packet (`check_applicability`), find its context (`context_key`),
/// extract compressible fields (`extract`), and rebuild the original
/// header bytes from an accepted `FieldSet` (`reconstruct`).
pub trait Profile: std::fmt::Debug {
    fn id(&self) -> ProfileId;
    fn name(&self) -> &'static str;

    /// Rejects fragmented IP, IP versions other than 4/6, and packets
    /// missing this profile's required transport protocol. RTP additionally
    /// requires the destination UDP port to be RTP-allow-listed (or the
    /// caller to have pre-classified the flow).
    fn check_applicability(&self, view: &PacketView, rtp_ports: &[u16]) -> bool;

    /// A 64-bit mix of addresses/protocol/ports identifying the flow this
    /// packet belongs to, used to find an existing context before
    /// allocating a new one.
    fn context_key(&self, view: &PacketView) -> u64;

    /// Name of the [`LsbField`] in [`FieldSet::lsb_fields`] that carries
    /// this profile's sequence number (the field matrix's "SN source"
    /// column), so the compressor/decompressor pipeline can treat it
    /// specially without hardcoding per-profile field names.
    fn sn_field_name(&self) -> &'static str;

    fn extract(&mut self, view: &PacketView) -> Result<FieldSet, Error>;

    /// Rebuilds the uncompressed header bytes (header only, payload is
    /// appended by the caller) from a `FieldSet` that has already been
    /// reference-merged and LSB-decoded.
    fn reconstruct(&self, fields: &FieldSet) -> Vec<u8>;
}

/// Tagged union over the seven profile implementations.
#[derive(Debug)]
pub enum AnyProfile {
    Uncompressed(UncompressedProfile),
    IpOnly(IpOnlyProfile),
    Udp(UdpProfile),
    Rtp(RtpProfile),
    Esp(EspProfile),
    UdpLite(UdpLiteProfile),
}

macro_rules! dispatch {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            AnyProfile::Uncompressed(p) => p.$method($($arg),*),
            AnyProfile::IpOnly(p) => p.$method($($arg),*),
            AnyProfile::Udp(p) => p.$method($($arg),*),
            AnyProfile::Rtp(p) => p.$method($($arg),*),
            AnyProfile::Esp(p) => p.$method($($arg),*),
            AnyProfile::UdpLite(p) => p.$method($($arg),*),
        }
    };
}

impl AnyProfile {
    pub fn id(&self) -> ProfileId {
        dispatch!(self, id)
    }

    pub fn name(&self) -> &'static str {
        dispatch!(self, name)
    }

    pub fn check_applicability(&self, view: &PacketView, rtp_ports: &[u16]) -> bool {
        dispatch!(self, check_applicability, view, rtp_ports)
    }

    pub fn context_key(&self, view: &PacketView) -> u64 {
        dispatch!(self, context_key, view)
    }

    pub fn sn_field_name(&self) -> &'static str {
        dispatch!(self, sn_field_name)
    }

    pub fn extract(&mut self, view: &PacketView) -> Result<FieldSet, Error> {
        dispatch!(self, extract, view)
    }

    pub fn reconstruct(&self, fields: &FieldSet) -> Vec<u8> {
        dispatch!(self, reconstruct, fields)
    }

    pub fn for_id(id: ProfileId) -> Self {
        match id {
            ProfileId::Uncompressed => AnyProfile::Uncompressed(UncompressedProfile),
            ProfileId::IpOnly => AnyProfile::IpOnly(IpOnlyProfile),
            ProfileId::Udp => AnyProfile::Udp(UdpProfile),
            ProfileId::Rtp => AnyProfile::Rtp(RtpProfile::default()),
            ProfileId::Esp => AnyProfile::Esp(EspProfile::default()),
            ProfileId::UdpLite => AnyProfile::UdpLite(UdpLiteProfile),
            ProfileId::Tcp => AnyProfile::Uncompressed(UncompressedProfile),
        }
    }
}

/// Shared `reconstruct` body: patch every LSB field into its template
/// byte range, then re-derive the IPv4 checksum if applicable. Every
/// concrete profile's `reconstruct` is a one-line call to this.
pub(crate) fn reconstruct_from_template(fields: &FieldSet) -> Vec<u8> {
    let mut out = fields.clone();
    for field in fields.lsb_fields.clone() {
        out.patch(&field);
    }
    if out.is_ipv4 {
        ipv4_checksum(&mut out.template);
    }
    out.template
}

/// Recomputes the IPv4 header checksum over `header` (bytes 10..12 are
/// treated as zero during the sum), the one field ROHC always re-derives
/// rather than carries (RFC 3095 §5.7, testable property 1's exemption).
pub(crate) fn ipv4_checksum(header: &mut [u8]) {
    header[10] = 0;
    header[11] = 0;

    let mut sum = 0u32;
    for chunk in header.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_be_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_be_bytes([chunk[0], 0])
        };
        sum += word as u32;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    let checksum = !(sum as u16);
    header[10..12].copy_from_slice(&checksum.to_be_bytes());
}
