//! Constructor-time configuration for [`crate::compressor::Compressor`] and
//! [`crate::decompressor::Decompressor`], grounded in the teacher's
//! `ServiceOptions<T>` / `SessionManagerOptions<T>` plain-struct pattern:
//! all tuning knobs are supplied once at construction, never discovered
//! from an external config file (that parsing stays outside this crate).

use codec::cid::CidSpace;
use codec::feedback::Mode;

use crate::profile::ProfileId;

/// Default IR-state periodic refresh period, in packets (RFC 3095 suggests
/// a few thousand; the reference implementation's default is 1700).
pub const DEFAULT_IR_REFRESH: u32 = 1700;
/// Default FO-state periodic refresh period, in packets.
pub const DEFAULT_FO_REFRESH: u32 = 700;
/// Successful IR transmissions required before IR -> FO (RFC 3095 default).
pub const DEFAULT_IR_COUNT: u32 = 3;
/// Default W-LSB window width.
pub const DEFAULT_WLSB_WIDTH: usize = 4;

/// A rate-limit pair: `k` failures out of the last `n` packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub k: u32,
    pub n: u32,
}

impl RateLimit {
    pub const fn new(k: u32, n: u32) -> Self {
        Self { k, n }
    }
}

/// FC -> SC default (RFC 3095 guidance: 31 failures out of 101 packets).
pub const DEFAULT_FC_TO_SC: RateLimit = RateLimit::new(31, 101);
/// SC -> NC default (32 out of 102 packets).
pub const DEFAULT_SC_TO_NC: RateLimit = RateLimit::new(32, 102);

/// Recognized bits of the decompressor features flag (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features(u32);

impl Features {
    pub const NONE: Features = Features(0);
    /// Bug-for-bug compatibility with ROHC 1.6.x peers.
    pub const COMPAT_1_6_X: Features = Features(1 << 0);
    /// Enables the single-repair-attempt CRC recovery path of §4.5.
    pub const CRC_REPAIR: Features = Features(1 << 1);

    const KNOWN: u32 = Self::COMPAT_1_6_X.0 | Self::CRC_REPAIR.0;

    /// Builds a feature set from a raw bitset, rejecting unknown bits
    /// (spec.md §6: "Unknown flags fail the call").
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::KNOWN != 0 {
            None
        } else {
            Some(Features(bits))
        }
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, flag: Features) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn insert(&mut self, flag: Features) {
        self.0 |= flag.0;
    }
}

impl std::ops::BitOr for Features {
    type Output = Features;

    fn bitor(self, rhs: Features) -> Features {
        Features(self.0 | rhs.0)
    }
}

/// Construction-time configuration for a [`crate::compressor::Compressor`].
#[derive(Debug, Clone)]
pub struct CompressorConfig {
    pub cid_type: CidSpace,
    pub max_cid: u16,
    pub mode: Mode,
    pub enabled_profiles: Vec<ProfileId>,
    pub rtp_ports: Vec<u16>,
    pub wlsb_width: usize,
    pub ir_refresh_period: u32,
    pub fo_refresh_period: u32,
    pub ir_count: u32,
    pub mrru: u16,
    /// Mirrors the decompressor's feature bits for constructor-signature
    /// parity; no compressor behavior currently reads this (both known
    /// flags, `COMPAT_1_6_X` and `CRC_REPAIR`, only affect decode).
    pub features: Features,
}

impl CompressorConfig {
    pub fn new(cid_type: CidSpace, max_cid: u16, mode: Mode) -> Self {
        Self {
            cid_type,
            max_cid,
            mode,
            enabled_profiles: vec![ProfileId::Uncompressed],
            rtp_ports: Vec::new(),
            wlsb_width: DEFAULT_WLSB_WIDTH,
            ir_refresh_period: DEFAULT_IR_REFRESH,
            fo_refresh_period: DEFAULT_FO_REFRESH,
            ir_count: DEFAULT_IR_COUNT,
            mrru: 0,
            features: Features::NONE,
        }
    }
}

/// Construction-time configuration for a [`crate::decompressor::Decompressor`].
#[derive(Debug, Clone)]
pub struct DecompressorConfig {
    pub cid_type: CidSpace,
    pub max_cid: u16,
    pub mode: Mode,
    pub enabled_profiles: Vec<ProfileId>,
    pub mrru: u16,
    pub fc_to_sc: RateLimit,
    pub sc_to_nc: RateLimit,
    pub features: Features,
}

impl DecompressorConfig {
    pub fn new(cid_type: CidSpace, max_cid: u16, mode: Mode) -> Self {
        Self {
            cid_type,
            max_cid,
            mode,
            enabled_profiles: vec![ProfileId::Uncompressed],
            mrru: 0,
            fc_to_sc: DEFAULT_FC_TO_SC,
            sc_to_nc: DEFAULT_SC_TO_NC,
            features: Features::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_rejects_unknown_bits() {
        assert!(Features::from_bits(1 << 31).is_none());
        assert!(Features::from_bits(Features::CRC_REPAIR.bits()).is_some());
    }

    #[test]
    fn features_union_contains_both() {
        let f = Features::COMPAT_1_6_X | Features::CRC_REPAIR;
        assert!(f.contains(Features::COMPAT_1_6_X));
        assert!(f.contains(Features::CRC_REPAIR));
    }

    #[test]
    fn compressor_config_has_sane_defaults() {
        let cfg = CompressorConfig::new(CidSpace::Small, 15, Mode::Optimistic);
        assert_eq!(cfg.wlsb_width, DEFAULT_WLSB_WIDTH);
        assert_eq!(cfg.enabled_profiles, vec![ProfileId::Uncompressed]);
    }
}
