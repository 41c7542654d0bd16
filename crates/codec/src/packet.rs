//! ROHC packet-type identification from the leading octet(s), RFC 3095 §5.2.
//!
//! The coarse family (UO-0, UO-1, UOR-2, IR, IR-DYN, feedback, segment,
//! padding) is fully determined by a handful of fixed prefix bits. Which
//! exact UO-1/UOR-2 *variant* (plain, `-ID`, `-TS`, `-RTP`) applies is a
//! profile decision, not a wire one — `rohc-core`'s active profile picks it
//! once the family is known.

use crate::{Error, cid};

pub const IR: u8 = 0xFC;
pub const IR_DYN: u8 = 0xF8;
pub const FEEDBACK: u8 = 0xF0;
pub const SEGMENT: u8 = 0xFD;
pub const PADDING: u8 = 0xE0;

/// The coarse packet family identified from a single leading octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Padding,
    Feedback,
    Segment,
    Ir,
    IrDyn,
    /// `110xxxxx`, one of UOR-2 / UOR-2-ID / UOR-2-TS / UOR-2-RTP.
    Uor2,
    /// `10xxxxxx`, one of UO-1 / UO-1-ID / UO-1-TS / UO-1-RTP.
    Uo1,
    /// `0xxxxxxx`.
    Uo0,
}

/// Identifies the family of the packet starting at `byte0`, the first octet
/// *after* any Add-CID prefix has already been stripped.
pub fn identify(byte0: u8) -> Family {
    if byte0 == PADDING {
        Family::Padding
    } else if byte0 == FEEDBACK {
        Family::Feedback
    } else if byte0 == SEGMENT {
        Family::Segment
    } else if byte0 == IR {
        Family::Ir
    } else if byte0 == IR_DYN {
        Family::IrDyn
    } else if byte0 & 0xE0 == 0xC0 {
        Family::Uor2
    } else if byte0 & 0xC0 == 0x80 {
        Family::Uo1
    } else {
        Family::Uo0
    }
}

/// The result of stripping an optional CID prefix and identifying the
/// packet family that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub cid: u16,
    pub family: Family,
    /// Offset of `family`'s leading octet within the original buffer.
    pub payload_offset: usize,
}

/// Parses the CID prefix (per `space`) and the packet family that follows,
/// from the front of `bytes`.
pub fn parse_header(space: cid::CidSpace, bytes: &[u8]) -> Result<Header, Error> {
    let (cid, consumed) = cid::decode_prefix(space, bytes)?;
    let byte0 = *bytes.get(consumed).ok_or(Error::Truncated)?;
    Ok(Header {
        cid,
        family: identify(byte0),
        payload_offset: consumed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_fixed_prefixes() {
        assert_eq!(identify(PADDING), Family::Padding);
        assert_eq!(identify(FEEDBACK), Family::Feedback);
        assert_eq!(identify(SEGMENT), Family::Segment);
        assert_eq!(identify(IR), Family::Ir);
        assert_eq!(identify(IR_DYN), Family::IrDyn);
    }

    #[test]
    fn identifies_uo0_range() {
        for b in 0x00..=0x7F {
            assert_eq!(identify(b), Family::Uo0, "byte {b:#04x}");
        }
    }

    #[test]
    fn identifies_uo1_range() {
        for b in 0x80..=0xBF {
            assert_eq!(identify(b), Family::Uo1, "byte {b:#04x}");
        }
    }

    #[test]
    fn identifies_uor2_range() {
        for b in 0xC0..=0xDF {
            assert_eq!(identify(b), Family::Uor2, "byte {b:#04x}");
        }
    }

    #[test]
    fn add_cid_never_collides_with_padding() {
        // CID 0 is implicit (no Add-CID octet), so 0xE1..=0xEF is the full
        // Add-CID range and 0xE0 is unambiguously Padding.
        for cid in 1..=15u16 {
            let prefix = cid::encode_prefix(cid::CidSpace::Small, cid).unwrap();
            assert_ne!(prefix[0], PADDING);
        }
    }

    #[test]
    fn parse_header_strips_small_cid() {
        let bytes = [0xE3, IR, 0xAA];
        let header = parse_header(cid::CidSpace::Small, &bytes).unwrap();
        assert_eq!(header.cid, 3);
        assert_eq!(header.family, Family::Ir);
        assert_eq!(header.payload_offset, 1);
    }

    #[test]
    fn parse_header_implicit_cid_zero() {
        let bytes = [IR_DYN, 0x01];
        let header = parse_header(cid::CidSpace::Small, &bytes).unwrap();
        assert_eq!(header.cid, 0);
        assert_eq!(header.family, Family::IrDyn);
        assert_eq!(header.payload_offset, 0);
    }

    #[test]
    fn parse_header_rejects_empty_input() {
        assert!(matches!(
            parse_header(cid::CidSpace::Small, &[]),
            Err(Error::Truncated)
        ));
    }
}
