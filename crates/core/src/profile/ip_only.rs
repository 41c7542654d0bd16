//! Profile 0x0004 — IP-only. Compresses a bare IPv4/IPv6 header carrying
//! any transport protocol; IP-ID is the sole LSB field.

use codec::ip::PacketView;
use codec::wlsb::shift;

use super::{FieldSet, LsbField, Profile, ProfileId};
use crate::error::Error;

#[derive(Debug, Clone, Copy, Default)]
pub struct IpOnlyProfile;

impl Profile for IpOnlyProfile {
    fn id(&self) -> ProfileId {
        ProfileId::IpOnly
    }

    fn name(&self) -> &'static str {
        "IP-only"
    }

    fn check_applicability(&self, view: &PacketView, _rtp_ports: &[u16]) -> bool {
        matches!(view, PacketView::V4(v) if !v.is_fragmented())
            || matches!(view, PacketView::V6(v) if !v.is_fragmented())
    }

    fn context_key(&self, view: &PacketView) -> u64 {
        context_key_ip(view)
    }

    fn sn_field_name(&self) -> &'static str {
        "ip_id"
    }

    fn extract(&mut self, view: &PacketView) -> Result<FieldSet, Error> {
        match view {
            PacketView::V4(v) => {
                let template = v.as_bytes()[..v.ihl() as usize * 4].to_vec();
                let lsb_fields = vec![LsbField {
                    name: "ip_id",
                    value: v.identification() as u32,
                    width: 16,
                    shift: shift::IP_ID,
                    offset: 4,
                    byte_len: 2,
                }];
                Ok(FieldSet {
                    template,
                    lsb_fields,
                    sn: v.identification() as u32,
                    static_key: 0,
                    is_ipv4: true,
                })
            }
            PacketView::V6(v) => Ok(FieldSet {
                template: v.as_bytes()[..40].to_vec(),
                lsb_fields: Vec::new(),
                sn: 0,
                static_key: 0,
                is_ipv4: false,
            }),
            _ => Err(Error::NotCompressible),
        }
    }

    fn reconstruct(&self, fields: &FieldSet) -> Vec<u8> {
        super::reconstruct_from_template(fields)
    }
}

/// Shared context-key heuristic: addresses + protocol, used by every IP
/// based profile (IP-only, UDP, RTP, ESP, UDP-Lite).
pub(crate) fn context_key_ip(view: &PacketView) -> u64 {
    match view {
        PacketView::V4(v) => {
            let src: u32 = v.src().into();
            let dst: u32 = v.dst().into();
            ((src as u64) << 32) ^ ((dst as u64) << 8) ^ v.protocol() as u64
        }
        PacketView::V6(v) => {
            let src = v.src().octets();
            let dst = v.dst().octets();
            let mut key = 0u64;
            for b in src.iter().chain(dst.iter()) {
                key = key.wrapping_mul(31).wrapping_add(*b as u64);
            }
            key ^ (v.next_header() as u64)
        }
        _ => 0,
    }
}
