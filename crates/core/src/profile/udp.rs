//! Profile 0x0002 — UDP. IP-only plus the 8-byte UDP header; SN still
//! rides on IP-ID since UDP carries no sequence number of its own.

use codec::ip::{self, PacketView};
use codec::wlsb::shift;

use super::ip_only::context_key_ip;
use super::{FieldSet, LsbField, Profile, ProfileId};
use crate::error::Error;

#[derive(Debug, Clone, Copy, Default)]
pub struct UdpProfile;

impl Profile for UdpProfile {
    fn id(&self) -> ProfileId {
        ProfileId::Udp
    }

    fn name(&self) -> &'static str {
        "UDP"
    }

    fn check_applicability(&self, view: &PacketView, _rtp_ports: &[u16]) -> bool {
        match view {
            PacketView::V4(v) => !v.is_fragmented() && v.protocol() == ip::protocol::UDP,
            PacketView::V6(v) => {
                !v.is_fragmented() && v.next_layer().map(|(p, _)| p) == Ok(ip::protocol::UDP)
            }
            _ => false,
        }
    }

    fn context_key(&self, view: &PacketView) -> u64 {
        let base = context_key_ip(view);
        let payload = match view {
            PacketView::V4(v) => v.payload(),
            PacketView::V6(v) => v.next_layer().map(|(_, p)| p).unwrap_or(&[]),
            _ => &[],
        };
        if payload.len() < 4 {
            return base;
        }
        let src_port = u16::from_be_bytes([payload[0], payload[1]]);
        let dst_port = u16::from_be_bytes([payload[2], payload[3]]);
        base ^ ((src_port as u64) << 16) ^ dst_port as u64
    }

    fn sn_field_name(&self) -> &'static str {
        "ip_id"
    }

    fn extract(&mut self, view: &PacketView) -> Result<FieldSet, Error> {
        let (ip_header_len, bytes, ip_id, is_ipv4) = match view {
            PacketView::V4(v) => (v.ihl() as usize * 4, v.as_bytes(), v.identification() as u32, true),
            PacketView::V6(v) => (40, v.as_bytes(), 0, false),
            _ => return Err(Error::NotCompressible),
        };

        if bytes.len() < ip_header_len + 8 {
            return Err(Error::Malformed("UDP header truncated".into()));
        }

        let template = bytes[..ip_header_len + 8].to_vec();
        let mut lsb_fields = vec![];
        if is_ipv4 {
            lsb_fields.push(LsbField {
                name: "ip_id",
                value: ip_id,
                width: 16,
                shift: shift::IP_ID,
                offset: 4,
                byte_len: 2,
            });
        }

        Ok(FieldSet {
            template,
            lsb_fields,
            sn: ip_id,
            static_key: 0,
            is_ipv4,
        })
    }

    fn reconstruct(&self, fields: &FieldSet) -> Vec<u8> {
        super::reconstruct_from_template(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_udp() -> Vec<u8> {
        let mut bytes = vec![
            0x45, 0x00, 0x00, 0x1C, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 192, 168, 0,
            1, 192, 168, 0, 2,
        ];
        bytes.extend_from_slice(&[0x04, 0xD2, 0x00, 0x50, 0x00, 0x08, 0x00, 0x00]);
        bytes
    }

    #[test]
    fn applicable_to_udp_only() {
        let bytes = ipv4_udp();
        let view = PacketView::parse(&bytes);
        assert!(UdpProfile.check_applicability(&view, &[]));
    }

    #[test]
    fn context_key_includes_ports() {
        let bytes = ipv4_udp();
        let view = PacketView::parse(&bytes);
        let key_a = UdpProfile.context_key(&view);

        let mut other = bytes.clone();
        other[22] = 0x51; // change dst port
        let view_b = PacketView::parse(&other);
        let key_b = UdpProfile.context_key(&view_b);

        assert_ne!(key_a, key_b);
    }
}
