//! Profile 0x0008 — UDP-Lite. Same shape as UDP but the header's third
//! 16-bit field is a checksum-coverage length, not a payload length, and
//! is tracked as a dynamic field rather than folded into the static chain.

use codec::ip::{self, PacketView};
use codec::wlsb::shift;

use super::ip_only::context_key_ip;
use super::{FieldSet, LsbField, Profile, ProfileId};
use crate::error::Error;

#[derive(Debug, Clone, Copy, Default)]
pub struct UdpLiteProfile;

impl Profile for UdpLiteProfile {
    fn id(&self) -> ProfileId {
        ProfileId::UdpLite
    }

    fn name(&self) -> &'static str {
        "UDP-Lite"
    }

    fn check_applicability(&self, view: &PacketView, _rtp_ports: &[u16]) -> bool {
        match view {
            PacketView::V4(v) => !v.is_fragmented() && v.protocol() == ip::protocol::UDP_LITE,
            PacketView::V6(v) => {
                !v.is_fragmented()
                    && v.next_layer().map(|(p, _)| p) == Ok(ip::protocol::UDP_LITE)
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
            return Err(Error::Malformed("UDP-Lite header truncated".into()));
        }

        let template = bytes[..ip_header_len + 8].to_vec();
        let coverage_len =
            u16::from_be_bytes([template[ip_header_len + 4], template[ip_header_len + 5]]) as u32;

        let mut lsb_fields = vec![LsbField {
            name: "coverage_len",
            value: coverage_len,
            width: 16,
            shift: shift::SN,
            offset: ip_header_len + 4,
            byte_len: 2,
        }];
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
