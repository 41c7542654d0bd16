//! Profile 0x0003 — ESP. SPI is static and set once at context creation;
//! because [`Profile::context_key`] folds SPI in, a flow that starts using
//! a new SPI simply fails to match the old context and gets a fresh one,
//! rather than forcing an IR-refresh of the old context with a changed
//! static field (`src/comp/c_esp.c` in the reference implementation).
//! ESP's own sequence number — not IP-ID — is the SN source.

use codec::ip::{self, PacketView};
use codec::wlsb::shift;

use super::ip_only::context_key_ip;
use super::{FieldSet, LsbField, Profile, ProfileId};
use crate::error::Error;

const ESP_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct EspProfile;

impl Profile for EspProfile {
    fn id(&self) -> ProfileId {
        ProfileId::Esp
    }

    fn name(&self) -> &'static str {
        "ESP"
    }

    fn check_applicability(&self, view: &PacketView, _rtp_ports: &[u16]) -> bool {
        match view {
            PacketView::V4(v) => !v.is_fragmented() && v.protocol() == ip::protocol::ESP,
            PacketView::V6(v) => {
                !v.is_fragmented() && v.next_layer().map(|(p, _)| p) == Ok(ip::protocol::ESP)
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
        let spi = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        base ^ ((spi as u64) << 1)
    }

    fn sn_field_name(&self) -> &'static str {
        "esp_sn"
    }

    fn extract(&mut self, view: &PacketView) -> Result<FieldSet, Error> {
        let (ip_header_len, bytes, ip_id, is_ipv4) = match view {
            PacketView::V4(v) => (v.ihl() as usize * 4, v.as_bytes(), v.identification() as u32, true),
            PacketView::V6(v) => (40, v.as_bytes(), 0, false),
            _ => return Err(Error::NotCompressible),
        };
        let _ = ip_id;

        let esp_offset = ip_header_len;
        if bytes.len() < esp_offset + ESP_HEADER_LEN {
            return Err(Error::Malformed("ESP header truncated".into()));
        }

        let template = bytes[..esp_offset + ESP_HEADER_LEN].to_vec();
        let spi = u32::from_be_bytes([
            template[esp_offset],
            template[esp_offset + 1],
            template[esp_offset + 2],
            template[esp_offset + 3],
        ]);
        let sn = u32::from_be_bytes([
            template[esp_offset + 4],
            template[esp_offset + 5],
            template[esp_offset + 6],
            template[esp_offset + 7],
        ]);

        let lsb_fields = vec![LsbField {
            name: "esp_sn",
            value: sn,
            width: 32,
            shift: shift::SN,
            offset: esp_offset + 4,
            byte_len: 4,
        }];

        Ok(FieldSet {
            template,
            lsb_fields,
            sn,
            static_key: spi as u64,
            is_ipv4,
        })
    }

    fn reconstruct(&self, fields: &FieldSet) -> Vec<u8> {
        super::reconstruct_from_template(fields)
    }
}
