//! Profile 0x0001 — RTP. IP/UDP plus the 12-byte(+) RTP header; SN is the
//! RTP sequence number, and the 32-bit RTP timestamp is tracked by a
//! [`ScaledTs`] sub-context so steady-state packets carry `ts_scaled`
//! instead of the raw TS.

use codec::ip::{self, PacketView};
use codec::wlsb::shift;

use super::ip_only::context_key_ip;
use super::{FieldSet, LsbField, Profile, ProfileId};
use crate::error::Error;
use crate::scaled_ts::ScaledTs;

const RTP_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Default)]
pub struct RtpProfile {
    scaled_ts: ScaledTs,
}

impl RtpProfile {
    pub fn scaled_ts(&self) -> &ScaledTs {
        &self.scaled_ts
    }

    /// Keeps the decompressor's scaled-TS sub-context in lockstep with the
    /// compressor's by feeding it every reconstructed timestamp, mirroring
    /// the bookkeeping [`Profile::extract`] does on the compressor side.
    pub fn observe_ts(&mut self, ts: u32) {
        self.scaled_ts.observe(ts);
    }
}

impl Profile for RtpProfile {
    fn id(&self) -> ProfileId {
        ProfileId::Rtp
    }

    fn name(&self) -> &'static str {
        "RTP"
    }

    fn check_applicability(&self, view: &PacketView, rtp_ports: &[u16]) -> bool {
        let (is_udp, payload) = match view {
            PacketView::V4(v) if !v.is_fragmented() && v.protocol() == ip::protocol::UDP => {
                (true, v.payload())
            }
            PacketView::V6(v) if !v.is_fragmented() => match v.next_layer() {
                Ok((p, rest)) if p == ip::protocol::UDP => (true, rest),
                _ => (false, &[][..]),
            },
            _ => (false, &[][..]),
        };

        if !is_udp || payload.len() < 8 + RTP_HEADER_LEN {
            return false;
        }

        let dst_port = u16::from_be_bytes([payload[2], payload[3]]);
        rtp_ports.contains(&dst_port)
    }

    fn context_key(&self, view: &PacketView) -> u64 {
        let base = context_key_ip(view);
        let payload = udp_payload(view);
        if payload.len() < 8 + RTP_HEADER_LEN {
            return base;
        }
        let rtp = &payload[8..];
        let ssrc = u32::from_be_bytes([rtp[8], rtp[9], rtp[10], rtp[11]]);
        base ^ ssrc as u64
    }

    fn sn_field_name(&self) -> &'static str {
        "rtp_sn"
    }

    fn extract(&mut self, view: &PacketView) -> Result<FieldSet, Error> {
        let (ip_header_len, bytes, ip_id, is_ipv4) = match view {
            PacketView::V4(v) => (v.ihl() as usize * 4, v.as_bytes(), v.identification() as u32, true),
            PacketView::V6(v) => (40, v.as_bytes(), 0, false),
            _ => return Err(Error::NotCompressible),
        };

        let rtp_offset = ip_header_len + 8;
        if bytes.len() < rtp_offset + RTP_HEADER_LEN {
            return Err(Error::Malformed("RTP header truncated".into()));
        }

        let template = bytes[..rtp_offset + RTP_HEADER_LEN].to_vec();
        let rtp = &template[rtp_offset..];
        let sequence = u16::from_be_bytes([rtp[2], rtp[3]]) as u32;
        let timestamp = u32::from_be_bytes([rtp[4], rtp[5], rtp[6], rtp[7]]);

        self.scaled_ts.observe(timestamp);

        let mut lsb_fields = vec![LsbField {
            name: "rtp_sn",
            value: sequence,
            width: 16,
            shift: shift::SN,
            offset: rtp_offset + 2,
            byte_len: 2,
        }];

        if let Some(scaled) = self.scaled_ts.scale(timestamp) {
            lsb_fields.push(LsbField {
                name: "ts_scaled",
                value: scaled,
                width: 32,
                shift: shift::TS_SCALED,
                offset: rtp_offset + 4,
                byte_len: 4,
            });
        } else {
            lsb_fields.push(LsbField {
                name: "ts",
                value: timestamp,
                width: 32,
                shift: shift::rtp_ts(32),
                offset: rtp_offset + 4,
                byte_len: 4,
            });
        }

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
            sn: sequence,
            static_key: 0,
            is_ipv4,
        })
    }

    fn reconstruct(&self, fields: &FieldSet) -> Vec<u8> {
        // `ts_scaled` must be unscaled back to a real timestamp before the
        // shared patch-and-checksum path runs.
        let mut fields = fields.clone();
        if let Some(idx) = fields.lsb_fields.iter().position(|f| f.name == "ts_scaled") {
            if let Some(ts) = self.scaled_ts.unscale(fields.lsb_fields[idx].value) {
                fields.lsb_fields[idx] = LsbField {
                    name: "ts",
                    value: ts,
                    ..fields.lsb_fields[idx]
                };
            }
        }
        super::reconstruct_from_template(&fields)
    }
}

fn udp_payload<'a>(view: &PacketView<'a>) -> &'a [u8] {
    match view {
        PacketView::V4(v) => v.payload(),
        PacketView::V6(v) => v.next_layer().map(|(_, p)| p).unwrap_or(&[]),
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4_rtp(seq: u16, ts: u32) -> Vec<u8> {
        let mut bytes = vec![
            0x45, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 192, 168, 0,
            1, 192, 168, 0, 2,
        ];
        bytes.extend_from_slice(&[0x04, 0xD2, 0x04, 0xD2, 0x00, 0x14, 0x00, 0x00]);
        bytes.push(0x80); // V=2
        bytes.push(0x00); // PT=0
        bytes.extend_from_slice(&seq.to_be_bytes());
        bytes.extend_from_slice(&ts.to_be_bytes());
        bytes.extend_from_slice(&0xAABBCCDDu32.to_be_bytes()); // SSRC
        let total_len = bytes.len() as u16;
        bytes[2..4].copy_from_slice(&total_len.to_be_bytes());
        bytes
    }

    #[test]
    fn applicable_when_dst_port_allow_listed() {
        let bytes = ipv4_rtp(1, 1000);
        let view = PacketView::parse(&bytes);
        assert!(RtpProfile::default().check_applicability(&view, &[0x04D2]));
        assert!(!RtpProfile::default().check_applicability(&view, &[9999]));
    }

    #[test]
    fn sn_round_trips_through_extract_and_reconstruct() {
        let mut profile = RtpProfile::default();
        for seq in 0..4u16 {
            let bytes = ipv4_rtp(seq, 1000 + seq as u32 * 160);
            let view = PacketView::parse(&bytes);
            let fields = profile.extract(&view).unwrap();
            assert_eq!(fields.sn, seq as u32);
            let rebuilt = profile.reconstruct(&fields);
            assert_eq!(rebuilt.len(), bytes.len());
        }
    }
}
