//! Profile 0x0000 — Uncompressed. No header compression at all; exists so
//! a flow the other profiles reject still gets ROHC framing (CID, SN,
//! feedback) without losing any bytes.

use codec::ip::PacketView;

use super::{FieldSet, Profile, ProfileId};
use crate::error::Error;

#[derive(Debug, Clone, Copy, Default)]
pub struct UncompressedProfile;

impl Profile for UncompressedProfile {
    fn id(&self) -> ProfileId {
        ProfileId::Uncompressed
    }

    fn name(&self) -> &'static str {
        "Uncompressed"
    }

    fn check_applicability(&self, _view: &PacketView, _rtp_ports: &[u16]) -> bool {
        // Always applicable: the profile of last resort.
        true
    }

    fn context_key(&self, view: &PacketView) -> u64 {
        // No flow classification: every packet shares one context key, so
        // one context serves the whole uncompressed stream.
        let _ = view;
        0
    }

    fn sn_field_name(&self) -> &'static str {
        ""
    }

    fn extract(&mut self, view: &PacketView) -> Result<FieldSet, Error> {
        Ok(FieldSet {
            template: view.as_bytes().to_vec(),
            lsb_fields: Vec::new(),
            sn: 0,
            static_key: 0,
            is_ipv4: false,
        })
    }

    fn reconstruct(&self, fields: &FieldSet) -> Vec<u8> {
        fields.template.clone()
    }
}
