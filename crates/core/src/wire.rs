//! Body encoding for the five ROHC packet families this endpoint emits,
//! layered on top of `codec`'s prefix/CRC/LSB primitives (the CID prefix
//! itself is handled by `codec::cid`, one layer up, not here).
//!
//! IR and IR-DYN share a layout (profile id, sender sequence number, CRC-8,
//! then the full reconstructed header as a length-prefixed blob) since this
//! codebase's [`crate::profile::FieldSet`] does not separate a static chain
//! from a dynamic chain (bit-exact private layout is a Non-goal). UO-0/UO-1
//! carry only the SN's low bits plus a CRC; UOR-2 additionally appends an
//! 8-bit LSB fragment of every non-SN field the active profile tracks, in
//! the fixed order the profile's `FieldSet::lsb_fields` already uses, so no
//! presence bitmap is needed on the wire — the decompressor knows exactly
//! how many extra octets to expect from its own profile.

use crate::error::Error;

pub struct IrBody {
    pub profile_id: u8,
    pub sn: u16,
    pub crc8: u8,
    pub template: Vec<u8>,
}

pub fn encode_ir(prefix: u8, profile_id: u8, sn: u16, crc8: u8, template: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(7 + template.len());
    out.push(prefix);
    out.push(profile_id);
    out.extend_from_slice(&sn.to_be_bytes());
    out.push(crc8);
    out.extend_from_slice(&(template.len() as u16).to_be_bytes());
    out.extend_from_slice(template);
    out
}

pub fn decode_ir(bytes: &[u8]) -> Result<IrBody, Error> {
    if bytes.len() < 7 {
        return Err(Error::Malformed("IR/IR-DYN packet truncated".into()));
    }
    let profile_id = bytes[1];
    let sn = u16::from_be_bytes([bytes[2], bytes[3]]);
    let crc8 = bytes[4];
    let len = u16::from_be_bytes([bytes[5], bytes[6]]) as usize;
    let template = bytes
        .get(7..7 + len)
        .ok_or_else(|| Error::Malformed("IR/IR-DYN template truncated".into()))?
        .to_vec();
    Ok(IrBody {
        profile_id,
        sn,
        crc8,
        template,
    })
}

/// `0 SN[3:0] CRC3[2:0]`, one octet (`codec::packet::identify`'s
/// `0x00..=0x7F` range).
pub fn encode_uo0(sn_lsb4: u8, crc3: u8) -> [u8; 1] {
    [((sn_lsb4 & 0x0F) << 3) | (crc3 & 0x07)]
}

/// Returns `(sn_lsb4, crc3)`.
pub fn decode_uo0(byte0: u8) -> (u8, u8) {
    ((byte0 >> 3) & 0x0F, byte0 & 0x07)
}

/// `10 SN[5:0]`, then a trailing CRC-3 octet. Always 2 bytes.
pub fn encode_uo1(sn_lsb6: u8, crc3: u8) -> [u8; 2] {
    [0x80 | (sn_lsb6 & 0x3F), crc3 & 0x07]
}

/// Reads only the first two octets; any bytes past them are the original
/// packet's trailing payload, not part of this fixed-size packet type, so
/// `bytes` is allowed to be longer than 2 (the caller slices off the
/// trailing payload separately once this returns).
pub fn decode_uo1(bytes: &[u8]) -> Result<(u8, u8), Error> {
    if bytes.len() < 2 {
        return Err(Error::Malformed("UO-1 packet truncated".into()));
    }
    Ok((bytes[0] & 0x3F, bytes[1] & 0x07))
}

/// `110 SN[4:0]`, a trailing CRC-7 octet, and zero or more extra octets in
/// between — one 8-bit LSB fragment per non-SN field the profile tracks, in
/// `FieldSet::lsb_fields` order.
pub fn encode_uor2(sn_lsb5: u8, extra: &[u8], crc7: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + extra.len());
    out.push(0xC0 | (sn_lsb5 & 0x1F));
    out.extend_from_slice(extra);
    out.push(crc7 & 0x7F);
    out
}

/// Returns `(sn_lsb5, extra_bytes, crc7)`. `extra_len` is the number of
/// non-SN fields the decompressor's active profile tracks — unlike UO-0/
/// UO-1, a UOR-2 body has no fixed length of its own, so the CRC-7 octet
/// can only be found by the caller telling us how many extra octets sit in
/// front of it; anything after is this packet's trailing payload, not part
/// of the UOR-2 body.
pub fn decode_uor2(bytes: &[u8], extra_len: usize) -> Result<(u8, &[u8], u8), Error> {
    let header_len = 2 + extra_len;
    if bytes.len() < header_len {
        return Err(Error::Malformed("UOR-2 packet truncated".into()));
    }
    let sn_lsb = bytes[0] & 0x1F;
    let extra = &bytes[1..1 + extra_len];
    let crc7 = bytes[1 + extra_len] & 0x7F;
    Ok((sn_lsb, extra, crc7))
}
