//! Context Identifier (CID) wire encoding, RFC 3095 §4.3.
//!
//! A small CID in `[0, 15]` is either implicit (CID 0, no prefix octet at
//! all) or carried in an Add-CID octet `1110 cid[3:0]`. A large CID in
//! `[0, 16383]` is always carried as an SDVL integer, regardless of value.

use crate::{Error, sdvl};

pub const ADD_CID_PREFIX: u8 = 0xE0;
pub const SMALL_CID_MAX: u16 = 15;
pub const LARGE_CID_MAX: u16 = 16383;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CidSpace {
    Small,
    Large,
}

/// Encodes `cid` as the (possibly empty) prefix that precedes the ROHC
/// packet bytes. CID 0 in the small space needs no octet at all.
pub fn encode_prefix(space: CidSpace, cid: u16) -> Result<Vec<u8>, Error> {
    match space {
        CidSpace::Small => {
            if cid > SMALL_CID_MAX {
                return Err(Error::InvalidInput);
            }
            if cid == 0 {
                Ok(Vec::new())
            } else {
                Ok(vec![ADD_CID_PREFIX | cid as u8])
            }
        }
        CidSpace::Large => {
            if cid > LARGE_CID_MAX {
                return Err(Error::InvalidInput);
            }
            sdvl::encode(cid as u32, 0)
        }
    }
}

/// Extracts the CID prefix (if any) from the front of `bytes`.
///
/// Returns `(cid, consumed_octets)`. In the small-CID space, a leading
/// Add-CID octet (`0xE1`..=`0xEF`) is consumed and its low nibble is the
/// CID; any other leading byte implies CID 0 and consumes nothing. In the
/// large-CID space, an SDVL integer is always present and always consumed.
pub fn decode_prefix(space: CidSpace, bytes: &[u8]) -> Result<(u16, usize), Error> {
    match space {
        CidSpace::Small => {
            if let Some(&first) = bytes.first() {
                if first & 0xF0 == ADD_CID_PREFIX && first != ADD_CID_PREFIX {
                    return Ok(((first & 0x0F) as u16, 1));
                }
            }
            Ok((0, 0))
        }
        CidSpace::Large => {
            let (value, len) = sdvl::decode(bytes)?;
            if value > LARGE_CID_MAX as u32 {
                return Err(Error::InvalidInput);
            }
            Ok((value as u16, len))
        }
    }
}
