//! Window-based Least-Significant-Bits (W-LSB) encoding, RFC 3095 §4.5.1.
//!
//! A [`Window`] remembers the last few values a field took (keyed by the
//! sender's sequence number) so that [`encode`] can pick the smallest
//! number of low-order bits `k` that still lets every remembered value be
//! reconstructed unambiguously, and [`decode`] can invert a received `k`-bit
//! fragment back into the full value using the decompressor's reference.

use std::collections::VecDeque;

use crate::Error;

/// Shift parameter policy fixed by the profiles (RFC 3095 §4.5.1, §5.7).
pub mod shift {
    /// IP-ID and SN: the interpretation interval is biased towards the past.
    pub const SN: i64 = -1;
    pub const IP_ID: i64 = -1;
    /// TS_SCALED: same bias as SN.
    pub const TS_SCALED: i64 = -1;

    /// RTP TS: biased towards the future, asymmetric by design (RFC 3095
    /// §4.5.3) because timestamps climb monotonically between packets.
    pub fn rtp_ts(k: u32) -> i64 {
        (1i64 << k.saturating_sub(2)) - 1
    }
}

/// A sliding window of up to `width` `(reference_value, sequence_number)`
/// pairs for one compressible field.
#[derive(Debug, Clone)]
pub struct Window {
    width: usize,
    entries: VecDeque<(u32, u16)>,
}

impl Window {
    pub fn new(width: usize) -> Self {
        assert!(width > 0, "W-LSB window width must be non-zero");
        Self {
            width,
            entries: VecDeque::with_capacity(width),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Records a newly committed `(value, sn)` pair, evicting the oldest
    /// entry if the window is full.
    pub fn add(&mut self, value: u32, sn: u16) {
        if self.entries.len() == self.width {
            self.entries.pop_front();
        }
        self.entries.push_back((value, sn));
    }

    /// Removes every entry whose sequence number is `<= sn` (RFC 3095
    /// acknowledgment pruning — late feedback narrows the window back down).
    pub fn ack(&mut self, sn: u16) {
        self.entries.retain(|&(_, entry_sn)| entry_sn > sn);
    }

    /// Finds the smallest `k` in `0..=field_bits` such that `value` decodes
    /// unambiguously against every entry currently in the window.
    ///
    /// `p` may depend on `k` for RTP TS (see [`shift::rtp_ts`]); callers
    /// pass a closure so the shift can be recomputed per candidate `k`.
    pub fn encode_k(
        &self,
        value: u32,
        field_bits: u32,
        p_for_k: impl Fn(u32) -> i64,
    ) -> Result<u32, Error> {
        if self.entries.is_empty() {
            return Err(Error::EmptyWindow);
        }

        for k in 0..=field_bits {
            let p = p_for_k(k);
            if self
                .entries
                .iter()
                .all(|&(r, _)| in_interval(value, r, k, p, field_bits))
            {
                return Ok(k);
            }
        }

        Err(Error::LsbOutOfRange)
    }
}

/// Checks whether `value` lies in the circular interval
/// `[r - p, r + (2^k - 1 - p)]` modulo `2^field_bits`.
fn in_interval(value: u32, r: u32, k: u32, p: i64, field_bits: u32) -> bool {
    if field_bits == 0 || field_bits > 32 || k > field_bits {
        return false;
    }

    let modulus: u64 = 1u64 << field_bits;
    let lo = (r as i64 - p).rem_euclid(modulus as i64) as u64;
    let span: u64 = 1u64 << k;
    let offset = (value as u64 + modulus - lo % modulus) % modulus;
    offset < span
}

/// Encodes `value`'s low `k` bits as carried on the wire.
pub fn mask(value: u32, k: u32) -> u32 {
    if k >= 32 {
        value
    } else {
        value & ((1u32 << k) - 1)
    }
}

/// Decodes a received `k`-bit fragment `m` against reference `r` and shift
/// `p`, returning the unique `field_bits`-wide value congruent to `m` modulo
/// `2^k` inside the interpretation interval.
pub fn decode(m: u32, k: u32, r: u32, p: i64, field_bits: u32) -> Result<u32, Error> {
    if field_bits == 0 || field_bits > 32 || k > field_bits {
        return Err(Error::LsbOutOfRange);
    }

    if k == field_bits {
        return Ok(m);
    }

    let modulus: u64 = 1u64 << field_bits;
    let span: u64 = 1u64 << k;
    let lo = (r as i64 - p).rem_euclid(modulus as i64) as u64;

    let base_low_bits = lo % span;
    let m = m as u64 % span;
    let offset = (m + span - base_low_bits) % span;
    let candidate = (lo + offset) % modulus;

    Ok(candidate as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_across_widths() {
        for field_bits in [4u32, 8, 16, 32] {
            let modulus: u64 = 1u64 << field_bits;
            let mut window = Window::new(4);
            let mut reference = (100u64 % modulus) as u32;
            window.add(reference, 0);

            for sn in 1..200u16 {
                let next = ((reference as u64 + 1) % modulus) as u32;
                let k = window
                    .encode_k(next, field_bits, |_| shift::SN)
                    .expect("encodable");
                let m = mask(next, k);
                let decoded =
                    decode(m, k, reference, shift::SN, field_bits).expect("decodable");
                assert_eq!(decoded, next, "field_bits={field_bits} sn={sn}");

                window.add(next, sn);
                reference = next;
            }
        }
    }

    #[test]
    fn ack_prunes_old_entries() {
        let mut w = Window::new(4);
        w.add(1, 1);
        w.add(2, 2);
        w.add(3, 3);
        w.ack(2);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn empty_window_cannot_encode() {
        let w = Window::new(4);
        assert!(matches!(
            w.encode_k(1, 16, |_| shift::SN),
            Err(Error::EmptyWindow)
        ));
    }

    #[test]
    fn window_evicts_oldest_beyond_width() {
        let mut w = Window::new(2);
        w.add(1, 1);
        w.add(2, 2);
        w.add(3, 3);
        assert_eq!(w.len(), 2);
        assert_eq!(w.entries.front().copied(), Some((2, 2)));
    }
}
