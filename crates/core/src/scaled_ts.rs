//! Scaled-RTP-Timestamp sub-context, RFC 3095 §4.5.3 / RFC 4815 §4.4.3.
//!
//! Once a stable `ts_stride` is learned, the wire only needs to carry
//! `ts_scaled = (ts - ts_offset) / ts_stride`, which is usually far fewer
//! bits than the raw 32-bit TS. `ts_delta` is computed as an explicit
//! unsigned wrapping subtraction — not a signed `abs()` — so that a TS
//! that wraps around `u32::MAX` is still handled the same way as any other
//! step (RFC 4815 §4.4.3).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubState {
    InitTs,
    InitStride,
    SendScaled,
}

#[derive(Debug, Clone)]
pub struct ScaledTs {
    state: SubState,
    ts_stride: u32,
    ts_offset: u32,
    last_ts: Option<u32>,
    /// Consecutive packets seen with the same candidate stride, required
    /// before trusting it enough to leave `InitStride`.
    stride_confirmations: u32,
    candidate_stride: Option<u32>,
}

/// Number of consecutive matching deltas required before a stride is
/// trusted (RFC 4815 recommends at least 2 to rule out a one-off jitter).
const STRIDE_CONFIRM_THRESHOLD: u32 = 2;

impl Default for ScaledTs {
    fn default() -> Self {
        Self {
            state: SubState::InitTs,
            ts_stride: 0,
            ts_offset: 0,
            last_ts: None,
            stride_confirmations: 0,
            candidate_stride: None,
        }
    }
}

impl ScaledTs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubState {
        self.state
    }

    pub fn ts_stride(&self) -> u32 {
        self.ts_stride
    }

    /// Unsigned wrapping delta between two timestamps. Never a signed
    /// `abs()` — see the module docs.
    pub fn ts_delta(new_ts: u32, old_ts: u32) -> u32 {
        new_ts.wrapping_sub(old_ts)
    }

    /// Feeds the next observed TS through the sub-state machine, updating
    /// `ts_stride`/`ts_offset` and returning whether `ts` is currently
    /// representable as `ts_scaled` (i.e. we are in `SendScaled`).
    pub fn observe(&mut self, ts: u32) -> bool {
        let Some(last) = self.last_ts else {
            self.last_ts = Some(ts);
            self.state = SubState::InitStride;
            return false;
        };

        let delta = Self::ts_delta(ts, last);
        self.last_ts = Some(ts);

        match self.state {
            // `InitTs` is the pre-first-packet sentinel only: the early
            // return above for `self.last_ts.is_none()` always moves
            // `state` to `InitStride` before this match ever runs, so
            // this arm can never be reached.
            SubState::InitTs => unreachable!("observe() always leaves InitTs on the first call"),
            SubState::InitStride => {
                if delta == 0 {
                    return false;
                }
                match self.candidate_stride {
                    Some(c) if c == delta => {
                        self.stride_confirmations += 1;
                    }
                    _ => {
                        self.candidate_stride = Some(delta);
                        self.stride_confirmations = 1;
                    }
                }

                if self.stride_confirmations >= STRIDE_CONFIRM_THRESHOLD {
                    self.ts_stride = delta;
                    self.ts_offset = ts % delta.max(1);
                    self.state = SubState::SendScaled;
                    true
                } else {
                    false
                }
            }
            SubState::SendScaled => {
                if self.ts_stride == 0 || delta % self.ts_stride != 0 {
                    // Irregular step: fall back to relearning the stride
                    // rather than emitting a wrong scaled value.
                    self.state = SubState::InitStride;
                    self.candidate_stride = Some(delta);
                    self.stride_confirmations = 1;
                    false
                } else {
                    true
                }
            }
        }
    }

    /// `ts_scaled = (ts - ts_offset) / ts_stride`. Only meaningful once
    /// `state() == SendScaled`.
    pub fn scale(&self, ts: u32) -> Option<u32> {
        if self.state != SubState::SendScaled || self.ts_stride == 0 {
            return None;
        }
        Some(ts.wrapping_sub(self.ts_offset) / self.ts_stride)
    }

    /// Inverse of [`Self::scale`].
    pub fn unscale(&self, ts_scaled: u32) -> Option<u32> {
        if self.state != SubState::SendScaled || self.ts_stride == 0 {
            return None;
        }
        Some(ts_scaled.wrapping_mul(self.ts_stride).wrapping_add(self.ts_offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_stride_after_confirmations_and_round_trips() {
        let mut sc = ScaledTs::new();
        let mut ts = 1000u32;
        let stride = 160u32;

        assert!(!sc.observe(ts)); // InitTs -> InitStride, no value yet
        for _ in 0..STRIDE_CONFIRM_THRESHOLD {
            ts += stride;
            sc.observe(ts);
        }

        assert_eq!(sc.state(), SubState::SendScaled);
        assert_eq!(sc.ts_stride(), stride);

        for _ in 0..50 {
            ts += stride;
            assert!(sc.observe(ts));
            let scaled = sc.scale(ts).unwrap();
            assert_eq!(sc.unscale(scaled).unwrap(), ts);
        }
    }

    #[test]
    fn ts_delta_wraps_instead_of_using_abs() {
        assert_eq!(ScaledTs::ts_delta(5, u32::MAX - 2), 8);
        assert_eq!(ScaledTs::ts_delta(u32::MAX - 2, 5), u32::MAX - 7);
    }

    #[test]
    fn irregular_step_relearns_stride() {
        let mut sc = ScaledTs::new();
        let mut ts = 0u32;
        for _ in 0..3 {
            ts += 160;
            sc.observe(ts);
        }
        assert_eq!(sc.state(), SubState::SendScaled);

        ts += 17; // irregular jump
        assert!(!sc.observe(ts));
        assert_eq!(sc.state(), SubState::InitStride);
    }
}
