use std::fmt::Display;

/// A 32-bit sequence number as it appears on the wire.
///
/// Wire sequence numbers wrap around a per-direction zero point (the ISN),
/// so a `SeqNo` is only meaningful relative to that zero point and a nearby
/// 64-bit stream position.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeqNo(u32);

impl SeqNo {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The sequence number `n` slots further along, wrapping.
    pub const fn offset(self, n: u32) -> Self {
        Self(self.0.wrapping_add(n))
    }

    /// Maps an absolute 64-bit stream position onto the wire, relative to
    /// `zero`.
    pub fn wrap(abs: u64, zero: SeqNo) -> Self {
        Self((abs as u32).wrapping_add(zero.0))
    }

    /// Resolves this wire sequence number back to the absolute 64-bit
    /// position closest to `checkpoint`, relative to `zero`.
    ///
    /// The result is never negative: when the nearest candidate would lie
    /// before position zero, the candidate one wraparound later is returned
    /// instead.
    pub fn unwrap(self, zero: SeqNo, checkpoint: u64) -> u64 {
        let off = self.0.wrapping_sub(zero.0);
        let delta = off.wrapping_sub(checkpoint as u32) as i32;

        if delta >= 0 {
            checkpoint.wrapping_add(delta as u64)
        } else {
            let back = u64::from(delta.unsigned_abs());
            if checkpoint >= back {
                checkpoint - back
            } else {
                checkpoint + (1 << 32) - back
            }
        }
    }
}

impl Display for SeqNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_at_zero_point() {
        assert_eq!(SeqNo::wrap(0, SeqNo::new(0)), SeqNo::new(0));
        assert_eq!(SeqNo::wrap(0, SeqNo::new(347)), SeqNo::new(347));
        assert_eq!(SeqNo::wrap(17, SeqNo::new(100)), SeqNo::new(117));
        assert_eq!(SeqNo::wrap((1 << 32) + 17, SeqNo::new(100)), SeqNo::new(117));
        assert_eq!(
            SeqNo::wrap(u64::from(u32::MAX) + 1, SeqNo::new(5)),
            SeqNo::new(5)
        );
    }

    #[test]
    fn unwrap_near_checkpoint() {
        assert_eq!(SeqNo::new(0).unwrap(SeqNo::new(0), 0), 0);
        assert_eq!(
            SeqNo::new(117).unwrap(SeqNo::new(100), (1 << 32) - 10),
            (1 << 32) + 17
        );
        // The candidate just past the third wraparound is the closest one.
        assert_eq!(
            SeqNo::new(10).unwrap(SeqNo::new(0), 3 * (1 << 32)),
            3 * (1 << 32) + 10
        );
    }

    #[test]
    fn unwrap_never_negative() {
        // The nearest candidate would be negative; the next wraparound wins.
        let w = SeqNo::wrap(u64::from(u32::MAX), SeqNo::new(0));
        assert_eq!(w.unwrap(SeqNo::new(0), 0), u64::from(u32::MAX));

        let w = SeqNo::new(u32::MAX - 5).offset(10);
        let abs = w.unwrap(SeqNo::new(u32::MAX - 5), 0);
        assert_eq!(abs, 10);
    }

    #[test]
    fn unwrap_inverts_wrap() {
        let cases: &[(u64, u32)] = &[
            (0, 0),
            (1, 0),
            (12, u32::MAX - 3),
            (u64::from(u32::MAX), 17),
            (u64::from(u32::MAX) + 1, 17),
            ((1 << 40) + 1234, 0xdead_beef),
            ((1 << 63) + 7, 99),
        ];
        for &(abs, zero) in cases {
            let zero = SeqNo::new(zero);
            assert_eq!(SeqNo::wrap(abs, zero).unwrap(zero, abs), abs);
        }
    }

    #[test]
    fn unwrap_stays_close() {
        let zero = SeqNo::new(0xcafe);
        for &checkpoint in &[1u64 << 31, 1 << 32, (1 << 45) + 12345] {
            for &raw in &[0u32, 1, 0xcafe, 0x8000_0000, u32::MAX] {
                let abs = SeqNo::new(raw).unwrap(zero, checkpoint);
                assert!(abs.abs_diff(checkpoint) <= 1 << 31);
            }
        }
    }
}
