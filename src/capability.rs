//! Capability detection.
//!
//! A [`Capabilities`] value is a four-bit mask, one bit per optional writer
//! capability. [`Capabilities::detect`] computes it from the probes on
//! [`ResponseWriter`]; the composer in [`crate::delegator`] turns it back into
//! a wrapper with the same shape.

use std::fmt;
use std::ops::BitOr;

use crate::writer::ResponseWriter;

/// Which optional capabilities a response writer supports.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const EMPTY: Self = Self(0);
    pub const FLUSHER: Self = Self(1 << 0);
    pub const HIJACKER: Self = Self(1 << 1);
    pub const READER_FROM: Self = Self(1 << 2);
    pub const PUSHER: Self = Self(1 << 3);
    pub const ALL: Self = Self(0b1111);

    /// Probes `w` once per capability and returns the combined mask.
    ///
    /// The probes only hand out borrows; nothing is written or flushed.
    pub fn detect(w: &mut dyn ResponseWriter) -> Self {
        let mut caps = Self::EMPTY;
        if w.as_flusher().is_some() {
            caps = caps | Self::FLUSHER;
        }
        if w.as_hijacker().is_some() {
            caps = caps | Self::HIJACKER;
        }
        if w.as_reader_from().is_some() {
            caps = caps | Self::READER_FROM;
        }
        if w.as_pusher().is_some() {
            caps = caps | Self::PUSHER;
        }
        caps
    }

    /// Returns `None` if `bits` has anything set outside the four known bits.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::ALL.0 == 0 { Some(Self(bits)) } else { None }
    }

    /// Wraps `bits` as-is, unknown bits included.
    pub const fn from_bits_retain(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Capabilities, &str); 4] = [
            (Capabilities::FLUSHER, "FLUSHER"),
            (Capabilities::HIJACKER, "HIJACKER"),
            (Capabilities::READER_FROM, "READER_FROM"),
            (Capabilities::PUSHER, "PUSHER"),
        ];

        if self.is_empty() {
            return f.write_str("Capabilities(EMPTY)");
        }
        f.write_str("Capabilities(")?;
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        let unknown = self.0 & !Self::ALL.0;
        if unknown != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{unknown:#x}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWriter;

    fn detect_mask<const MASK: u8>() {
        let mut w = MockWriter::<MASK>::new();
        assert_eq!(Capabilities::detect(&mut w).bits(), MASK, "mask {MASK:#06b}");
    }

    #[test]
    fn detects_every_combination() {
        detect_mask::<0>();
        detect_mask::<1>();
        detect_mask::<2>();
        detect_mask::<3>();
        detect_mask::<4>();
        detect_mask::<5>();
        detect_mask::<6>();
        detect_mask::<7>();
        detect_mask::<8>();
        detect_mask::<9>();
        detect_mask::<10>();
        detect_mask::<11>();
        detect_mask::<12>();
        detect_mask::<13>();
        detect_mask::<14>();
        detect_mask::<15>();
    }

    #[test]
    fn detection_is_stable_and_side_effect_free() {
        let mut w = MockWriter::<0b1111>::new();
        let first = Capabilities::detect(&mut w);
        let second = Capabilities::detect(&mut w);
        assert_eq!(first, second);
        assert!(w.calls.is_empty());
    }

    #[test]
    fn from_bits_rejects_unknown_bits() {
        assert_eq!(Capabilities::from_bits(0b1111), Some(Capabilities::ALL));
        assert_eq!(Capabilities::from_bits(0b1_0000), None);
        assert_eq!(Capabilities::from_bits_retain(0b1_0000).bits(), 16);
    }

    #[test]
    fn debug_lists_flag_names() {
        let caps = Capabilities::FLUSHER | Capabilities::PUSHER;
        assert_eq!(format!("{caps:?}"), "Capabilities(FLUSHER | PUSHER)");
        assert_eq!(format!("{:?}", Capabilities::EMPTY), "Capabilities(EMPTY)");
    }
}
