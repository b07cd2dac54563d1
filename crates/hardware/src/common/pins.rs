//! Pin bus word.
//!
//! A `PinWord` is the (mask, value) pair exchanged between the MCU model and a device.
//! 1. **Mask:** Bits set in `mask` are meaningful for this call.
//! 2. **Value:** Bits outside `mask` are unknown, never implicitly zero.
//! 3. **Positions:** Bit positions are chip-specific and fixed at compile time by each device.

/// A set of pin levels with a validity mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PinWord {
    /// Bits that carry a known level in this word.
    pub mask: u32,
    /// Pin levels; only bits inside `mask` are meaningful.
    pub value: u32,
}

impl PinWord {
    /// A word in which every pin is unknown.
    pub const UNKNOWN: Self = Self { mask: 0, value: 0 };

    /// Creates a word, clearing value bits that fall outside the mask.
    ///
    /// # Arguments
    ///
    /// * `mask` - Bits that are meaningful.
    /// * `value` - Levels of the meaningful bits.
    #[inline]
    pub const fn new(mask: u32, value: u32) -> Self {
        Self {
            mask,
            value: value & mask,
        }
    }

    /// Returns the level of `bit`, or `None` when the bit is not in the mask.
    #[inline]
    pub const fn level(&self, bit: u32) -> Option<bool> {
        if self.mask & (1 << bit) == 0 {
            None
        } else {
            Some(self.value & (1 << bit) != 0)
        }
    }

    /// Returns a copy with `bit` driven to `high`.
    #[must_use]
    pub const fn with_level(self, bit: u32, high: bool) -> Self {
        let m = 1 << bit;
        Self {
            mask: self.mask | m,
            value: if high { self.value | m } else { self.value & !m },
        }
    }

    /// Returns the field `value >> shift & field_mask` if every bit of it is known.
    ///
    /// # Arguments
    ///
    /// * `shift` - Position of the field's least significant bit.
    /// * `field_mask` - Unshifted mask of the field width (e.g. `0xFF`).
    pub const fn field(&self, shift: u32, field_mask: u32) -> Option<u32> {
        if (self.mask >> shift) & field_mask == field_mask {
            Some((self.value >> shift) & field_mask)
        } else {
            None
        }
    }

    /// Returns `true` if no pin is known.
    #[inline]
    pub const fn is_unknown(&self) -> bool {
        self.mask == 0
    }
}
