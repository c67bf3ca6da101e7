use crate::bitwise::Bits;
use crate::cpu::condition::Condition;

/// A raw 32-bit ARM instruction word. Fields are read by position, the
/// word itself is never modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmModeOpcode(u32);

impl ArmModeOpcode {
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn condition(self) -> Condition {
        Condition::from(self.0.get_bits(28..=31))
    }

    /// Bits 27-20 followed by bits 7-4: the lookup table index.
    #[must_use]
    pub const fn discriminant(self) -> usize {
        (((self.0 >> 16) & 0xFF0) | ((self.0 >> 4) & 0xF)) as usize
    }

    /// Register index stored in the nibble starting at `lsb`.
    #[must_use]
    pub fn register(self, lsb: u8) -> usize {
        self.0.get_bits(lsb..=lsb + 3) as usize
    }
}

impl From<u32> for ArmModeOpcode {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl std::ops::Deref for ArmModeOpcode {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ArmModeOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}
