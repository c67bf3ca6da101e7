//! # Memory bus
//!
//! The core talks to memory only through [`Bus`]. Accesses are little-endian
//! and force-aligned to their width, the way the ARM7TDMI drives the address
//! lines. Loads that must observe the misalignment (LDR, LDRH) go through the
//! `read_rotate_*` helpers instead.

use crate::bitwise::Bits;

pub trait Bus {
    fn read_byte(&mut self, address: u32) -> u8;

    fn write_byte(&mut self, address: u32, value: u8);

    fn read_half_word(&mut self, address: u32) -> u16 {
        let address = address & !1;
        let low = self.read_byte(address);
        let high = self.read_byte(address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    fn write_half_word(&mut self, address: u32, value: u16) {
        let address = address & !1;
        let [low, high] = value.to_le_bytes();
        self.write_byte(address, low);
        self.write_byte(address.wrapping_add(1), high);
    }

    fn read_word(&mut self, address: u32) -> u32 {
        let address = address & !3;
        let low = self.read_half_word(address);
        let high = self.read_half_word(address.wrapping_add(2));
        u32::from(low) | (u32::from(high) << 16)
    }

    fn write_word(&mut self, address: u32, value: u32) {
        let address = address & !3;
        self.write_half_word(address, value.get_bits(0..=15) as u16);
        self.write_half_word(address.wrapping_add(2), value.get_bits(16..=31) as u16);
    }

    /// Word load as LDR sees it: the aligned word rotated right by
    /// 8 bits for every byte of misalignment.
    fn read_rotate_word(&mut self, address: u32) -> u32 {
        let rotation = (address & 3) * 8;
        self.read_word(address).rotate_right(rotation)
    }

    /// Halfword load as LDRH sees it: an odd address rotates the aligned
    /// halfword right by 8 inside the 32-bit register.
    fn read_rotate_half_word(&mut self, address: u32) -> u32 {
        let rotation = (address & 1) * 8;
        u32::from(self.read_half_word(address)).rotate_right(rotation)
    }
}

/// Flat little-endian RAM starting at address 0.
///
/// Reads outside the buffer return 0 and writes outside it are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatMemory {
    data: Vec<u8>,
}

impl FlatMemory {
    /// Default size, big enough for the vectors and a small program.
    pub const DEFAULT_SIZE: usize = 0x1_0000;

    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Builds a memory holding `words` from address 0.
    #[must_use]
    pub fn with_program(size: usize, words: &[u32]) -> Self {
        let mut memory = Self::new(size);
        for (address, word) in (0_u32..).step_by(4).zip(words) {
            memory.write_word(address, *word);
        }
        memory
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

impl Bus for FlatMemory {
    fn read_byte(&mut self, address: u32) -> u8 {
        let Some(value) = usize::try_from(address)
            .ok()
            .and_then(|idx| self.data.get(idx))
        else {
            tracing::warn!("read from unmapped address 0x{address:08X}");
            return 0;
        };

        *value
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        match usize::try_from(address)
            .ok()
            .and_then(|idx| self.data.get_mut(idx))
        {
            Some(slot) => *slot = value,
            None => tracing::warn!("write to unmapped address 0x{address:08X} dropped"),
        }
    }
}
