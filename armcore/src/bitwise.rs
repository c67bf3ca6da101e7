use std::ops::RangeInclusive;

/// Contains some helper methods to manipulate bits,
/// the index (`bit_idx`) is supposed to be from lsb to msb (right to left)
pub trait Bits: Copy + Sized {
    fn is_bit_on(&self, bit_idx: u8) -> bool;

    fn is_bit_off(&self, bit_idx: u8) -> bool {
        !self.is_bit_on(bit_idx)
    }

    fn set_bit_on(&mut self, bit_idx: u8);

    fn set_bit_off(&mut self, bit_idx: u8);

    fn set_bit(&mut self, bit_idx: u8, value: bool) {
        if value {
            self.set_bit_on(bit_idx);
        } else {
            self.set_bit_off(bit_idx);
        }
    }

    fn get_bit(&self, bit_idx: u8) -> bool {
        self.is_bit_on(bit_idx)
    }

    /// Returns the bits in `bits_range` (inclusive on both ends) moved down to position 0.
    fn get_bits(&self, bits_range: RangeInclusive<u8>) -> Self;

    /// Checks if a certain sequence of bit is set to 1.
    fn are_bits_on(&self, bits_range: RangeInclusive<u8>) -> bool {
        bits_range.into_iter().all(|idx| self.is_bit_on(idx))
    }

    /// Returns a sign-extended copy of the lowest `number_of_bits` bits.
    fn sign_extended(&self, number_of_bits: u8) -> Self;
}

macro_rules! impl_bits {
    ($($unsigned:ty => $signed:ty),* $(,)?) => {
        $(
            impl Bits for $unsigned {
                fn is_bit_on(&self, bit_idx: u8) -> bool {
                    debug_assert!(u32::from(bit_idx) < <$unsigned>::BITS);
                    (*self >> bit_idx) & 1 == 1
                }

                fn set_bit_on(&mut self, bit_idx: u8) {
                    debug_assert!(u32::from(bit_idx) < <$unsigned>::BITS);
                    *self |= 1 << bit_idx;
                }

                fn set_bit_off(&mut self, bit_idx: u8) {
                    debug_assert!(u32::from(bit_idx) < <$unsigned>::BITS);
                    *self &= !(1 << bit_idx);
                }

                fn get_bits(&self, bits_range: RangeInclusive<u8>) -> Self {
                    let (start, end) = (*bits_range.start(), *bits_range.end());
                    debug_assert!(start <= end && u32::from(end) < <$unsigned>::BITS);

                    let length = u32::from(end - start) + 1;
                    let value = *self >> start;

                    if length == <$unsigned>::BITS {
                        value
                    } else {
                        value & ((1 << length) - 1)
                    }
                }

                fn sign_extended(&self, number_of_bits: u8) -> Self {
                    debug_assert!(
                        number_of_bits > 0 && u32::from(number_of_bits) <= <$unsigned>::BITS
                    );

                    // Move the sign bit of the field to the msb, then let the
                    // arithmetic shift drag it back down.
                    let unused = <$unsigned>::BITS - u32::from(number_of_bits);
                    (((*self << unused) as $signed) >> unused) as $unsigned
                }
            }
        )*
    };
}

impl_bits!(u8 => i8, u16 => i16, u32 => i32);
