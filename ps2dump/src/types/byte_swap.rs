/*!
Trait for byte-swappable basic types.

Savestates and core files are always little endian. Records are decoded and encoded
through `dataview::Pod` in host order and passed through [`from_le`] / [`to_le`],
which only swap on big endian hosts.
*/

/// A trait specifying that a type/struct can be byte swapped.
///
/// # Examples
///
/// ```
/// use ps2dump::types::ByteSwap;
///
/// let mut value = [0x1234u16, 0x5678];
/// value.byte_swap();
/// assert_eq!(value, [0x3412, 0x7856]);
/// ```
pub trait ByteSwap {
    fn byte_swap(&mut self);
}

impl ByteSwap for u8 {
    fn byte_swap(&mut self) {
        // no-op
    }
}

impl ByteSwap for i16 {
    fn byte_swap(&mut self) {
        *self = Self::from_le_bytes(self.to_be_bytes());
    }
}

impl ByteSwap for u16 {
    fn byte_swap(&mut self) {
        *self = Self::from_le_bytes(self.to_be_bytes());
    }
}

impl ByteSwap for u32 {
    fn byte_swap(&mut self) {
        *self = Self::from_le_bytes(self.to_be_bytes());
    }
}

impl ByteSwap for u64 {
    fn byte_swap(&mut self) {
        *self = Self::from_le_bytes(self.to_be_bytes());
    }
}

// array types
impl<T: ByteSwap, const N: usize> ByteSwap for [T; N] {
    fn byte_swap(&mut self) {
        self.iter_mut().for_each(|e| e.byte_swap());
    }
}

// slice types
impl<T: ByteSwap> ByteSwap for [T] {
    fn byte_swap(&mut self) {
        self.iter_mut().for_each(|e| e.byte_swap());
    }
}

/// Implements [`ByteSwap`] for a struct by swapping each of the listed fields.
#[macro_export]
macro_rules! impl_byte_swap {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::types::ByteSwap for $ty {
            fn byte_swap(&mut self) {
                $($crate::types::ByteSwap::byte_swap(&mut self.$field);)*
            }
        }
    };
}

/// Converts a value read in host order from little endian data.
pub fn from_le<T: ByteSwap>(mut value: T) -> T {
    if cfg!(target_endian = "big") {
        value.byte_swap();
    }
    value
}

/// Converts a host order value into its little endian representation.
pub fn to_le<T: ByteSwap>(value: T) -> T {
    from_le(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    struct Pair {
        a: u16,
        b: [u32; 2],
    }

    impl_byte_swap!(Pair { a, b });

    #[test]
    fn swap_u16() {
        let mut num = 1234u16;
        num.byte_swap();
        assert_eq!(num, 1234u16.swap_bytes());
        num.byte_swap();
        assert_eq!(num, 1234);
    }

    #[test]
    fn swap_u64() {
        let mut num = 1234u64;
        num.byte_swap();
        assert_eq!(num, 1234u64.swap_bytes());
        num.byte_swap();
        assert_eq!(num, 1234);
    }

    #[test]
    fn swap_i16() {
        let mut num = -8i16;
        num.byte_swap();
        assert_eq!(num, (-8i16).swap_bytes());
    }

    #[test]
    fn swap_struct() {
        let mut pair = Pair {
            a: 0x1234,
            b: [0x1122_3344, 0x5566_7788],
        };
        pair.byte_swap();
        assert_eq!(pair.a, 0x3412);
        assert_eq!(pair.b, [0x4433_2211, 0x8877_6655]);
    }

    #[test]
    fn le_roundtrip_is_identity() {
        let value = 0xdead_beef_u32;
        assert_eq!(from_le(to_le(value)), value);
        if cfg!(target_endian = "little") {
            assert_eq!(to_le(value), value);
        }
    }
}
