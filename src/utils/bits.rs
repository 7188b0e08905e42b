/*
 * Flag helpers on fixed-width integers. Every register in the system is manipulated through these.
 */
pub trait Bits: Copy {
    fn bit(self, n: u32) -> bool;
    fn with_bit(self, n: u32, value: bool) -> Self;
    /* Extracts bits [lo, lo+len) as u32 */
    fn bits(self, lo: u32, len: u32) -> u32;
    fn byte(self, n: usize) -> u8;
    fn with_byte(self, n: usize, value: u8) -> Self;

    fn set_bit(&mut self, n: u32, value: bool) { *self = self.with_bit(n, value); }
    fn set_byte(&mut self, n: usize, value: u8) { *self = self.with_byte(n, value); }
}

macro_rules! impl_bits {
    ($t:ty) => {
        impl Bits for $t {
            #[inline]
            fn bit(self, n: u32) -> bool { (self >> n) & 1 != 0 }

            #[inline]
            fn with_bit(self, n: u32, value: bool) -> Self {
                if value { self | (1 << n) } else { self & !(1 << n) }
            }

            #[inline]
            fn bits(self, lo: u32, len: u32) -> u32 {
                let mask = if len >= 32 { u32::MAX } else { (1u32 << len) - 1 };
                ((self as u32) >> lo) & mask
            }

            #[inline]
            fn byte(self, n: usize) -> u8 { (self >> (8 * n)) as u8 }

            #[inline]
            fn with_byte(self, n: usize, value: u8) -> Self {
                let shift = 8 * n;
                (self & !((0xFF as $t) << shift)) | ((value as $t) << shift)
            }
        }
    };
}

impl_bits!(u8);
impl_bits!(u16);
impl_bits!(u32);

#[inline]
pub fn bcd(value: u32) -> u8 {
    (((value / 10) % 10) << 4 | (value % 10)) as u8
}
