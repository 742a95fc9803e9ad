//! Signed 16.16 fixed point, the format of the touch transform registers.

use core::fmt;

/// Signed fixed-point number with 16 fractional bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fixed16(i32);

impl Fixed16 {
    pub const FRAC_BITS: u32 = 16;
    pub const ZERO: Self = Self(0);

    /// Wraps a raw register value.
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// The raw register value.
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// `numerator / denominator`, truncated toward zero.
    ///
    /// `None` when the denominator is zero or the quotient does not fit.
    pub fn from_ratio(numerator: i64, denominator: i64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let scaled = numerator.checked_mul(1 << Self::FRAC_BITS)?;
        i32::try_from(scaled / denominator).ok().map(Self)
    }

    /// Multiplies by an integer, keeping the full 16.16 product.
    pub fn mul_int(self, value: i32) -> i64 {
        i64::from(self.0) * i64::from(value)
    }
}

impl fmt::Debug for Fixed16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed16({:#010x})", self.0)
    }
}

impl fmt::Display for Fixed16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let frac = u64::from(abs & 0xFFFF) * 10_000 / 65_536;
        write!(f, "{}{}.{:04}", sign, abs >> 16, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    #[test]
    fn ratio_truncates_toward_zero() {
        assert_eq!(Fixed16::from_ratio(1, 3).unwrap().to_bits(), 21845);
        assert_eq!(Fixed16::from_ratio(-1, 3).unwrap().to_bits(), -21845);
        assert_eq!(Fixed16::from_ratio(800, 1023).unwrap().to_bits(), 51250);
    }

    #[test]
    fn ratio_rejects_zero_and_overflow() {
        assert_eq!(Fixed16::from_ratio(1, 0), None);
        assert_eq!(Fixed16::from_ratio(1 << 20, 1), None);
    }

    #[test]
    fn display_and_integer_product() {
        let half = Fixed16::from_ratio(-1, 2).unwrap();
        assert_eq!(format!("{}", half), "-0.5000");
        assert_eq!(format!("{}", Fixed16::from_bits(1 << 16)), "1.0000");
        assert_eq!(Fixed16::from_bits(3 << 16).mul_int(2), 6 << 16);
        assert_eq!(half.mul_int(3), -3 << 15);
    }
}
