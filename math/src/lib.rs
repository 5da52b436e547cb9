pub mod uint;

construct_uint!(Uint192, 3);
construct_uint!(Uint256, 4);

impl Uint256 {
    /// Decodes a compact ("nBits") difficulty target into its full 256-bit form.
    /// Negative or zero-mantissa encodings yield zero.
    #[inline]
    pub fn from_compact_target_bits(bits: u32) -> Self {
        let (mant, expt) = {
            let unshifted_expt = bits >> 24;
            if unshifted_expt <= 3 {
                ((bits & 0xFFFFFF) >> (8 * (3 - unshifted_expt as usize)), 0)
            } else {
                (bits & 0xFFFFFF, 8 * ((bits >> 24) - 3))
            }
        };

        // The mantissa is signed but may not be negative
        if mant > 0x7FFFFF {
            Self::ZERO
        } else {
            Self::from_u64(mant as u64).overflowing_shl(expt).0
        }
    }
}

impl From<Uint192> for Uint256 {
    #[inline]
    fn from(u: Uint192) -> Self {
        Uint256([u.0[0], u.0[1], u.0[2], 0])
    }
}

impl TryFrom<Uint256> for Uint192 {
    type Error = uint::TryFromIntError;

    #[inline]
    fn try_from(u: Uint256) -> Result<Self, Self::Error> {
        if u.0[3] != 0 { Err(uint::TryFromIntError) } else { Ok(Uint192([u.0[0], u.0[1], u.0[2]])) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_target_bits() {
        // Simnet-like easiest target: 0x7fffff << (8 * (0x20 - 3))
        let target = Uint256::from_compact_target_bits(0x207fffff);
        assert_eq!(target.bits(), 255);
        assert_eq!(target >> 232, Uint256::from_u64(0x7fffff));

        assert_eq!(Uint256::from_compact_target_bits(0x1d00ffff), Uint256::from_u64(0xffff) << 208);
        assert_eq!(Uint256::from_compact_target_bits(0x03123456), Uint256::from_u64(0x123456));
        assert_eq!(Uint256::from_compact_target_bits(0x02123456), Uint256::from_u64(0x1234));
        // Negative mantissa
        assert_eq!(Uint256::from_compact_target_bits(0x04923456), Uint256::ZERO);
    }

    #[test]
    fn test_widening_conversions() {
        let narrow = Uint192::from_u128(u128::MAX) + Uint192::from_u64(1);
        let wide = Uint256::from(narrow);
        assert_eq!(wide, Uint256::from_u128(u128::MAX) + Uint256::from_u64(1));
        assert_eq!(Uint192::try_from(wide), Ok(narrow));
        assert!(Uint192::try_from(Uint256::MAX).is_err());
    }
}
