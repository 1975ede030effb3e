//! arith.rs - Word-sized modular arithmetic
//!
//! Every routine here works on residues modulo an NTT-friendly prime
//! `p < 2^62`. Inputs are expected to be below `2p` unless stated otherwise;
//! this is a precondition, not a runtime check.
//!
//! ## Reductions
//! - Shoup: `mul_mod_lazy(x, y, shoup(y), p)` returns a value in `[0, 2p)`
//! - Barrett: `reduce_barrett` maps any `u64` into `[0, p)` using
//!   `floor(2^64 / p)`
//! - 128-bit: the high word is folded through `2^64 mod p`

use evi_internal::math::{divide_128_by_64_lo, pow_mod};

/// A prime modulus together with its precomputed reduction constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modulus {
    /// The prime itself
    pub value: u64,
    /// `2p`, the lazy-reduction bound
    pub two_value: u64,
    /// `p >> 1`, the centered-representation threshold
    pub half: u64,
    /// `2^64 mod p`
    pub two_to_64: u64,
    /// Shoup companion of `two_to_64`
    pub two_to_64_shoup: u64,
    /// `floor(2^64 / p)`
    pub barrett_ratio: u64,
}

impl Modulus {
    /// Precompute the reduction constants of `p`
    pub fn new(p: u64) -> Self {
        let two_to_64 = pow_mod(2, 64, p);
        Self {
            value: p,
            two_value: p << 1,
            half: p >> 1,
            two_to_64,
            two_to_64_shoup: shoup(two_to_64, p),
            barrett_ratio: divide_128_by_64_lo(1, 0, p),
        }
    }

    /// Reduce a 64-bit value
    #[inline(always)]
    pub fn reduce(&self, v: u64) -> u64 {
        reduce_barrett(self.value, self.barrett_ratio, v)
    }

    /// Reduce a 128-bit value
    #[inline(always)]
    pub fn reduce_u128(&self, v: u128) -> u64 {
        reduce_barrett_u128(self, v)
    }

    /// `x·y mod p` for `x, y < p`
    #[inline(always)]
    pub fn mul(&self, x: u64, y: u64) -> u64 {
        mul_mod(self, x, y)
    }
}

/// Shoup companion `floor(y·2^64 / p)` of a multiplier `y < p`
#[inline(always)]
pub fn shoup(y: u64, p: u64) -> u64 {
    divide_128_by_64_lo(y, 0, p)
}

/// High word of a 64×64 product
#[inline(always)]
fn mul_hi(a: u64, b: u64) -> u64 {
    (((a as u128) * (b as u128)) >> 64) as u64
}

/// `x·y mod p` in `[0, 2p)` using the Shoup companion of `y`
#[inline(always)]
pub fn mul_mod_lazy(x: u64, y: u64, y_shoup: u64, p: u64) -> u64 {
    let q = mul_hi(x, y_shoup);
    x.wrapping_mul(y).wrapping_sub(q.wrapping_mul(p))
}

/// Subtract `bound` once if `x >= bound`
#[inline(always)]
pub fn sub_if_ge(x: u64, bound: u64) -> u64 {
    if x >= bound {
        x - bound
    } else {
        x
    }
}

/// Barrett reduction of any 64-bit value into `[0, p)`
#[inline(always)]
pub fn reduce_barrett(p: u64, ratio: u64, v: u64) -> u64 {
    let q = mul_hi(v, ratio);
    sub_if_ge(v.wrapping_sub(q.wrapping_mul(p)), p)
}

/// Reduction of a 128-bit value into `[0, p)`
#[inline(always)]
pub fn reduce_barrett_u128(m: &Modulus, v: u128) -> u64 {
    let hi = m.reduce((v >> 64) as u64);
    let lo = m.reduce(v as u64);
    let folded = mul_mod_lazy(hi, m.two_to_64, m.two_to_64_shoup, m.value);
    let sum = folded + lo;
    sub_if_ge(sub_if_ge(sum, m.two_value), m.value)
}

/// Full `x·y mod p`
#[inline(always)]
pub fn mul_mod(m: &Modulus, x: u64, y: u64) -> u64 {
    reduce_barrett_u128(m, (x as u128) * (y as u128))
}

/// Map a signed value in `(-p, p)` to `[0, p)`
#[inline(always)]
pub fn add_if_lt_zero(v: i64, p: u64) -> u64 {
    v.wrapping_add((p as i64) & (v >> 63)) as u64
}

/// Fold two random bits into a ternary residue
///
/// `b2 = 0` gives 0; otherwise `b1 = 1` gives 1 and `b1 = 0` gives `p - 1`.
#[inline(always)]
pub fn ternary_mod(b1: u64, b2: u64, p: u64) -> u64 {
    b2.wrapping_mul((b1.wrapping_sub(1) & p).wrapping_add((b1 << 1).wrapping_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use evi_internal::math::mul_mod_u128;
    use proptest::prelude::*;

    const QF_Q: u64 = 288230376135196673;
    const IP1_Q: u64 = 1152921504606830593;

    #[test]
    fn test_modulus_constants() {
        let m = Modulus::new(QF_Q);
        assert_eq!(m.two_value, 2 * QF_Q);
        assert_eq!(m.two_to_64 as u128, (1u128 << 64) % QF_Q as u128);
        assert_eq!(m.barrett_ratio as u128, (1u128 << 64) / QF_Q as u128);
    }

    #[test]
    fn test_ternary_mod() {
        let p = 1032193;
        assert_eq!(ternary_mod(0, 0, p), 0);
        assert_eq!(ternary_mod(1, 0, p), 0);
        assert_eq!(ternary_mod(1, 1, p), 1);
        assert_eq!(ternary_mod(0, 1, p), p - 1);
    }

    #[test]
    fn test_add_if_lt_zero() {
        assert_eq!(add_if_lt_zero(-1, 17), 16);
        assert_eq!(add_if_lt_zero(5, 17), 5);
        assert_eq!(add_if_lt_zero(0, 17), 0);
    }

    proptest! {
        #[test]
        fn prop_mul_mod_lazy_bounds(x in 0u64..2 * IP1_Q, y in 0u64..IP1_Q) {
            let r = mul_mod_lazy(x, y, shoup(y, IP1_Q), IP1_Q);
            prop_assert!(r < 2 * IP1_Q);
            prop_assert_eq!(r % IP1_Q, mul_mod_u128(x % IP1_Q, y, IP1_Q));
        }

        #[test]
        fn prop_reduce_barrett(v in any::<u64>()) {
            let m = Modulus::new(QF_Q);
            prop_assert_eq!(m.reduce(v), v % QF_Q);
        }

        #[test]
        fn prop_reduce_u128(v in any::<u128>()) {
            let m = Modulus::new(IP1_Q);
            prop_assert_eq!(m.reduce_u128(v) as u128, v % IP1_Q as u128);
        }

        #[test]
        fn prop_mul_mod(x in 0u64..QF_Q, y in 0u64..QF_Q) {
            let m = Modulus::new(QF_Q);
            prop_assert_eq!(m.mul(x, y), mul_mod_u128(x, y, QF_Q));
        }
    }
}
