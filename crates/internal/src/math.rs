//! Integer arithmetic used while building modulus tables

/// Modular exponentiation (a^b mod m) with 128-bit intermediates
pub fn pow_mod(a: u64, mut exp: u64, m: u64) -> u64 {
    if m == 1 {
        return 0;
    }
    let m128 = m as u128;
    let mut result: u128 = 1;
    let mut base = (a as u128) % m128;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % m128;
        }
        exp >>= 1;
        base = base * base % m128;
    }
    result as u64
}

/// Modular product with 128-bit intermediates
#[inline]
pub fn mul_mod_u128(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128) * (b as u128) % (m as u128)) as u64
}

/// Inverse of `a` modulo the prime `p` (Fermat), `None` when `a ≡ 0`
pub fn inv_mod_prime(a: u64, p: u64) -> Option<u64> {
    if p < 2 || a % p == 0 {
        return None;
    }
    Some(pow_mod(a, p - 2, p))
}

/// floor(hi·2^64 / m) for `hi < m`
#[inline]
pub fn divide_128_by_64_lo(hi: u64, lo: u64, m: u64) -> u64 {
    ((((hi as u128) << 64) | lo as u128) / m as u128) as u64
}

/// Distinct prime factors of `n` by trial division
pub fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    let mut d = 2u64;
    while d.saturating_mul(d) <= n {
        if n % d == 0 {
            factors.push(d);
            while n % d == 0 {
                n /= d;
            }
        }
        d += if d == 2 { 1 } else { 2 };
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Reverse the low `bits` bits of `x`
#[inline]
pub fn bit_reverse(x: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    x.reverse_bits() >> (usize::BITS - bits)
}

/// True for 1, 2, 4, ...
#[inline]
pub fn is_power_of_two(x: u64) -> bool {
    x != 0 && x & (x - 1) == 0
}

/// Smallest power of two `>= x` (1 for 0)
#[inline]
pub fn next_power_of_two(x: u64) -> u64 {
    x.max(1).next_power_of_two()
}

/// Number of significant bits of `x`
#[inline]
pub fn bit_width(x: u64) -> u32 {
    u64::BITS - x.leading_zeros()
}

/// floor(log2(x)) for `x > 0`
#[inline]
pub fn log2_floor(x: u64) -> u32 {
    debug_assert!(x > 0);
    u64::BITS - 1 - x.leading_zeros()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pow_mod_small() {
        assert_eq!(pow_mod(2, 10, 1000), 24);
        assert_eq!(pow_mod(3, 0, 7), 1);
        assert_eq!(pow_mod(5, 3, 1), 0);
    }

    #[test]
    fn test_prime_factors() {
        assert_eq!(prime_factors(1), Vec::<u64>::new());
        assert_eq!(prime_factors(360), vec![2, 3, 5]);
        assert_eq!(prime_factors(1032192), vec![2, 3, 7]);
        assert_eq!(prime_factors(97), vec![97]);
    }

    #[test]
    fn test_bit_helpers() {
        assert_eq!(bit_reverse(1, 3), 4);
        assert_eq!(bit_reverse(6, 3), 3);
        assert_eq!(bit_reverse(0, 0), 0);
        assert_eq!(next_power_of_two(0), 1);
        assert_eq!(next_power_of_two(33), 64);
        assert_eq!(next_power_of_two(64), 64);
        assert_eq!(bit_width(1032193), 20);
        assert_eq!(bit_width(0), 0);
        assert_eq!(log2_floor(4096), 12);
        assert_eq!(log2_floor(4095), 11);
        assert!(is_power_of_two(1));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(192));
    }

    proptest! {
        #[test]
        fn prop_inverse_is_inverse(a in 1u64..2251799813554177) {
            let p = 2251799813554177u64;
            let inv = inv_mod_prime(a, p).unwrap();
            prop_assert_eq!(mul_mod_u128(a, inv, p), 1);
        }
    }
}
