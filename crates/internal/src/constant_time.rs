//! Constant-time operations used on secret key material

use subtle::{Choice, ConstantTimeEq};

/// Constant-time comparison of two coefficient slices
///
/// Slices of different lengths compare unequal; the length itself is not
/// treated as secret.
pub fn ct_eq_u64s(a: &[u64], b: &[u64]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc = Choice::from(1u8);
    for (x, y) in a.iter().zip(b) {
        acc &= x.ct_eq(y);
    }
    acc.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ct_eq_u64s() {
        assert!(ct_eq_u64s(&[1, 2, 3], &[1, 2, 3]));
        assert!(!ct_eq_u64s(&[1, 2, 3], &[1, 2, 4]));
        assert!(!ct_eq_u64s(&[1, 2], &[1, 2, 3]));
    }
}
