//! ntt.rs - Negacyclic number theoretic transform over one prime
//!
//! Forward transforms are Cooley-Tukey with bit-reversed twiddles, backward
//! transforms are Gentleman-Sande with the inverse twiddles reordered stage
//! by stage. Butterflies keep values lazily reduced below `4p` (forward) or
//! `2p` (backward); the final pass reduces according to [`OutputModFactor`].
//!
//! ## Root selection
//! The 2·degree-th root `psi` is the smallest member of the orbit of
//! `g^((p-1)/(2·degree))` for the smallest primitive root `g`, so that tables
//! agree with any other implementation following the same rule.
//!
//! ## Padded transforms
//! [`Ntt::forward_padded`] replicates the first `pad_rank` coefficients across
//! the whole polynomial and runs only the last `log2(pad_rank)` stages.
//! Every block then already holds the input reduced modulo its
//! `X^pad_rank - c` factor, so the skipped stages are the identity.
//! [`Ntt::backward_sparse`] computes only the coefficients at positions
//! `k·fullmod - 1`; everything else in the output is garbage.

use evi_internal::math::{
    bit_reverse, inv_mod_prime, is_power_of_two, log2_floor, mul_mod_u128, pow_mod, prime_factors,
};
use tracing::trace;

use crate::arith::{mul_mod_lazy, shoup, sub_if_ge};
use crate::error::{validate, Error, Result};

/// How far the output of a transform is reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputModFactor {
    /// Outputs in `[0, p)`
    #[default]
    One,
    /// Outputs in `[0, 2p)`
    Two,
    /// Outputs in `[0, 4p)` (forward only)
    Four,
}

/// Precomputed tables for transforms of one degree modulo one prime
#[derive(Debug, Clone)]
pub struct Ntt {
    degree: usize,
    prime: u64,
    two_prime: u64,
    psi: u64,
    psi_rev: Vec<u64>,
    psi_rev_shoup: Vec<u64>,
    psi_inv_rev: Vec<u64>,
    psi_inv_rev_shoup: Vec<u64>,
    degree_inv: u64,
    degree_inv_shoup: u64,
    degree_inv_w: u64,
    degree_inv_w_shoup: u64,
}

/// Smallest primitive root modulo the prime `p`
pub fn find_primitive_root(p: u64) -> Result<u64> {
    let phi = p - 1;
    let factors = prime_factors(phi);
    (2..=phi)
        .find(|&r| factors.iter().all(|&f| pow_mod(r, phi / f, p) != 1))
        .ok_or(Error::Processing {
            operation: "find_primitive_root",
            details: "no primitive root found",
        })
}

/// Minimal primitive `2·degree`-th root of unity modulo `p`
pub fn find_minimal_root(degree: usize, p: u64) -> Result<u64> {
    let g = find_primitive_root(p)?;
    let psi = pow_mod(g, (p - 1) / (2 * degree as u64), p);
    let psi_square = mul_mod_u128(psi, psi, p);
    let psi_square_shoup = shoup(psi_square, p);

    let mut min_root = psi;
    let mut tmp = psi;
    for _ in 0..degree {
        tmp = sub_if_ge(mul_mod_lazy(tmp, psi_square, psi_square_shoup, p), p);
        min_root = min_root.min(tmp);
    }
    Ok(min_root)
}

fn check_parameters(degree: usize, prime: u64) -> Result<()> {
    validate::parameter(
        is_power_of_two(degree as u64),
        "degree",
        "must be a power of two",
    )?;
    validate::parameter(prime < (1 << 62), "prime", "must be below 2^62")?;
    validate::parameter(
        prime > 2 * degree as u64 && (prime - 1) % (2 * degree as u64) == 0,
        "prime",
        "must be congruent to 1 modulo 2·degree",
    )?;
    Ok(())
}

impl Ntt {
    /// Tables for `degree` using the minimal root of `prime`
    pub fn new(degree: usize, prime: u64) -> Result<Self> {
        check_parameters(degree, prime)?;
        let psi = find_minimal_root(degree, prime)?;
        Self::with_psi(degree, prime, psi)
    }

    /// Tables of size `mini_degree` whose root is the full-degree minimal
    /// root raised to `degree / mini_degree`
    pub fn new_mini(degree: usize, prime: u64, mini_degree: usize) -> Result<Self> {
        check_parameters(degree, prime)?;
        validate::parameter(
            is_power_of_two(mini_degree as u64) && mini_degree <= degree,
            "mini_degree",
            "must be a power of two not above degree",
        )?;
        let psi = find_minimal_root(degree, prime)?;
        let psi = pow_mod(psi, (degree / mini_degree) as u64, prime);
        Self::with_psi(mini_degree, prime, psi)
    }

    /// Tables for an explicit primitive `2·degree`-th root `psi`
    pub fn with_psi(degree: usize, prime: u64, psi: u64) -> Result<Self> {
        validate::parameter(
            is_power_of_two(degree as u64),
            "degree",
            "must be a power of two",
        )?;
        validate::parameter(
            pow_mod(psi, degree as u64, prime) == prime - 1,
            "psi",
            "must be a primitive 2·degree-th root of unity",
        )?;
        let psi_inv = inv_mod_prime(psi, prime).ok_or(Error::param("psi", "not invertible"))?;
        let psi_shoup = shoup(psi, prime);
        let psi_inv_shoup = shoup(psi_inv, prime);
        let mul = |x: u64, y: u64, ys: u64| sub_if_ge(mul_mod_lazy(x, y, ys, prime), prime);

        let mut psi_rev = vec![0u64; degree];
        let mut psi_inv_rev = vec![0u64; degree];
        psi_rev[0] = 1;
        psi_inv_rev[0] = 1;
        let bits = log2_floor(degree as u64);
        let mut prev = 0usize;
        for i in 1..degree {
            let idx = bit_reverse(i, bits);
            psi_rev[idx] = mul(psi_rev[prev], psi, psi_shoup);
            psi_inv_rev[idx] = mul(psi_inv_rev[prev], psi_inv, psi_inv_shoup);
            prev = idx;
        }

        // backward stages read their twiddles contiguously
        let mut reordered = Vec::with_capacity(degree);
        reordered.push(psi_inv_rev[0]);
        let mut m = degree >> 1;
        while m > 0 {
            reordered.extend_from_slice(&psi_inv_rev[m..2 * m]);
            m >>= 1;
        }
        let psi_inv_rev = reordered;

        let psi_rev_shoup = psi_rev.iter().map(|&w| shoup(w, prime)).collect();
        let psi_inv_rev_shoup = psi_inv_rev.iter().map(|&w| shoup(w, prime)).collect();

        let degree_inv =
            inv_mod_prime(degree as u64, prime).ok_or(Error::param("degree", "not invertible"))?;
        let degree_inv_w = mul_mod_u128(degree_inv, psi_inv_rev[degree - 1], prime);

        trace!(degree, prime, psi, "built NTT tables");

        Ok(Self {
            degree,
            prime,
            two_prime: prime << 1,
            psi,
            psi_rev,
            psi_rev_shoup,
            psi_inv_rev,
            psi_inv_rev_shoup,
            degree_inv,
            degree_inv_shoup: shoup(degree_inv, prime),
            degree_inv_w,
            degree_inv_w_shoup: shoup(degree_inv_w, prime),
        })
    }

    /// Transform size
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Modulus
    pub fn prime(&self) -> u64 {
        self.prime
    }

    /// Root of unity the tables were built from
    pub fn psi(&self) -> u64 {
        self.psi
    }

    #[inline(always)]
    fn butterfly(&self, op: &mut [u64], x: usize, y: usize, w: u64, ws: u64) {
        let tx = sub_if_ge(op[x], self.two_prime);
        let ty = mul_mod_lazy(op[y], w, ws, self.prime);
        op[x] = tx + ty;
        op[y] = tx + self.two_prime - ty;
    }

    #[inline(always)]
    fn butterfly_inv(&self, op: &mut [u64], x: usize, y: usize, w: u64, ws: u64) {
        let tx = op[x] + op[y];
        let ty = op[x] + self.two_prime - op[y];
        op[x] = sub_if_ge(tx, self.two_prime);
        op[y] = mul_mod_lazy(ty, w, ws, self.prime);
    }

    /// Inverse butterfly that only produces the `y` output
    #[inline(always)]
    fn butterfly_inv_pruned(&self, op: &mut [u64], x: usize, y: usize, w: u64, ws: u64) {
        let ty = op[x] + self.two_prime - op[y];
        op[y] = mul_mod_lazy(ty, w, ws, self.prime);
    }

    #[inline(always)]
    fn butterfly_inv_last(&self, op: &mut [u64], x: usize, y: usize) {
        let tx = sub_if_ge(op[x] + op[y], self.two_prime);
        let ty = op[x] + self.two_prime - op[y];
        op[x] = mul_mod_lazy(tx, self.degree_inv, self.degree_inv_shoup, self.prime);
        op[y] = mul_mod_lazy(ty, self.degree_inv_w, self.degree_inv_w_shoup, self.prime);
    }

    fn forward_step(&self, op: &mut [u64], t: usize) {
        let m = (self.degree >> 1) / t;
        for i in 0..m {
            let w = self.psi_rev[m + i];
            let ws = self.psi_rev_shoup[m + i];
            let base = 2 * t * i;
            for x in base..base + t {
                self.butterfly(op, x, x + t, w, ws);
            }
        }
    }

    fn backward_step(&self, op: &mut [u64], t: usize) {
        let m = (self.degree >> 1) / t;
        let root_idx = 1 + self.degree - self.degree / t;
        for i in 0..m {
            let w = self.psi_inv_rev[root_idx + i];
            let ws = self.psi_inv_rev_shoup[root_idx + i];
            let base = 2 * t * i;
            for x in base..base + t {
                self.butterfly_inv(op, x, x + t, w, ws);
            }
        }
    }

    fn reduce_output(&self, values: &mut [u64], factor: OutputModFactor) {
        match factor {
            OutputModFactor::One => {
                for v in values.iter_mut() {
                    *v = sub_if_ge(sub_if_ge(*v, self.two_prime), self.prime);
                }
            }
            OutputModFactor::Two => {
                for v in values.iter_mut() {
                    *v = sub_if_ge(*v, self.two_prime);
                }
            }
            OutputModFactor::Four => {}
        }
    }

    fn check_len(&self, op: &[u64]) -> Result<()> {
        validate::length("Ntt operand", op.len(), self.degree)
    }

    /// In-place forward transform with fully reduced output
    pub fn forward(&self, op: &mut [u64]) -> Result<()> {
        self.forward_with(op, OutputModFactor::One)
    }

    /// In-place forward transform
    pub fn forward_with(&self, op: &mut [u64], factor: OutputModFactor) -> Result<()> {
        self.check_len(op)?;
        let mut t = self.degree >> 1;
        while t > 0 {
            self.forward_step(op, t);
            t >>= 1;
        }
        self.reduce_output(op, factor);
        Ok(())
    }

    /// Forward transform of a polynomial whose coefficients beyond `pad_rank`
    /// are zero. The first `pad_rank` coefficients are replicated across the
    /// whole operand and only the last `log2(pad_rank)` stages run; the result
    /// equals [`Ntt::forward`] of the zero-padded input.
    pub fn forward_padded(&self, op: &mut [u64], pad_rank: usize) -> Result<()> {
        self.forward_padded_with(op, pad_rank, OutputModFactor::One)
    }

    /// See [`Ntt::forward_padded`]
    pub fn forward_padded_with(
        &self,
        op: &mut [u64],
        pad_rank: usize,
        factor: OutputModFactor,
    ) -> Result<()> {
        self.check_len(op)?;
        validate::parameter(
            is_power_of_two(pad_rank as u64) && pad_rank <= self.degree,
            "pad_rank",
            "must be a power of two not above degree",
        )?;
        let (head, tail) = op.split_at_mut(pad_rank);
        for chunk in tail.chunks_exact_mut(pad_rank) {
            chunk.copy_from_slice(head);
        }

        let mut t = pad_rank >> 1;
        while t > 0 {
            self.forward_step(op, t);
            t >>= 1;
        }
        self.reduce_output(op, factor);
        Ok(())
    }

    /// In-place backward transform with fully reduced output
    pub fn backward(&self, op: &mut [u64]) -> Result<()> {
        self.backward_with(op, OutputModFactor::One)
    }

    /// In-place backward transform; [`OutputModFactor::Four`] is treated as `Two`
    pub fn backward_with(&self, op: &mut [u64], factor: OutputModFactor) -> Result<()> {
        self.check_len(op)?;
        if self.degree == 1 {
            return Ok(());
        }
        let half = self.degree >> 1;
        let mut t = 1;
        while t < half {
            self.backward_step(op, t);
            t <<= 1;
        }
        for x in 0..half {
            self.butterfly_inv_last(op, x, x + half);
        }
        if factor == OutputModFactor::One {
            for v in op.iter_mut() {
                *v = sub_if_ge(*v, self.prime);
            }
        }
        Ok(())
    }

    /// Backward transform computing only the coefficients at
    /// `fullmod - 1, 2·fullmod - 1, ...`
    pub fn backward_sparse(&self, op: &mut [u64], fullmod: usize) -> Result<()> {
        self.check_len(op)?;
        validate::parameter(
            is_power_of_two(fullmod as u64) && fullmod <= self.degree / 2,
            "fullmod",
            "must be a power of two not above degree / 2",
        )?;
        let degree = self.degree;
        let half = degree >> 1;

        let mut t = 1;
        while t < fullmod {
            let m = half / t;
            let root_idx = 1 + degree - degree / t;
            let mut x = (fullmod - 1) % t;
            for i in 0..m {
                let w = self.psi_inv_rev[root_idx + i];
                let ws = self.psi_inv_rev_shoup[root_idx + i];
                self.butterfly_inv_pruned(op, x, x + t, w, ws);
                x += 2 * t;
            }
            t <<= 1;
        }

        while t < half {
            let m = half / t;
            let root_idx = 1 + degree - degree / t;
            let repeat = t / fullmod;
            let mut x = fullmod - 1;
            for i in 0..m {
                let w = self.psi_inv_rev[root_idx + i];
                let ws = self.psi_inv_rev_shoup[root_idx + i];
                for _ in 0..repeat {
                    self.butterfly_inv(op, x, x + t, w, ws);
                    x += fullmod;
                }
                x += t;
            }
            t <<= 1;
        }

        let mut x = fullmod - 1;
        for _ in 0..degree / (2 * fullmod) {
            self.butterfly_inv_last(op, x, x + half);
            x += fullmod;
        }

        let mut i = fullmod - 1;
        while i < degree {
            op[i] = sub_if_ge(op[i], self.prime);
            i += fullmod;
        }
        Ok(())
    }
}
