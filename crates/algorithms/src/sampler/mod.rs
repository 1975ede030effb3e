//! Seeded polynomial sampling
//!
//! Every draw comes from one SHAKE256 stream keyed by a 64-byte seed. Small
//! draws are sliced out of a 64-bit word buffer so consecutive requests
//! share words; a request that does not fit takes its high bits from the
//! leftover buffer and its low bits from a fresh word.
//!
//! Distributions:
//! * uniform residues mod Q or P by rejection on `bit_width(prime)` bits
//! * ternary `{-1, 0, 1}` from two bits per coefficient
//! * fixed Hamming weight ternary (exactly `hamming_weight` nonzero entries)
//! * centered binomial error with `CBD_COIN_SIZE` coins per side

use evi_internal::math::bit_width;
use evi_params::{CBD_COIN_SIZE, DEGREE, HW_REJ_BIT_SIZE, SEED_MIN_SIZE};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::arith::{add_if_lt_zero, ternary_mod};
use crate::error::{validate, Error, Result};
use crate::preset::PresetConstants;
use crate::xof::ShakeXof256;

/// Deterministic sampler over a SHAKE256 stream
///
/// The stream state and the bit buffer are wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RandomSampler {
    xof: ShakeXof256,
    #[zeroize(skip)]
    prime_q: u64,
    #[zeroize(skip)]
    prime_p: u64,
    #[zeroize(skip)]
    hamming_weight: u32,
    buffer: u64,
    buffer_size: u32,
}

impl RandomSampler {
    /// Sampler for the moduli of `constants`
    ///
    /// A seed shorter than `SEED_MIN_SIZE` bytes is rejected; only the first
    /// `SEED_MIN_SIZE` bytes of a longer seed are used. Without a seed one is
    /// drawn from the operating system.
    pub fn new(constants: &PresetConstants, seed: Option<&[u8]>) -> Result<Self> {
        let mut key = Zeroizing::new([0u8; SEED_MIN_SIZE]);
        match seed {
            Some(bytes) => {
                validate::parameter(
                    bytes.len() >= SEED_MIN_SIZE,
                    "seed",
                    "seed must be at least 64 bytes",
                )?;
                key.copy_from_slice(&bytes[..SEED_MIN_SIZE]);
            }
            None => OsRng.try_fill_bytes(&mut key[..]).map_err(|_| Error::Processing {
                operation: "RandomSampler::new",
                details: "operating system entropy source failed",
            })?,
        }
        debug!(seeded = seed.is_some(), "random sampler initialised");

        Ok(Self {
            xof: ShakeXof256::with_seed(&key[..])?,
            prime_q: constants.q.value,
            prime_p: constants.p.value,
            hamming_weight: constants.hamming_weight,
            buffer: 0,
            buffer_size: 0,
        })
    }

    /// Next `out_len` random bits, `out_len <= 64`
    pub fn random_bits(&mut self, out_len: u32) -> Result<u64> {
        validate::parameter(out_len <= 64, "out_len", "at most 64 bits per draw")?;

        if out_len == 64 {
            return self.xof.next_u64();
        }
        if self.buffer_size >= out_len {
            let result = self.buffer & low_mask(out_len);
            self.buffer >>= out_len;
            self.buffer_size -= out_len;
            return Ok(result);
        }

        let remaining = out_len - self.buffer_size;
        let low_bits = self.xof.next_u64()?;
        let result = (self.buffer << remaining) | (low_bits & low_mask(remaining));
        self.buffer = low_bits >> remaining;
        self.buffer_size = 64 - remaining;
        Ok(result)
    }

    fn sample_uniform(&mut self, prime: u64, res: &mut [u64]) -> Result<()> {
        let width = bit_width(prime);
        for slot in res.iter_mut() {
            *slot = loop {
                let candidate = self.random_bits(width)?;
                if candidate < prime {
                    break candidate;
                }
            };
        }
        Ok(())
    }

    /// Uniform residues mod Q
    pub fn sample_uniform_mod_q(&mut self, res: &mut [u64]) -> Result<()> {
        self.sample_uniform(self.prime_q, res)
    }

    /// Uniform residues mod P
    pub fn sample_uniform_mod_p(&mut self, res: &mut [u64]) -> Result<()> {
        self.sample_uniform(self.prime_p, res)
    }

    /// Ternary polynomial, embedded into Q and optionally into P
    ///
    /// Zero has probability 1/2, each of ±1 probability 1/4.
    pub fn sample_zo(&mut self, res_q: &mut [u64], mut res_p: Option<&mut [u64]>) -> Result<()> {
        if let Some(p) = res_p.as_deref() {
            validate::length("sample_zo", p.len(), res_q.len())?;
        }
        for i in 0..res_q.len() {
            let b1 = self.random_bits(1)?;
            let b2 = self.random_bits(1)?;
            res_q[i] = ternary_mod(b1, b2, self.prime_q);
            if let Some(p) = res_p.as_deref_mut() {
                p[i] = ternary_mod(b1, b2, self.prime_p);
            }
        }
        Ok(())
    }

    /// Uniform integer in `[0, bound)` for `bound <= 2^HW_REJ_BIT_SIZE`
    fn uniform_below(&mut self, bound: u32) -> Result<u32> {
        let two_to_l = 1u32 << HW_REJ_BIT_SIZE;
        let threshold = two_to_l % bound;
        loop {
            let rnd = self.random_bits(HW_REJ_BIT_SIZE)? as u32;
            let m = rnd * bound;
            if m & (two_to_l - 1) >= threshold {
                return Ok(m >> HW_REJ_BIT_SIZE);
            }
        }
    }

    /// Swap indices for a Fisher-Yates shuffle of `DEGREE` slots
    ///
    /// Entry `i` is uniform in `[0, DEGREE - 1 - i)`.
    pub fn rej_sampling_mod(&mut self, si: &mut [i32]) -> Result<()> {
        validate::min_length("rej_sampling_mod", si.len(), DEGREE - 1)?;
        for (i, slot) in si.iter_mut().take(DEGREE - 1).enumerate() {
            *slot = self.uniform_below((DEGREE - 1 - i) as u32)? as i32;
        }
        Ok(())
    }

    /// Ternary vector with exactly `hamming_weight` nonzero entries
    pub fn sample_hwt(&mut self, res: &mut [i64]) -> Result<()> {
        validate::length("sample_hwt", res.len(), DEGREE)?;
        res.fill(0);

        let mut positions: Vec<u32> = (0..DEGREE as u32).collect();
        for i in 0..self.hamming_weight as usize {
            let j = i + self.uniform_below((DEGREE - i) as u32)? as usize;
            positions.swap(i, j);
            let sign = self.random_bits(1)? as i64;
            res[positions[i] as usize] = 2 * sign - 1;
        }
        Ok(())
    }

    /// Fixed ternary vector with `hamming_weight` alternating ±1 entries
    ///
    /// Entry `k` sits at `7k mod DEGREE`; 7 is odd, so no two collide.
    /// Only meant for reproducible test keys.
    pub fn no_sample_hwt(&self, res: &mut [i64]) -> Result<()> {
        validate::length("no_sample_hwt", res.len(), DEGREE)?;
        res.fill(0);
        for count in 0..self.hamming_weight as usize {
            res[(7 * count) % DEGREE] = (count % 2) as i64 * 2 - 1;
        }
        Ok(())
    }

    /// One centered binomial sample in `[-CBD_COIN_SIZE, CBD_COIN_SIZE]`
    pub fn centered_binomial(&mut self) -> Result<i64> {
        let plus = self.random_bits(CBD_COIN_SIZE)?.count_ones() as i64;
        let minus = self.random_bits(CBD_COIN_SIZE)?.count_ones() as i64;
        Ok(plus - minus)
    }

    /// Error polynomial, embedded into Q and optionally into P
    pub fn sample_gaussian(
        &mut self,
        res_q: &mut [u64],
        mut res_p: Option<&mut [u64]>,
    ) -> Result<()> {
        if let Some(p) = res_p.as_deref() {
            validate::length("sample_gaussian", p.len(), res_q.len())?;
        }
        for i in 0..res_q.len() {
            let e = self.centered_binomial()?;
            res_q[i] = add_if_lt_zero(e, self.prime_q);
            if let Some(p) = res_p.as_deref_mut() {
                p[i] = add_if_lt_zero(e, self.prime_p);
            }
        }
        Ok(())
    }

    /// Map small signed coefficients to residues mod `modulus`
    pub fn embedding(coeff: &[i64], poly: &mut [u64], modulus: u64) -> Result<()> {
        validate::length("embedding", poly.len(), coeff.len())?;
        for (dst, &c) in poly.iter_mut().zip(coeff) {
            *dst = add_if_lt_zero(c, modulus);
        }
        Ok(())
    }

    /// Hamming weight of sampled secrets
    pub fn hamming_weight(&self) -> u32 {
        self.hamming_weight
    }
}

#[inline(always)]
fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}
