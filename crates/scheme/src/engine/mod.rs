//! CKKS primitive seam
//!
//! The packing layer prepares scaled coefficient vectors and key material;
//! the actual RLWE arithmetic sits behind [`CkksEngine`]. [`RlweEngine`] is
//! the textbook implementation over the Context's Q/P moduli.
//!
//! Ciphertexts satisfy `b + a·s = m + e` modulo every prime they carry.

use evi_algorithms::arith::Modulus;
use evi_algorithms::sampler::RandomSampler;
use evi_params::DEGREE;
use tracing::trace;

use crate::context::{Context, ModRing};
use crate::error::{primitive, Error, Result};
use crate::keys::{SecretKey, SwitchingKey};
use crate::query::PolyPair;

/// Map `value·delta` to a residue, rounding half away from zero
pub fn quantize(value: f64, delta: f64, modulus: &Modulus) -> u64 {
    let scaled = value * delta;
    let rounded = (if scaled >= 0.0 { scaled + 0.5 } else { scaled - 0.5 }) as i128;
    let magnitude = modulus.reduce_u128(rounded.unsigned_abs());
    if rounded < 0 && magnitude != 0 {
        modulus.value - magnitude
    } else {
        magnitude
    }
}

/// Centered lift of a residue divided by `delta`
pub fn dequantize(residue: u64, delta: f64, modulus: &Modulus) -> f64 {
    let centered = if residue > modulus.half {
        -((modulus.value - residue) as f64)
    } else {
        residue as f64
    };
    centered / delta
}

/// Key used for one encryption
#[derive(Debug, Clone, Copy)]
pub enum EncryptionKey<'a> {
    Secret(&'a SecretKey),
    /// Level-1 public key, first entry used
    Public(&'a SwitchingKey),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncryptOptions {
    /// Fixed-point scale applied to the message
    pub delta: f64,
    /// 0 for Q only, 1 to also produce the P part
    pub level: u32,
    /// Leave the ciphertext in NTT form
    pub ntt_out: bool,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            delta: 1.0,
            level: 0,
            ntt_out: true,
        }
    }
}

/// Ciphertext produced by an engine: the Q pair and, at level 1, the P pair
pub type RawCiphertext = (PolyPair, Option<PolyPair>);

/// RLWE encryption primitive used by the packing layer
pub trait CkksEngine {
    /// Encrypt the coefficient-domain message `msg` (at most `DEGREE` slots)
    fn encrypt(
        &mut self,
        ctx: &Context,
        msg: &[f64],
        key: EncryptionKey<'_>,
        opts: EncryptOptions,
    ) -> Result<RawCiphertext>;

    /// Recover `DEGREE` coefficient-domain values from the Q part
    fn decrypt(
        &self,
        ctx: &Context,
        ciphertext: &PolyPair,
        sk: &SecretKey,
        delta: f64,
        ntt_form: bool,
    ) -> Result<Vec<f64>>;
}

/// Seeded reference engine
pub struct RlweEngine {
    sampler: RandomSampler,
}

impl RlweEngine {
    pub fn new(ctx: &Context, seed: Option<&[u8]>) -> Result<Self> {
        let sampler = primitive(RandomSampler::new(ctx.constants(), seed), "RlweEngine::new")?;
        Ok(Self { sampler })
    }

    /// Sampler shared with the packing layer
    pub(crate) fn sampler_mut(&mut self) -> &mut RandomSampler {
        &mut self.sampler
    }

    fn message_poly(msg: &[f64], delta: f64, ring: &ModRing) -> Result<Vec<u64>> {
        let mut poly = vec![0u64; DEGREE];
        for (dst, &v) in poly.iter_mut().zip(msg) {
            *dst = quantize(v, delta, ring.modulus());
        }
        ring.forward(&mut poly)?;
        Ok(poly)
    }

    /// `b = -a·s + e + m` with fresh uniform `a`
    fn encrypt_secret(
        &mut self,
        ring: &ModRing,
        sk_ntt: &[u64],
        msg_ntt: &[u64],
        noise: &mut [u64],
        uniform_q: bool,
    ) -> Result<PolyPair> {
        let mut a = vec![0u64; DEGREE];
        let context = "RlweEngine::encrypt";
        if uniform_q {
            primitive(self.sampler.sample_uniform_mod_q(&mut a), context)?;
        } else {
            primitive(self.sampler.sample_uniform_mod_p(&mut a), context)?;
        }
        ring.forward(noise)?;
        let mut b = vec![0u64; DEGREE];
        ring.add(noise, msg_ntt, &mut b);
        let mut neg_a = a.clone();
        ring.negate(&mut neg_a);
        ring.mad(&neg_a, sk_ntt, &mut b);
        Ok(PolyPair { a, b })
    }

    /// `(u·pk_b + e0 + m, u·pk_a + e1)`
    fn encrypt_public(
        ring: &ModRing,
        pk_a: &[u64],
        pk_b: &[u64],
        u: &[u64],
        msg_ntt: &[u64],
        e0: &mut [u64],
        e1: &mut [u64],
    ) -> Result<PolyPair> {
        ring.forward(e0)?;
        ring.forward(e1)?;
        let mut b = vec![0u64; DEGREE];
        ring.add(e0, msg_ntt, &mut b);
        ring.mad(u, pk_b, &mut b);
        let mut a = e1.to_vec();
        ring.mad(u, pk_a, &mut a);
        Ok(PolyPair { a, b })
    }
}

impl CkksEngine for RlweEngine {
    fn encrypt(
        &mut self,
        ctx: &Context,
        msg: &[f64],
        key: EncryptionKey<'_>,
        opts: EncryptOptions,
    ) -> Result<RawCiphertext> {
        let context = "RlweEngine::encrypt";
        if msg.len() > DEGREE {
            return Err(Error::encryption(
                context,
                format!("message of {} slots exceeds the degree", msg.len()),
            ));
        }
        trace!(slots = msg.len(), level = opts.level, "encrypting block");

        let with_p = opts.level > 0;
        let m_q = Self::message_poly(msg, opts.delta, ctx.q())?;
        let m_p = if with_p {
            Some(Self::message_poly(msg, opts.delta, ctx.p())?)
        } else {
            None
        };

        let (q_pair, p_pair) = match key {
            EncryptionKey::Secret(sk) => {
                sk.check_context(ctx, context)?;
                let mut e_q = vec![0u64; DEGREE];
                let mut e_p = vec![0u64; DEGREE];
                primitive(self.sampler.sample_gaussian(&mut e_q, Some(&mut e_p)), context)?;
                let q_pair = self.encrypt_secret(ctx.q(), sk.key_q(), &m_q, &mut e_q, true)?;
                let p_pair = match &m_p {
                    Some(m_p) => Some(self.encrypt_secret(ctx.p(), sk.key_p(), m_p, &mut e_p, false)?),
                    None => None,
                };
                (q_pair, p_pair)
            }
            EncryptionKey::Public(pk) => {
                if pk.entries() == 0 {
                    return Err(Error::encryption(context, "public key is empty"));
                }
                let mut u_q = vec![0u64; DEGREE];
                let mut u_p = vec![0u64; DEGREE];
                primitive(self.sampler.sample_zo(&mut u_q, Some(&mut u_p)), context)?;
                ctx.ntt_mod_q(&mut u_q)?;
                ctx.ntt_mod_p(&mut u_p)?;

                let mut e0_q = vec![0u64; DEGREE];
                let mut e0_p = vec![0u64; DEGREE];
                let mut e1_q = vec![0u64; DEGREE];
                let mut e1_p = vec![0u64; DEGREE];
                primitive(self.sampler.sample_gaussian(&mut e0_q, Some(&mut e0_p)), context)?;
                primitive(self.sampler.sample_gaussian(&mut e1_q, Some(&mut e1_p)), context)?;

                let q_pair = Self::encrypt_public(
                    ctx.q(),
                    pk.a_q_at(0),
                    pk.b_q_at(0),
                    &u_q,
                    &m_q,
                    &mut e0_q,
                    &mut e1_q,
                )?;
                let p_pair = match &m_p {
                    Some(m_p) => Some(Self::encrypt_public(
                        ctx.p(),
                        pk.a_p_at(0),
                        pk.b_p_at(0),
                        &u_p,
                        m_p,
                        &mut e0_p,
                        &mut e1_p,
                    )?),
                    None => None,
                };
                (q_pair, p_pair)
            }
        };

        if opts.ntt_out {
            return Ok((q_pair, p_pair));
        }
        let mut q_pair = q_pair;
        ctx.intt_mod_q(&mut q_pair.a)?;
        ctx.intt_mod_q(&mut q_pair.b)?;
        let p_pair = match p_pair {
            Some(mut pair) => {
                ctx.intt_mod_p(&mut pair.a)?;
                ctx.intt_mod_p(&mut pair.b)?;
                Some(pair)
            }
            None => None,
        };
        Ok((q_pair, p_pair))
    }

    fn decrypt(
        &self,
        ctx: &Context,
        ciphertext: &PolyPair,
        sk: &SecretKey,
        delta: f64,
        ntt_form: bool,
    ) -> Result<Vec<f64>> {
        let context = "RlweEngine::decrypt";
        if ciphertext.a.len() != DEGREE || ciphertext.b.len() != DEGREE {
            return Err(Error::decryption(context, "ciphertext polynomials must hold DEGREE coefficients"));
        }
        sk.check_context(ctx, context)?;

        let mut a = ciphertext.a.clone();
        let mut b = ciphertext.b.clone();
        if !ntt_form {
            ctx.ntt_mod_q(&mut a)?;
            ctx.ntt_mod_q(&mut b)?;
        }
        ctx.mad_mod_q(&a, sk.key_q(), &mut b);
        ctx.intt_mod_q(&mut b)?;

        let q = ctx.q().modulus();
        Ok(b.iter().map(|&v| dequantize(v, delta, q)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::KeyGenerator;
    use evi_api::{DeviceType, EvalMode};
    use evi_params::{Preset, SEED_MIN_SIZE};

    fn ctx() -> Context {
        Context::new(Preset::QF0, DeviceType::Cpu, 128, EvalMode::Flat).unwrap()
    }

    #[test]
    fn test_quantize_signs() {
        let m = Modulus::new(evi_params::QF0.prime_q);
        assert_eq!(quantize(0.0, 1024.0, &m), 0);
        assert_eq!(quantize(1.0, 1024.0, &m), 1024);
        assert_eq!(quantize(-1.0, 1024.0, &m), m.value - 1024);
        assert_eq!(quantize(0.4 / 1024.0, 1024.0, &m), 0);
        assert_eq!(quantize(-0.6 / 1024.0, 1024.0, &m), m.value - 1);
        assert_eq!(dequantize(m.value - 1024, 1024.0, &m), -1.0);
        assert_eq!(dequantize(512, 1024.0, &m), 0.5);
    }

    #[test]
    fn test_secret_and_public_round_trip() {
        let ctx = ctx();
        let mut keygen = KeyGenerator::new(&ctx, Some(&[3u8; SEED_MIN_SIZE])).unwrap();
        let sk = keygen.gen_sec_key().unwrap();
        let pk = keygen.gen_enc_key(&sk).unwrap();
        let mut engine = RlweEngine::new(&ctx, Some(&[4u8; SEED_MIN_SIZE])).unwrap();

        let msg: Vec<f64> = (0..DEGREE).map(|i| ((i % 17) as f64 - 8.0) / 8.0).collect();
        let delta = 2f64.powi(25);

        for (key, level, ntt_out) in [
            (EncryptionKey::Secret(&sk), 0, true),
            (EncryptionKey::Secret(&sk), 1, false),
            (EncryptionKey::Public(&pk), 1, true),
            (EncryptionKey::Public(&pk), 0, false),
        ] {
            let opts = EncryptOptions { delta, level, ntt_out };
            let (q, p) = engine.encrypt(&ctx, &msg, key, opts).unwrap();
            assert_eq!(p.is_some(), level == 1);
            let out = engine.decrypt(&ctx, &q, &sk, delta, ntt_out).unwrap();
            for (x, y) in msg.iter().zip(&out) {
                assert!((x - y).abs() < 1e-3, "{x} vs {y}");
            }
        }
    }

    #[test]
    fn test_rejects_oversized_message() {
        let ctx = ctx();
        let mut keygen = KeyGenerator::new(&ctx, Some(&[1u8; SEED_MIN_SIZE])).unwrap();
        let sk = keygen.gen_sec_key().unwrap();
        let mut engine = RlweEngine::new(&ctx, None).unwrap();
        let msg = vec![0.0; DEGREE + 1];
        let err = engine
            .encrypt(&ctx, &msg, EncryptionKey::Secret(&sk), EncryptOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Encryption);
    }
}
