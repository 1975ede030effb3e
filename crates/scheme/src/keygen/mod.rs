//! Key generation
//!
//! Every public key is built from the same switching-key recipe: a level-1
//! RLWE sample under the target secret whose Q part additionally carries
//! `P · from`. The encryption key is the degenerate case `from = 0`.

use evi_algorithms::sampler::RandomSampler;
use evi_params::DEGREE;
use tracing::{debug, instrument};

use crate::context::Context;
use crate::error::{primitive, Error, Result};
use crate::keys::{KeyPack, MultiSecretKey, SecretKey, SwitchingKey};

/// Produces secret keys and the public keys derived from them
pub struct KeyGenerator<'a> {
    ctx: &'a Context,
    sampler: RandomSampler,
}

impl<'a> KeyGenerator<'a> {
    /// `seed` must hold at least `SEED_MIN_SIZE` bytes; `None` draws from the OS
    pub fn new(ctx: &'a Context, seed: Option<&[u8]>) -> Result<Self> {
        let sampler = primitive(RandomSampler::new(ctx.constants(), seed), "KeyGenerator::new")?;
        Ok(Self { ctx, sampler })
    }

    pub fn context(&self) -> &Context {
        self.ctx
    }

    /// Ternary secret with the preset's Hamming weight
    #[instrument(skip_all, fields(preset = %self.ctx.preset()))]
    pub fn gen_sec_key(&mut self) -> Result<SecretKey> {
        let mut coeffs = vec![0i64; DEGREE];
        primitive(self.sampler.sample_hwt(&mut coeffs), "KeyGenerator::gen_sec_key")?;
        SecretKey::from_coeffs(self.ctx, &coeffs)
    }

    /// Fixed secret, identical across runs and seeds
    pub fn gen_sec_key_deterministic(&self) -> Result<SecretKey> {
        let mut coeffs = vec![0i64; DEGREE];
        primitive(
            self.sampler.no_sample_hwt(&mut coeffs),
            "KeyGenerator::gen_sec_key_deterministic",
        )?;
        SecretKey::from_coeffs(self.ctx, &coeffs)
    }

    /// One independent secret per internal rank slot
    #[instrument(skip_all, fields(count = self.ctx.rank()))]
    pub fn gen_multi_sec_key(&mut self) -> Result<MultiSecretKey> {
        let keys = (0..self.ctx.rank())
            .map(|_| self.gen_sec_key())
            .collect::<Result<Vec<_>>>()?;
        MultiSecretKey::new(keys)
    }

    /// Public encryption key `(-a, a·s + e)` over Q and P
    #[instrument(skip_all)]
    pub fn gen_enc_key(&mut self, sk: &SecretKey) -> Result<SwitchingKey> {
        sk.check_context(self.ctx, "KeyGenerator::gen_enc_key")?;
        let mut key = SwitchingKey::zeroed(1);
        self.fill_switching_entry(&mut key, 0, sk, None)?;
        Ok(key)
    }

    /// Key switching `from_q` (NTT form mod Q) to `sk`
    pub fn gen_switching_key(&mut self, sk: &SecretKey, from_q: &[u64]) -> Result<SwitchingKey> {
        let context = "KeyGenerator::gen_switching_key";
        sk.check_context(self.ctx, context)?;
        if from_q.len() != DEGREE {
            return Err(Error::invalid_input(
                context,
                format!("source polynomial must hold {DEGREE} coefficients"),
            ));
        }
        let mut key = SwitchingKey::zeroed(1);
        self.fill_switching_entry(&mut key, 0, sk, Some(from_q))?;
        Ok(key)
    }

    /// Entry `k` switches `to[k]` into `from`
    #[instrument(skip_all, fields(entries = to.len()))]
    pub fn gen_switch_key(&mut self, from: &SecretKey, to: &[SecretKey]) -> Result<SwitchingKey> {
        let context = "KeyGenerator::gen_switch_key";
        from.check_context(self.ctx, context)?;
        if to.is_empty() {
            return Err(Error::invalid_input(context, "no target secrets"));
        }
        let mut key = SwitchingKey::zeroed(to.len());
        for (k, target) in to.iter().enumerate() {
            target.check_context(self.ctx, context)?;
            self.fill_switching_entry(&mut key, k, from, Some(target.key_q()))?;
        }
        Ok(key)
    }

    /// Relinearization key switching `s²` back to `s`
    #[instrument(skip_all)]
    pub fn gen_relin_key(&mut self, sk: &SecretKey) -> Result<SwitchingKey> {
        let mut square = vec![0u64; DEGREE];
        self.ctx.mult_mod_q(sk.key_q(), sk.key_q(), &mut square);
        self.gen_switching_key(sk, &square)
    }

    /// Mod-pack key for a single secret, `pad_rank` entries
    #[instrument(skip_all, fields(pad_rank = self.ctx.pad_rank()))]
    pub fn gen_mod_pack_key(&mut self, sk: &SecretKey) -> Result<SwitchingKey> {
        let targets = vec![sk.clone(); self.ctx.pad_rank()];
        self.gen_shared_a_mod_pack_key(sk, &targets)
    }

    /// Mod-pack key gathering the rotated coefficients of every target secret
    ///
    /// Entry `k` switches the secret whose slot `pad·j + i` holds coefficient
    /// `j·pad + pad - 1 - k` of `to[i]` (negacyclic index wrap).
    #[instrument(skip_all, fields(targets = to.len()))]
    pub fn gen_shared_a_mod_pack_key(
        &mut self,
        from: &SecretKey,
        to: &[SecretKey],
    ) -> Result<SwitchingKey> {
        let context = "KeyGenerator::gen_shared_a_mod_pack_key";
        from.check_context(self.ctx, context)?;
        let pad = self.ctx.pad_rank();
        if to.is_empty() || to.len() > pad {
            return Err(Error::invalid_input(
                context,
                format!("expected 1..={pad} target secrets, got {}", to.len()),
            ));
        }
        let items = self.ctx.items_per_ctxt();
        let q = self.ctx.q().prime();

        let mut key = SwitchingKey::zeroed(pad);
        let mut coeffs = vec![0i64; DEGREE];
        let mut from_q = vec![0u64; DEGREE];
        for k in 0..pad {
            coeffs.fill(0);
            for j in 0..items {
                for (i, target) in to.iter().enumerate() {
                    target.check_context(self.ctx, context)?;
                    let src = (j * pad + pad - 1 - k + DEGREE) % DEGREE;
                    coeffs[pad * j + i] = target.coeffs()[src];
                }
            }
            primitive(RandomSampler::embedding(&coeffs, &mut from_q, q), context)?;
            self.ctx.ntt_mod_q(&mut from_q)?;
            self.fill_switching_entry(&mut key, k, from, Some(&from_q))?;
        }
        debug!(entries = pad, "mod-pack key generated");
        Ok(key)
    }

    /// Encryption key plus evaluation keys; shared-a modes also get the
    /// switch key from `multi` into `sk`
    #[instrument(skip_all, fields(mode = %self.ctx.eval_mode()))]
    pub fn gen_keys(&mut self, sk: &SecretKey, multi: Option<&MultiSecretKey>) -> Result<KeyPack> {
        let mut pack = KeyPack::new();
        pack.set_enc_key(self.gen_enc_key(sk)?);
        let relin = self.gen_relin_key(sk)?;
        let mod_pack = self.gen_mod_pack_key(sk)?;
        pack.set_eval_keys(relin, mod_pack);

        if self.ctx.eval_mode().is_shared_a() {
            let multi = multi.ok_or_else(|| {
                Error::invalid_input(
                    "KeyGenerator::gen_keys",
                    "shared-a modes need the multi secret key",
                )
            })?;
            let targets: Vec<SecretKey> = multi.iter().cloned().collect();
            pack.set_switch_key(self.gen_switch_key(sk, &targets)?);
        }
        Ok(pack)
    }

    /// Fill entry `k` so that `b + a·s = e + P·from` mod Q and `b + a·s = e` mod P
    fn fill_switching_entry(
        &mut self,
        key: &mut SwitchingKey,
        k: usize,
        sk: &SecretKey,
        from_q: Option<&[u64]>,
    ) -> Result<()> {
        let context = "KeyGenerator::gen_switching_key";
        let ctx = self.ctx;
        let (a_q, a_p, b_q, b_p) = key.entry_mut(k);

        primitive(self.sampler.sample_uniform_mod_q(a_q), context)?;
        primitive(self.sampler.sample_uniform_mod_p(a_p), context)?;
        primitive(self.sampler.sample_gaussian(b_q, Some(&mut *b_p)), context)?;
        ctx.ntt_mod_q(b_q)?;
        ctx.ntt_mod_p(b_p)?;

        ctx.mad_mod_q(a_q, sk.key_q(), b_q);
        ctx.mad_mod_p(a_p, sk.key_p(), b_p);
        ctx.negate_mod_q(a_q);
        ctx.negate_mod_p(a_p);

        if let Some(from_q) = from_q {
            ctx.mad_scalar_mod_q(from_q, ctx.constants().p_mod_q, b_q);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evi_api::{DeviceType, EvalMode};
    use evi_params::{Preset, SEED_MIN_SIZE};

    fn ctx(mode: EvalMode) -> Context {
        Context::new(Preset::QF0, DeviceType::Cpu, 64, mode).unwrap()
    }

    /// Largest centered coefficient of `INTT(b + a·s - P·from)` mod Q
    fn residual_norm(ctx: &Context, key: &SwitchingKey, k: usize, sk: &SecretKey, from_q: &[u64]) -> u64 {
        let mut acc = key.b_q_at(k).to_vec();
        ctx.mad_mod_q(key.a_q_at(k), sk.key_q(), &mut acc);
        let mut scaled = vec![0u64; DEGREE];
        ctx.mad_scalar_mod_q(from_q, ctx.constants().p_mod_q, &mut scaled);
        let mut diff = vec![0u64; DEGREE];
        ctx.sub_mod_q(&acc, &scaled, &mut diff);
        ctx.intt_mod_q(&mut diff).unwrap();
        let q = ctx.q().prime();
        diff.iter().map(|&v| v.min(q - v)).max().unwrap_or(0)
    }

    #[test]
    fn test_sec_key_weight_and_seed() {
        let ctx = ctx(EvalMode::Flat);
        let seed = [9u8; SEED_MIN_SIZE];
        let a = KeyGenerator::new(&ctx, Some(&seed)).unwrap().gen_sec_key().unwrap();
        let b = KeyGenerator::new(&ctx, Some(&seed)).unwrap().gen_sec_key().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hamming_weight(), ctx.constants().hamming_weight as usize);

        let other = KeyGenerator::new(&ctx, Some(&[8u8; SEED_MIN_SIZE]))
            .unwrap()
            .gen_sec_key()
            .unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_deterministic_key_ignores_seed() {
        let ctx = ctx(EvalMode::Flat);
        let a = KeyGenerator::new(&ctx, Some(&[1u8; SEED_MIN_SIZE]))
            .unwrap()
            .gen_sec_key_deterministic()
            .unwrap();
        let b = KeyGenerator::new(&ctx, None).unwrap().gen_sec_key_deterministic().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_enc_key_is_rlwe_sample() {
        let ctx = ctx(EvalMode::Flat);
        let mut keygen = KeyGenerator::new(&ctx, Some(&[2u8; SEED_MIN_SIZE])).unwrap();
        let sk = keygen.gen_sec_key().unwrap();
        let pk = keygen.gen_enc_key(&sk).unwrap();
        assert_eq!(pk.entries(), 1);
        let zero = vec![0u64; DEGREE];
        assert!(residual_norm(&ctx, &pk, 0, &sk, &zero) <= 21);
    }

    #[test]
    fn test_switching_key_carries_source() {
        let ctx = ctx(EvalMode::Flat);
        let mut keygen = KeyGenerator::new(&ctx, Some(&[3u8; SEED_MIN_SIZE])).unwrap();
        let sk = keygen.gen_sec_key().unwrap();
        let other = keygen.gen_sec_key().unwrap();

        let key = keygen.gen_switch_key(&sk, &[other.clone(), sk.clone()]).unwrap();
        assert_eq!(key.entries(), 2);
        assert!(residual_norm(&ctx, &key, 0, &sk, other.key_q()) <= 21);
        assert!(residual_norm(&ctx, &key, 1, &sk, sk.key_q()) <= 21);

        let relin = keygen.gen_relin_key(&sk).unwrap();
        let mut square = vec![0u64; DEGREE];
        ctx.mult_mod_q(sk.key_q(), sk.key_q(), &mut square);
        assert!(residual_norm(&ctx, &relin, 0, &sk, &square) <= 21);
    }

    #[test]
    fn test_mod_pack_key_entries() {
        let ctx = ctx(EvalMode::Flat);
        let mut keygen = KeyGenerator::new(&ctx, Some(&[4u8; SEED_MIN_SIZE])).unwrap();
        let sk = keygen.gen_sec_key_deterministic().unwrap();
        let key = keygen.gen_mod_pack_key(&sk).unwrap();
        assert_eq!(key.entries(), ctx.pad_rank());

        let too_many = vec![sk.clone(); ctx.pad_rank() + 1];
        assert!(keygen.gen_shared_a_mod_pack_key(&sk, &too_many).is_err());
    }

    #[test]
    fn test_gen_keys_by_mode() {
        let flat = ctx(EvalMode::Flat);
        let mut keygen = KeyGenerator::new(&flat, Some(&[5u8; SEED_MIN_SIZE])).unwrap();
        let sk = keygen.gen_sec_key().unwrap();
        let pack = keygen.gen_keys(&sk, None).unwrap();
        assert!(pack.enc_loaded() && pack.eval_loaded());
        assert!(pack.switch_key().is_none());

        let ms = Context::new(Preset::QF0, DeviceType::Cpu, 32, EvalMode::Ms).unwrap();
        let mut keygen = KeyGenerator::new(&ms, Some(&[6u8; SEED_MIN_SIZE])).unwrap();
        let sk = keygen.gen_sec_key().unwrap();
        assert!(keygen.gen_keys(&sk, None).is_err());
        let multi = keygen.gen_multi_sec_key().unwrap();
        assert_eq!(multi.len(), ms.rank());
        let pack = keygen.gen_keys(&sk, Some(&multi)).unwrap();
        assert_eq!(pack.switch_key().unwrap().entries(), multi.len());
    }

    #[test]
    fn test_rejects_foreign_secret() {
        let qf = ctx(EvalMode::Flat);
        let ip = Context::new(Preset::IP0, DeviceType::Cpu, 64, EvalMode::Flat).unwrap();
        let sk = KeyGenerator::new(&ip, None).unwrap().gen_sec_key_deterministic().unwrap();
        let mut keygen = KeyGenerator::new(&qf, None).unwrap();
        assert!(keygen.gen_enc_key(&sk).is_err());
    }
}
