//! Key material
//!
//! Secret keys keep their ternary coefficients next to the NTT-form
//! embeddings into Q and P. Public keys (encryption, relinearization,
//! mod-pack and shared-a switch keys) are all [`SwitchingKey`]s: level-1
//! RLWE pairs, optionally holding several `DEGREE`-sized entries back to
//! back.

use core::fmt;

use evi_algorithms::sampler::RandomSampler;
use evi_api::SealMode;
use evi_internal::constant_time::ct_eq_u64s;
use evi_params::{Preset, AES256_KEY_SIZE, DEGREE};
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::context::Context;
use crate::error::{primitive, Error, Result};

/// QF1 is an alias of QF0 and shares its keys
pub(crate) fn presets_compatible(a: Preset, b: Preset) -> bool {
    let canonical = |p: Preset| if p == Preset::QF1 { Preset::QF0 } else { p };
    canonical(a) == canonical(b)
}

/// Ternary RLWE secret
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    #[zeroize(skip)]
    preset: Preset,
    /// (Q, P) the embeddings were taken in
    #[zeroize(skip)]
    primes: (u64, u64),
    coeffs: Vec<i64>,
    key_q: Vec<u64>,
    key_p: Vec<u64>,
}

impl SecretKey {
    /// Embed ternary coefficients into both moduli and transform them
    pub fn from_coeffs(ctx: &Context, coeffs: &[i64]) -> Result<Self> {
        let context = "SecretKey::from_coeffs";
        if coeffs.len() != DEGREE {
            return Err(Error::invalid_input(
                context,
                format!("expected {DEGREE} coefficients, got {}", coeffs.len()),
            ));
        }
        if coeffs.iter().any(|c| !(-1..=1).contains(c)) {
            return Err(Error::invalid_input(context, "coefficients must be ternary"));
        }

        let mut key_q = vec![0u64; DEGREE];
        let mut key_p = vec![0u64; DEGREE];
        primitive(RandomSampler::embedding(coeffs, &mut key_q, ctx.q().prime()), context)?;
        primitive(RandomSampler::embedding(coeffs, &mut key_p, ctx.p().prime()), context)?;
        ctx.ntt_mod_q(&mut key_q)?;
        ctx.ntt_mod_p(&mut key_p)?;

        Ok(Self {
            preset: ctx.preset(),
            primes: (ctx.q().prime(), ctx.p().prime()),
            coeffs: coeffs.to_vec(),
            key_q,
            key_p,
        })
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    /// Ternary coefficients in `{-1, 0, 1}`
    pub fn coeffs(&self) -> &[i64] {
        &self.coeffs
    }

    /// NTT form mod Q
    pub fn key_q(&self) -> &[u64] {
        &self.key_q
    }

    /// NTT form mod P
    pub fn key_p(&self) -> &[u64] {
        &self.key_p
    }

    /// Number of nonzero coefficients
    pub fn hamming_weight(&self) -> usize {
        self.coeffs.iter().filter(|&&c| c != 0).count()
    }

    pub(crate) fn check_context(&self, ctx: &Context, context: &'static str) -> Result<()> {
        if !presets_compatible(self.preset, ctx.preset()) {
            return Err(Error::invalid_input(
                context,
                format!("secret key for {} used with a {} context", self.preset, ctx.preset()),
            ));
        }
        if self.primes != (ctx.q().prime(), ctx.p().prime()) {
            return Err(Error::invalid_input(context, "secret key was embedded under different primes"));
        }
        Ok(())
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        let same_q = Choice::from(ct_eq_u64s(&self.key_q, &other.key_q) as u8);
        let same_p = Choice::from(ct_eq_u64s(&self.key_p, &other.key_p) as u8);
        let same_preset = (presets_compatible(self.preset, other.preset) as u8).ct_eq(&1);
        (same_q & same_p & same_preset).into()
    }
}

impl Eq for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("preset", &self.preset)
            .field("degree", &self.key_q.len())
            .finish()
    }
}

/// Independent secrets used by shared-a modes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiSecretKey {
    keys: Vec<SecretKey>,
}

impl MultiSecretKey {
    pub fn new(keys: Vec<SecretKey>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::invalid_input("MultiSecretKey::new", "no secret keys given"));
        }
        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SecretKey> {
        self.keys.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, SecretKey> {
        self.keys.iter()
    }
}

impl core::ops::Index<usize> for MultiSecretKey {
    type Output = SecretKey;

    fn index(&self, index: usize) -> &SecretKey {
        &self.keys[index]
    }
}

/// Level-1 RLWE pairs `(a, b)` over Q and P in NTT form
///
/// Entry `k` occupies coefficients `k·DEGREE..(k+1)·DEGREE` of each vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchingKey {
    pub a_q: Vec<u64>,
    pub a_p: Vec<u64>,
    pub b_q: Vec<u64>,
    pub b_p: Vec<u64>,
}

impl SwitchingKey {
    /// All-zero key with `entries` slots
    pub fn zeroed(entries: usize) -> Self {
        let len = entries * DEGREE;
        Self {
            a_q: vec![0; len],
            a_p: vec![0; len],
            b_q: vec![0; len],
            b_p: vec![0; len],
        }
    }

    pub fn entries(&self) -> usize {
        self.a_q.len() / DEGREE
    }

    fn slot(k: usize) -> core::ops::Range<usize> {
        k * DEGREE..(k + 1) * DEGREE
    }

    pub fn a_q_at(&self, k: usize) -> &[u64] {
        &self.a_q[Self::slot(k)]
    }

    pub fn a_p_at(&self, k: usize) -> &[u64] {
        &self.a_p[Self::slot(k)]
    }

    pub fn b_q_at(&self, k: usize) -> &[u64] {
        &self.b_q[Self::slot(k)]
    }

    pub fn b_p_at(&self, k: usize) -> &[u64] {
        &self.b_p[Self::slot(k)]
    }

    /// Mutable views `(a_q, a_p, b_q, b_p)` of entry `k`
    pub(crate) fn entry_mut(&mut self, k: usize) -> (&mut [u64], &mut [u64], &mut [u64], &mut [u64]) {
        let r = Self::slot(k);
        (
            &mut self.a_q[r.clone()],
            &mut self.a_p[r.clone()],
            &mut self.b_q[r.clone()],
            &mut self.b_p[r],
        )
    }
}

/// Public keys handed to the encryptor and the evaluator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPack {
    enc_key: Option<SwitchingKey>,
    relin_key: Option<SwitchingKey>,
    mod_pack_key: Option<SwitchingKey>,
    switch_key: Option<SwitchingKey>,
}

impl KeyPack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enc_key(&self) -> Option<&SwitchingKey> {
        self.enc_key.as_ref()
    }

    pub fn relin_key(&self) -> Option<&SwitchingKey> {
        self.relin_key.as_ref()
    }

    pub fn mod_pack_key(&self) -> Option<&SwitchingKey> {
        self.mod_pack_key.as_ref()
    }

    /// Shared-a conversion key used by multi-secret encryption
    pub fn switch_key(&self) -> Option<&SwitchingKey> {
        self.switch_key.as_ref()
    }

    pub fn set_enc_key(&mut self, key: SwitchingKey) {
        self.enc_key = Some(key);
    }

    pub fn set_eval_keys(&mut self, relin: SwitchingKey, mod_pack: SwitchingKey) {
        self.relin_key = Some(relin);
        self.mod_pack_key = Some(mod_pack);
    }

    pub fn set_switch_key(&mut self, key: SwitchingKey) {
        self.switch_key = Some(key);
    }

    pub fn enc_loaded(&self) -> bool {
        self.enc_key.is_some()
    }

    pub fn eval_loaded(&self) -> bool {
        self.relin_key.is_some() && self.mod_pack_key.is_some()
    }
}

/// How a secret key file is protected at rest
#[derive(Clone)]
pub struct SealInfo {
    mode: SealMode,
    key: Option<Zeroizing<Vec<u8>>>,
}

impl SealInfo {
    /// Unsealed storage
    pub fn none() -> Self {
        Self {
            mode: SealMode::None,
            key: None,
        }
    }

    /// AES key-encryption-key sealing; the key must be 32 bytes
    pub fn aes_kek(key: &[u8]) -> Result<Self> {
        if key.len() != AES256_KEY_SIZE {
            return Err(Error::invalid_input(
                "SealInfo::aes_kek",
                format!("AES-KEK key must be {AES256_KEY_SIZE} bytes, got {}", key.len()),
            ));
        }
        Ok(Self {
            mode: SealMode::AesKek,
            key: Some(Zeroizing::new(key.to_vec())),
        })
    }

    pub fn mode(&self) -> SealMode {
        self.mode
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref().map(Vec::as_slice)
    }
}

impl Default for SealInfo {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for SealInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealInfo")
            .field("mode", &self.mode)
            .field("has_key", &self.key.is_some())
            .finish()
    }
}

/// Boundary to the component that encrypts secret key files at rest
pub trait KeySealer {
    fn seal(&self, info: &SealInfo, plain: &[u8]) -> Result<Vec<u8>>;

    fn unseal(&self, info: &SealInfo, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use evi_api::{DeviceType, EvalMode};

    fn ctx() -> Context {
        Context::new(Preset::QF0, DeviceType::Cpu, 64, EvalMode::Flat).unwrap()
    }

    fn ternary(seed: usize) -> Vec<i64> {
        (0..DEGREE).map(|i| ((i * 7 + seed) % 3) as i64 - 1).collect()
    }

    #[test]
    fn test_secret_key_embedding() {
        let ctx = ctx();
        let sk = SecretKey::from_coeffs(&ctx, &ternary(0)).unwrap();
        let mut back = sk.key_q().to_vec();
        ctx.intt_mod_q(&mut back).unwrap();
        let q = ctx.q().prime();
        for (c, &v) in sk.coeffs().iter().zip(&back) {
            let expected = if *c < 0 { q - 1 } else { *c as u64 };
            assert_eq!(v, expected);
        }
        assert_eq!(sk.preset(), Preset::QF0);
    }

    #[test]
    fn test_runtime_keys_are_tied_to_their_primes() {
        let runtime = |q: &evi_params::PresetParams| {
            Context::with_runtime(DeviceType::Cpu, 64, q.prime_q, q.prime_p, 0, 0, 20.0, 64).unwrap()
        };
        let qf0 = runtime(&evi_params::QF0);
        let ip0 = runtime(&evi_params::IP0);
        let sk = SecretKey::from_coeffs(&qf0, &ternary(1)).unwrap();

        assert!(sk.check_context(&qf0, "test").is_ok());
        let err = sk.check_context(&ip0, "test").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_secret_key_rejects_bad_coeffs() {
        let ctx = ctx();
        let err = SecretKey::from_coeffs(&ctx, &[0; 10]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let mut coeffs = ternary(1);
        coeffs[5] = 2;
        assert!(SecretKey::from_coeffs(&ctx, &coeffs).is_err());
    }

    #[test]
    fn test_secret_key_equality_and_debug() {
        let ctx = ctx();
        let a = SecretKey::from_coeffs(&ctx, &ternary(0)).unwrap();
        let b = SecretKey::from_coeffs(&ctx, &ternary(0)).unwrap();
        let c = SecretKey::from_coeffs(&ctx, &ternary(1)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        let shown = format!("{a:?}");
        assert!(shown.contains("QF0"));
        assert!(!shown.contains("key_q"));
    }

    #[test]
    fn test_presets_compatible() {
        assert!(presets_compatible(Preset::QF0, Preset::QF1));
        assert!(!presets_compatible(Preset::QF0, Preset::IP0));
    }

    #[test]
    fn test_switching_key_slots() {
        let mut key = SwitchingKey::zeroed(3);
        assert_eq!(key.entries(), 3);
        key.entry_mut(2).2[0] = 5;
        assert_eq!(key.b_q_at(2)[0], 5);
        assert_eq!(key.b_q[2 * DEGREE], 5);
    }

    #[test]
    fn test_key_pack_flags() {
        let mut pack = KeyPack::new();
        assert!(!pack.enc_loaded());
        pack.set_enc_key(SwitchingKey::zeroed(1));
        assert!(pack.enc_loaded());
        assert!(!pack.eval_loaded());
        pack.set_eval_keys(SwitchingKey::zeroed(1), SwitchingKey::zeroed(2));
        assert!(pack.eval_loaded());
    }

    #[test]
    fn test_seal_info() {
        assert_eq!(SealInfo::aes_kek(&[0; 16]).unwrap_err().kind(), ErrorKind::InvalidInput);
        let info = SealInfo::aes_kek(&[7; 32]).unwrap();
        assert_eq!(info.mode(), SealMode::AesKek);
        assert_eq!(info.key().unwrap().len(), 32);
        assert!(!format!("{info:?}").contains('7'));
        assert_eq!(SealInfo::default().mode(), SealMode::None);
    }
}
