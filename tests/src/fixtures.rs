// src/fixtures.rs

use evi_api::{DeviceType, EvalMode};
use evi_params::{Preset, SEED_MIN_SIZE};
use evi_scheme::{
    Context, ContextConfig, Decryptor, Encryptor, KeyGenerator, KeyPack, Result, SecretKey,
};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Parameters of a reproducible test context
#[derive(Debug, Clone)]
pub struct Fixture {
    pub preset: Preset,
    pub rank: usize,
    pub eval_mode: EvalMode,
    pub seed: u64,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            preset: Preset::QF0,
            rank: 128,
            eval_mode: EvalMode::Flat,
            seed: 1,
        }
    }
}

// Builder methods
impl Fixture {
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_eval_mode(mut self, eval_mode: EvalMode) -> Self {
        self.eval_mode = eval_mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

// Predefined fixtures for the packing modes
impl Fixture {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn rmp() -> Self {
        Self::default().with_rank(512).with_eval_mode(EvalMode::Rmp)
    }

    pub fn mm() -> Self {
        Self::default().with_rank(32).with_eval_mode(EvalMode::Mm)
    }
}

impl Fixture {
    /// Sampler seed for one consumer; distinct streams never share bytes
    pub fn seed_bytes(&self, stream: u64) -> [u8; SEED_MIN_SIZE] {
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);
        rng.set_stream(stream);
        let mut out = [0u8; SEED_MIN_SIZE];
        rng.fill_bytes(&mut out);
        out
    }

    pub fn config(&self) -> ContextConfig {
        ContextConfig::new(self.preset, self.rank, self.eval_mode)
            .with_device(DeviceType::Cpu)
            .with_seed(&self.seed_bytes(0))
    }

    pub fn context(&self) -> Result<Context> {
        Context::from_config(&self.config())
    }

    /// Context plus a secret key and its public keys
    pub fn session(&self) -> Result<Session> {
        let ctx = self.context()?;
        let (sk, pack) = {
            let mut keygen = KeyGenerator::new(&ctx, Some(&self.seed_bytes(1)))?;
            let sk = keygen.gen_sec_key()?;
            let multi = if self.eval_mode.is_shared_a() {
                Some(keygen.gen_multi_sec_key()?)
            } else {
                None
            };
            let pack = keygen.gen_keys(&sk, multi.as_ref())?;
            (sk, pack)
        };
        Ok(Session {
            ctx,
            sk,
            pack,
            encryptor_seed: self.seed_bytes(2),
        })
    }
}

/// Keys generated for one fixture
pub struct Session {
    pub ctx: Context,
    pub sk: SecretKey,
    pub pack: KeyPack,
    encryptor_seed: [u8; SEED_MIN_SIZE],
}

impl Session {
    /// Encryptor with the session's public key loaded
    pub fn encryptor(&self) -> Result<Encryptor<'_>> {
        let mut enc = Encryptor::new(&self.ctx, Some(&self.encryptor_seed))?;
        enc.load_enc_key(&self.pack);
        Ok(enc)
    }

    pub fn decryptor(&self) -> Result<Decryptor<'_>> {
        Decryptor::new(&self.ctx)
    }
}
