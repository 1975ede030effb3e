//! Context, packing, keys and wire formats for encrypted vector search
//!
//! A [`Context`] fixes a parameter preset, an evaluation mode and a vector
//! rank, and derives the packing layout from them. Everything else borrows
//! it:
//!
//! - [`KeyGenerator`] draws secret keys and builds encryption, relinearization,
//!   mod-pack and shared-a switch keys
//! - [`Encryptor`] quantizes vectors into plaintext blocks in the layout the
//!   mode asks for, then encrypts them through a [`CkksEngine`]
//! - [`Decryptor`] undoes both steps for queries and search results
//! - [`serialize`] reads and writes key files, bundles and metadata; block,
//!   query and result layouts live with their types in [`query`]
//!
//! ```no_run
//! use evi_api::{DeviceType, EncodeType, EvalMode};
//! use evi_params::Preset;
//! use evi_scheme::{Context, Decryptor, Encryptor, KeyGenerator};
//!
//! # fn main() -> evi_scheme::Result<()> {
//! let ctx = Context::new(Preset::QF0, DeviceType::Cpu, 128, EvalMode::Flat)?;
//! let mut keygen = KeyGenerator::new(&ctx, None)?;
//! let sk = keygen.gen_sec_key()?;
//! let pack = keygen.gen_keys(&sk, None)?;
//!
//! let mut enc = Encryptor::new(&ctx, None)?;
//! enc.load_enc_key(&pack);
//! let query = enc.encrypt(&[0.25; 128], EncodeType::Item, 0, None)?;
//! let values = Decryptor::new(&ctx)?.decrypt_query(&query, &sk, None)?;
//! assert!((values[0] - 0.25).abs() < 1e-3);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod decryptor;
pub mod encryptor;
pub mod engine;
pub mod error;
pub mod keygen;
pub mod keys;
pub mod query;
pub mod serialize;

mod wire;

pub use config::ContextConfig;
pub use context::{inner_rank, Context, ModRing};
pub use decryptor::Decryptor;
pub use encryptor::Encryptor;
pub use engine::{CkksEngine, EncryptOptions, EncryptionKey, RlweEngine};
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use keygen::KeyGenerator;
pub use keys::{KeyPack, KeySealer, MultiSecretKey, SealInfo, SecretKey, SwitchingKey};
pub use query::{
    Block, BlockAccess, BlockMeta, CipherBlock, Matrix, PlainBlock, PolyPair, Query, SearchResult,
    SerializedBlock,
};
pub use serialize::EvalMetadata;
