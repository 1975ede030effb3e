//! Constants shared by every evi crate

/// Polynomial degree (number of coefficients per polynomial)
pub const DEGREE: usize = 4096;

/// log2 of [`DEGREE`]
pub const LOG_DEGREE: u32 = 12;

/// Size in bytes of one polynomial stored as little-endian `u64`s
pub const U64_DEGREE: usize = DEGREE * 8;

/// log2 of the smallest supported context dimension
pub const MIN_CONTEXT_SIZE_LOG: u32 = 5;

/// log2 of the largest supported context dimension
pub const MAX_CONTEXT_SIZE_LOG: u32 = 12;

/// Smallest supported context dimension
pub const MIN_CONTEXT_SIZE: usize = 1 << MIN_CONTEXT_SIZE_LOG;

/// Largest supported context dimension
pub const MAX_CONTEXT_SIZE: usize = 1 << MAX_CONTEXT_SIZE_LOG;

/// Number of distinct power-of-two context sizes
pub const NUM_CONTEXT: usize = (MAX_CONTEXT_SIZE_LOG - MIN_CONTEXT_SIZE_LOG + 1) as usize;

/// Exact seed length consumed by the random sampler
pub const SEED_MIN_SIZE: usize = 64;

/// Bit size of one draw in the rejection sampler
pub const HW_REJ_BIT_SIZE: u32 = 12;

/// Coin count of the centered binomial error distribution
pub const CBD_COIN_SIZE: u32 = 21;

/// Standard deviation the centered binomial distribution approximates
pub const GAUSSIAN_ERROR_STDEV: f64 = 3.2;

/// SHAKE256 rate in bytes
pub const SHAKE256_RATE: usize = 136;

/// Bytes squeezed from the XOF per refill
pub const PRNG_BUF_SIZE: usize = SHAKE256_RATE * 80;

/// Width in bits of one buffered random word
pub const BIT_MAX_LEN: u32 = 64;

/// AES-256 key size used by sealed secret keys
pub const AES256_KEY_SIZE: usize = 32;

/// AES-GCM nonce size used by sealed secret keys
pub const AES256_IV_SIZE: usize = 12;

/// AES-GCM tag size used by sealed secret keys
pub const AES256_TAG_SIZE: usize = 16;

/// Lower bound of the internal rank used by rank-minimizing packing
pub const MIN_INNER_RANK: usize = 32;

/// Leading byte of a serialized secret key file
pub const SECRET_KEY_FORMAT_TAG: u8 = 0x01;

/// Length of the preset name field in a secret key file
pub const PRESET_NAME_SIZE: usize = 4;
