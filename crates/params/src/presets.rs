//! Named parameter presets
//!
//! Each preset fixes a pair of NTT-friendly primes (Q, P), their minimal
//! 2·DEGREE-th roots of unity, the fixed-point scale factors and the secret
//! key Hamming weight. A psi of zero means the root is computed when the
//! transform tables are built.

/// Parameter preset identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// 51/55-bit inner-product preset
    IP0,
    /// 60/20-bit inner-product preset with a separate query scale
    IP1,
    /// 58/51-bit preset
    QF0,
    /// Alias of [`Preset::QF0`] kept for key files written under this name
    QF1,
    /// User-provided primes, see `PresetConstants::runtime`
    Runtime,
}

impl Preset {
    /// Name used in key files and metadata
    pub const fn name(self) -> &'static str {
        match self {
            Preset::IP0 => "IP0",
            Preset::IP1 => "IP1",
            Preset::QF0 => "QF0",
            Preset::QF1 => "QF1",
            Preset::Runtime => "RUNTIME",
        }
    }

    /// Parse a preset name. Only the table presets are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "IP0" => Some(Preset::IP0),
            "IP1" => Some(Preset::IP1),
            "QF0" => Some(Preset::QF0),
            "QF1" => Some(Preset::QF1),
            _ => None,
        }
    }

    /// Table entry for this preset, `None` for [`Preset::Runtime`]
    pub const fn params(self) -> Option<&'static PresetParams> {
        match self {
            Preset::IP0 => Some(&IP0),
            Preset::IP1 => Some(&IP1),
            Preset::QF0 | Preset::QF1 => Some(&QF0),
            Preset::Runtime => None,
        }
    }
}

impl core::fmt::Display for Preset {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw values of one preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetParams {
    /// Working modulus
    pub prime_q: u64,

    /// Minimal 2·DEGREE-th root of unity mod Q (0 = compute)
    pub psi_q: u64,

    /// Auxiliary modulus
    pub prime_p: u64,

    /// Minimal 2·DEGREE-th root of unity mod P (0 = compute)
    pub psi_p: u64,

    /// log2 of the default fixed-point scale
    pub scale_factor: f64,

    /// log2 of the scale used for database items
    pub db_scale_factor: f64,

    /// log2 of the scale used for encoded queries
    pub query_scale_factor: f64,

    /// Number of non-zero secret key coefficients
    pub hamming_weight: u32,
}

/// IP0 preset
pub const IP0: PresetParams = PresetParams {
    prime_q: 2251799813554177,
    psi_q: 278055349447,
    prime_p: 36028797014376449,
    psi_p: 115736144453,
    scale_factor: 24.0,
    db_scale_factor: 24.0,
    query_scale_factor: 24.0,
    hamming_weight: 2730,
};

/// IP1 preset
pub const IP1: PresetParams = PresetParams {
    prime_q: 1152921504606830593,
    psi_q: 0,
    prime_p: 1032193,
    psi_p: 0,
    scale_factor: 34.0,
    db_scale_factor: 34.0,
    query_scale_factor: 24.0,
    hamming_weight: 2730,
};

/// QF0 preset (also used by QF1)
pub const QF0: PresetParams = PresetParams {
    prime_q: 288230376135196673,
    psi_q: 60193018759093,
    prime_p: 2251799810670593,
    psi_p: 254746317487,
    scale_factor: 25.0,
    db_scale_factor: 25.0,
    query_scale_factor: 25.0,
    hamming_weight: 2730,
};
