//! Derived per-preset constants
//!
//! [`preset_constants`] is the single entry point turning a named preset
//! into the immutable numeric table every other component reads. Nothing is
//! cached globally; building the table is cheap.

use evi_api::{Error, Result};
use evi_internal::math::{inv_mod_prime, is_power_of_two};
use evi_params::{Preset, PresetParams, DEGREE};

use crate::arith::{shoup, Modulus};

/// Immutable numeric constants of one parameter set
#[derive(Debug, Clone, PartialEq)]
pub struct PresetConstants {
    /// Preset these constants were derived from
    pub preset: Preset,
    /// Working modulus Q
    pub q: Modulus,
    /// Auxiliary modulus P
    pub p: Modulus,
    /// Root of unity recorded for Q (0 = computed by the transform)
    pub psi_q: u64,
    /// Root of unity recorded for P (0 = computed by the transform)
    pub psi_p: u64,
    /// `P mod Q`
    pub p_mod_q: u64,
    /// `P^-1 mod Q`
    pub p_inv_mod_q: u64,
    /// Shoup companion of `p_inv_mod_q`
    pub p_inv_mod_q_shoup: u64,
    /// `DEGREE^-1 mod Q`
    pub inv_degree_q: u64,
    /// `DEGREE^-1 mod P`
    pub inv_degree_p: u64,
    /// log2 of the default scale
    pub scale_factor: f64,
    /// log2 of the database scale
    pub db_scale_factor: f64,
    /// log2 of the query scale
    pub query_scale_factor: f64,
    /// Secret key Hamming weight
    pub hamming_weight: u32,
}

/// Constants of a table preset
///
/// Fails with `NotSupported` for [`Preset::Runtime`], which has no table
/// entry; use [`PresetConstants::runtime`] instead.
pub fn preset_constants(preset: Preset) -> Result<PresetConstants> {
    let params = preset.params().ok_or_else(|| {
        Error::not_supported("preset_constants", format!("preset {preset} has no fixed table"))
    })?;
    PresetConstants::derive(preset, params)
}

impl PresetConstants {
    /// Constants for caller-supplied primes
    pub fn runtime(
        prime_q: u64,
        prime_p: u64,
        psi_q: u64,
        psi_p: u64,
        scale_factor: f64,
        hamming_weight: u32,
    ) -> Result<Self> {
        let params = PresetParams {
            prime_q,
            psi_q,
            prime_p,
            psi_p,
            scale_factor,
            db_scale_factor: scale_factor,
            query_scale_factor: scale_factor,
            hamming_weight,
        };
        Self::derive(Preset::Runtime, &params)
    }

    fn derive(preset: Preset, params: &PresetParams) -> Result<Self> {
        for (name, prime) in [("prime_q", params.prime_q), ("prime_p", params.prime_p)] {
            check_prime(name, prime)?;
        }
        if params.hamming_weight as usize > DEGREE {
            return Err(Error::invalid_input(
                "PresetConstants",
                format!("hamming weight {} exceeds degree", params.hamming_weight),
            ));
        }

        let q = Modulus::new(params.prime_q);
        let p = Modulus::new(params.prime_p);
        let p_mod_q = q.reduce(params.prime_p);
        let p_inv_mod_q = inv_mod_prime(p_mod_q, q.value).ok_or_else(|| {
            Error::invalid_input("PresetConstants", "P is not invertible modulo Q")
        })?;
        let inv_degree = |m: &Modulus| inv_mod_prime(DEGREE as u64, m.value);

        Ok(Self {
            preset,
            q,
            p,
            psi_q: params.psi_q,
            psi_p: params.psi_p,
            p_mod_q,
            p_inv_mod_q,
            p_inv_mod_q_shoup: shoup(p_inv_mod_q, q.value),
            inv_degree_q: inv_degree(&q).unwrap_or_default(),
            inv_degree_p: inv_degree(&p).unwrap_or_default(),
            scale_factor: params.scale_factor,
            db_scale_factor: params.db_scale_factor,
            query_scale_factor: params.query_scale_factor,
            hamming_weight: params.hamming_weight,
        })
    }
}

fn check_prime(name: &'static str, prime: u64) -> Result<()> {
    let two_n = 2 * DEGREE as u64;
    if prime < two_n || prime >= (1 << 62) || (prime - 1) % two_n != 0 {
        return Err(Error::invalid_input(
            "PresetConstants",
            format!("{name} = {prime} is not an NTT-friendly prime below 2^62"),
        ));
    }
    debug_assert!(is_power_of_two(two_n));
    Ok(())
}
