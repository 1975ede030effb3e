//! RNS context: moduli, transforms and packing parameters
//!
//! A [`Context`] is built once per (preset, device, rank, mode) tuple and is
//! read-only afterwards. It owns one [`ModRing`] per modulus; each ring holds
//! the full-degree transform, the mini transform over `items_per_ctxt`
//! coefficients and the NTT-form one-hot table used by `shift_index`.
//!
//! ## Packing parameters
//!
//! | mode     | internal rank        | show rank | input ciphertexts        |
//! |----------|----------------------|-----------|--------------------------|
//! | RMP, RMS | `inner_rank(rank)`   | rank      | `ceil(rank / inner)`     |
//! | MS       | rank                 | 0         | 1                        |
//! | FLAT     | rank                 | rank      | 1                        |
//! | MM       | rank                 | rank      | rank                     |
//!
//! `pad_rank` is the next power of two of the internal rank and
//! `items_per_ctxt = DEGREE / pad_rank`.
//!
//! All element-wise operations expect `DEGREE`-long operands with
//! coefficients already reduced below the modulus.

use evi_algorithms::arith::{mul_mod, mul_mod_lazy, sub_if_ge, Modulus};
use evi_algorithms::ntt::Ntt;
use evi_algorithms::preset::{preset_constants, PresetConstants};
use evi_api::{DeviceType, EvalMode};
use evi_internal::math::{log2_floor, next_power_of_two};
use evi_params::{Preset, DEGREE, MAX_CONTEXT_SIZE, MIN_CONTEXT_SIZE, MIN_INNER_RANK};
use tracing::{debug, instrument, warn};

use crate::config::ContextConfig;
use crate::error::{ensure, primitive, Error, Result};

/// Block size used by rank-minimizing packing for a vector of `rank` values
///
/// `max(32, 2^floor(log2(rank) / 2))`
pub fn inner_rank(rank: usize) -> usize {
    if rank == 0 {
        return MIN_INNER_RANK;
    }
    let root = 1usize << (log2_floor(rank as u64) / 2);
    root.max(MIN_INNER_RANK)
}

/// Arithmetic and transforms modulo one prime of the RNS pair
#[derive(Debug, Clone)]
pub struct ModRing {
    modulus: Modulus,
    ntt: Ntt,
    mini: Ntt,
    shift: Vec<Vec<u64>>,
}

impl ModRing {
    fn new(modulus: Modulus, recorded_psi: u64, pad_rank: usize, items_per_ctxt: usize) -> Result<Self> {
        let ntt = primitive(Ntt::new(DEGREE, modulus.value), "Context::new")?;
        if recorded_psi != 0 && recorded_psi != ntt.psi() {
            warn!(
                prime = modulus.value,
                recorded = recorded_psi,
                computed = ntt.psi(),
                "preset root differs from the minimal root, using the computed one"
            );
        }
        let mini = primitive(
            Ntt::new_mini(DEGREE, modulus.value, items_per_ctxt),
            "Context::new",
        )?;

        let mut shift = Vec::with_capacity(items_per_ctxt);
        for i in 0..items_per_ctxt {
            let mut one_hot = vec![0u64; DEGREE];
            one_hot[i * pad_rank] = 1;
            primitive(ntt.forward(&mut one_hot), "Context::new")?;
            shift.push(one_hot);
        }

        Ok(Self {
            modulus,
            ntt,
            mini,
            shift,
        })
    }

    /// The modulus and its reduction constants
    pub fn modulus(&self) -> &Modulus {
        &self.modulus
    }

    /// The prime itself
    pub fn prime(&self) -> u64 {
        self.modulus.value
    }

    /// Full-degree transform tables
    pub fn ntt(&self) -> &Ntt {
        &self.ntt
    }

    /// `res = op1 + op2`
    pub fn add(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        debug_assert!(op1.len() == res.len() && op2.len() == res.len());
        let p = self.modulus.value;
        for ((r, &x), &y) in res.iter_mut().zip(op1).zip(op2) {
            *r = sub_if_ge(x + y, p);
        }
    }

    /// `res += op`
    pub fn add_assign(&self, res: &mut [u64], op: &[u64]) {
        debug_assert_eq!(op.len(), res.len());
        let p = self.modulus.value;
        for (r, &x) in res.iter_mut().zip(op) {
            *r = sub_if_ge(*r + x, p);
        }
    }

    /// `res = op1 - op2`
    pub fn sub(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        debug_assert!(op1.len() == res.len() && op2.len() == res.len());
        let p = self.modulus.value;
        for ((r, &x), &y) in res.iter_mut().zip(op1).zip(op2) {
            *r = sub_if_ge(x + p - y, p);
        }
    }

    /// `res = op1 · op2`
    pub fn mult(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        debug_assert!(op1.len() == res.len() && op2.len() == res.len());
        for ((r, &x), &y) in res.iter_mut().zip(op1).zip(op2) {
            *r = mul_mod(&self.modulus, x, y);
        }
    }

    /// `res *= op`
    pub fn mult_assign(&self, res: &mut [u64], op: &[u64]) {
        debug_assert_eq!(op.len(), res.len());
        for (r, &x) in res.iter_mut().zip(op) {
            *r = mul_mod(&self.modulus, *r, x);
        }
    }

    /// `res += op1 · op2`
    pub fn mad(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        debug_assert!(op1.len() == res.len() && op2.len() == res.len());
        let p = self.modulus.value;
        for ((r, &x), &y) in res.iter_mut().zip(op1).zip(op2) {
            *r = sub_if_ge(*r + mul_mod(&self.modulus, x, y), p);
        }
    }

    /// `res += op1 · scalar`
    pub fn mad_scalar(&self, op1: &[u64], scalar: u64, res: &mut [u64]) {
        debug_assert_eq!(op1.len(), res.len());
        let p = self.modulus.value;
        for (r, &x) in res.iter_mut().zip(op1) {
            *r = sub_if_ge(*r + mul_mod(&self.modulus, x, scalar), p);
        }
    }

    /// `poly = -poly`; zero stays zero
    pub fn negate(&self, poly: &mut [u64]) {
        let p = self.modulus.value;
        for v in poly.iter_mut() {
            *v = if *v == 0 { 0 } else { p - *v };
        }
    }

    /// Forward transform in place
    pub fn forward(&self, poly: &mut [u64]) -> Result<()> {
        primitive(self.ntt.forward(poly), "ModRing::forward")
    }

    /// Mini forward transform
    ///
    /// With `pad_rank == 0` the first `items_per_ctxt` coefficients go
    /// through the mini transform. Otherwise the first `pad_rank`
    /// coefficients are replicated and transformed at full degree.
    pub fn forward_mini(&self, poly: &mut [u64], pad_rank: usize) -> Result<()> {
        if pad_rank == 0 {
            let n = self.mini.degree();
            ensure(poly.len() >= n, "ModRing::forward_mini", "operand shorter than the mini degree")?;
            return primitive(self.mini.forward(&mut poly[..n]), "ModRing::forward_mini");
        }
        primitive(self.ntt.forward_padded(poly, pad_rank), "ModRing::forward_mini")
    }

    /// Inverse of the `pad_rank == 0` mini transform
    pub fn backward_mini(&self, poly: &mut [u64]) -> Result<()> {
        let n = self.mini.degree();
        ensure(poly.len() >= n, "ModRing::backward_mini", "operand shorter than the mini degree")?;
        primitive(self.mini.backward(&mut poly[..n]), "ModRing::backward_mini")
    }

    /// Backward transform in place
    pub fn backward(&self, poly: &mut [u64]) -> Result<()> {
        primitive(self.ntt.backward(poly), "ModRing::backward")
    }

    /// Backward transform resolving only positions `k·fullmod - 1`
    pub fn backward_sparse(&self, poly: &mut [u64], fullmod: usize) -> Result<()> {
        primitive(self.ntt.backward_sparse(poly, fullmod), "ModRing::backward_sparse")
    }

    /// Multiply an NTT-form polynomial by the one-hot at slot
    /// `(index mod items_per_ctxt)·pad_rank`
    pub fn shift_index(&self, index: usize, input: &[u64], out: &mut [u64]) {
        let table = &self.shift[index % self.shift.len()];
        self.mult(input, table, out);
    }

    /// [`ModRing::shift_index`] applied to both halves of a ciphertext
    pub fn shift_index_pair(
        &self,
        index: usize,
        a_in: &[u64],
        b_in: &[u64],
        a_out: &mut [u64],
        b_out: &mut [u64],
    ) {
        let table = &self.shift[index % self.shift.len()];
        self.mult(a_in, table, a_out);
        self.mult(b_in, table, b_out);
    }
}

/// Re-express coefficients mod `from` as centered residues mod `to`
///
/// Values above `from / 2` are treated as negative.
pub fn normalize_mod(poly: &mut [u64], from: &Modulus, to: &Modulus) {
    let half = from.value >> 1;
    let small = half <= to.value;
    let diff = to
        .value
        .wrapping_sub(if small { from.value } else { to.reduce(from.value) });
    for v in poly.iter_mut() {
        let mut t = *v;
        if t > half {
            t = t.wrapping_add(diff);
        }
        *v = if small { sub_if_ge(t, to.value) } else { to.reduce(t) };
    }
}

/// Immutable parameter set shared by encoders, key generators and decryptors
#[derive(Debug)]
pub struct Context {
    constants: PresetConstants,
    device: DeviceType,
    eval_mode: EvalMode,
    rank: usize,
    show_rank: usize,
    pad_rank: usize,
    log_pad_rank: u32,
    items_per_ctxt: usize,
    num_input_cipher: usize,
    ring_q: ModRing,
    ring_p: ModRing,
}

fn check_device(device: DeviceType) -> Result<()> {
    if device == DeviceType::Gpu {
        return Err(Error::not_supported(
            "Context::new",
            "DeviceType::Gpu is not supported in this build",
        ));
    }
    Ok(())
}

fn check_rank(rank: usize) -> Result<()> {
    if !(MIN_CONTEXT_SIZE..=MAX_CONTEXT_SIZE).contains(&rank) {
        return Err(Error::invalid_input(
            "Context::new",
            format!("rank {rank} must lie in [{MIN_CONTEXT_SIZE}, {MAX_CONTEXT_SIZE}]"),
        ));
    }
    Ok(())
}

impl Context {
    /// Context for a table preset
    #[instrument(skip_all, fields(preset = %preset, rank, mode = %eval_mode))]
    pub fn new(preset: Preset, device: DeviceType, rank: usize, eval_mode: EvalMode) -> Result<Self> {
        check_device(device)?;
        check_rank(rank)?;
        let constants = preset_constants(preset)?;

        let (internal, show_rank, num_input_cipher) = match eval_mode {
            EvalMode::Rmp | EvalMode::Rms => {
                let inner = inner_rank(rank);
                (inner, rank, rank.div_ceil(inner))
            }
            EvalMode::Ms => (rank, 0, 1),
            EvalMode::Flat => (rank, rank, 1),
            EvalMode::Mm => (rank, rank, rank),
        };
        Self::build(constants, device, eval_mode, internal, show_rank, num_input_cipher)
    }

    /// FLAT context over caller-supplied primes
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(rank, prime_q, prime_p))]
    pub fn with_runtime(
        device: DeviceType,
        rank: usize,
        prime_q: u64,
        prime_p: u64,
        psi_q: u64,
        psi_p: u64,
        scale_factor: f64,
        hamming_weight: u32,
    ) -> Result<Self> {
        check_device(device)?;
        check_rank(rank)?;
        let constants =
            PresetConstants::runtime(prime_q, prime_p, psi_q, psi_p, scale_factor, hamming_weight)?;
        Self::build(constants, device, EvalMode::Flat, rank, 0, 1)
    }

    /// Context described by a configuration file
    pub fn from_config(config: &ContextConfig) -> Result<Self> {
        Self::new(config.preset()?, config.device, config.rank, config.eval_mode)
    }

    fn build(
        constants: PresetConstants,
        device: DeviceType,
        eval_mode: EvalMode,
        rank: usize,
        show_rank: usize,
        num_input_cipher: usize,
    ) -> Result<Self> {
        let pad_rank = next_power_of_two(rank as u64) as usize;
        let log_pad_rank = log2_floor(pad_rank as u64);
        let items_per_ctxt = DEGREE / pad_rank;
        debug!(
            rank,
            show_rank,
            pad_rank,
            items_per_ctxt,
            num_input_cipher,
            "derived packing parameters"
        );

        let ring_q = ModRing::new(constants.q, constants.psi_q, pad_rank, items_per_ctxt)?;
        let ring_p = ModRing::new(constants.p, constants.psi_p, pad_rank, items_per_ctxt)?;

        Ok(Self {
            constants,
            device,
            eval_mode,
            rank,
            show_rank,
            pad_rank,
            log_pad_rank,
            items_per_ctxt,
            num_input_cipher,
            ring_q,
            ring_p,
        })
    }

    /// Ring modulo Q
    pub fn q(&self) -> &ModRing {
        &self.ring_q
    }

    /// Ring modulo P
    pub fn p(&self) -> &ModRing {
        &self.ring_p
    }

    pub fn add_mod_q(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        self.ring_q.add(op1, op2, res)
    }

    pub fn add_mod_p(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        self.ring_p.add(op1, op2, res)
    }

    pub fn sub_mod_q(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        self.ring_q.sub(op1, op2, res)
    }

    pub fn mult_mod_q(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        self.ring_q.mult(op1, op2, res)
    }

    pub fn mult_mod_p(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        self.ring_p.mult(op1, op2, res)
    }

    pub fn mad_mod_q(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        self.ring_q.mad(op1, op2, res)
    }

    pub fn mad_mod_p(&self, op1: &[u64], op2: &[u64], res: &mut [u64]) {
        self.ring_p.mad(op1, op2, res)
    }

    pub fn mad_scalar_mod_q(&self, op1: &[u64], scalar: u64, res: &mut [u64]) {
        self.ring_q.mad_scalar(op1, scalar, res)
    }

    pub fn negate_mod_q(&self, poly: &mut [u64]) {
        self.ring_q.negate(poly)
    }

    pub fn negate_mod_p(&self, poly: &mut [u64]) {
        self.ring_p.negate(poly)
    }

    pub fn ntt_mod_q(&self, poly: &mut [u64]) -> Result<()> {
        self.ring_q.forward(poly)
    }

    pub fn ntt_mod_p(&self, poly: &mut [u64]) -> Result<()> {
        self.ring_p.forward(poly)
    }

    pub fn ntt_mod_q_mini(&self, poly: &mut [u64], pad_rank: usize) -> Result<()> {
        self.ring_q.forward_mini(poly, pad_rank)
    }

    pub fn ntt_mod_p_mini(&self, poly: &mut [u64], pad_rank: usize) -> Result<()> {
        self.ring_p.forward_mini(poly, pad_rank)
    }

    pub fn intt_mod_q(&self, poly: &mut [u64]) -> Result<()> {
        self.ring_q.backward(poly)
    }

    pub fn intt_mod_p(&self, poly: &mut [u64]) -> Result<()> {
        self.ring_p.backward(poly)
    }

    pub fn intt_mod_q_sparse(&self, poly: &mut [u64], fullmod: usize) -> Result<()> {
        self.ring_q.backward_sparse(poly, fullmod)
    }

    pub fn shift_index_q(&self, index: usize, input: &[u64], out: &mut [u64]) {
        self.ring_q.shift_index(index, input, out)
    }

    pub fn shift_index_p(&self, index: usize, input: &[u64], out: &mut [u64]) {
        self.ring_p.shift_index(index, input, out)
    }

    pub fn shift_index_pair_q(
        &self,
        index: usize,
        a_in: &[u64],
        b_in: &[u64],
        a_out: &mut [u64],
        b_out: &mut [u64],
    ) {
        self.ring_q.shift_index_pair(index, a_in, b_in, a_out, b_out)
    }

    pub fn shift_index_pair_p(
        &self,
        index: usize,
        a_in: &[u64],
        b_in: &[u64],
        a_out: &mut [u64],
        b_out: &mut [u64],
    ) {
        self.ring_p.shift_index_pair(index, a_in, b_in, a_out, b_out)
    }

    /// Lift an NTT-form polynomial mod Q into NTT form mod P
    pub fn mod_up(&self, poly_q: &[u64], poly_p: &mut [u64]) -> Result<()> {
        ensure(
            poly_q.len() == DEGREE && poly_p.len() == DEGREE,
            "Context::mod_up",
            "operands must hold DEGREE coefficients",
        )?;
        poly_p.copy_from_slice(poly_q);
        self.ring_q.backward(poly_p)?;
        normalize_mod(poly_p, &self.constants.q, &self.constants.p);
        self.ring_p.forward(poly_p)
    }

    /// Divide a (Q, P) NTT-form pair by P, rounding away the P residue
    ///
    /// The result lands in `poly_q`; `poly_p` is clobbered.
    pub fn mod_down(&self, poly_q: &mut [u64], poly_p: &mut [u64]) -> Result<()> {
        ensure(
            poly_q.len() == DEGREE && poly_p.len() == DEGREE,
            "Context::mod_down",
            "operands must hold DEGREE coefficients",
        )?;
        self.ring_p.backward(poly_p)?;
        normalize_mod(poly_p, &self.constants.p, &self.constants.q);
        self.ring_q.forward(poly_p)?;

        let q = self.constants.q.value;
        let inv = self.constants.p_inv_mod_q;
        let inv_shoup = self.constants.p_inv_mod_q_shoup;
        for (x, &y) in poly_q.iter_mut().zip(poly_p.iter()) {
            let tmp = q - y + *x;
            *x = sub_if_ge(mul_mod_lazy(tmp, inv, inv_shoup, q), q);
        }
        Ok(())
    }

    /// Numeric constants of the preset
    pub fn constants(&self) -> &PresetConstants {
        &self.constants
    }

    pub fn preset(&self) -> Preset {
        self.constants.preset
    }

    pub fn device(&self) -> DeviceType {
        self.device
    }

    pub fn eval_mode(&self) -> EvalMode {
        self.eval_mode
    }

    /// Internal rank the packing is sized for
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Rank requested by the caller (0 in MS mode)
    pub fn show_rank(&self) -> usize {
        self.show_rank
    }

    pub fn pad_rank(&self) -> usize {
        self.pad_rank
    }

    pub fn log_pad_rank(&self) -> u32 {
        self.log_pad_rank
    }

    pub fn items_per_ctxt(&self) -> usize {
        self.items_per_ctxt
    }

    pub fn num_input_cipher(&self) -> usize {
        self.num_input_cipher
    }

    /// log2 of the default scale
    pub fn scale_factor(&self) -> f64 {
        self.constants.scale_factor
    }

    pub fn db_scale_factor(&self) -> f64 {
        self.constants.db_scale_factor
    }

    pub fn query_scale_factor(&self) -> f64 {
        self.constants.query_scale_factor
    }
}
