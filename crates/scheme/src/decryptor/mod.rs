//! Decryption and decoding back to `f32` vectors
//!
//! Only FLAT, RMP and MM contexts have a client-side decryptor; the shared-a
//! modes never hand ciphertexts back to the key owner.

use evi_api::{EncodeType, EvalMode};
use evi_params::DEGREE;
use tracing::{instrument, trace};

use crate::context::Context;
use crate::engine::{dequantize, CkksEngine, RlweEngine};
use crate::error::{Error, Result};
use crate::keys::SecretKey;
use crate::query::{Block, BlockAccess, BlockMeta, PolyPair, Query, SearchResult};

/// Turns ciphertexts, plaintexts and search results back into vectors
pub struct Decryptor<'a, E: CkksEngine = RlweEngine> {
    ctx: &'a Context,
    engine: E,
}

impl<'a> Decryptor<'a, RlweEngine> {
    pub fn new(ctx: &'a Context) -> Result<Self> {
        Self::with_engine(ctx, RlweEngine::new(ctx, None)?)
    }
}

impl<'a, E: CkksEngine> Decryptor<'a, E> {
    pub fn with_engine(ctx: &'a Context, engine: E) -> Result<Self> {
        match ctx.eval_mode() {
            EvalMode::Flat | EvalMode::Rmp | EvalMode::Mm => Ok(Self { ctx, engine }),
            mode => Err(Error::invalid_access(
                "Decryptor::new",
                format!("no decryptor for {mode} mode"),
            )),
        }
    }

    pub fn context(&self) -> &Context {
        self.ctx
    }

    /// Decrypt an encrypted vector
    ///
    /// FLAT and RMP give `DEGREE` values with the encoder's reversal and
    /// padding undone. MM queries come back as `cols × show_rank` values,
    /// item-major.
    #[instrument(skip_all, fields(blocks = query.len()))]
    pub fn decrypt_query(&self, query: &Query, sk: &SecretKey, scale: Option<f64>) -> Result<Vec<f32>> {
        if self.ctx.eval_mode() == EvalMode::Mm {
            return self.decrypt_mm_query(query, sk, scale);
        }
        let delta = scale.unwrap_or_else(|| self.ctx.scale_factor().exp2());
        self.unpack(query, sk, delta, 0)
    }

    /// Decrypt item `idx` of an RMP batch ciphertext
    pub fn decrypt_query_at(
        &self,
        idx: usize,
        query: &Query,
        sk: &SecretKey,
        scale: Option<f64>,
    ) -> Result<Vec<f32>> {
        if self.ctx.eval_mode() != EvalMode::Rmp {
            return Err(Error::not_supported(
                "Decryptor::decrypt_query_at",
                "indexed decryption is only available in RMP mode",
            ));
        }
        let delta = scale.unwrap_or_else(|| self.ctx.scale_factor().exp2());
        self.unpack(query, sk, delta, idx)
    }

    /// Decode a plaintext query produced by the encoder
    pub fn decode(&self, query: &Query) -> Result<Vec<f32>> {
        let context = "Decryptor::decode";
        let ctx = self.ctx;
        if ctx.eval_mode() == EvalMode::Mm {
            let block = query
                .blocks()
                .first()
                .ok_or_else(|| Error::invalid_input(context, "empty query"))?;
            let (plain, meta) = plain_poly(block, context)?;
            let delta = (meta.scale_bit as f64).exp2();
            let len = (meta.show_dim as usize).min(DEGREE);
            return Ok(plain[..len]
                .iter()
                .map(|&v| dequantize(v, delta, ctx.q().modulus()) as f32)
                .collect());
        }

        let mut out = vec![0f32; DEGREE];
        for (i, block) in query.iter().enumerate() {
            let (plain, meta) = plain_poly(block, context)?;
            let mut coeffs = plain.to_vec();
            ctx.intt_mod_q(&mut coeffs)?;
            let delta = (meta.scale_bit as f64).exp2();
            let slots: Vec<f64> = coeffs.iter().map(|&v| dequantize(v, delta, ctx.q().modulus())).collect();
            place(&mut out, &slots, meta, i, 0);
        }
        Ok(out)
    }

    /// Decrypt a server search result
    ///
    /// The default scale is `2^scale_factor`, squared when `is_score` marks an
    /// inner-product result.
    #[instrument(skip_all, fields(items = result.total_item_count(), is_score))]
    pub fn decrypt_result(
        &self,
        result: &SearchResult,
        sk: &SecretKey,
        is_score: bool,
        scale: Option<f64>,
    ) -> Result<Vec<f32>> {
        let context = "Decryptor::decrypt_result";
        let matrix = result.matrix();
        let b = matrix.get_poly(0, 0)?;
        let a = matrix.get_poly(1, 0)?;
        if b.is_empty() || a.len() != b.len() {
            return Err(Error::decryption(context, "result holds no ciphertext"));
        }

        if self.ctx.eval_mode() == EvalMode::Mm {
            let delta = scale.unwrap_or_else(|| (2.0 * self.ctx.scale_factor()).exp2());
            return self.decrypt_mm_result(result, a, b, sk, delta);
        }

        let exponent = self.ctx.scale_factor() * if is_score { 2.0 } else { 1.0 };
        let delta = scale.unwrap_or_else(|| exponent.exp2());
        let items = self.ctx.items_per_ctxt();
        let pad = self.ctx.pad_rank();

        let mut out = Vec::with_capacity(b.len());
        for (a, b) in a.chunks_exact(DEGREE).zip(b.chunks_exact(DEGREE)) {
            let pair = PolyPair {
                a: a.to_vec(),
                b: b.to_vec(),
            };
            let buf = self.engine.decrypt(self.ctx, &pair, sk, delta, true)?;
            if is_score {
                out.extend((0..DEGREE).map(|j| buf[(j % items) * pad + j / items] as f32));
            } else {
                out.extend(buf.iter().map(|&v| v as f32));
            }
        }
        trace!(values = out.len(), "result decrypted");
        Ok(out)
    }

    fn decrypt_mm_result(
        &self,
        result: &SearchResult,
        a: &[u64],
        b: &[u64],
        sk: &SecretKey,
        delta: f64,
    ) -> Result<Vec<f32>> {
        let rows = result.matrix().dim as usize;
        let mut item_count = result.total_item_count() as usize / DEGREE;
        if item_count == 0 {
            item_count = result.matrix().n as usize;
        }
        let needed = item_count * rows * DEGREE;
        if b.len() < needed {
            return Err(Error::decryption(
                "Decryptor::decrypt_result",
                format!("result holds {} coefficients, {needed} expected", b.len()),
            ));
        }

        let mut out = vec![0f32; needed];
        for row in 0..rows {
            for item in 0..item_count {
                let at = (item * rows + row) * DEGREE;
                let pair = PolyPair {
                    a: a[at..at + DEGREE].to_vec(),
                    b: b[at..at + DEGREE].to_vec(),
                };
                let buf = self.engine.decrypt(self.ctx, &pair, sk, delta, false)?;
                let dst = (row * item_count + item) * DEGREE;
                for (d, &v) in out[dst..dst + DEGREE].iter_mut().zip(&buf) {
                    *d = v as f32;
                }
            }
        }
        Ok(out)
    }

    fn decrypt_mm_query(&self, query: &Query, sk: &SecretKey, scale: Option<f64>) -> Result<Vec<f32>> {
        let rows = query.len();
        let cols = match query.inner_item_count() {
            0 => DEGREE,
            n => n as usize,
        };
        let stride = self.ctx.show_rank();
        let delta = scale.unwrap_or_else(|| self.ctx.db_scale_factor().exp2());

        let mut out = vec![0f32; cols * stride];
        for (row, block) in query.iter().enumerate().take(rows.min(stride)) {
            let pair = cipher_pair(block, "Decryptor::decrypt_query")?;
            let buf = self.engine.decrypt(self.ctx, &pair, sk, delta, false)?;
            for (col, &v) in buf.iter().enumerate().take(cols.min(DEGREE)) {
                out[col * stride + row] = v as f32;
            }
        }
        Ok(out)
    }

    /// Decrypt every block and lay the values out as the encoder read them
    fn unpack(&self, query: &Query, sk: &SecretKey, delta: f64, idx: usize) -> Result<Vec<f32>> {
        let context = "Decryptor::decrypt_query";
        if query.is_empty() {
            return Err(Error::decryption(context, "query holds no ciphertext"));
        }
        let mut out = vec![0f32; DEGREE];
        for (i, block) in query.iter().enumerate() {
            let pair = cipher_pair(block, context)?;
            let slots = self.engine.decrypt(self.ctx, &pair, sk, delta, true)?;
            place(&mut out, &slots, block.meta(), i, idx);
        }
        Ok(out)
    }
}

/// Q-part `(a, b)` of a ciphertext block
fn cipher_pair(block: &Block, context: &'static str) -> Result<PolyPair> {
    let cipher = block
        .as_cipher()
        .ok_or_else(|| Error::decryption(context, "block is not a ciphertext"))?;
    if cipher.q.a.is_empty() || cipher.q.b.is_empty() {
        return Err(Error::decryption(context, "empty ciphertext polynomial"));
    }
    Ok(cipher.q.clone())
}

fn plain_poly<'b>(block: &'b Block, context: &'static str) -> Result<(&'b [u64], &'b BlockMeta)> {
    match block {
        Block::Plain(plain) => Ok((&plain.q, &plain.meta)),
        Block::Serialized(_) => Err(Error::not_supported(
            context,
            "128-bit plaintext blocks cannot be decoded",
        )),
        Block::Cipher(_) => Err(Error::invalid_input(context, "block is a ciphertext")),
    }
}

/// Copy the values of block `i` into `out`, undoing the query reversal
///
/// Block `i` covers `out[dim·i..]`. `idx` selects the packed item of an RMP
/// batch ciphertext (items only).
fn place(out: &mut Vec<f32>, slots: &[f64], meta: &BlockMeta, i: usize, idx: usize) {
    let dim = meta.dim as usize;
    if dim == 0 {
        return;
    }
    let start = dim * i;
    let shown = (meta.show_dim as usize).max(dim);
    let count = dim.min(shown.saturating_sub(start));
    let padded = dim.next_power_of_two();
    if out.len() < start + count {
        out.resize(start + count, 0.0);
    }
    for j in 0..count {
        let src = match meta.encode_type {
            EncodeType::Item => j + idx * dim,
            EncodeType::Query => padded - 1 - j,
        };
        if let Some(&v) = slots.get(src) {
            out[start + j] = v as f32;
        }
    }
}
