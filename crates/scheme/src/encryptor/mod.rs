//! Vector packing, encoding and encryption
//!
//! The layout rules depend on the evaluation mode of the [`Context`]:
//!
//! * FLAT / MS: one vector per block. Items are copied in order; queries are
//!   reversed and right-aligned inside the next power of two so a negacyclic
//!   product lines up the inner product.
//! * RMP / RMS: the vector is cut into `inner_rank` sized blocks, queries
//!   reversed inside each block.
//! * MM: queries stay in coefficient form; databases are encrypted
//!   transposed, one ciphertext per row and `DEGREE` items per batch.

use evi_algorithms::arith::sub_if_ge;
use evi_api::{EncodeType, EvalMode};
use evi_params::{DEGREE, MAX_CONTEXT_SIZE};
use tracing::{debug, instrument, trace};

use crate::context::{inner_rank, Context};
use crate::engine::{quantize, CkksEngine, EncryptOptions, EncryptionKey, RlweEngine};
use crate::error::{primitive, Error, Result};
use crate::keys::{KeyPack, MultiSecretKey, SecretKey, SwitchingKey};
use crate::query::{BlockMeta, CipherBlock, Matrix, PlainBlock, PolyPair, Query, SerializedBlock};

/// One block worth of slot values with its metadata
struct Slots {
    values: Vec<f64>,
    meta: BlockMeta,
}

/// Encodes plaintexts and encrypts them with a [`CkksEngine`]
pub struct Encryptor<'a, E: CkksEngine = RlweEngine> {
    ctx: &'a Context,
    engine: E,
    enc_key: Option<SwitchingKey>,
    switch_key: Option<SwitchingKey>,
}

impl<'a> Encryptor<'a, RlweEngine> {
    /// Encryptor backed by the reference engine
    pub fn new(ctx: &'a Context, seed: Option<&[u8]>) -> Result<Self> {
        Ok(Self::with_engine(ctx, RlweEngine::new(ctx, seed)?))
    }

    /// Shared-a encryption (RMS / MS)
    ///
    /// Block `j` is encrypted under `multi[j]` with one `a` shared by every
    /// block, then moved to the key the switch key targets. The result is a
    /// level-0 ciphertext per block.
    #[instrument(skip_all, fields(len = msg.len()))]
    pub fn encrypt_multi(
        &mut self,
        msg: &[f32],
        multi: &MultiSecretKey,
        encode_type: EncodeType,
        scale: Option<f64>,
    ) -> Result<Query> {
        let context = "Encryptor::encrypt_multi";
        let ctx = self.ctx;
        if !ctx.eval_mode().is_shared_a() {
            return Err(Error::invalid_access(
                context,
                format!("shared-a encryption is not available in {} mode", ctx.eval_mode()),
            ));
        }
        if msg.is_empty() {
            return Err(Error::encryption(context, "nothing to encrypt"));
        }
        let switch_key = self
            .switch_key
            .as_ref()
            .ok_or_else(|| Error::encryption(context, "switch key is not loaded"))?;
        check_fits(msg.len(), context)?;

        let block_rank = inner_rank(msg.len());
        let num_blocks = msg.len().div_ceil(block_rank);
        let usable = multi.len().min(switch_key.entries()).min(ctx.pad_rank());
        if num_blocks > usable {
            return Err(Error::invalid_input(
                context,
                format!("{num_blocks} blocks need as many secrets, only {usable} available"),
            ));
        }
        let delta = scale.unwrap_or_else(|| ctx.scale_factor().exp2());

        let sampler = self.engine.sampler_mut();
        let mut a = vec![0u64; DEGREE];
        primitive(sampler.sample_uniform_mod_q(&mut a), context)?;
        ctx.ntt_mod_q(&mut a)?;
        let mut neg_a = a.clone();
        ctx.negate_mod_q(&mut neg_a);

        let q = ctx.q();
        let mut shared = Vec::with_capacity(num_blocks);
        for (j, chunk) in msg.chunks(block_rank).enumerate() {
            multi[j].check_context(ctx, context)?;
            let mut slots = vec![0f64; DEGREE];
            for (dst, &v) in slots.iter_mut().zip(chunk) {
                *dst = f64::from(v);
            }
            if encode_type == EncodeType::Query {
                slots[..block_rank].reverse();
            }

            let mut b = vec![0u64; DEGREE];
            primitive(sampler.sample_gaussian(&mut b, None), context)?;
            for (dst, &v) in b.iter_mut().zip(&slots) {
                let m = quantize(v, delta, q.modulus());
                *dst = sub_if_ge(*dst + m, q.prime());
            }
            ctx.ntt_mod_q(&mut b)?;
            ctx.mad_mod_q(&neg_a, multi[j].key_q(), &mut b);
            shared.push(b);
        }

        let mut up_p = vec![0u64; DEGREE];
        ctx.mod_up(&a, &mut up_p)?;

        let mut out = Query::new();
        for (j, b_j) in shared.iter().enumerate() {
            let k = j % ctx.pad_rank();
            let mut b_q = vec![0u64; DEGREE];
            let mut b_p = vec![0u64; DEGREE];
            let mut a_q = vec![0u64; DEGREE];
            let mut a_p = vec![0u64; DEGREE];
            ctx.mult_mod_q(&a, switch_key.b_q_at(k), &mut b_q);
            ctx.mult_mod_p(&up_p, switch_key.b_p_at(k), &mut b_p);
            ctx.mult_mod_q(&a, switch_key.a_q_at(k), &mut a_q);
            ctx.mult_mod_p(&up_p, switch_key.a_p_at(k), &mut a_p);
            ctx.mod_down(&mut a_q, &mut a_p)?;
            ctx.mod_down(&mut b_q, &mut b_p)?;
            ctx.q().add_assign(&mut b_q, b_j);

            let meta = BlockMeta {
                n: 1,
                dim: ctx.pad_rank() as u64,
                show_dim: msg.len() as u64,
                encode_type,
                ..BlockMeta::default()
            };
            out.push(CipherBlock {
                meta,
                q: PolyPair { a: a_q, b: b_q },
                p: None,
            });
        }
        debug!(blocks = out.len(), "shared-a query converted");
        Ok(out)
    }
}

impl<'a, E: CkksEngine> Encryptor<'a, E> {
    /// Encryptor backed by a caller-provided engine
    pub fn with_engine(ctx: &'a Context, engine: E) -> Self {
        Self {
            ctx,
            engine,
            enc_key: None,
            switch_key: None,
        }
    }

    pub fn context(&self) -> &Context {
        self.ctx
    }

    /// Take the encryption key (and, for shared-a modes, the switch key)
    pub fn load_enc_key(&mut self, pack: &KeyPack) {
        self.enc_key = pack.enc_key().cloned();
        if self.ctx.eval_mode().is_shared_a() {
            self.switch_key = pack.switch_key().cloned();
        }
    }

    pub fn enc_loaded(&self) -> bool {
        self.enc_key.is_some()
    }

    /// Encode `msg` into plaintext blocks
    ///
    /// `scale` overrides the query scale (RMS uses the main scale factor).
    pub fn encode(
        &self,
        msg: &[f32],
        encode_type: EncodeType,
        level: u32,
        scale: Option<f64>,
    ) -> Result<Query> {
        let context = "Encryptor::encode";
        if msg.is_empty() {
            return Err(Error::encryption(context, "nothing to encode"));
        }
        check_level(level, context)?;
        let ctx = self.ctx;
        let scale_bit = match scale {
            Some(s) => s.log2() as u64,
            None => ctx.query_scale_factor() as u64,
        };
        let delta = scale.unwrap_or_else(|| (scale_bit as f64).exp2());

        let mut out = Query::new();
        match ctx.eval_mode() {
            EvalMode::Mm => {
                if encode_type != EncodeType::Query {
                    return Err(Error::not_supported(context, "MM mode only encodes queries"));
                }
                check_fits(msg.len(), context)?;
                let values: Vec<f64> = msg.iter().map(|&v| f64::from(v)).collect();
                let mut meta = flat_meta(msg.len(), encode_type);
                meta.scale_bit = scale_bit;
                out.push(self.encode_block(&values, meta, level, delta, Transform::None)?);
            }
            EvalMode::Rmp => {
                for mut slots in split_rank_blocks(msg, encode_type, context)? {
                    slots.meta.scale_bit = scale_bit;
                    let rank = slots.meta.dim as usize;
                    let block =
                        self.encode_block(&slots.values[..rank], slots.meta, level, delta, Transform::Mini(rank))?;
                    out.push(block);
                }
            }
            EvalMode::Rms => {
                let delta = scale.unwrap_or_else(|| ctx.scale_factor().exp2());
                for mut slots in split_rank_blocks(msg, encode_type, context)? {
                    slots.meta.scale_bit = scale_bit;
                    let rank = slots.meta.dim as usize;
                    let mut poly = vec![0u64; DEGREE];
                    for (dst, &v) in poly.iter_mut().zip(&slots.values[..rank]) {
                        *dst = quantize(v, delta, ctx.q().modulus());
                    }
                    ctx.ntt_mod_q_mini(&mut poly, rank)?;
                    out.push(SerializedBlock {
                        meta: slots.meta,
                        coeffs: poly.into_iter().map(u128::from).collect(),
                    });
                }
            }
            EvalMode::Flat | EvalMode::Ms => {
                let mut slots = flat_slots(msg, encode_type, context)?;
                slots.meta.scale_bit = scale_bit;
                out.push(self.encode_block(&slots.values, slots.meta, level, delta, Transform::Full)?);
            }
        }
        trace!(blocks = out.len(), mode = %ctx.eval_mode(), "encoded");
        Ok(out)
    }

    /// Encode every row and concatenate the blocks
    pub fn encode_batch(
        &self,
        rows: &[Vec<f32>],
        encode_type: EncodeType,
        level: u32,
        scale: Option<f64>,
    ) -> Result<Query> {
        let mut out = Query::new();
        for row in rows {
            out.extend(self.encode(row, encode_type, level, scale)?);
        }
        Ok(out)
    }

    /// Encrypt with the loaded public key
    #[instrument(skip_all, fields(len = msg.len(), level))]
    pub fn encrypt(
        &mut self,
        msg: &[f32],
        encode_type: EncodeType,
        level: u32,
        scale: Option<f64>,
    ) -> Result<Query> {
        let context = "Encryptor::encrypt";
        let mode = self.ctx.eval_mode();
        if mode.is_shared_a() || mode == EvalMode::Mm {
            return Err(Error::not_supported(
                context,
                format!("public-key encryption is not available in {mode} mode"),
            ));
        }
        let enc_key = self
            .enc_key
            .as_ref()
            .ok_or_else(|| Error::encryption(context, "encryption key is not loaded"))?;
        Self::encrypt_layout(
            self.ctx,
            &mut self.engine,
            msg,
            encode_type,
            level,
            scale,
            EncryptionKey::Public(enc_key),
        )
    }

    /// Encrypt with a secret key; no public key needs to be loaded
    #[instrument(skip_all, fields(len = msg.len(), level))]
    pub fn encrypt_with_secret(
        &mut self,
        msg: &[f32],
        sk: &SecretKey,
        encode_type: EncodeType,
        level: u32,
        scale: Option<f64>,
    ) -> Result<Query> {
        Self::encrypt_layout(
            self.ctx,
            &mut self.engine,
            msg,
            encode_type,
            level,
            scale,
            EncryptionKey::Secret(sk),
        )
    }

    /// Encrypt many vectors with the loaded public key
    ///
    /// RMP packs `DEGREE / inner_rank` items per ciphertext; the items that
    /// do not fill a whole ciphertext go into groups of 1, 2, 4, ... items.
    /// FLAT gives one query per vector and MM delegates to
    /// [`Encryptor::encrypt_mm`].
    #[instrument(skip_all, fields(items = msgs.len(), level))]
    pub fn encrypt_batch(
        &mut self,
        msgs: &[Vec<f32>],
        encode_type: EncodeType,
        level: u32,
        scale: Option<f64>,
    ) -> Result<Vec<Query>> {
        let context = "Encryptor::encrypt_batch";
        if self.enc_key.is_none() {
            return Err(Error::encryption(context, "encryption key is not loaded"));
        }
        if msgs.is_empty() {
            return Err(Error::encryption(context, "nothing to encrypt"));
        }
        match self.ctx.eval_mode() {
            EvalMode::Rmp => self.encrypt_batch_rmp(msgs, encode_type, level, scale),
            EvalMode::Flat => msgs
                .iter()
                .map(|m| self.encrypt(m, encode_type, level, scale))
                .collect(),
            EvalMode::Mm => self.encrypt_mm(msgs, encode_type, level, scale),
            mode => Err(Error::not_supported(
                context,
                format!("batch encryption is not available in {mode} mode"),
            )),
        }
    }

    /// Encrypt `num_items` equal-length vectors stored back to back
    ///
    /// FLAT returns one matrix holding `DEGREE / dim` items per ciphertext.
    /// RMP returns one matrix per `inner_rank` slice of the dimension, each
    /// holding `DEGREE / inner_rank` items per ciphertext. A matrix `degree`
    /// is its item count per ciphertext.
    #[instrument(skip_all, fields(len = msg.len(), num_items, level))]
    pub fn encrypt_bulk(
        &mut self,
        msg: &[f32],
        num_items: usize,
        level: u32,
        scale: Option<f64>,
    ) -> Result<Vec<Matrix>> {
        let context = "Encryptor::encrypt_bulk";
        let ctx = self.ctx;
        let enc_key = self
            .enc_key
            .as_ref()
            .ok_or_else(|| Error::encryption(context, "encryption key is not loaded"))?;
        if msg.is_empty() {
            return Err(Error::encryption(context, "nothing to encrypt"));
        }
        if num_items == 0 || msg.len() % num_items != 0 {
            return Err(Error::invalid_input(
                context,
                format!("{} values do not split into {num_items} items", msg.len()),
            ));
        }
        let dim = msg.len() / num_items;
        if !dim.is_power_of_two() {
            return Err(Error::invalid_input(context, format!("item dimension {dim} is not a power of two")));
        }
        check_fits(dim, context)?;
        check_level(level, context)?;
        let opts = EncryptOptions {
            delta: scale.unwrap_or_else(|| ctx.scale_factor().exp2()),
            level,
            ntt_out: true,
        };

        match ctx.eval_mode() {
            EvalMode::Flat => {
                let mut blocks = Vec::with_capacity(msg.len().div_ceil(DEGREE));
                for chunk in msg.chunks(DEGREE) {
                    let slots = flat_slots(chunk, EncodeType::Item, context)?;
                    let (q, p) = self.engine.encrypt(ctx, &slots.values, EncryptionKey::Public(enc_key), opts)?;
                    blocks.push(CipherBlock { meta: slots.meta, q, p });
                }
                let mut matrix = Matrix::from_cipher_blocks(&blocks, None, dim as u64)?;
                matrix.n = num_items as u64;
                matrix.degree = (DEGREE / dim) as u64;
                Ok(vec![matrix])
            }
            EvalMode::Rmp => {
                let block_rank = inner_rank(dim);
                let num_db = dim.div_ceil(block_rank);
                let per_ctxt = DEGREE / block_rank;
                let num_ctxt = num_items.div_ceil(per_ctxt);
                debug!(num_db, num_ctxt, block_rank, "bulk layout");

                let mut out = Vec::with_capacity(num_db);
                for db in 0..num_db {
                    let mut blocks = Vec::with_capacity(num_ctxt);
                    for first in (0..num_items).step_by(per_ctxt) {
                        let mut slots = vec![0f64; DEGREE];
                        for (i, item) in msg.chunks_exact(dim).skip(first).take(per_ctxt).enumerate() {
                            let from = db * block_rank;
                            let to = (from + block_rank).min(dim);
                            for (dst, &v) in slots[i * block_rank..].iter_mut().zip(&item[from..to]) {
                                *dst = f64::from(v);
                            }
                        }
                        let (q, p) = self.engine.encrypt(ctx, &slots, EncryptionKey::Public(enc_key), opts)?;
                        blocks.push(CipherBlock {
                            meta: BlockMeta {
                                n: 1,
                                dim: block_rank as u64,
                                show_dim: dim as u64,
                                encode_type: EncodeType::Item,
                                ..BlockMeta::default()
                            },
                            q,
                            p,
                        });
                    }
                    let mut matrix = Matrix::from_cipher_blocks(&blocks, None, block_rank as u64)?;
                    matrix.n = num_items as u64;
                    matrix.degree = per_ctxt as u64;
                    out.push(matrix);
                }
                Ok(out)
            }
            mode => Err(Error::not_supported(
                context,
                format!("bulk encryption is not available in {mode} mode"),
            )),
        }
    }

    /// MM database encryption
    ///
    /// Batch `b` holds items `b·DEGREE..`; its ciphertext for row `i` carries
    /// coordinate `i` of every item of the batch, in coefficient form.
    #[instrument(skip_all, fields(items = msgs.len()))]
    pub fn encrypt_mm(
        &mut self,
        msgs: &[Vec<f32>],
        encode_type: EncodeType,
        level: u32,
        scale: Option<f64>,
    ) -> Result<Vec<Query>> {
        let context = "Encryptor::encrypt_mm";
        if msgs.is_empty() {
            return Err(Error::encryption(context, "nothing to encrypt"));
        }
        if self.ctx.eval_mode() != EvalMode::Mm {
            return Err(Error::not_supported(context, "transposed encryption is MM only"));
        }
        check_level(level, context)?;
        let ctx = self.ctx;
        let enc_key = self
            .enc_key
            .as_ref()
            .ok_or_else(|| Error::encryption(context, "encryption key is not loaded"))?;
        let opts = EncryptOptions {
            delta: scale.unwrap_or_else(|| ctx.db_scale_factor().exp2()),
            level,
            ntt_out: false,
        };

        let rows = uniform_len(msgs, context)?;
        let mut out = Vec::with_capacity(msgs.len().div_ceil(DEGREE));
        for batch in msgs.chunks(DEGREE) {
            let mut query = Query::new();
            for row in 0..rows {
                let column: Vec<f64> = batch
                    .iter()
                    .map(|item| f64::from(item[row]))
                    .collect();
                let (q, p) = self.engine.encrypt(ctx, &column, EncryptionKey::Public(enc_key), opts)?;
                let meta = BlockMeta {
                    n: batch.len() as u64,
                    dim: rows as u64,
                    show_dim: rows as u64,
                    encode_type,
                    ..BlockMeta::default()
                };
                query.push(CipherBlock { meta, q, p });
            }
            out.push(query);
        }
        Ok(out)
    }

    fn encrypt_batch_rmp(
        &mut self,
        msgs: &[Vec<f32>],
        encode_type: EncodeType,
        level: u32,
        scale: Option<f64>,
    ) -> Result<Vec<Query>> {
        let context = "Encryptor::encrypt_batch";
        if encode_type == EncodeType::Query {
            return Err(Error::not_supported(context, "queries cannot be batch encrypted"));
        }
        check_level(level, context)?;
        let ctx = self.ctx;
        let enc_key = self
            .enc_key
            .as_ref()
            .ok_or_else(|| Error::encryption(context, "encryption key is not loaded"))?;

        let show_dim = uniform_len(msgs, context)?;
        let block_rank = inner_rank(show_dim);
        let num_blocks = show_dim.div_ceil(block_rank).max(1);
        let per_ctxt = DEGREE / block_rank;
        let opts = EncryptOptions {
            delta: scale.unwrap_or_else(|| ctx.scale_factor().exp2()),
            level,
            ntt_out: true,
        };

        let groups = rmp_groups(msgs.len(), per_ctxt);
        debug!(groups = groups.len(), per_ctxt, block_rank, "batch layout");

        let mut out = Vec::with_capacity(groups.len());
        let mut start = 0;
        for size in groups {
            let items = &msgs[start..start + size];
            start += size;
            let mut query = Query::new();
            for block in 0..num_blocks {
                let mut slots = vec![0f64; DEGREE];
                for (i, item) in items.iter().enumerate() {
                    let from = block * block_rank;
                    let to = (from + block_rank).min(show_dim);
                    for (dst, &v) in slots[i * block_rank..].iter_mut().zip(&item[from..to]) {
                        *dst = f64::from(v);
                    }
                }
                let (q, p) = self.engine.encrypt(ctx, &slots, EncryptionKey::Public(enc_key), opts)?;
                let meta = BlockMeta {
                    n: size as u64,
                    dim: block_rank as u64,
                    show_dim: show_dim as u64,
                    encode_type,
                    ..BlockMeta::default()
                };
                query.push(CipherBlock { meta, q, p });
            }
            out.push(query);
        }
        Ok(out)
    }

    fn encrypt_layout(
        ctx: &Context,
        engine: &mut E,
        msg: &[f32],
        encode_type: EncodeType,
        level: u32,
        scale: Option<f64>,
        key: EncryptionKey<'_>,
    ) -> Result<Query> {
        let context = "Encryptor::encrypt";
        if msg.is_empty() {
            return Err(Error::encryption(context, "nothing to encrypt"));
        }
        check_level(level, context)?;
        let opts = EncryptOptions {
            delta: scale.unwrap_or_else(|| ctx.scale_factor().exp2()),
            level,
            ntt_out: true,
        };

        let layout = if ctx.eval_mode() == EvalMode::Rmp {
            split_rank_blocks(msg, encode_type, context)?
        } else {
            vec![flat_slots(msg, encode_type, context)?]
        };
        let mut out = Query::new();
        for slots in layout {
            let (q, p) = engine.encrypt(ctx, &slots.values, key, opts)?;
            out.push(CipherBlock {
                meta: slots.meta,
                q,
                p,
            });
        }
        Ok(out)
    }

    fn encode_block(
        &self,
        values: &[f64],
        meta: BlockMeta,
        level: u32,
        delta: f64,
        transform: Transform,
    ) -> Result<PlainBlock> {
        let ctx = self.ctx;
        let mut q = vec![0u64; DEGREE];
        for (dst, &v) in q.iter_mut().zip(values) {
            *dst = quantize(v, delta, ctx.q().modulus());
        }
        let mut p = if level > 0 {
            let mut p = vec![0u64; DEGREE];
            for (dst, &v) in p.iter_mut().zip(values) {
                *dst = quantize(v, delta, ctx.p().modulus());
            }
            Some(p)
        } else {
            None
        };

        match transform {
            Transform::None => {}
            Transform::Full => {
                ctx.ntt_mod_q(&mut q)?;
                if let Some(p) = p.as_mut() {
                    ctx.ntt_mod_p(p)?;
                }
            }
            Transform::Mini(rank) => {
                ctx.ntt_mod_q_mini(&mut q, rank)?;
                if let Some(p) = p.as_mut() {
                    ctx.ntt_mod_p_mini(p, rank)?;
                }
            }
        }
        Ok(PlainBlock { meta, q, p })
    }
}

#[derive(Debug, Clone, Copy)]
enum Transform {
    None,
    Full,
    /// Padded transform of the first `rank` slots
    Mini(usize),
}

fn check_level(level: u32, context: &'static str) -> Result<()> {
    if level > 1 {
        return Err(Error::invalid_input(context, format!("level must be 0 or 1, got {level}")));
    }
    Ok(())
}

fn check_fits(len: usize, context: &'static str) -> Result<()> {
    let max = MAX_CONTEXT_SIZE.min(DEGREE);
    if len > max {
        return Err(Error::invalid_input(
            context,
            format!("vector of {len} values exceeds the maximum dimension {max}"),
        ));
    }
    Ok(())
}

/// Common length of a batch whose items must all share one dimension
fn uniform_len(msgs: &[Vec<f32>], context: &'static str) -> Result<usize> {
    let len = msgs.first().map_or(0, Vec::len);
    if len == 0 {
        return Err(Error::invalid_input(context, "batch items must not be empty"));
    }
    if let Some((i, item)) = msgs.iter().enumerate().find(|(_, m)| m.len() != len) {
        return Err(Error::invalid_input(
            context,
            format!("item {i} has {} values, expected {len}", item.len()),
        ));
    }
    check_fits(len, context)?;
    Ok(len)
}

fn flat_meta(len: usize, encode_type: EncodeType) -> BlockMeta {
    BlockMeta {
        n: 1,
        dim: len as u64,
        show_dim: len as u64,
        encode_type,
        ..BlockMeta::default()
    }
}

/// Whole vector in one block; queries reversed at offset `next_pow2(len) - len`
fn flat_slots(msg: &[f32], encode_type: EncodeType, context: &'static str) -> Result<Slots> {
    check_fits(msg.len(), context)?;
    let mut values = vec![0f64; DEGREE];
    match encode_type {
        EncodeType::Item => {
            for (dst, &v) in values.iter_mut().zip(msg) {
                *dst = f64::from(v);
            }
        }
        EncodeType::Query => {
            let offset = msg.len().next_power_of_two() - msg.len();
            for (dst, &v) in values[offset..].iter_mut().zip(msg.iter().rev()) {
                *dst = f64::from(v);
            }
        }
    }
    Ok(Slots {
        values,
        meta: flat_meta(msg.len(), encode_type),
    })
}

/// `inner_rank` sized blocks; queries reversed inside each block
fn split_rank_blocks(msg: &[f32], encode_type: EncodeType, context: &'static str) -> Result<Vec<Slots>> {
    check_fits(msg.len(), context)?;
    let block_rank = inner_rank(msg.len());
    let blocks = msg
        .chunks(block_rank)
        .map(|chunk| {
            let mut values = vec![0f64; DEGREE];
            for (dst, &v) in values.iter_mut().zip(chunk) {
                *dst = f64::from(v);
            }
            if encode_type == EncodeType::Query {
                values[..block_rank].reverse();
            }
            Slots {
                values,
                meta: BlockMeta {
                    n: 1,
                    dim: block_rank as u64,
                    show_dim: msg.len() as u64,
                    encode_type,
                    ..BlockMeta::default()
                },
            }
        })
        .collect();
    Ok(blocks)
}

/// Group sizes for `total` items with `per_ctxt` items per ciphertext
///
/// Full groups come first. The remainder is covered by one group each of
/// 1, 2, 4, ... items while they fit, and the rest by its binary digits.
pub(crate) fn rmp_groups(total: usize, per_ctxt: usize) -> Vec<usize> {
    let mut groups = vec![per_ctxt; total / per_ctxt];
    let mut left = total % per_ctxt;
    let mut counts = vec![0usize; per_ctxt.trailing_zeros() as usize + 1];

    let mut size = 1;
    let mut slot = 0;
    while size <= left {
        counts[slot] = 1;
        left -= size;
        size *= 2;
        slot += 1;
    }
    let mut bit = 0;
    while left > 0 {
        if left & 1 == 1 {
            counts[bit] += 1;
        }
        left >>= 1;
        bit += 1;
    }

    for (slot, &count) in counts.iter().enumerate() {
        groups.extend(std::iter::repeat(1usize << slot).take(count));
    }
    groups
}
