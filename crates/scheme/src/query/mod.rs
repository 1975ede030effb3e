//! Encoded and encrypted vector containers
//!
//! A [`Query`] is an ordered list of [`Block`]s produced by one encode or
//! encrypt call. Blocks hold either an RLWE ciphertext, an encoded
//! plaintext or a plaintext kept as 128-bit coefficients; all three expose
//! their polynomials through [`BlockAccess`].
//!
//! Polynomial addressing follows `(pos, level)`: `pos` 0 is `b`, `pos` 1 is
//! `a` (ciphertexts only); `level` 0 is the Q part, `level` 1 the P part.
//!
//! Server-side results come back as a [`SearchResult`] wrapping a
//! [`Matrix`], whose polynomials are concatenations of `DEGREE`-sized
//! ciphertext slices.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use evi_api::{DataType, EncodeType, Serialize};
use evi_params::DEGREE;

use crate::error::{Error, Result, ResultExt};
use crate::wire::{expect_end, read_level, read_poly, read_u32, read_u64, read_u8, write_poly, MAX_WIRE_COEFFS};

/// Tag of a query holding independent blocks
pub const QUERY_TYPE_SINGLE: u8 = 0;

/// Tag of an inner-product search result
pub const RESULT_TAG_INNER_PRODUCT: u8 = 0;

/// Layout information carried by every block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    /// Items packed into the block
    pub n: u64,
    /// Dimension of each packed item
    pub dim: u64,
    pub degree: u64,
    /// Length of the vector the caller supplied
    pub show_dim: u64,
    /// log2 of the encoding scale
    pub scale_bit: u64,
    pub encode_type: EncodeType,
}

impl Default for BlockMeta {
    fn default() -> Self {
        Self {
            n: 0,
            dim: 0,
            degree: DEGREE as u64,
            show_dim: 0,
            scale_bit: 0,
            encode_type: EncodeType::Item,
        }
    }
}

impl BlockMeta {
    fn write(&self, w: &mut dyn Write, level: u32) -> Result<()> {
        let ctx = "BlockMeta::write";
        w.write_i32::<LittleEndian>(level as i32).with_context(ctx)?;
        for v in [self.n, self.dim, self.degree, self.show_dim, self.scale_bit] {
            w.write_u64::<LittleEndian>(v).with_context(ctx)?;
        }
        w.write_u8(self.encode_type as u8).with_context(ctx)
    }

    fn read(r: &mut dyn Read) -> Result<(Self, u32)> {
        let ctx = "BlockMeta::read";
        let level = read_level(r, ctx)?;
        let n = read_u64(r, ctx)?;
        let dim = read_u64(r, ctx)?;
        let degree = read_u64(r, ctx)?;
        let show_dim = read_u64(r, ctx)?;
        let scale_bit = read_u64(r, ctx)?;
        let encode_type = EncodeType::try_from(read_u8(r, ctx)?)?;
        if degree != DEGREE as u64 {
            return Err(Error::serialization(ctx, format!("block degree {degree} is not {DEGREE}")));
        }
        let meta = Self {
            n,
            dim,
            degree,
            show_dim,
            scale_bit,
            encode_type,
        };
        Ok((meta, level))
    }
}

/// Uniform access to the polynomials of a block
pub trait BlockAccess {
    fn meta(&self) -> &BlockMeta;

    fn meta_mut(&mut self) -> &mut BlockMeta;

    fn data_type(&self) -> DataType;

    /// 0 when only the Q part is present, 1 with the P part
    fn get_level(&self) -> u32;

    /// Polynomial at `pos` (0 = b, 1 = a) of the Q (`level` 0) or P part
    fn get_poly(&self, pos: usize, level: u32) -> Result<&[u64]>;

    fn get_poly_mut(&mut self, pos: usize, level: u32) -> Result<&mut [u64]>;

    /// Write the block header followed by its polynomials
    fn serialize(&self, writer: &mut dyn Write) -> Result<()>;
}

fn bad_access(context: &'static str, pos: usize, level: u32) -> Error {
    Error::invalid_access(context, format!("no polynomial at pos {pos}, level {level}"))
}

/// `(a, b)` halves of one RLWE ciphertext modulo one prime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolyPair {
    pub a: Vec<u64>,
    pub b: Vec<u64>,
}

impl PolyPair {
    pub fn zeroed() -> Self {
        Self {
            a: vec![0; DEGREE],
            b: vec![0; DEGREE],
        }
    }
}

/// RLWE ciphertext block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherBlock {
    pub meta: BlockMeta,
    pub q: PolyPair,
    pub p: Option<PolyPair>,
}

impl CipherBlock {
    /// All-zero block at `level`
    pub fn zeroed(meta: BlockMeta, level: u32) -> Self {
        Self {
            meta,
            q: PolyPair::zeroed(),
            p: (level > 0).then(PolyPair::zeroed),
        }
    }

    fn read_body(meta: BlockMeta, level: u32, r: &mut dyn Read) -> Result<Self> {
        let ctx = "CipherBlock::deserialize";
        let a = read_poly(r, DEGREE, ctx)?;
        let b = read_poly(r, DEGREE, ctx)?;
        let p = if level > 0 {
            let a = read_poly(r, DEGREE, ctx)?;
            let b = read_poly(r, DEGREE, ctx)?;
            Some(PolyPair { a, b })
        } else {
            None
        };
        Ok(Self {
            meta,
            q: PolyPair { a, b },
            p,
        })
    }
}

impl BlockAccess for CipherBlock {
    fn meta(&self) -> &BlockMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut BlockMeta {
        &mut self.meta
    }

    fn data_type(&self) -> DataType {
        DataType::Cipher
    }

    fn get_level(&self) -> u32 {
        u32::from(self.p.is_some())
    }

    fn get_poly(&self, pos: usize, level: u32) -> Result<&[u64]> {
        let pair = match level {
            0 => Some(&self.q),
            1 => self.p.as_ref(),
            _ => None,
        }
        .ok_or_else(|| bad_access("CipherBlock::get_poly", pos, level))?;
        match pos {
            0 => Ok(&pair.b),
            1 => Ok(&pair.a),
            _ => Err(bad_access("CipherBlock::get_poly", pos, level)),
        }
    }

    fn get_poly_mut(&mut self, pos: usize, level: u32) -> Result<&mut [u64]> {
        let pair = match level {
            0 => Some(&mut self.q),
            1 => self.p.as_mut(),
            _ => None,
        }
        .ok_or_else(|| bad_access("CipherBlock::get_poly_mut", pos, level))?;
        match pos {
            0 => Ok(&mut pair.b),
            1 => Ok(&mut pair.a),
            _ => Err(bad_access("CipherBlock::get_poly_mut", pos, level)),
        }
    }

    fn serialize(&self, writer: &mut dyn Write) -> Result<()> {
        let ctx = "CipherBlock::serialize";
        self.meta.write(writer, self.get_level())?;
        write_poly(writer, &self.q.a, ctx)?;
        write_poly(writer, &self.q.b, ctx)?;
        if let Some(p) = &self.p {
            write_poly(writer, &p.a, ctx)?;
            write_poly(writer, &p.b, ctx)?;
        }
        Ok(())
    }
}

/// Encoded plaintext block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainBlock {
    pub meta: BlockMeta,
    pub q: Vec<u64>,
    pub p: Option<Vec<u64>>,
}

impl PlainBlock {
    pub fn zeroed(meta: BlockMeta, level: u32) -> Self {
        Self {
            meta,
            q: vec![0; DEGREE],
            p: (level > 0).then(|| vec![0; DEGREE]),
        }
    }

    fn read_body(meta: BlockMeta, level: u32, r: &mut dyn Read) -> Result<Self> {
        let ctx = "PlainBlock::deserialize";
        let q = read_poly(r, DEGREE, ctx)?;
        let p = if level > 0 { Some(read_poly(r, DEGREE, ctx)?) } else { None };
        Ok(Self { meta, q, p })
    }
}

impl BlockAccess for PlainBlock {
    fn meta(&self) -> &BlockMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut BlockMeta {
        &mut self.meta
    }

    fn data_type(&self) -> DataType {
        DataType::Plain
    }

    fn get_level(&self) -> u32 {
        u32::from(self.p.is_some())
    }

    fn get_poly(&self, pos: usize, level: u32) -> Result<&[u64]> {
        match (pos, level) {
            (0, 0) => Ok(&self.q),
            (0, 1) => self
                .p
                .as_deref()
                .ok_or_else(|| bad_access("PlainBlock::get_poly", pos, level)),
            _ => Err(bad_access("PlainBlock::get_poly", pos, level)),
        }
    }

    fn get_poly_mut(&mut self, pos: usize, level: u32) -> Result<&mut [u64]> {
        match (pos, level) {
            (0, 0) => Ok(&mut self.q),
            (0, 1) => self
                .p
                .as_deref_mut()
                .ok_or_else(|| bad_access("PlainBlock::get_poly_mut", pos, level)),
            _ => Err(bad_access("PlainBlock::get_poly_mut", pos, level)),
        }
    }

    fn serialize(&self, writer: &mut dyn Write) -> Result<()> {
        let ctx = "PlainBlock::serialize";
        self.meta.write(writer, self.get_level())?;
        write_poly(writer, &self.q, ctx)?;
        if let Some(p) = &self.p {
            write_poly(writer, p, ctx)?;
        }
        Ok(())
    }
}

/// Plaintext kept as 128-bit coefficients for shared-a evaluation
///
/// These blocks live in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedBlock {
    pub meta: BlockMeta,
    pub coeffs: Vec<u128>,
}

impl BlockAccess for SerializedBlock {
    fn meta(&self) -> &BlockMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut BlockMeta {
        &mut self.meta
    }

    fn data_type(&self) -> DataType {
        DataType::SerializedPlain
    }

    fn get_level(&self) -> u32 {
        0
    }

    fn get_poly(&self, pos: usize, level: u32) -> Result<&[u64]> {
        Err(bad_access("SerializedBlock::get_poly", pos, level))
    }

    fn get_poly_mut(&mut self, pos: usize, level: u32) -> Result<&mut [u64]> {
        Err(bad_access("SerializedBlock::get_poly_mut", pos, level))
    }

    fn serialize(&self, _writer: &mut dyn Write) -> Result<()> {
        Err(Error::invalid_access(
            "SerializedBlock::serialize",
            "serialized plaintext blocks have no wire form",
        ))
    }
}

/// One element of a [`Query`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Cipher(CipherBlock),
    Plain(PlainBlock),
    Serialized(SerializedBlock),
}

impl Block {
    fn inner(&self) -> &dyn BlockAccess {
        match self {
            Block::Cipher(b) => b,
            Block::Plain(b) => b,
            Block::Serialized(b) => b,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn BlockAccess {
        match self {
            Block::Cipher(b) => b,
            Block::Plain(b) => b,
            Block::Serialized(b) => b,
        }
    }

    /// Read one block of the given representation
    pub fn deserialize(reader: &mut dyn Read, data_type: DataType) -> Result<Self> {
        match data_type {
            DataType::Cipher => {
                let (meta, level) = BlockMeta::read(reader)?;
                Ok(Block::Cipher(CipherBlock::read_body(meta, level, reader)?))
            }
            DataType::Plain => {
                let (meta, level) = BlockMeta::read(reader)?;
                Ok(Block::Plain(PlainBlock::read_body(meta, level, reader)?))
            }
            DataType::SerializedPlain => Err(Error::not_supported(
                "Block::deserialize",
                "serialized plaintext blocks cannot be read back",
            )),
        }
    }

    pub fn as_cipher(&self) -> Option<&CipherBlock> {
        match self {
            Block::Cipher(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_plain(&self) -> Option<&PlainBlock> {
        match self {
            Block::Plain(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_serialized(&self) -> Option<&SerializedBlock> {
        match self {
            Block::Serialized(b) => Some(b),
            _ => None,
        }
    }
}

impl BlockAccess for Block {
    fn meta(&self) -> &BlockMeta {
        self.inner().meta()
    }

    fn meta_mut(&mut self) -> &mut BlockMeta {
        self.inner_mut().meta_mut()
    }

    fn data_type(&self) -> DataType {
        self.inner().data_type()
    }

    fn get_level(&self) -> u32 {
        self.inner().get_level()
    }

    fn get_poly(&self, pos: usize, level: u32) -> Result<&[u64]> {
        self.inner().get_poly(pos, level)
    }

    fn get_poly_mut(&mut self, pos: usize, level: u32) -> Result<&mut [u64]> {
        self.inner_mut().get_poly_mut(pos, level)
    }

    fn serialize(&self, writer: &mut dyn Write) -> Result<()> {
        self.inner().serialize(writer)
    }
}

impl From<CipherBlock> for Block {
    fn from(b: CipherBlock) -> Self {
        Block::Cipher(b)
    }
}

impl From<PlainBlock> for Block {
    fn from(b: PlainBlock) -> Self {
        Block::Plain(b)
    }
}

impl From<SerializedBlock> for Block {
    fn from(b: SerializedBlock) -> Self {
        Block::Serialized(b)
    }
}

/// Ordered blocks produced by one encode or encrypt call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    blocks: Vec<Block>,
    total_item_count: u32,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            total_item_count: 0,
        }
    }

    pub fn push(&mut self, block: impl Into<Block>) {
        self.blocks.push(block.into());
    }

    /// Append every block of `other`
    pub fn extend(&mut self, other: Query) {
        self.total_item_count += other.total_item_count;
        self.blocks.extend(other.blocks);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Representation of the first block
    pub fn data_type(&self) -> Option<DataType> {
        self.blocks.first().map(|b| b.data_type())
    }

    /// Items packed per block, read from the first block
    pub fn inner_item_count(&self) -> u64 {
        self.blocks.first().map_or(0, |b| b.meta().n)
    }

    pub fn total_item_count(&self) -> u32 {
        self.total_item_count
    }

    pub fn set_total_item_count(&mut self, count: u32) {
        self.total_item_count = count;
    }

    pub fn serialize(&self, writer: &mut dyn Write) -> Result<()> {
        let ctx = "Query::serialize";
        let first = self
            .blocks
            .first()
            .ok_or_else(|| Error::invalid_input(ctx, "cannot serialize an empty query"))?;
        writer.write_u8(QUERY_TYPE_SINGLE).with_context(ctx)?;
        writer.write_u8(first.data_type() as u8).with_context(ctx)?;
        writer
            .write_u32::<LittleEndian>(self.blocks.len() as u32)
            .with_context(ctx)?;
        for block in &self.blocks {
            block.serialize(writer)?;
        }
        Ok(())
    }

    pub fn deserialize(reader: &mut dyn Read) -> Result<Self> {
        let ctx = "Query::deserialize";
        let query_type = read_u8(reader, ctx)?;
        if query_type != QUERY_TYPE_SINGLE {
            return Err(Error::not_supported(ctx, format!("query type {query_type}")));
        }
        let data_type = DataType::try_from(read_u8(reader, ctx)?)?;
        if data_type == DataType::SerializedPlain {
            return Err(Error::not_supported(ctx, "serialized plaintext queries"));
        }
        let count = read_u32(reader, ctx)?;
        let mut blocks = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            blocks.push(Block::deserialize(reader, data_type)?);
        }
        Ok(Self::from_blocks(blocks))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize(&mut out)?;
        Ok(out)
    }

    /// Parse a query occupying all of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let query = Self::deserialize(&mut cursor)?;
        expect_end(&mut cursor, "Query::from_bytes")?;
        Ok(query)
    }
}

impl<'a> IntoIterator for &'a Query {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Write `u32 count` followed by every query
pub fn serialize_queries(queries: &[Query], writer: &mut dyn Write) -> Result<()> {
    writer
        .write_u32::<LittleEndian>(queries.len() as u32)
        .with_context("serialize_queries")?;
    for query in queries {
        query.serialize(writer)?;
    }
    Ok(())
}

pub fn deserialize_queries(reader: &mut dyn Read) -> Result<Vec<Query>> {
    let count = read_u32(reader, "deserialize_queries")?;
    (0..count).map(|_| Query::deserialize(reader)).collect()
}

/// Batch of polynomials sharing one header
///
/// Every polynomial holds `ceil(n / degree)·DEGREE` coefficients. Ciphertext
/// matrices store `[a_q, b_q]` plus `[a_p, b_p]` at level 1; plaintext
/// matrices store `[b_q]` plus `[b_p]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    pub n: u64,
    pub dim: u64,
    pub degree: u64,
    data_type: DataType,
    level: u32,
    polys: Vec<Vec<u64>>,
}

fn matrix_poly_len(n: u64, degree: u64, context: &'static str) -> Result<usize> {
    if degree == 0 {
        return Err(Error::serialization(context, "matrix degree is zero"));
    }
    let len = n.div_ceil(degree) * DEGREE as u64;
    if len > MAX_WIRE_COEFFS {
        return Err(Error::serialization(context, format!("matrix of {n} items is too large")));
    }
    Ok(len as usize)
}

fn polys_per_level(data_type: DataType) -> usize {
    if data_type == DataType::Cipher {
        2
    } else {
        1
    }
}

impl Matrix {
    /// All-zero matrix sized for `n` items
    pub fn zeroed(data_type: DataType, level: u32, n: u64, dim: u64) -> Result<Self> {
        if data_type == DataType::SerializedPlain {
            return Err(Error::not_supported("Matrix::zeroed", "serialized plaintext matrices"));
        }
        let len = matrix_poly_len(n, DEGREE as u64, "Matrix::zeroed")?;
        let count = polys_per_level(data_type) * (level as usize + 1);
        Ok(Self {
            n,
            dim,
            degree: DEGREE as u64,
            data_type,
            level,
            polys: vec![vec![0; len]; count],
        })
    }

    /// Ciphertext matrix concatenating `blocks` slice by slice
    ///
    /// `n` defaults to `blocks.len()·DEGREE`.
    pub fn from_cipher_blocks(blocks: &[CipherBlock], n: Option<u64>, dim: u64) -> Result<Self> {
        let ctx = "Matrix::from_cipher_blocks";
        let first = blocks
            .first()
            .ok_or_else(|| Error::invalid_input(ctx, "no blocks to concatenate"))?;
        let level = first.get_level();
        if blocks.iter().any(|b| b.get_level() != level) {
            return Err(Error::invalid_input(ctx, "blocks have mixed levels"));
        }
        let n = n.unwrap_or((blocks.len() * DEGREE) as u64);
        let mut matrix = Self::zeroed(DataType::Cipher, level, n, dim)?;
        let slots = matrix.polys[0].len() / DEGREE;
        if slots < blocks.len() {
            return Err(Error::invalid_input(ctx, "n is too small for the given blocks"));
        }
        for (i, block) in blocks.iter().enumerate() {
            let range = i * DEGREE..(i + 1) * DEGREE;
            matrix.polys[0][range.clone()].copy_from_slice(&block.q.a);
            matrix.polys[1][range.clone()].copy_from_slice(&block.q.b);
            if let Some(p) = &block.p {
                matrix.polys[2][range.clone()].copy_from_slice(&p.a);
                matrix.polys[3][range].copy_from_slice(&p.b);
            }
        }
        Ok(matrix)
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn get_level(&self) -> u32 {
        self.level
    }

    fn index(&self, pos: usize, level: u32) -> Option<usize> {
        if level > self.level {
            return None;
        }
        let per_level = polys_per_level(self.data_type);
        // wire order puts a before b
        let slot = match (per_level, pos) {
            (2, 1) => 0,
            (2, 0) => 1,
            (1, 0) => 0,
            _ => return None,
        };
        Some(level as usize * per_level + slot)
    }

    /// Polynomial at `pos` (0 = b, 1 = a) and `level`
    pub fn get_poly(&self, pos: usize, level: u32) -> Result<&[u64]> {
        self.index(pos, level)
            .map(|i| self.polys[i].as_slice())
            .ok_or_else(|| bad_access("Matrix::get_poly", pos, level))
    }

    pub fn get_poly_mut(&mut self, pos: usize, level: u32) -> Result<&mut [u64]> {
        match self.index(pos, level) {
            Some(i) => Ok(self.polys[i].as_mut_slice()),
            None => Err(bad_access("Matrix::get_poly_mut", pos, level)),
        }
    }

    pub fn serialize(&self, writer: &mut dyn Write) -> Result<()> {
        let ctx = "Matrix::serialize";
        let len = matrix_poly_len(self.n, self.degree, ctx)?;
        writer.write_i32::<LittleEndian>(self.level as i32).with_context(ctx)?;
        for v in [self.n, self.dim, self.degree] {
            writer.write_u64::<LittleEndian>(v).with_context(ctx)?;
        }
        for poly in &self.polys {
            if poly.len() < len {
                return Err(Error::serialization(ctx, "polynomial shorter than its header claims"));
            }
            write_poly(writer, &poly[..len], ctx)?;
        }
        Ok(())
    }

    pub fn deserialize(reader: &mut dyn Read, data_type: DataType) -> Result<Self> {
        let ctx = "Matrix::deserialize";
        if data_type == DataType::SerializedPlain {
            return Err(Error::not_supported(ctx, "serialized plaintext matrices"));
        }
        let level = read_level(reader, ctx)?;
        let n = read_u64(reader, ctx)?;
        let dim = read_u64(reader, ctx)?;
        let degree = read_u64(reader, ctx)?;
        let len = matrix_poly_len(n, degree, ctx)?;
        let count = polys_per_level(data_type) * (level as usize + 1);
        let polys = (0..count)
            .map(|_| read_poly(reader, len, ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            n,
            dim,
            degree,
            data_type,
            level,
            polys,
        })
    }
}

/// Inner-product scores returned by a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    total_item_count: u32,
    matrix: Matrix,
}

impl SearchResult {
    /// Result over a ciphertext matrix; a zero count falls back to the matrix `n`
    pub fn new(matrix: Matrix, total_item_count: u32) -> Result<Self> {
        if matrix.data_type() != DataType::Cipher {
            return Err(Error::invalid_input("SearchResult::new", "results hold ciphertexts"));
        }
        let total_item_count = if total_item_count == 0 {
            matrix.n as u32
        } else {
            total_item_count
        };
        Ok(Self {
            total_item_count,
            matrix,
        })
    }

    pub fn total_item_count(&self) -> u32 {
        self.total_item_count
    }

    /// Items in the underlying matrix
    pub fn item_count(&self) -> u64 {
        self.matrix.n
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn serialize(&self, writer: &mut dyn Write) -> Result<()> {
        let ctx = "SearchResult::serialize";
        writer.write_u8(RESULT_TAG_INNER_PRODUCT).with_context(ctx)?;
        writer
            .write_u32::<LittleEndian>(self.total_item_count)
            .with_context(ctx)?;
        self.matrix.serialize(writer)
    }

    pub fn deserialize(reader: &mut dyn Read) -> Result<Self> {
        let ctx = "SearchResult::deserialize";
        let tag = read_u8(reader, ctx)?;
        if tag != RESULT_TAG_INNER_PRODUCT {
            return Err(Error::serialization(ctx, format!("unknown result tag {tag}")));
        }
        let total = read_u32(reader, ctx)?;
        let matrix = Matrix::deserialize(reader, DataType::Cipher)?;
        Self::new(matrix, total)
    }
}

impl Serialize for SearchResult {
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let result = Self::deserialize(&mut cursor)?;
        expect_end(&mut cursor, "SearchResult::from_bytes")?;
        Ok(result)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // a matrix built through this module always matches its header
        if self.serialize(&mut out).is_err() {
            out.clear();
        }
        out
    }
}
