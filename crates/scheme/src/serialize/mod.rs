//! Key files, key bundles and evaluation metadata
//!
//! Block, query, matrix and search-result layouts live with their types in
//! [`crate::query`]; this module covers the key material:
//!
//! * secret key: `0x01`, 4-byte preset name (NUL padded), then `DEGREE / 4`
//!   bytes of 2-bit two's-complement coefficients, most significant first;
//! * encryption key: loaded flag, then `a_q, a_p, b_q, b_p`;
//! * evaluation key: loaded flag, the relinearization key, then the mod-pack
//!   key with `pad_rank` entries per polynomial;
//! * key bundle: `(u32 name_len, name, u64 size, blob)*` closed by a zero
//!   `u32`;
//! * sealed secret key: a JSON header naming the preset and seal type, then
//!   `u32 size` and the sealer's output.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use evi_api::{DeviceType, EvalMode, SealMode, SerializeSecret};
use evi_internal::fixed::{fixed_name, name_from_fixed};
use evi_params::{
    Preset, DEGREE, MAX_CONTEXT_SIZE, MIN_CONTEXT_SIZE, PRESET_NAME_SIZE, SECRET_KEY_FORMAT_TAG,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::context::{inner_rank, Context};
use crate::error::{Error, Result, ResultExt};
use crate::keys::{presets_compatible, KeyPack, KeySealer, SealInfo, SecretKey, SwitchingKey};
use crate::wire::{expect_end, read_poly, read_u32, read_u64, read_u8, write_poly, MAX_WIRE_COEFFS};

pub use crate::query::{deserialize_queries, serialize_queries};

pub const SECRET_KEY_FILE: &str = "SecKey.bin";
pub const ENC_KEY_FILE: &str = "EncKey.bin";
pub const EVAL_KEY_FILE: &str = "EvalKey.bin";
pub const EVAL_METADATA_FILE: &str = "metadata-eval.json";

/// Files packed by [`bundle_key_dir`], in order
pub const BUNDLE_ORDER: [&str; 3] = [SECRET_KEY_FILE, ENC_KEY_FILE, EVAL_KEY_FILE];

const SECRET_KEY_LEN: usize = 1 + PRESET_NAME_SIZE + DEGREE / 4;

// ---------------------------------------------------------------------------
// Secret keys
// ---------------------------------------------------------------------------

fn pack_coeff(c: i64) -> u8 {
    (c as u8) & 0x03
}

fn unpack_coeff(bits: u8, context: &'static str) -> Result<i64> {
    match bits {
        0 => Ok(0),
        1 => Ok(1),
        3 => Ok(-1),
        _ => Err(Error::serialization(context, "invalid packed secret coefficient")),
    }
}

/// Write the packed secret key file format
pub fn write_secret_key(sk: &SecretKey, writer: &mut dyn Write) -> Result<()> {
    let context = "write_secret_key";
    let name = sk.preset().name().as_bytes();
    if name.len() > PRESET_NAME_SIZE {
        return Err(Error::not_supported(
            context,
            format!("{} keys have no file representation", sk.preset()),
        ));
    }
    let mut out = Zeroizing::new(Vec::with_capacity(SECRET_KEY_LEN));
    out.push(SECRET_KEY_FORMAT_TAG);
    out.extend_from_slice(&fixed_name::<PRESET_NAME_SIZE>(sk.preset().name()));
    out.extend(sk.coeffs().chunks_exact(4).map(|c| {
        (pack_coeff(c[0]) << 6) | (pack_coeff(c[1]) << 4) | (pack_coeff(c[2]) << 2) | pack_coeff(c[3])
    }));
    writer.write_all(&out).with_context(context)
}

/// Preset name and coefficients of a secret key file
fn parse_secret_key(reader: &mut dyn Read) -> Result<(Preset, Zeroizing<Vec<i64>>)> {
    let context = "read_secret_key";
    let mut raw = Zeroizing::new(vec![0u8; SECRET_KEY_LEN]);
    reader.read_exact(&mut raw).with_context(context)?;
    if raw[0] != SECRET_KEY_FORMAT_TAG {
        return Err(Error::key_not_loaded(context, "secret key file is not marked as loaded"));
    }
    let name = name_from_fixed(&raw[1..1 + PRESET_NAME_SIZE]);
    let preset = Preset::from_name(&name)
        .ok_or_else(|| Error::serialization(context, format!("unknown preset {name:?}")))?;

    let mut coeffs = Zeroizing::new(Vec::with_capacity(DEGREE));
    for &byte in &raw[1 + PRESET_NAME_SIZE..] {
        for shift in [6u8, 4, 2, 0] {
            coeffs.push(unpack_coeff((byte >> shift) & 0x03, context)?);
        }
    }
    Ok((preset, coeffs))
}

/// Read a secret key file and embed it into `ctx`
///
/// The file's preset must match the context's.
pub fn read_secret_key(ctx: &Context, reader: &mut dyn Read) -> Result<SecretKey> {
    let (preset, coeffs) = parse_secret_key(reader)?;
    if !presets_compatible(preset, ctx.preset()) {
        return Err(Error::invalid_input(
            "read_secret_key",
            format!("secret key for {preset} loaded into a {} context", ctx.preset()),
        ));
    }
    SecretKey::from_coeffs(ctx, &coeffs)
}

impl SerializeSecret for SecretKey {
    /// Parse a secret key file, embedding it into a fresh context for its preset
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let (preset, coeffs) = parse_secret_key(&mut cursor)?;
        expect_end(&mut cursor, "SecretKey::from_bytes")?;
        let ctx = Context::new(preset, DeviceType::Cpu, MIN_CONTEXT_SIZE, EvalMode::Flat)?;
        SecretKey::from_coeffs(&ctx, &coeffs)
    }

    fn to_bytes_zeroizing(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(SECRET_KEY_LEN));
        // runtime-preset keys have no file representation
        if write_secret_key(self, &mut *out).is_err() {
            out.clear();
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Public keys
// ---------------------------------------------------------------------------

fn write_switching_key(key: &SwitchingKey, entries: usize, writer: &mut dyn Write, context: &'static str) -> Result<()> {
    if key.entries() != entries {
        return Err(Error::invalid_input(
            context,
            format!("key holds {} entries, {entries} expected", key.entries()),
        ));
    }
    for poly in [&key.a_q, &key.a_p, &key.b_q, &key.b_p] {
        write_poly(writer, poly, context)?;
    }
    Ok(())
}

fn read_switching_key(reader: &mut dyn Read, entries: usize, context: &'static str) -> Result<SwitchingKey> {
    let len = entries * DEGREE;
    if len as u64 > MAX_WIRE_COEFFS {
        return Err(Error::serialization(context, format!("{entries} key entries is too many")));
    }
    Ok(SwitchingKey {
        a_q: read_poly(reader, len, context)?,
        a_p: read_poly(reader, len, context)?,
        b_q: read_poly(reader, len, context)?,
        b_p: read_poly(reader, len, context)?,
    })
}

fn read_flag(reader: &mut dyn Read, context: &'static str) -> Result<bool> {
    match read_u8(reader, context)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(Error::serialization(context, format!("invalid loaded flag {other}"))),
    }
}

/// Write the encryption key file
pub fn write_enc_key(pack: &KeyPack, writer: &mut dyn Write) -> Result<()> {
    let context = "write_enc_key";
    let key = pack
        .enc_key()
        .ok_or_else(|| Error::key_not_loaded(context, "encryption key is not loaded"))?;
    writer.write_u8(1).with_context(context)?;
    write_switching_key(key, 1, writer, context)
}

pub fn read_enc_key(reader: &mut dyn Read) -> Result<SwitchingKey> {
    let context = "read_enc_key";
    if !read_flag(reader, context)? {
        return Err(Error::key_not_loaded(context, "encryption key file is empty"));
    }
    read_switching_key(reader, 1, context)
}

/// Write the evaluation key file: relinearization then mod-pack key
pub fn write_eval_key(ctx: &Context, pack: &KeyPack, writer: &mut dyn Write) -> Result<()> {
    let context = "write_eval_key";
    let (Some(relin), Some(mod_pack)) = (pack.relin_key(), pack.mod_pack_key()) else {
        return Err(Error::key_not_loaded(context, "evaluation keys are not loaded"));
    };
    writer.write_u8(1).with_context(context)?;
    write_switching_key(relin, 1, writer, context)?;
    write_switching_key(mod_pack, ctx.pad_rank(), writer, context)
}

/// Read `(relin, mod_pack)` sized for `ctx`
pub fn read_eval_key(ctx: &Context, reader: &mut dyn Read) -> Result<(SwitchingKey, SwitchingKey)> {
    let context = "read_eval_key";
    if !read_flag(reader, context)? {
        return Err(Error::key_not_loaded(context, "evaluation key file is empty"));
    }
    let relin = read_switching_key(reader, 1, context)?;
    let mod_pack = read_switching_key(reader, ctx.pad_rank(), context)?;
    Ok((relin, mod_pack))
}

impl KeyPack {
    /// Encryption part then evaluation part, each behind its loaded flag
    ///
    /// Keys that are not loaded are written as zeros so the layout stays fixed.
    pub fn serialize(&self, ctx: &Context, writer: &mut dyn Write) -> Result<()> {
        let context = "KeyPack::serialize";
        let empty_enc = SwitchingKey::zeroed(1);
        writer.write_u8(self.enc_loaded() as u8).with_context(context)?;
        write_switching_key(self.enc_key().unwrap_or(&empty_enc), 1, writer, context)?;

        let empty_mod_pack = SwitchingKey::zeroed(ctx.pad_rank());
        let (relin, mod_pack) = match (self.relin_key(), self.mod_pack_key()) {
            (Some(r), Some(m)) => (r, m),
            _ => (&empty_enc, &empty_mod_pack),
        };
        writer.write_u8(self.eval_loaded() as u8).with_context(context)?;
        write_switching_key(relin, 1, writer, context)?;
        write_switching_key(mod_pack, ctx.pad_rank(), writer, context)
    }

    pub fn deserialize(ctx: &Context, reader: &mut dyn Read) -> Result<Self> {
        let context = "KeyPack::deserialize";
        let mut pack = Self::new();
        let enc_loaded = read_flag(reader, context)?;
        let enc = read_switching_key(reader, 1, context)?;
        if enc_loaded {
            pack.set_enc_key(enc);
        }
        let eval_loaded = read_flag(reader, context)?;
        let relin = read_switching_key(reader, 1, context)?;
        let mod_pack = read_switching_key(reader, ctx.pad_rank(), context)?;
        if eval_loaded {
            pack.set_eval_keys(relin, mod_pack);
        }
        Ok(pack)
    }

    pub fn to_bytes(&self, ctx: &Context) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.serialize(ctx, &mut out)?;
        Ok(out)
    }

    pub fn from_bytes(ctx: &Context, bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let pack = Self::deserialize(ctx, &mut cursor)?;
        expect_end(&mut cursor, "KeyPack::from_bytes")?;
        Ok(pack)
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// `path` itself, or `path/name` when `path` is a directory
fn key_path(path: &Path, name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(name)
    } else {
        path.to_path_buf()
    }
}

fn create(path: &Path, context: &'static str) -> Result<BufWriter<File>> {
    File::create(path).map(BufWriter::new).with_context(context)
}

fn open(path: &Path, context: &'static str) -> Result<BufReader<File>> {
    File::open(path).map(BufReader::new).with_context(context)
}

pub fn save_secret_key(sk: &SecretKey, path: impl AsRef<Path>) -> Result<()> {
    let path = key_path(path.as_ref(), SECRET_KEY_FILE);
    let mut out = create(&path, "save_secret_key")?;
    write_secret_key(sk, &mut out)?;
    out.flush().with_context("save_secret_key")
}

pub fn load_secret_key(ctx: &Context, path: impl AsRef<Path>) -> Result<SecretKey> {
    let path = key_path(path.as_ref(), SECRET_KEY_FILE);
    read_secret_key(ctx, &mut open(&path, "load_secret_key")?)
}

pub fn save_enc_key(pack: &KeyPack, path: impl AsRef<Path>) -> Result<()> {
    let path = key_path(path.as_ref(), ENC_KEY_FILE);
    let mut out = create(&path, "save_enc_key")?;
    write_enc_key(pack, &mut out)?;
    out.flush().with_context("save_enc_key")
}

pub fn load_enc_key(path: impl AsRef<Path>) -> Result<SwitchingKey> {
    let path = key_path(path.as_ref(), ENC_KEY_FILE);
    read_enc_key(&mut open(&path, "load_enc_key")?)
}

pub fn save_eval_key(ctx: &Context, pack: &KeyPack, path: impl AsRef<Path>) -> Result<()> {
    let path = key_path(path.as_ref(), EVAL_KEY_FILE);
    let mut out = create(&path, "save_eval_key")?;
    write_eval_key(ctx, pack, &mut out)?;
    out.flush().with_context("save_eval_key")
}

pub fn load_eval_key(ctx: &Context, path: impl AsRef<Path>) -> Result<(SwitchingKey, SwitchingKey)> {
    let path = key_path(path.as_ref(), EVAL_KEY_FILE);
    read_eval_key(ctx, &mut open(&path, "load_eval_key")?)
}

/// Write the secret, encryption and evaluation key files into `dir`
#[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub fn save_keys(ctx: &Context, sk: &SecretKey, pack: &KeyPack, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context("save_keys")?;
    save_secret_key(sk, dir.join(SECRET_KEY_FILE))?;
    save_enc_key(pack, dir.join(ENC_KEY_FILE))?;
    if ctx.eval_mode() != EvalMode::Mm {
        save_eval_key(ctx, pack, dir.join(EVAL_KEY_FILE))?;
    }
    Ok(())
}

/// Load the public keys from a key directory
///
/// MM contexts carry no evaluation key.
pub fn load_key_pack(ctx: &Context, dir: impl AsRef<Path>) -> Result<KeyPack> {
    let dir = dir.as_ref();
    let mut pack = KeyPack::new();
    pack.set_enc_key(load_enc_key(dir.join(ENC_KEY_FILE))?);
    if ctx.eval_mode() != EvalMode::Mm {
        let (relin, mod_pack) = load_eval_key(ctx, dir.join(EVAL_KEY_FILE))?;
        pack.set_eval_keys(relin, mod_pack);
    }
    Ok(pack)
}

// ---------------------------------------------------------------------------
// Sealed secret keys
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SealedHeader {
    #[serde(rename = "ParameterPreset")]
    preset: String,
    #[serde(rename = "SealType")]
    seal_type: SealMode,
}

/// Seal a secret key file; `SealMode::None` returns the plain file
pub fn seal_secret_key(sk: &SecretKey, info: &SealInfo, sealer: &dyn KeySealer) -> Result<Vec<u8>> {
    let context = "seal_secret_key";
    let mut plain = Zeroizing::new(Vec::with_capacity(SECRET_KEY_LEN));
    write_secret_key(sk, &mut *plain)?;
    if info.mode() == SealMode::None {
        return Ok(plain.to_vec());
    }

    let header = SealedHeader {
        preset: sk.preset().name().to_string(),
        seal_type: info.mode(),
    };
    let sealed = sealer.seal(info, &plain)?;
    let mut out = serde_json::to_vec(&header).map_err(|e| Error::serialization(context, e.to_string()))?;
    out.write_u32::<LittleEndian>(sealed.len() as u32).with_context(context)?;
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Inverse of [`seal_secret_key`]
///
/// The header's seal type must match `info`, else `KeyNotLoaded`.
pub fn unseal_secret_key(
    ctx: &Context,
    info: &SealInfo,
    sealer: &dyn KeySealer,
    bytes: &[u8],
) -> Result<SecretKey> {
    let context = "unseal_secret_key";
    if info.mode() == SealMode::None {
        let mut cursor = Cursor::new(bytes);
        let sk = read_secret_key(ctx, &mut cursor)?;
        expect_end(&mut cursor, context)?;
        return Ok(sk);
    }

    let mut stream = serde_json::Deserializer::from_slice(bytes).into_iter::<SealedHeader>();
    let header = match stream.next() {
        Some(Ok(header)) => header,
        _ => return Err(Error::key_not_loaded(context, "seal mode mismatch: missing sealed key header")),
    };
    if header.seal_type != info.mode() {
        return Err(Error::key_not_loaded(
            context,
            format!("seal mode mismatch: file is {}, expected {}", header.seal_type.name(), info.mode().name()),
        ));
    }
    debug!(preset = %header.preset, "sealed secret key header");

    let mut cursor = Cursor::new(&bytes[stream.byte_offset()..]);
    let size = read_u32(&mut cursor, context)? as usize;
    let start = cursor.position() as usize;
    let body = cursor.into_inner();
    if body.len() - start != size {
        return Err(Error::serialization(context, "sealed key size does not match its header"));
    }
    let plain = sealer.unseal(info, &body[start..])?;
    let mut cursor = Cursor::new(plain.as_slice());
    let sk = read_secret_key(ctx, &mut cursor)?;
    expect_end(&mut cursor, context)?;
    Ok(sk)
}

pub fn save_sealed_secret_key(
    sk: &SecretKey,
    info: &SealInfo,
    sealer: &dyn KeySealer,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = key_path(path.as_ref(), SECRET_KEY_FILE);
    let bytes = seal_secret_key(sk, info, sealer)?;
    fs::write(&path, bytes).with_context("save_sealed_secret_key")
}

pub fn load_sealed_secret_key(
    ctx: &Context,
    info: &SealInfo,
    sealer: &dyn KeySealer,
    path: impl AsRef<Path>,
) -> Result<SecretKey> {
    let path = key_path(path.as_ref(), SECRET_KEY_FILE);
    let bytes = Zeroizing::new(fs::read(&path).with_context("load_sealed_secret_key")?);
    unseal_secret_key(ctx, info, sealer, &bytes)
}

// ---------------------------------------------------------------------------
// Key bundles
// ---------------------------------------------------------------------------

/// Write named blobs as a key bundle
pub fn write_key_bundle(entries: &[(&str, &[u8])], writer: &mut dyn Write) -> Result<()> {
    let context = "write_key_bundle";
    for (name, blob) in entries {
        if name.is_empty() {
            return Err(Error::invalid_input(context, "bundle entry names must not be empty"));
        }
        writer.write_u32::<LittleEndian>(name.len() as u32).with_context(context)?;
        writer.write_all(name.as_bytes()).with_context(context)?;
        writer.write_u64::<LittleEndian>(blob.len() as u64).with_context(context)?;
        writer.write_all(blob).with_context(context)?;
    }
    writer.write_u32::<LittleEndian>(0).with_context(context)
}

/// Named blobs of a key bundle, in file order
pub fn read_key_bundle(reader: &mut dyn Read) -> Result<Vec<(String, Zeroizing<Vec<u8>>)>> {
    let context = "read_key_bundle";
    let mut entries = Vec::new();
    loop {
        let name_len = read_u32(reader, context)? as usize;
        if name_len == 0 {
            return Ok(entries);
        }
        if name_len > 4096 {
            return Err(Error::serialization(context, format!("entry name of {name_len} bytes")));
        }
        let mut name = vec![0u8; name_len];
        reader.read_exact(&mut name).with_context(context)?;
        let name = String::from_utf8(name).map_err(|e| Error::serialization(context, e.to_string()))?;
        let size = read_u64(reader, context)?;
        if size > MAX_WIRE_COEFFS * 8 {
            return Err(Error::serialization(context, format!("entry {name} claims {size} bytes")));
        }
        let mut blob = Zeroizing::new(Vec::new());
        (&mut *reader).take(size).read_to_end(&mut blob).with_context(context)?;
        if blob.len() as u64 != size {
            return Err(Error::serialization(context, format!("entry {name} is truncated")));
        }
        entries.push((name, blob));
    }
}

/// Pack the key files of `dir` into one bundle
///
/// A missing file fails with `FileNotFound`.
pub fn bundle_key_dir(dir: impl AsRef<Path>, writer: &mut dyn Write) -> Result<()> {
    let dir = dir.as_ref();
    let mut blobs = Vec::with_capacity(BUNDLE_ORDER.len());
    for name in BUNDLE_ORDER {
        let file = dir.join(name);
        if !file.is_file() {
            return Err(Error::file_not_found(
                "bundle_key_dir",
                format!("key file not found: {}", file.display()),
            ));
        }
        blobs.push(Zeroizing::new(fs::read(&file).with_context("bundle_key_dir")?));
    }
    let entries: Vec<(&str, &[u8])> = BUNDLE_ORDER
        .iter()
        .zip(&blobs)
        .map(|(name, blob)| (*name, blob.as_slice()))
        .collect();
    write_key_bundle(&entries, writer)
}

/// Restore the secret key and public keys from a bundle
///
/// Unknown entries are skipped; a bundle without a secret key fails with
/// `InvalidInput`.
#[instrument(skip_all)]
pub fn load_key_bundle(ctx: &Context, reader: &mut dyn Read) -> Result<(SecretKey, KeyPack)> {
    let mut sk = None;
    let mut pack = KeyPack::new();
    for (name, blob) in read_key_bundle(reader)? {
        let mut cursor = Cursor::new(blob.as_slice());
        match name.as_str() {
            SECRET_KEY_FILE => sk = Some(read_secret_key(ctx, &mut cursor)?),
            ENC_KEY_FILE => pack.set_enc_key(read_enc_key(&mut cursor)?),
            EVAL_KEY_FILE => {
                let (relin, mod_pack) = read_eval_key(ctx, &mut cursor)?;
                pack.set_eval_keys(relin, mod_pack);
            }
            other => debug!(entry = other, "skipping unknown bundle entry"),
        }
    }
    let sk = sk.ok_or_else(|| Error::invalid_input("load_key_bundle", "secret key blob missing in key bundle"))?;
    Ok((sk, pack))
}

// ---------------------------------------------------------------------------
// Evaluation metadata
// ---------------------------------------------------------------------------

/// Contents of `metadata-eval.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalMetadata {
    #[serde(rename = "ParameterPreset")]
    pub preset: String,
    #[serde(rename = "EvalMode", default, skip_serializing_if = "Option::is_none")]
    pub eval_mode: Option<EvalMode>,
    #[serde(rename = "Ranks", default)]
    pub ranks: Vec<usize>,
}

impl EvalMetadata {
    pub fn new(preset: Preset, eval_mode: Option<EvalMode>, ranks: Vec<usize>) -> Self {
        Self {
            preset: preset.name().to_string(),
            eval_mode,
            ranks,
        }
    }

    pub fn preset(&self) -> Result<Preset> {
        Preset::from_name(&self.preset).ok_or_else(|| {
            Error::not_supported("EvalMetadata::preset", format!("unknown preset {}", self.preset))
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::serialization("EvalMetadata::from_json_str", e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::serialization("EvalMetadata::to_json_string", e.to_string()))
    }

    /// Write `metadata-eval.json` into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let path = dir.as_ref().join(EVAL_METADATA_FILE);
        fs::write(path, self.to_json_string()?).with_context("EvalMetadata::save")
    }

    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = key_path(dir.as_ref(), EVAL_METADATA_FILE);
        Self::from_json_str(&fs::read_to_string(path).with_context("EvalMetadata::load")?)
    }
}

/// Round ranks up to powers of two and pick one context per inner rank
///
/// Returns the sorted, deduplicated ranks and `(inner_rank, index)` pairs
/// naming the first rank of each inner rank, ordered by inner rank. An
/// empty list stands for every supported rank.
pub fn adjust_rank_list(ranks: &[usize]) -> Result<(Vec<usize>, Vec<(usize, usize)>)> {
    let mut adjusted = Vec::new();
    if ranks.is_empty() {
        adjusted.extend((MIN_CONTEXT_SIZE.trailing_zeros()..=MAX_CONTEXT_SIZE.trailing_zeros()).map(|s| 1 << s));
    } else {
        for &rank in ranks {
            if !(MIN_CONTEXT_SIZE..=MAX_CONTEXT_SIZE).contains(&rank) {
                return Err(Error::invalid_input(
                    "adjust_rank_list",
                    format!("rank must lie in [{MIN_CONTEXT_SIZE}, {MAX_CONTEXT_SIZE}], got {rank}"),
                ));
            }
            adjusted.push(rank.next_power_of_two());
        }
        adjusted.sort_unstable();
        adjusted.dedup();
    }

    let mut inner: Vec<(usize, usize)> = Vec::new();
    for (i, &rank) in adjusted.iter().enumerate() {
        let r = inner_rank(rank);
        if !inner.iter().any(|&(seen, _)| seen == r) {
            inner.push((r, i));
        }
    }
    inner.sort_unstable();
    Ok((adjusted, inner))
}
