//! Little-endian stream helpers shared by the wire formats

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{Error, Result, ResultExt};

/// Upper bound on the coefficients a single serialized polynomial may claim
pub(crate) const MAX_WIRE_COEFFS: u64 = 1 << 28;

pub(crate) fn write_poly(w: &mut dyn Write, poly: &[u64], context: &'static str) -> Result<()> {
    let mut bytes = vec![0u8; poly.len() * 8];
    LittleEndian::write_u64_into(poly, &mut bytes);
    w.write_all(&bytes).with_context(context)
}

/// Read `len` coefficients, growing the buffer only as data arrives
pub(crate) fn read_poly(r: &mut dyn Read, len: usize, context: &'static str) -> Result<Vec<u64>> {
    const CHUNK: usize = 1 << 14;
    let mut poly = Vec::with_capacity(len.min(CHUNK));
    let mut buf = vec![0u64; len.min(CHUNK)];
    while poly.len() < len {
        let take = (len - poly.len()).min(CHUNK);
        r.read_u64_into::<LittleEndian>(&mut buf[..take])
            .with_context(context)?;
        poly.extend_from_slice(&buf[..take]);
    }
    Ok(poly)
}

pub(crate) fn read_u8(r: &mut dyn Read, context: &'static str) -> Result<u8> {
    r.read_u8().with_context(context)
}

pub(crate) fn read_u32(r: &mut dyn Read, context: &'static str) -> Result<u32> {
    r.read_u32::<LittleEndian>().with_context(context)
}

pub(crate) fn read_u64(r: &mut dyn Read, context: &'static str) -> Result<u64> {
    r.read_u64::<LittleEndian>().with_context(context)
}

pub(crate) fn read_i32(r: &mut dyn Read, context: &'static str) -> Result<i32> {
    r.read_i32::<LittleEndian>().with_context(context)
}

/// Level field: 0 (Q only) or 1 (Q and P)
pub(crate) fn read_level(r: &mut dyn Read, context: &'static str) -> Result<u32> {
    match read_i32(r, context)? {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(Error::serialization(context, format!("invalid level {other}"))),
    }
}

/// Fail unless the reader is exhausted
pub(crate) fn expect_end(r: &mut dyn Read, context: &'static str) -> Result<()> {
    let mut probe = [0u8; 1];
    match r.read(&mut probe).with_context(context)? {
        0 => Ok(()),
        _ => Err(Error::serialization(context, "trailing bytes after payload")),
    }
}
