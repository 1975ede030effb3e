//! Fixed-width name fields
//!
//! Key files carry the preset name in a NUL-padded field of constant width.

/// Encode `name` into a fixed-width NUL-padded field, truncating if longer
pub fn fixed_name<const N: usize>(name: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = name.as_bytes();
    let len = bytes.len().min(N);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

/// Decode a NUL-padded fixed-width field
pub fn name_from_fixed(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
