//! Error handling for scheme operations
//!
//! The scheme layer reports everything through the shared [`evi_api::Error`]
//! taxonomy. Primitive failures (`evi_algorithms::Error`) convert through
//! `From`, so `?` works across the crate boundary; [`primitive`] rewrites the
//! context so the caller-facing operation is named instead of the primitive.

use evi_algorithms::error::Error as PrimitiveError;

pub use evi_api::error::{Error, ErrorKind, Result, ResultExt};

/// Convert a primitive result, naming the scheme operation that failed
#[inline]
pub(crate) fn primitive<T>(
    r: core::result::Result<T, PrimitiveError>,
    context: &'static str,
) -> Result<T> {
    r.map_err(|e| Error::from(e).with_context(context))
}

/// Fail with `InvalidInput` unless `condition` holds
#[inline]
pub(crate) fn ensure(condition: bool, context: &'static str, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::invalid_input(context, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_renames_context() {
        let r: core::result::Result<(), _> = Err(PrimitiveError::Length {
            context: "Ntt operand",
            expected: 4096,
            actual: 12,
        });
        let err = primitive(r, "Context::ntt_mod_q").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "[InvalidInput] Context::ntt_mod_q: expected length 4096, got 12");
    }

    #[test]
    fn test_ensure() {
        assert!(ensure(true, "x", "unused").is_ok());
        let err = ensure(false, "Encryptor::encrypt", "empty message").unwrap_err();
        assert_eq!(err.message(), "empty message");
    }
}
