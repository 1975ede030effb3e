//! Shared enums used across the evi public API

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Packing strategy fixed for the lifetime of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum EvalMode {
    /// One full-degree item per ciphertext
    Flat,
    /// Rank-minimizing packing, plaintext side
    Rmp,
    /// Rank-minimizing packing with shared-a secret keys
    Rms,
    /// Packing only, shared-a secret keys
    Ms,
    /// Column-major matrix batches
    Mm,
}

impl EvalMode {
    /// Name used in configuration files
    pub const fn name(self) -> &'static str {
        match self {
            EvalMode::Flat => "FLAT",
            EvalMode::Rmp => "RMP",
            EvalMode::Rms => "RMS",
            EvalMode::Ms => "MS",
            EvalMode::Mm => "MM",
        }
    }

    /// Modes whose vectors are split into inner-rank blocks
    pub const fn is_rank_minimizing(self) -> bool {
        matches!(self, EvalMode::Rmp | EvalMode::Rms)
    }

    /// Modes built on a shared `a` polynomial across several secret keys
    pub const fn is_shared_a(self) -> bool {
        matches!(self, EvalMode::Rms | EvalMode::Ms)
    }
}

impl fmt::Display for EvalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl core::str::FromStr for EvalMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FLAT" => Ok(EvalMode::Flat),
            "RMP" => Ok(EvalMode::Rmp),
            "RMS" => Ok(EvalMode::Rms),
            "MS" => Ok(EvalMode::Ms),
            "MM" => Ok(EvalMode::Mm),
            other => Err(Error::invalid_input(
                "EvalMode::from_str",
                format!("unknown evaluation mode {other}"),
            )),
        }
    }
}

/// How a vector is laid out before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[repr(u8)]
pub enum EncodeType {
    /// Database item, copied in order
    Item = 0,
    /// Query vector, reversed so a negacyclic product yields the inner product
    Query = 1,
}

impl TryFrom<u8> for EncodeType {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(EncodeType::Item),
            1 => Ok(EncodeType::Query),
            _ => Err(Error::serialization("EncodeType", format!("invalid tag {v}"))),
        }
    }
}

/// Representation carried by a block or query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    /// RLWE ciphertext
    Cipher = 0,
    /// Encoded plaintext
    Plain = 1,
    /// Plaintext kept as 128-bit coefficients
    SerializedPlain = 2,
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(DataType::Cipher),
            1 => Ok(DataType::Plain),
            2 => Ok(DataType::SerializedPlain),
            _ => Err(Error::serialization("DataType", format!("invalid tag {v}"))),
        }
    }
}

/// Execution device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum DeviceType {
    #[default]
    Cpu,
    /// Rejected at context construction by this build
    Gpu,
}

/// How a secret key is protected at rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SealMode {
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "NONE"))]
    None,
    #[cfg_attr(feature = "serde", serde(rename = "AES-KEK"))]
    AesKek,
}

impl SealMode {
    /// Name written into key metadata
    pub const fn name(self) -> &'static str {
        match self {
            SealMode::None => "NONE",
            SealMode::AesKek => "AES-KEK",
        }
    }
}

impl core::str::FromStr for SealMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NONE" => Ok(SealMode::None),
            "AES-KEK" => Ok(SealMode::AesKek),
            other => Err(Error::invalid_input(
                "SealMode::from_str",
                format!("unknown seal mode {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_mode_names() {
        for mode in [EvalMode::Flat, EvalMode::Rmp, EvalMode::Rms, EvalMode::Ms, EvalMode::Mm] {
            assert_eq!(mode.name().parse::<EvalMode>().unwrap(), mode);
        }
        assert!("IVF".parse::<EvalMode>().is_err());
        assert!(EvalMode::Rms.is_shared_a());
        assert!(!EvalMode::Rmp.is_shared_a());
        assert!(EvalMode::Rmp.is_rank_minimizing());
    }

    #[test]
    fn test_tags() {
        assert_eq!(EncodeType::try_from(1).unwrap(), EncodeType::Query);
        assert!(EncodeType::try_from(7).is_err());
        assert_eq!(DataType::try_from(2).unwrap(), DataType::SerializedPlain);
        assert_eq!("AES-KEK".parse::<SealMode>().unwrap(), SealMode::AesKek);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_names_match_config_names() {
        assert_eq!(serde_json::to_string(&EvalMode::Rmp).unwrap(), "\"RMP\"");
        assert_eq!(serde_json::to_string(&SealMode::AesKek).unwrap(), "\"AES-KEK\"");
        assert_eq!(serde_json::from_str::<DeviceType>("\"GPU\"").unwrap(), DeviceType::Gpu);
        assert!(serde_json::from_str::<EvalMode>("\"Flat\"").is_err());
    }
}
