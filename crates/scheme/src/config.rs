//! Context configuration files
//!
//! ```toml
//! preset = "QF0"
//! device = "CPU"
//! rank = 512
//! eval_mode = "RMP"
//! seed_hex = "00112233..."
//! ```

use std::path::Path;

use evi_api::{DeviceType, EvalMode};
use evi_params::{Preset, SEED_MIN_SIZE};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Error, Result, ResultExt};

/// Everything needed to build a [`Context`](crate::Context) and seed its samplers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub preset: String,
    #[serde(default)]
    pub device: DeviceType,
    pub rank: usize,
    pub eval_mode: EvalMode,
    /// Sampler seed, hex encoded; `None` seeds from the OS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_hex: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            preset: Preset::QF0.name().to_string(),
            device: DeviceType::Cpu,
            rank: 512,
            eval_mode: EvalMode::Flat,
            seed_hex: None,
        }
    }
}

impl ContextConfig {
    pub fn new(preset: Preset, rank: usize, eval_mode: EvalMode) -> Self {
        Self {
            preset: preset.name().to_string(),
            rank,
            eval_mode,
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device: DeviceType) -> Self {
        self.device = device;
        self
    }

    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_eval_mode(mut self, eval_mode: EvalMode) -> Self {
        self.eval_mode = eval_mode;
        self
    }

    pub fn with_seed(mut self, seed: &[u8]) -> Self {
        self.seed_hex = Some(hex::encode(seed));
        self
    }

    /// Parse the preset name; `Runtime` is not nameable here
    pub fn preset(&self) -> Result<Preset> {
        Preset::from_name(&self.preset).ok_or_else(|| {
            Error::not_supported(
                "ContextConfig::preset",
                format!("unknown preset {}", self.preset),
            )
        })
    }

    /// Decoded seed, at least `SEED_MIN_SIZE` bytes
    pub fn seed(&self) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let context = "ContextConfig::seed";
        let Some(text) = self.seed_hex.as_deref() else {
            return Ok(None);
        };
        let bytes = Zeroizing::new(
            hex::decode(text).map_err(|e| Error::invalid_input(context, e.to_string()))?,
        );
        if bytes.len() < SEED_MIN_SIZE {
            return Err(Error::invalid_input(
                context,
                format!("seed must hold at least {SEED_MIN_SIZE} bytes, got {}", bytes.len()),
            ));
        }
        Ok(Some(bytes))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::serialization("ContextConfig::from_toml_str", e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::serialization("ContextConfig::from_json_str", e.to_string()))
    }

    /// Load a `.json` file as JSON, anything else as TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context("ContextConfig::load")?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::serialization("ContextConfig::to_toml_string", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_toml_and_json() {
        let cfg = ContextConfig::from_toml_str(
            "preset = \"IP0\"\nrank = 256\neval_mode = \"RMP\"\n",
        )
        .unwrap();
        assert_eq!(cfg.preset().unwrap(), Preset::IP0);
        assert_eq!(cfg.device, DeviceType::Cpu);
        assert_eq!(cfg.eval_mode, EvalMode::Rmp);
        assert!(cfg.seed().unwrap().is_none());

        let json = ContextConfig::from_json_str(
            r#"{"preset":"QF0","device":"GPU","rank":128,"eval_mode":"MM"}"#,
        )
        .unwrap();
        assert_eq!(json.device, DeviceType::Gpu);
        assert_eq!(json.eval_mode, EvalMode::Mm);

        let back = ContextConfig::from_toml_str(&cfg.to_toml_string().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_builder_and_seed() {
        let cfg = ContextConfig::new(Preset::QF1, 64, EvalMode::Flat).with_seed(&[0xab; SEED_MIN_SIZE]);
        assert_eq!(cfg.seed().unwrap().unwrap().as_slice(), &[0xab; SEED_MIN_SIZE][..]);

        let short = cfg.clone().with_seed(&[1, 2, 3]);
        assert_eq!(short.seed().unwrap_err().kind(), ErrorKind::InvalidInput);

        let mut bad = cfg.with_rank(32);
        bad.seed_hex = Some("zz".into());
        assert!(bad.seed().is_err());
    }

    #[test]
    fn test_unknown_preset() {
        let cfg = ContextConfig {
            preset: "RUNTIME".into(),
            ..ContextConfig::default()
        };
        assert_eq!(cfg.preset().unwrap_err().kind(), ErrorKind::NotSupported);
        assert!(ContextConfig::from_toml_str("rank = \"x\"").is_err());
    }
}
