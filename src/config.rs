use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::defaults::Defaults;
use crate::errors::ConfigError;
use crate::util::hex_to_bytes;

/// Tunables for the credential managers and their keep-alive tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Salt bound into every session signature.
    pub app_id: String,
    pub device_name: String,
    pub model_name: String,

    /// How long a registered session signature is trusted.
    pub signature_validity_secs: u64,

    /// Byte appended to `r || s` (hex); `None` sends the bare 64 bytes.
    pub signature_format_byte: Option<u8>,

    /// Subtracted from the server-reported token lifetime.
    pub token_safety_margin_secs: u64,

    pub keep_alive_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_id: Defaults::APP_ID.to_string(),
            device_name: Defaults::DEVICE_NAME.to_string(),
            model_name: Defaults::MODEL_NAME.to_string(),
            signature_validity_secs: Defaults::SIGNATURE_VALIDITY_SECS,
            signature_format_byte: Some(Defaults::SIGNATURE_FORMAT_BYTE),
            token_safety_margin_secs: Defaults::TOKEN_SAFETY_MARGIN_SECS,
            keep_alive_interval_secs: Defaults::KEEP_ALIVE_INTERVAL_SECS,
        }
    }
}

impl SessionConfig {
    /// Read a JSON config file; missing fields fall back to [`Defaults`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults (or `base`) overridden by `DRIVE_*` environment variables.
    pub fn from_env_over(base: Self) -> Result<Self> {
        let mut config = base;
        if let Ok(v) = std::env::var("DRIVE_APP_ID") {
            config.app_id = v;
        }
        if let Some(v) = env_u64("DRIVE_SIGNATURE_VALIDITY_SECS")? {
            config.signature_validity_secs = v;
        }
        if let Some(v) = env_u64("DRIVE_TOKEN_SAFETY_MARGIN_SECS")? {
            config.token_safety_margin_secs = v;
        }
        if let Some(v) = env_u64("DRIVE_KEEP_ALIVE_SECS")? {
            config.keep_alive_interval_secs = v;
        }
        if let Ok(v) = std::env::var("DRIVE_SIGNATURE_SUFFIX") {
            config.signature_format_byte = parse_format_byte(&v)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Every window must fit [`Defaults::MAX_WINDOW_SECS`]; interval and validity must be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let windows = [
            ("keep_alive_interval_secs", self.keep_alive_interval_secs, true),
            ("signature_validity_secs", self.signature_validity_secs, true),
            ("token_safety_margin_secs", self.token_safety_margin_secs, false),
        ];
        for (field, got, positive) in windows {
            if positive && got == 0 {
                return Err(ConfigError::NotPositive(field));
            }
            if got > Defaults::MAX_WINDOW_SECS {
                return Err(ConfigError::TooLarge {
                    field,
                    max: Defaults::MAX_WINDOW_SECS,
                    got,
                });
            }
        }
        if self.app_id.contains(':') {
            return Err(ConfigError::AppIdSeparator);
        }
        Ok(())
    }

    pub fn signature_validity(&self) -> time::Duration {
        saturating_seconds(self.signature_validity_secs)
    }

    pub fn token_safety_margin(&self) -> time::Duration {
        saturating_seconds(self.token_safety_margin_secs)
    }

    pub fn keep_alive_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.keep_alive_interval_secs)
    }
}

// never wraps negative for unvalidated configs
fn saturating_seconds(secs: u64) -> time::Duration {
    time::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

/// `""` or `"none"` disables the suffix; otherwise one hex byte, `0x` optional.
pub fn parse_format_byte(s: &str) -> Result<Option<u8>> {
    let t = s.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let bytes = hex_to_bytes(t)?;
    match bytes.as_slice() {
        [b] => Ok(Some(*b)),
        _ => Err(anyhow!("signature suffix must be a single byte, got {}", bytes.len())),
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("parsing {name}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"signature_validity_secs": 600}"#).unwrap();
        assert_eq!(config.signature_validity_secs, 600);
        assert_eq!(config.app_id, Defaults::APP_ID);
        assert_eq!(config.keep_alive_interval(), std::time::Duration::from_secs(10));
        assert_eq!(config.token_safety_margin(), time::Duration::seconds(60));
    }

    #[test]
    fn format_byte_parsing() {
        assert_eq!(parse_format_byte("01").unwrap(), Some(0x01));
        assert_eq!(parse_format_byte("0x00").unwrap(), Some(0x00));
        assert_eq!(parse_format_byte("none").unwrap(), None);
        assert!(parse_format_byte("0102").is_err());
        assert!(parse_format_byte("zz").is_err());
    }

    #[test]
    fn validation_rejects_zero_interval() {
        let config = SessionConfig {
            keep_alive_interval_secs: 0,
            ..SessionConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive("keep_alive_interval_secs"))
        );
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn oversized_windows_are_rejected() {
        let config = SessionConfig {
            signature_validity_secs: u64::MAX,
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooLarge { field: "signature_validity_secs", .. })
        ));
        // unvalidated, the window saturates instead of wrapping negative
        assert!(config.signature_validity().is_positive());

        let config = SessionConfig {
            token_safety_margin_secs: Defaults::MAX_WINDOW_SECS + 1,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            signature_validity_secs: Defaults::MAX_WINDOW_SECS,
            ..SessionConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
