// src/util.rs
use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>> {
    let t = s.trim();
    let t = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")).unwrap_or(t);
    Ok(hex::decode(t)?)
}

/// Exactly 32 bytes of hex (optional 0x prefix).
pub fn hex_to_32(s: &str) -> Result<[u8; 32]> {
    let bytes = hex_to_bytes(s)?;
    if bytes.len() != 32 {
        return Err(anyhow!("expected 32 bytes of hex (got {})", bytes.len()));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// RFC 3339 rendering for log fields; falls back to the unix timestamp.
pub fn fmt_ts(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339)
        .unwrap_or_else(|_| ts.unix_timestamp().to_string())
}
