use anyhow::{anyhow, Context, Result};
use k256::PublicKey;

use drive_credentials::crypto::{sign, verify, KeyPair, Signature};
use drive_credentials::util::{hex_to_32, hex_to_bytes, sha256};

/// Either an explicit digest or the SHA-256 of a message.
pub fn resolve_digest(digest: Option<&str>, message: Option<&str>) -> Result<Vec<u8>> {
    match (digest, message) {
        (Some(d), None) => {
            let bytes = hex_to_bytes(d).context("parsing --digest")?;
            if bytes.len() > 32 {
                return Err(anyhow!("digest must be at most 32 bytes (got {})", bytes.len()));
            }
            Ok(bytes)
        }
        (None, Some(m)) => Ok(sha256(m.as_bytes()).to_vec()),
        _ => Err(anyhow!("pass exactly one of --digest or --message")),
    }
}

/// Hex of r||s plus the optional format byte.
pub fn sign_hex(key_hex: &str, digest: &[u8], format_byte: Option<u8>) -> Result<String> {
    let key_bytes = hex_to_32(key_hex).context("parsing --key")?;
    let key_pair = KeyPair::from_bytes(&key_bytes)?;
    let signature = sign(digest, &key_pair.private_scalar())?;
    Ok(signature.to_hex(format_byte))
}

/// Accepts 64 bytes (r||s) or 65 bytes with a trailing format byte.
pub fn verify_hex(public_key_hex: &str, digest: &[u8], signature_hex: &str) -> Result<bool> {
    let pk_bytes = hex_to_bytes(public_key_hex).context("parsing --public-key")?;
    let public_key =
        PublicKey::from_sec1_bytes(&pk_bytes).map_err(|_| anyhow!("public key parse failed"))?;

    let raw = hex_to_bytes(signature_hex).context("parsing --signature")?;
    let rs = match raw.len() {
        64 => &raw[..],
        65 => &raw[..64],
        n => return Err(anyhow!("signature must be 64 or 65 bytes (got {n})")),
    };
    let Some(signature) = Signature::from_bytes(rs) else {
        return Ok(false);
    };
    Ok(verify(digest, &public_key, &signature))
}
