use anyhow::{Context, Result};
use serde::Serialize;

use drive_credentials::credentials::signature::{build_session_signature, DeviceIdentity};
use drive_credentials::crypto::KeyPair;
use drive_credentials::defaults::Defaults;
use drive_credentials::util::hex_to_32;
use drive_credentials::SessionConfig;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSignatureOut {
    pub user_id: String,
    pub device_id: String,
    pub message: String,
    pub digest: String,
    pub pub_key: String,
    pub signature: String,
}

/// Sign the session message for `user_id` with `key_hex` or a fresh key pair.
pub fn build(config: &SessionConfig, user_id: &str, key_hex: Option<&str>) -> Result<SessionSignatureOut> {
    let key_pair = match key_hex {
        Some(k) => KeyPair::from_bytes(&hex_to_32(k).context("parsing --key")?)?,
        None => KeyPair::generate(),
    };
    let identity = DeviceIdentity::for_user(config.app_id.clone(), user_id);
    let signed = build_session_signature(&key_pair, &identity, config.signature_format_byte)?;

    Ok(SessionSignatureOut {
        user_id: identity.user_id.clone(),
        device_id: identity.device_id.clone(),
        message: identity.session_message(Defaults::SESSION_NONCE),
        digest: hex::encode(identity.session_digest()),
        pub_key: signed.public_key_hex,
        signature: signed.signature_hex,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_key_gives_reproducible_output() {
        let config = SessionConfig::default();
        let key = "11".repeat(32);
        let a = build(&config, "user", Some(&key)).unwrap();
        let b = build(&config, "user", Some(&key)).unwrap();
        assert_eq!(a.signature, b.signature);
        assert_eq!(a.pub_key, b.pub_key);
        assert!(a.message.starts_with(Defaults::APP_ID));
        assert!(a.message.ends_with(":user:0"));
    }
}
