use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::{CredentialCell, CredentialSnapshot, CredentialSource, Refreshed};
use crate::config::SessionConfig;
use crate::crypto::KeyPair;
use crate::defaults::Defaults;
use crate::errors::{CredentialError, RemoteError, SignError};
use crate::remote::SessionRegistrar;
use crate::types::CreateSessionRequest;
use crate::util::sha256;

/// Who the session signature is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub app_id: String,
    pub device_id: String,
    pub user_id: String,
}

impl DeviceIdentity {
    /// Identity for `user_id` with the device id derived from it.
    pub fn for_user(app_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            app_id: app_id.into(),
            device_id: device_id_for_user(&user_id),
            user_id,
        }
    }

    /// `app_id:device_id:user_id:nonce`
    pub fn session_message(&self, nonce: u64) -> String {
        format!(
            "{}:{}:{}:{}",
            self.app_id, self.device_id, self.user_id, nonce
        )
    }

    pub fn session_digest(&self) -> [u8; 32] {
        sha256(self.session_message(Defaults::SESSION_NONCE).as_bytes())
    }
}

/// Hex SHA-256 of the user id, sent as `X-Device-Id`.
pub fn device_id_for_user(user_id: &str) -> String {
    hex::encode(sha256(user_id.as_bytes()))
}

/// Public half of a key pair plus its signature over the session digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSignature {
    pub public_key_hex: String,
    pub signature_hex: String,
}

/// Signs the identity's session digest with `key_pair`.
pub fn build_session_signature(
    key_pair: &KeyPair,
    identity: &DeviceIdentity,
    format_byte: Option<u8>,
) -> Result<SessionSignature, SignError> {
    let signature = key_pair.sign_digest(&identity.session_digest())?;
    Ok(SessionSignature {
        public_key_hex: key_pair.public_key_hex(),
        signature_hex: signature.to_hex(format_byte),
    })
}

/// Keeps a registered device signature valid.
///
/// Each refresh generates a fresh key pair, signs the session digest with it
/// and publishes the pair to the session endpoint. The key pair is kept only if
/// the server accepts it.
pub struct SignatureManager {
    cell: CredentialCell<Option<Arc<KeyPair>>>,
    registrar: Arc<dyn SessionRegistrar>,
    identity: DeviceIdentity,
    validity: Duration,
    format_byte: Option<u8>,
    device_name: String,
    model_name: String,
}

impl SignatureManager {
    pub fn new(
        identity: DeviceIdentity,
        registrar: Arc<dyn SessionRegistrar>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            cell: CredentialCell::new("device_signature", None),
            registrar,
            identity,
            validity: config.signature_validity(),
            format_byte: config.signature_format_byte,
            device_name: config.device_name.clone(),
            model_name: config.model_name.clone(),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Current signature, registering a new session if it has expired.
    pub async fn signature(&self) -> Result<String, CredentialError> {
        self.get_at(OffsetDateTime::now_utc()).await
    }

    pub async fn get_at(&self, now: OffsetDateTime) -> Result<String, CredentialError> {
        self.cell
            .get_or_refresh(now, |_previous| self.register(now))
            .await
    }

    async fn register(
        &self,
        now: OffsetDateTime,
    ) -> Result<Refreshed<Option<Arc<KeyPair>>>, CredentialError> {
        let expires_at = now
            .checked_add(self.validity)
            .ok_or(CredentialError::ExpiryOutOfRange("device_signature"))?;
        let key_pair = KeyPair::generate();
        let signed = build_session_signature(&key_pair, &self.identity, self.format_byte)?;
        debug!(public_key = %signed.public_key_hex, "registering device session");

        let request = CreateSessionRequest {
            device_name: self.device_name.clone(),
            model_name: self.model_name.clone(),
            pub_key: signed.public_key_hex,
            signature: signed.signature_hex.clone(),
        };
        // on any failure key_pair is dropped here
        let ack = self
            .registrar
            .register_session(&request)
            .await
            .map_err(CredentialError::SessionRegistrationFailed)?;
        if !ack.is_accepted() {
            return Err(CredentialError::SessionRegistrationFailed(
                RemoteError::Rejected("session not accepted".into()),
            ));
        }

        Ok(Refreshed {
            secret: Some(Arc::new(key_pair)),
            value: signed.signature_hex,
            expires_at,
        })
    }

    pub async fn snapshot(&self) -> CredentialSnapshot {
        self.cell.snapshot().await
    }

    /// Public key of the currently registered key pair, if any.
    pub async fn public_key_hex(&self) -> Option<String> {
        self.cell
            .with_secret(|kp| kp.as_ref().map(|kp| kp.public_key_hex()))
            .await
    }
}

impl fmt::Debug for SignatureManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureManager")
            .field("identity", &self.identity)
            .field("validity", &self.validity)
            .finish()
    }
}

#[async_trait]
impl CredentialSource for SignatureManager {
    fn kind(&self) -> &'static str {
        "device_signature"
    }

    async fn refresh_or_get(&self, now: OffsetDateTime) -> Result<String, CredentialError> {
        self.get_at(now).await
    }
}
