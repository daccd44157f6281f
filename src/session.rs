use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::SessionConfig;
use crate::credentials::keepalive::{KeepAlive, Shutdown};
use crate::credentials::signature::{DeviceIdentity, SignatureManager};
use crate::credentials::CredentialSource;
use crate::errors::{ConfigError, CredentialError};
use crate::remote::SessionRegistrar;

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_DEVICE_ID: &str = "X-Device-Id";
pub const HEADER_SIGNATURE: &str = "X-Signature";

/// The credential headers every authenticated drive request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialHeaders {
    pub access_token: String,
    pub device_id: String,
    pub signature: String,
}

impl CredentialHeaders {
    /// `(name, value)` pairs ready for an HTTP request builder.
    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            (HEADER_AUTHORIZATION, format!("Bearer {}", self.access_token)),
            (HEADER_DEVICE_ID, self.device_id.clone()),
            (HEADER_SIGNATURE, self.signature.clone()),
        ]
    }
}

/// Both credentials of one signed-in user plus their keep-alive tasks.
///
/// Dropping the session without calling [`CredentialSession::shutdown`] still
/// stops the tasks (their signal sender goes away) but does not wait for them.
pub struct CredentialSession {
    token: Arc<dyn CredentialSource>,
    signature: Arc<SignatureManager>,
    shutdown: Shutdown,
    tasks: Mutex<Vec<KeepAlive>>,
}

impl CredentialSession {
    /// Wire up the managers for `user_id` and start both keep-alive tasks.
    /// `config` is validated first; nothing is spawned if it is rejected.
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &SessionConfig,
        token: Arc<dyn CredentialSource>,
        registrar: Arc<dyn SessionRegistrar>,
        user_id: &str,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let identity = DeviceIdentity::for_user(config.app_id.clone(), user_id);
        let signature = Arc::new(SignatureManager::new(identity, registrar, config));
        let shutdown = Shutdown::new();
        let interval = config.keep_alive_interval();

        let tasks = vec![
            KeepAlive::spawn_with(Arc::clone(&token), interval, shutdown.clone())?,
            KeepAlive::spawn_with(
                Arc::clone(&signature) as Arc<dyn CredentialSource>,
                interval,
                shutdown.clone(),
            )?,
        ];
        info!(device_id = %signature.identity().device_id, "credential session started");

        Ok(Self {
            token,
            signature,
            shutdown,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.signature.identity().device_id
    }

    pub fn signature_manager(&self) -> &Arc<SignatureManager> {
        &self.signature
    }

    pub async fn current_access_token(&self) -> Result<String, CredentialError> {
        self.token
            .refresh_or_get(time::OffsetDateTime::now_utc())
            .await
    }

    pub async fn current_signature(&self) -> Result<String, CredentialError> {
        self.signature.signature().await
    }

    pub async fn headers(&self) -> Result<CredentialHeaders, CredentialError> {
        Ok(CredentialHeaders {
            access_token: self.current_access_token().await?,
            device_id: self.device_id().to_string(),
            signature: self.current_signature().await?,
        })
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Stop both keep-alive tasks and wait for them. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        self.shutdown.trigger();
        // held while joining so a concurrent caller returns only once both tasks are gone
        let mut tasks = self.tasks.lock().await;
        if tasks.is_empty() {
            return;
        }
        for task in tasks.drain(..) {
            task.join().await;
        }
        info!("credential session shut down");
    }
}
