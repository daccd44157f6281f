use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use drive_credentials::crypto::Signature;
use drive_credentials::remote::{SessionRegistrar, TokenRefresher};
use drive_credentials::types::{CreateSessionRequest, CreateSessionResponse, RefreshTokenResponse};
use drive_credentials::util::{hex_to_bytes, sha256};
use drive_credentials::{
    ConfigError, CredentialError, CredentialSession, RemoteError, SessionConfig, StaticToken,
    TokenCache,
};

/// Hands out `access-N` tokens with a fixed lifetime.
struct Backend {
    refreshes: AtomicUsize,
    expires_in: i64,
}

impl Backend {
    fn new(expires_in: i64) -> Arc<Self> {
        Arc::new(Self {
            refreshes: AtomicUsize::new(0),
            expires_in,
        })
    }

    fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for Backend {
    async fn refresh_access_token(
        &self,
        _refresh_token: &str,
    ) -> Result<RefreshTokenResponse, RemoteError> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RefreshTokenResponse {
            refresh_token: format!("refresh-{n}"),
            access_token: format!("access-{n}"),
            expires_in: self.expires_in,
        })
    }
}

#[derive(Default)]
struct Registrar {
    requests: Mutex<Vec<CreateSessionRequest>>,
    fail: bool,
}

impl Registrar {
    fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionRegistrar for Registrar {
    async fn register_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, RemoteError> {
        if self.fail {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(CreateSessionResponse::accepted())
    }
}

fn config(interval_secs: u64) -> SessionConfig {
    SessionConfig {
        keep_alive_interval_secs: interval_secs,
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn headers_carry_all_three_credentials() {
    let backend = Backend::new(3600);
    let registrar = Arc::new(Registrar::default());
    let cfg = config(3600);
    let token = Arc::new(TokenCache::new("refresh-0", backend.clone(), cfg.token_safety_margin()));
    let session = CredentialSession::start(&cfg, token, registrar.clone(), "user-42").unwrap();

    let headers = session.headers().await.unwrap();
    assert_eq!(headers.access_token, "access-1");
    assert_eq!(headers.device_id, session.device_id());

    let pairs = headers.pairs();
    assert_eq!(pairs[0].1, "Bearer access-1");
    assert_eq!(pairs[1].1, headers.device_id);
    assert_eq!(pairs[2].1, headers.signature);

    // the registered public key verifies the signature over the session message
    let request = registrar.requests.lock().unwrap()[0].clone();
    assert_eq!(request.signature, headers.signature);
    let pk = k256::PublicKey::from_sec1_bytes(&hex_to_bytes(&request.pub_key).unwrap()).unwrap();
    let raw = hex_to_bytes(&headers.signature).unwrap();
    assert_eq!(raw.len(), 65);
    let sig = Signature::from_bytes(&raw[..64]).unwrap();
    let message = format!("{}:{}:user-42:0", cfg.app_id, session.device_id());
    assert!(drive_credentials::crypto::verify(&sha256(message.as_bytes()), &pk, &sig));

    // cached on the second read
    session.headers().await.unwrap();
    assert_eq!(backend.refreshes(), 1);
    assert_eq!(registrar.count(), 1);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn keep_alive_stops_calling_backend_after_shutdown() {
    // expires_in below the safety margin: every tick has to refresh
    let backend = Backend::new(1);
    let registrar = Arc::new(Registrar::default());
    let cfg = config(10);
    let token = Arc::new(TokenCache::new("refresh-0", backend.clone(), cfg.token_safety_margin()));
    let session = CredentialSession::start(&cfg, token, registrar.clone(), "user").unwrap();

    tokio::time::sleep(Duration::from_secs(35)).await;
    let before = backend.refreshes();
    assert!(before >= 3, "expected at least three refreshes, got {before}");
    assert_eq!(registrar.count(), 1);

    session.shutdown().await;
    assert!(session.is_shut_down());
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.refreshes(), before);

    // second call is a no-op
    session.shutdown().await;
}

#[tokio::test]
async fn concurrent_shutdown_calls_both_return() {
    let cfg = config(1);
    let session = Arc::new(
        CredentialSession::start(
            &cfg,
            Arc::new(StaticToken::new("fixed")),
            Arc::new(Registrar::default()),
            "user",
        )
        .unwrap(),
    );

    let a = tokio::spawn({
        let s = Arc::clone(&session);
        async move { s.shutdown().await }
    });
    let b = tokio::spawn({
        let s = Arc::clone(&session);
        async move { s.shutdown().await }
    });
    a.await.unwrap();
    b.await.unwrap();
    assert!(session.is_shut_down());
}

#[tokio::test]
async fn registration_failure_surfaces_in_headers() {
    let cfg = config(3600);
    let registrar = Arc::new(Registrar {
        fail: true,
        ..Registrar::default()
    });
    let session =
        CredentialSession::start(&cfg, Arc::new(StaticToken::new("fixed")), registrar, "user")
            .unwrap();

    assert_eq!(session.current_access_token().await.unwrap(), "fixed");
    let err = session.headers().await.unwrap_err();
    assert!(matches!(err, CredentialError::SessionRegistrationFailed(RemoteError::Transport(_))));

    session.shutdown().await;
}

#[tokio::test]
async fn invalid_config_is_refused_before_anything_starts() {
    let registrar = Arc::new(Registrar::default());
    let token = Arc::new(StaticToken::new("fixed"));

    let err = CredentialSession::start(&config(0), token.clone(), registrar.clone(), "user")
        .err()
        .unwrap();
    assert_eq!(err, ConfigError::NotPositive("keep_alive_interval_secs"));

    let oversized = SessionConfig {
        signature_validity_secs: u64::MAX,
        ..SessionConfig::default()
    };
    let started = CredentialSession::start(&oversized, token.clone(), registrar.clone(), "user");
    assert!(started.is_err());

    // nothing was spawned that could still hold the sources
    tokio::task::yield_now().await;
    assert_eq!(Arc::strong_count(&token), 1);
    assert_eq!(registrar.count(), 0);
}
