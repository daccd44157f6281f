//! Time-limited credentials and the machinery that keeps them fresh.
//!
//! Both the access token and the device signature share one read path:
//! a single exclusive lock per credential, a wall-clock expiry check, and at
//! most one refresh in flight. Callers that queue up behind a refresh get its
//! outcome, including its error, instead of issuing their own call.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::CredentialError;
use crate::util::fmt_ts;

pub mod keepalive;
pub mod signature;
pub mod token;

/// Anything holding a refreshable credential the keep-alive task can poke.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Short label used in logs.
    fn kind(&self) -> &'static str;

    /// Return the value valid at `now`, refreshing first if it has expired.
    async fn refresh_or_get(&self, now: OffsetDateTime) -> Result<String, CredentialError>;
}

/// Outcome of one successful refresh.
pub(crate) struct Refreshed<S> {
    pub secret: S,
    pub value: String,
    pub expires_at: OffsetDateTime,
}

/// Point-in-time view of a credential, without its secret material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    pub value: Option<String>,
    pub expires_at: OffsetDateTime,
}

struct CellState<S> {
    secret: S,
    value: Option<String>,
    expires_at: OffsetDateTime,
    /// Attempt number and error of the latest refresh, if it failed.
    last_failure: Option<(u64, CredentialError)>,
}

impl<S> CellState<S> {
    fn valid_at(&self, now: OffsetDateTime) -> Option<&str> {
        match &self.value {
            Some(v) if now < self.expires_at => Some(v),
            _ => None,
        }
    }
}

pub(crate) struct CredentialCell<S> {
    kind: &'static str,
    state: Mutex<CellState<S>>,
    /// Completed refresh attempts; bumped under the lock, read before taking it.
    attempts: AtomicU64,
}

impl<S: Clone + Send> CredentialCell<S> {
    /// An empty credential that expired at the Unix epoch.
    pub fn new(kind: &'static str, secret: S) -> Self {
        Self {
            kind,
            state: Mutex::new(CellState {
                secret,
                value: None,
                expires_at: OffsetDateTime::UNIX_EPOCH,
                last_failure: None,
            }),
            attempts: AtomicU64::new(0),
        }
    }

    pub async fn get_or_refresh<F, Fut>(
        &self,
        now: OffsetDateTime,
        refresh: F,
    ) -> Result<String, CredentialError>
    where
        F: FnOnce(S) -> Fut,
        Fut: Future<Output = Result<Refreshed<S>, CredentialError>>,
    {
        let seen = self.attempts.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        if let Some(value) = state.valid_at(now) {
            return Ok(value.to_owned());
        }
        if let Some((attempt, err)) = &state.last_failure {
            if *attempt > seen {
                debug!(credential = self.kind, "joining failed refresh");
                return Err(err.clone());
            }
        }

        debug!(credential = self.kind, expired_at = %fmt_ts(state.expires_at), "refreshing");
        let outcome = refresh(state.secret.clone()).await;
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;

        match outcome {
            Ok(refreshed) => {
                if refreshed.expires_at <= now {
                    warn!(
                        credential = self.kind,
                        "refreshed credential is already past its deadline"
                    );
                }
                info!(
                    credential = self.kind,
                    expires_at = %fmt_ts(refreshed.expires_at),
                    "credential refreshed"
                );
                state.secret = refreshed.secret;
                state.value = Some(refreshed.value.clone());
                state.expires_at = refreshed.expires_at;
                state.last_failure = None;
                Ok(refreshed.value)
            }
            Err(err) => {
                warn!(credential = self.kind, error = %err, "refresh failed");
                state.last_failure = Some((attempt, err.clone()));
                Err(err)
            }
        }
    }

    pub async fn snapshot(&self) -> CredentialSnapshot {
        let state = self.state.lock().await;
        CredentialSnapshot {
            value: state.value.clone(),
            expires_at: state.expires_at,
        }
    }

    /// Runs `f` against the current secret under the lock.
    pub async fn with_secret<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RemoteError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use time::Duration;

    fn t0() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    #[tokio::test]
    async fn starts_expired_and_refreshes_on_first_read() {
        let cell = CredentialCell::new("test", 0u32);
        assert_eq!(cell.snapshot().await.expires_at, OffsetDateTime::UNIX_EPOCH);

        let v = cell
            .get_or_refresh(t0(), |gen| async move {
                Ok(Refreshed {
                    secret: gen + 1,
                    value: format!("v{}", gen + 1),
                    expires_at: t0() + Duration::minutes(5),
                })
            })
            .await
            .unwrap();
        assert_eq!(v, "v1");
        assert_eq!(cell.with_secret(|s| *s).await, 1);
    }

    #[tokio::test]
    async fn waiters_share_a_failed_refresh() {
        let cell = Arc::new(CredentialCell::new("test", ()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cell = Arc::clone(&cell);
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                cell.get_or_refresh(t0(), |_| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Err::<Refreshed<()>, _>(CredentialError::RefreshFailed(RemoteError::Transport(
                        "down".into(),
                    )))
                })
                .await
            }));
        }
        for t in tasks {
            assert!(t.await.unwrap().is_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // a later caller retries
        let v = cell
            .get_or_refresh(t0(), |_| async move {
                Ok(Refreshed {
                    secret: (),
                    value: "ok".into(),
                    expires_at: t0() + Duration::minutes(1),
                })
            })
            .await
            .unwrap();
        assert_eq!(v, "ok");
    }
}
