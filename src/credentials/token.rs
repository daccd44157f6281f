use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use zeroize::Zeroizing;

use super::{CredentialCell, CredentialSnapshot, CredentialSource, Refreshed};
use crate::errors::{CredentialError, RemoteError};
use crate::remote::TokenRefresher;

/// Caches an access token derived from a refresh token.
///
/// The token is refreshed lazily: a read that finds it expired performs the
/// refresh call while holding the credential lock, so concurrent readers wait
/// for that one call instead of racing their own.
pub struct TokenCache {
    cell: CredentialCell<Zeroizing<String>>,
    refresher: Arc<dyn TokenRefresher>,
    safety_margin: Duration,
}

impl TokenCache {
    pub fn new(
        refresh_token: impl Into<String>,
        refresher: Arc<dyn TokenRefresher>,
        safety_margin: Duration,
    ) -> Self {
        Self {
            cell: CredentialCell::new("access_token", Zeroizing::new(refresh_token.into())),
            refresher,
            safety_margin,
        }
    }

    /// Current access token, refreshing it if it has expired.
    pub async fn access_token(&self) -> Result<String, CredentialError> {
        self.get_at(OffsetDateTime::now_utc()).await
    }

    pub async fn get_at(&self, now: OffsetDateTime) -> Result<String, CredentialError> {
        let refresher = Arc::clone(&self.refresher);
        let margin = self.safety_margin;

        self.cell
            .get_or_refresh(now, |refresh_token| async move {
                let resp = refresher
                    .refresh_access_token(&refresh_token)
                    .await
                    .map_err(CredentialError::RefreshFailed)?;

                if resp.access_token.is_empty() {
                    return Err(malformed("empty access_token"));
                }
                if resp.expires_in <= 0 {
                    return Err(malformed(&format!("expires_in = {}", resp.expires_in)));
                }

                let expires_at = now
                    .checked_add(Duration::seconds(resp.expires_in))
                    .and_then(|t| t.checked_sub(margin))
                    .ok_or_else(|| {
                        malformed(&format!("expires_in = {} out of range", resp.expires_in))
                    })?;

                // some responses omit the rotated refresh token; keep the old one then
                let secret = if resp.refresh_token.is_empty() {
                    refresh_token
                } else {
                    Zeroizing::new(resp.refresh_token)
                };

                Ok(Refreshed {
                    secret,
                    value: resp.access_token,
                    expires_at,
                })
            })
            .await
    }

    pub async fn snapshot(&self) -> CredentialSnapshot {
        self.cell.snapshot().await
    }

    /// The refresh token that the next refresh will present.
    pub async fn refresh_token(&self) -> String {
        self.cell.with_secret(|s| s.to_string()).await
    }
}

fn malformed(what: &str) -> CredentialError {
    CredentialError::RefreshFailed(RemoteError::Malformed(what.to_string()))
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("refresh_token", &"[REDACTED]")
            .field("safety_margin", &self.safety_margin)
            .finish()
    }
}

#[async_trait]
impl CredentialSource for TokenCache {
    fn kind(&self) -> &'static str {
        "access_token"
    }

    async fn refresh_or_get(&self, now: OffsetDateTime) -> Result<String, CredentialError> {
        self.get_at(now).await
    }
}

/// A fixed access token managed elsewhere; never refreshed.
#[derive(Clone)]
pub struct StaticToken {
    access_token: String,
}

impl StaticToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl CredentialSource for StaticToken {
    fn kind(&self) -> &'static str {
        "static_token"
    }

    async fn refresh_or_get(&self, _now: OffsetDateTime) -> Result<String, CredentialError> {
        Ok(self.access_token.clone())
    }
}
