//! Seams to the HTTP layer. The transport itself lives outside this crate;
//! implementations only have to map their failures onto [`RemoteError`].

use async_trait::async_trait;

use crate::errors::RemoteError;
use crate::types::{CreateSessionRequest, CreateSessionResponse, RefreshTokenResponse};

/// Exchanges a refresh token for a new access token (and usually a new refresh token).
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshTokenResponse, RemoteError>;
}

/// Publishes a device public key together with a signature made by it.
#[async_trait]
pub trait SessionRegistrar: Send + Sync {
    async fn register_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, RemoteError>;
}
