use thiserror::Error;

/// Failure reported by one of the remote operations (token refresh, session registration).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("rejected by server: {0}")]
    Rejected(String),
}

/// Invalid input handed to the deterministic signer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignError {
    #[error("private scalar must satisfy 0 < d < n")]
    InvalidPrivateKey,
    #[error("message digest must be at most 32 bytes (got {0})")]
    DigestTooLong(usize),
}

/// Errors surfaced by the credential managers.
///
/// `Clone` so that one failed refresh can be handed to every caller that was
/// queued behind it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("access token refresh failed: {0}")]
    RefreshFailed(RemoteError),
    #[error("session registration failed: {0}")]
    SessionRegistrationFailed(RemoteError),
    #[error("signing failed: {0}")]
    Signing(#[from] SignError),
    #[error("{0} credential expiry is out of the representable time range")]
    ExpiryOutOfRange(&'static str),
}

/// Rejected [`SessionConfig`](crate::config::SessionConfig) values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    #[error("{field} must be at most {max} seconds (got {got})")]
    TooLarge {
        field: &'static str,
        max: u64,
        got: u64,
    },
    #[error("app_id must not contain ':'")]
    AppIdSeparator,
}

/// Aborts on a broken arithmetic invariant.
///
/// Only reachable with a malformed curve/modulus configuration; never corrected silently.
#[track_caller]
pub(crate) fn invariant_violation(what: &str) -> ! {
    panic!("arithmetic invariant violated: {what}")
}
