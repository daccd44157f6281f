//! Credential and signature lifecycle for the drive API client.
//!
//! * [`crypto`]: deterministic secp256k1 ECDSA (RFC6979-style nonces, low-S).
//! * [`credentials`]: the access-token cache, the device-signature manager and
//!   the keep-alive tasks that renew them in the background.
//! * [`session`]: both credentials wired together behind one shutdown signal.
//!
//! The HTTP transport is not part of this crate; it plugs in through the
//! traits in [`remote`].

pub mod config;
pub mod credentials;
pub mod crypto;
pub mod defaults;
pub mod errors;
pub mod remote;
pub mod session;
pub mod types;
pub mod util;

pub use config::SessionConfig;
pub use credentials::keepalive::{KeepAlive, Shutdown};
pub use credentials::signature::{DeviceIdentity, SignatureManager};
pub use credentials::token::{StaticToken, TokenCache};
pub use credentials::{CredentialSnapshot, CredentialSource};
pub use errors::{ConfigError, CredentialError, RemoteError, SignError};
pub use session::{CredentialHeaders, CredentialSession};
