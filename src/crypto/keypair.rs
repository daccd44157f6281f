use std::fmt;

use k256::ecdsa::SigningKey;
use k256::PublicKey;
use rand_core::OsRng;

use super::modular::Scalar;
use super::signer::{sign, Signature};
use crate::errors::SignError;

/// An ephemeral secp256k1 key pair. The private half is zeroized on drop.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Rebuild a key pair from a 32-byte private key (must satisfy `0 < d < n`).
    pub fn from_bytes(private_key: &[u8; 32]) -> Result<Self, SignError> {
        let signing_key =
            SigningKey::from_slice(private_key).map_err(|_| SignError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    pub fn private_scalar(&self) -> Scalar {
        let bytes: [u8; 32] = self.signing_key.to_bytes().into();
        // SigningKey guarantees 0 < d < n
        Scalar::reduce(ethers_core::types::U256::from_big_endian(&bytes))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self.signing_key.verifying_key())
    }

    /// Uncompressed SEC1 encoding: 0x04 || X || Y (65 bytes).
    pub fn public_key_uncompressed(&self) -> [u8; 65] {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let mut out = [0u8; 65];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Lowercase hex of the uncompressed public key, no `0x` prefix.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_uncompressed())
    }

    /// Private key as lowercase hex, no `0x` prefix.
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Deterministically sign a digest of at most 32 bytes.
    pub fn sign_digest(&self, digest: &[u8]) -> Result<Signature, SignError> {
        sign(digest, &self.private_scalar())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}
