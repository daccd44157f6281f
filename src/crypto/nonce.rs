//! Deterministic nonce derivation (HMAC-SHA256 DRBG, RFC6979 style).
//!
//! The session endpoint verifies signatures produced with exactly this
//! construction, so the byte sequence must never change.

use ethers_core::types::U256;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::modular::Scalar;

type HmacSha256 = Hmac<Sha256>;

/// A source of nonce candidates the signer can draw from and reseed.
pub trait NonceSource {
    /// Next candidate as a big-endian integer. May be out of range.
    fn generate(&mut self) -> U256;
    fn reseed(&mut self, extra: &[u8]);
}

#[derive(Zeroize, ZeroizeOnDrop)]
pub struct NonceGenerator {
    v: [u8; 32],
    k: [u8; 32],
}

impl NonceGenerator {
    /// Fresh, unseeded state: `V = 01…01`, `K = 00…00`.
    pub fn new() -> Self {
        Self {
            v: [0x01; 32],
            k: [0x00; 32],
        }
    }

    /// Seeds with `pad32(private) || pad32(digest mod n)`.
    pub fn for_signing(private_key: &Scalar, digest: &[u8; 32]) -> Self {
        let mut seed = [0u8; 64];
        seed[..32].copy_from_slice(&private_key.to_be_bytes());
        seed[32..].copy_from_slice(&Scalar::reduce(U256::from_big_endian(digest)).to_be_bytes());

        let mut generator = Self::new();
        generator.reseed(&seed);
        seed.zeroize();
        generator
    }

    fn hmac(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(&self.k).expect("HMAC-SHA256 accepts keys of any length");
        for part in parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().into()
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceSource for NonceGenerator {
    fn generate(&mut self) -> U256 {
        self.v = self.hmac(&[&self.v]);
        U256::from_big_endian(&self.v)
    }

    fn reseed(&mut self, extra: &[u8]) {
        self.k = self.hmac(&[&self.v, &[0x00], extra]);
        self.v = self.hmac(&[&self.v]);
        if !extra.is_empty() {
            self.k = self.hmac(&[&self.v, &[0x01], extra]);
            self.v = self.hmac(&[&self.v]);
        }
    }
}
