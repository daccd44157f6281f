//! Deterministic ECDSA over secp256k1 with low-S normalization.

use ethers_core::types::{U256, U512};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{ProjectivePoint, PublicKey, SecretKey};
use tracing::trace;

use super::modular::{left_pad32, Scalar};
use super::nonce::{NonceGenerator, NonceSource};
use crate::errors::{invariant_violation, SignError};

/// Upper bound on nonce candidates drawn for one signature. Each candidate
/// fails with probability ~2^-128, so hitting this means the modulus is broken.
pub const MAX_NONCE_ATTEMPTS: usize = 1024;

/// An ECDSA signature with `0 < r < n` and `0 < s <= n/2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    r: Scalar,
    s: Scalar,
}

impl Signature {
    /// Builds a signature from raw components, rejecting zero values. `s` is normalized.
    pub fn from_scalars(r: Scalar, s: Scalar) -> Option<Self> {
        if r.is_zero() || s.is_zero() {
            return None;
        }
        Some(Self { r, s }.normalize_s())
    }

    /// Parses `r || s` (exactly 64 bytes); a trailing format byte must be stripped first.
    ///
    /// Strict: a high `s` is rejected rather than normalized, so the malleated
    /// twin `(r, n - s)` of a valid signature never parses.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 64 {
            return None;
        }
        let r = Scalar::from_be_slice(&bytes[..32])?;
        let s = Scalar::from_be_slice(&bytes[32..])?;
        if s.is_high() {
            return None;
        }
        Self::from_scalars(r, s)
    }

    pub fn r(&self) -> Scalar {
        self.r
    }

    pub fn s(&self) -> Scalar {
        self.s
    }

    fn normalize_s(self) -> Self {
        if self.s.is_high() {
            Self {
                r: self.r,
                s: self.s.neg(),
            }
        } else {
            self
        }
    }

    /// 32-byte big-endian `r` followed by 32-byte big-endian `s`.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r.to_be_bytes());
        out[32..].copy_from_slice(&self.s.to_be_bytes());
        out
    }

    /// Hex of `r || s`, with the server's format byte appended when given.
    pub fn to_hex(&self, format_byte: Option<u8>) -> String {
        let mut out = hex::encode(self.to_bytes());
        if let Some(b) = format_byte {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }
}

/// Sign `digest` (left-padded to 32 bytes, used as-is for `z`) with `private_key`.
pub fn sign(digest: &[u8], private_key: &Scalar) -> Result<Signature, SignError> {
    let padded = left_pad32(digest).ok_or(SignError::DigestTooLong(digest.len()))?;
    if private_key.is_zero() {
        return Err(SignError::InvalidPrivateKey);
    }
    let mut nonces = NonceGenerator::for_signing(private_key, &padded);
    Ok(sign_with(&padded, private_key, &mut nonces))
}

pub(crate) fn sign_with<N: NonceSource>(
    digest: &[u8; 32],
    private_key: &Scalar,
    nonces: &mut N,
) -> Signature {
    let z = U256::from_big_endian(digest);

    for attempt in 0..MAX_NONCE_ATTEMPTS {
        if let Some(sig) = try_sign(nonces.generate(), z, private_key) {
            return sig.normalize_s();
        }
        trace!(attempt, "nonce candidate rejected, reseeding");
        nonces.reseed(&[]);
    }

    invariant_violation("no admissible nonce within the attempt cap")
}

fn try_sign(candidate: U256, z: U256, d: &Scalar) -> Option<Signature> {
    let k = Scalar::new_nonzero(candidate)?;
    let r = Scalar::reduce(base_mul_x(&k)?);
    if r.is_zero() {
        return None;
    }

    let Some(k_inv) = k.invert() else {
        invariant_violation("nonce has no inverse modulo the curve order")
    };
    // z may exceed n; the sum is reduced together with r·d
    let e = Scalar::reduce_wide(U512::from(z) + r.as_u256().full_mul(d.as_u256()));
    let s = k_inv.mul(&e);
    if s.is_zero() {
        return None;
    }
    Some(Signature { r, s })
}

/// x coordinate of `k·G`.
fn base_mul_x(k: &Scalar) -> Option<U256> {
    let point = SecretKey::from_slice(&k.to_be_bytes()).ok()?.public_key();
    let encoded = point.to_encoded_point(false);
    encoded.x().map(|x| U256::from_big_endian(x))
}

/// Checks the ECDSA relation: x((z·s⁻¹)·G + (r·s⁻¹)·Q) ≡ r (mod n).
pub fn verify(digest: &[u8], public_key: &PublicKey, signature: &Signature) -> bool {
    let Some(padded) = left_pad32(digest) else {
        return false;
    };
    let z = Scalar::reduce(U256::from_big_endian(&padded));
    let Some(s_inv) = signature.s.invert() else {
        return false;
    };
    let (Some(u1), Some(u2)) = (
        to_k256(&z.mul(&s_inv)),
        to_k256(&signature.r.mul(&s_inv)),
    ) else {
        return false;
    };

    let point = (ProjectivePoint::GENERATOR * u1 + public_key.to_projective() * u2).to_affine();
    let encoded = point.to_encoded_point(false);
    match encoded.x() {
        Some(x) => Scalar::reduce(U256::from_big_endian(x)) == signature.r,
        None => false, // point at infinity
    }
}

fn to_k256(s: &Scalar) -> Option<k256::Scalar> {
    Option::from(k256::Scalar::from_repr(s.to_be_bytes().into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::modular::CURVE_ORDER;
    use sha2::{Digest, Sha256};

    struct Scripted {
        candidates: Vec<U256>,
        reseeds: usize,
    }

    impl NonceSource for Scripted {
        fn generate(&mut self) -> U256 {
            self.candidates.remove(0)
        }

        fn reseed(&mut self, extra: &[u8]) {
            assert!(extra.is_empty());
            self.reseeds += 1;
        }
    }

    fn key(x: u64) -> Scalar {
        Scalar::new(U256::from(x)).unwrap()
    }

    #[test]
    fn out_of_range_candidates_trigger_reseed() {
        let mut nonces = Scripted {
            candidates: vec![U256::zero(), CURVE_ORDER, U256::max_value(), U256::from(5u64)],
            reseeds: 0,
        };
        let digest = [0x11u8; 32];
        let d = key(0xABCDEF);
        let sig = sign_with(&digest, &d, &mut nonces);
        assert_eq!(nonces.reseeds, 3);
        assert!(nonces.candidates.is_empty());

        let pk = SecretKey::from_slice(&d.to_be_bytes()).unwrap().public_key();
        assert!(verify(&digest, &pk, &sig));
    }

    #[test]
    #[should_panic(expected = "arithmetic invariant violated")]
    fn exhausted_attempts_are_fatal() {
        let mut nonces = Scripted {
            candidates: vec![U256::zero(); MAX_NONCE_ATTEMPTS],
            reseeds: 0,
        };
        sign_with(&[0x22u8; 32], &key(3), &mut nonces);
    }

    #[test]
    fn signing_is_deterministic() {
        let digest = Sha256::digest(b"deterministic");
        let a = sign(&digest, &key(42)).unwrap();
        let b = sign(&digest, &key(42)).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_ne!(a, sign(&digest, &key(43)).unwrap());
    }

    #[test]
    fn short_digest_is_left_padded() {
        let mut padded = [0u8; 32];
        padded[30] = 0xBE;
        padded[31] = 0xEF;
        assert_eq!(
            sign(&[0xBE, 0xEF], &key(9)).unwrap(),
            sign(&padded, &key(9)).unwrap()
        );
    }

    #[test]
    fn rejects_bad_inputs() {
        assert_eq!(
            sign(&[0u8; 33], &key(1)).unwrap_err(),
            SignError::DigestTooLong(33)
        );
        assert_eq!(
            sign(&[0u8; 32], &Scalar::ZERO).unwrap_err(),
            SignError::InvalidPrivateKey
        );
    }

    #[test]
    fn hex_appends_format_byte() {
        let sig = sign(&[0x33u8; 32], &key(77)).unwrap();
        let plain = sig.to_hex(None);
        assert_eq!(plain.len(), 128);
        assert_eq!(sig.to_hex(Some(0x01)), format!("{plain}01"));
        assert_eq!(Signature::from_bytes(&sig.to_bytes()), Some(sig));
    }

    #[test]
    fn from_scalars_normalizes_high_s() {
        let high = key(5).neg();
        let sig = Signature::from_scalars(key(1), high).unwrap();
        assert_eq!(sig.s(), key(5));
        assert!(Signature::from_scalars(Scalar::ZERO, key(1)).is_none());
    }

    #[test]
    fn parsing_rejects_high_s_twin() {
        let sig = sign(&[0x44u8; 32], &key(1234)).unwrap();
        let mut twin = [0u8; 64];
        twin[..32].copy_from_slice(&sig.r().to_be_bytes());
        twin[32..].copy_from_slice(&sig.s().neg().to_be_bytes());

        assert!(Signature::from_bytes(&twin).is_none());
        assert_eq!(Signature::from_bytes(&sig.to_bytes()), Some(sig));
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let d = key(0x1234_5678);
        let pk = SecretKey::from_slice(&d.to_be_bytes()).unwrap().public_key();
        let digest = Sha256::digest(b"tamper");
        let sig = sign(&digest, &d).unwrap();
        assert!(verify(&digest, &pk, &sig));

        let other = Sha256::digest(b"tamper!");
        assert!(!verify(&other, &pk, &sig));

        let bumped = Signature::from_scalars(sig.r(), sig.s().add(&Scalar::ONE)).unwrap();
        assert!(!verify(&digest, &pk, &bumped));
    }
}
