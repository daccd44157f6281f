//! Fixed-width arithmetic modulo the secp256k1 group order.
//!
//! Every value is a 256-bit integer kept strictly below `n`. Subtraction and
//! negation are defined modulo `n`, so no signed intermediates are needed,
//! including inside the extended Euclidean inverse.

use std::fmt;

use ethers_core::types::{U256, U512};

/// secp256k1 group order
/// n = 0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
pub const CURVE_ORDER: U256 = U256([
    0xBFD2_5E8C_D036_4141,
    0xBAAE_DCE6_AF48_A03B,
    0xFFFF_FFFF_FFFF_FFFE,
    0xFFFF_FFFF_FFFF_FFFF,
]);

/// floor(n / 2); the largest `s` accepted in low-S form.
pub const HALF_ORDER: U256 = U256([
    0xDFE9_2F46_681B_20A0,
    0x5D57_6E73_57A4_501D,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

/// An integer in `[0, n)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scalar(U256);

impl Scalar {
    pub const ZERO: Scalar = Scalar(U256([0, 0, 0, 0]));
    pub const ONE: Scalar = Scalar(U256([1, 0, 0, 0]));

    /// Accepts `x` only if it is already below `n`.
    pub fn new(x: U256) -> Option<Self> {
        if x < CURVE_ORDER {
            Some(Scalar(x))
        } else {
            None
        }
    }

    /// Accepts `x` only if `0 < x < n`.
    pub fn new_nonzero(x: U256) -> Option<Self> {
        Self::new(x).filter(|s| !s.is_zero())
    }

    /// `x mod n`.
    pub fn reduce(x: U256) -> Self {
        if x < CURVE_ORDER {
            Scalar(x)
        } else {
            Scalar(x % CURVE_ORDER)
        }
    }

    /// `x mod n` for a 512-bit input (products, sums of products).
    pub fn reduce_wide(x: U512) -> Self {
        let r = x % U512::from(CURVE_ORDER);
        let mut buf = [0u8; 64];
        r.to_big_endian(&mut buf);
        // r < n < 2^256, so the upper half is zero
        Scalar(U256::from_big_endian(&buf[32..]))
    }

    /// Strict 32-byte big-endian decoding; rejects values `>= n`.
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Option<Self> {
        Self::new(U256::from_big_endian(bytes))
    }

    /// Like [`Scalar::from_be_bytes`] but for slices; any width other than 32 is refused.
    pub fn from_be_slice(bytes: &[u8]) -> Option<Self> {
        let fixed: &[u8; 32] = bytes.try_into().ok()?;
        Self::from_be_bytes(fixed)
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        u256_to_be32(self.0)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `true` if the value lies in the upper half of the field (`> n/2`).
    pub fn is_high(&self) -> bool {
        self.0 > HALF_ORDER
    }

    pub fn add(&self, other: &Scalar) -> Scalar {
        let (sum, carry) = self.0.overflowing_add(other.0);
        if carry || sum >= CURVE_ORDER {
            // with a carry the true sum is sum + 2^256; wrapping subtraction lands on it
            Scalar(sum.overflowing_sub(CURVE_ORDER).0)
        } else {
            Scalar(sum)
        }
    }

    pub fn sub(&self, other: &Scalar) -> Scalar {
        if self.0 >= other.0 {
            Scalar(self.0 - other.0)
        } else {
            Scalar(CURVE_ORDER - (other.0 - self.0))
        }
    }

    pub fn neg(&self) -> Scalar {
        if self.is_zero() {
            *self
        } else {
            Scalar(CURVE_ORDER - self.0)
        }
    }

    pub fn mul(&self, other: &Scalar) -> Scalar {
        Self::reduce_wide(self.0.full_mul(other.0))
    }

    /// Modular inverse via the extended Euclidean algorithm.
    ///
    /// Returns `None` when `gcd(self, n) != 1`, which for prime `n` means `self == 0`.
    pub fn invert(&self) -> Option<Scalar> {
        // invariant: r_i ≡ t_i · self (mod n)
        let (mut r0, mut r1) = (CURVE_ORDER, self.0);
        let (mut t0, mut t1) = (Scalar::ZERO, Scalar::ONE);

        while !r1.is_zero() {
            let q = r0 / r1;
            let r2 = r0 % r1;
            let t2 = t0.sub(&Scalar::reduce(q).mul(&t1));
            r0 = r1;
            r1 = r2;
            t0 = t1;
            t1 = t2;
        }

        if r0 == U256::one() {
            Some(t0)
        } else {
            None
        }
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar(0x{})", hex::encode(self.to_be_bytes()))
    }
}

pub fn u256_to_be32(x: U256) -> [u8; 32] {
    let mut b = [0u8; 32];
    x.to_big_endian(&mut b);
    b
}

/// Left-pads a big-endian byte string to 32 bytes. Inputs wider than 32 bytes are refused.
pub fn left_pad32(bytes: &[u8]) -> Option<[u8; 32]> {
    if bytes.len() > 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(bytes);
    Some(out)
}
