pub mod keypair;
pub mod modular;
pub mod nonce;
pub mod signer;

pub use keypair::KeyPair;
pub use modular::{Scalar, CURVE_ORDER, HALF_ORDER};
pub use signer::{sign, verify, Signature};
