pub mod error;
pub mod keys;
pub mod signing;
pub mod hashing;

pub use error::CryptoError;
pub use keys::{KeyPair, PublicKey};
pub use signing::{sign, verify, Ed25519Verifier, Signature};
pub use hashing::{hash, hash_voucher, voucher_digest_hex};
