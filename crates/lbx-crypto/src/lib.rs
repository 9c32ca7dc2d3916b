//! # lbx-crypto: Signing for the Lockbox Provenance Stack
//!
//! Multi-algorithm signing and verification of entry payloads with an
//! N-of-M multi-signature policy.
//!
//! ## Algorithms
//!
//! [`SignatureAlgorithm`] is a closed union over exactly three identifiers:
//!
//! | Identifier | Aliases | Wire signature |
//! |---|---|---|
//! | `EdDSA` | `Ed25519` | 64 raw bytes |
//! | `ES256K` | `secp256k1` | 64 bytes `r‖s` (not DER) |
//! | `RS256` | `RSA`, `RSASSA-PKCS1-v1_5` | PKCS#1 v1.5 over SHA-256 |
//!
//! Anything else fails at [`SignatureAlgorithm::normalize`]. Every signature
//! value on the wire is unpadded base64url.
//!
//! ## Key lifecycle
//!
//! Keys live in a [`KeyStore`] passed to the [`SigningService`] explicitly.
//! Signing upserts a public-only clone of the signing key into the store so
//! verification can always resolve the key by `kid`. Revocation is
//! monotonic and blocks both signing and verification.
//!
//! ## Crate Policy
//!
//! - Private key material is never logged; `SigningKey`'s `Debug` redacts it
//!   and it is zeroized on drop.
//! - No `unsafe` code.

pub mod algorithm;
pub mod ed25519;
pub mod error;
pub mod es256k;
pub mod key;
pub mod keystore;
pub mod rs256;
pub mod signing;

pub use algorithm::SignatureAlgorithm;
pub use error::{KeyStoreError, SigningError};
pub use key::{decode_key_material, SigningKey};
pub use keystore::{InMemoryKeyStore, KeyStore};
pub use signing::{MultiSigPolicy, SigningService};
