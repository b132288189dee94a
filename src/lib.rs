//! MuSig: commit-then-reveal multi-party Schnorr signatures over secp256k1.
//!
//! N signers jointly produce one 64-byte BIP-340 signature that verifies
//! against a single aggregate key. Curve arithmetic comes from crypto-rs
//! (<https://github.com/BEULAHEVANJALIN/crypto-rs>); transport between
//! signers is left to the caller, who drives the rounds in order:
//!
//! 1. [`AggregateKey::new`] over the ordered participant keys.
//! 2. [`SignerSession::random`] per signer; broadcast [`SignerSession::commitment`].
//! 3. Once every commitment is in, [`SignerSession::reveal_nonce`] and broadcast.
//! 4. [`aggregate_committed_nonces`] (or [`aggregate_nonces`]).
//! 5. [`partial_sign`] per signer, then [`aggregate_signature`].
mod challenge;
pub use challenge::compute_challenge;
pub mod error;
pub use error::MusigError;
pub mod keyagg;
pub use keyagg::{AggregateKey, coefficient};
pub mod keys;
pub use keys::{Parity, PublicKey};
pub mod nonce;
pub use nonce::{
    AggregateNonce, NonceCommitment, PublicNonce, aggregate_committed_nonces, aggregate_nonces,
};
pub mod session;
pub use session::{SessionState, SignerSession};
pub mod sign;
pub use sign::{
    FinalSignature, PartialSignature, aggregate_signature, partial_sign, sign_multi, sign_single,
};
pub mod verify;
pub use verify::{verify, verify_x_only};
