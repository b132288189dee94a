//! BIP-340 verification of final signatures.
//!
//! The protocol itself never calls this; it exists so callers and tests can
//! check a `(R.x || s)` signature against the aggregate key's x-coordinate
//! exactly as a standard single-key verifier would.

use crate::keyagg::AggregateKey;
use crate::sign::FinalSignature;
use crypto_rs::schnorr::schnorr_verify;

/// Verify `sig` over `msg` against the aggregate key.
pub fn verify(sig: &FinalSignature, key: &AggregateKey, msg: &[u8]) -> bool {
    verify_x_only(&key.x_only(), msg, sig)
}

/// Verify `sig` over `msg` against a 32-byte x-only public key.
pub fn verify_x_only(x_only: &[u8; 32], msg: &[u8], sig: &FinalSignature) -> bool {
    schnorr_verify(x_only, msg, &sig.to_bytes())
}
