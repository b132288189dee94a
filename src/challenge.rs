//! Fiat-Shamir challenge.
//!
//! ```text
//! e = H_tag("BIP0340/challenge", R.x || X.x || m) mod n
//! ```
//!
//! Using the BIP-340 tag keeps the final signature checkable by any standard
//! single-key Schnorr verifier against `X.x`.

use crypto_rs::schnorr::tagged_hash;
use crypto_rs::secp256k1::Secp256k1Scalar;

const CHALLENGE_TAG: &str = "BIP0340/challenge";

/// Compute the challenge from x-only encodings of the combined nonce `r_x`
/// and combined key `x_only`, plus the message.
///
/// Only x-coordinates enter the hash, so negating either point leaves the
/// challenge unchanged.
pub fn compute_challenge(r_x: &[u8; 32], x_only: &[u8; 32], msg: &[u8]) -> Secp256k1Scalar {
    let mut buf = Vec::with_capacity(64 + msg.len());
    buf.extend_from_slice(r_x);
    buf.extend_from_slice(x_only);
    buf.extend_from_slice(msg);
    Secp256k1Scalar::from_bytes_be(&tagged_hash(CHALLENGE_TAG, &buf))
}
