//! Nonce commitments, reveals and aggregation.
//!
//! Round 1 publishes `t_i = SHA256(R_i.x)`. Round 2 publishes `R_i.x` together
//! with its parity. Aggregation lifts every revealed x-coordinate to even Y,
//! sums them and derives the challenge; the declared parity of each reveal is
//! informational only, the parity recomputed from the sum is authoritative.

use crate::challenge::compute_challenge;
use crate::error::MusigError;
use crate::keyagg::AggregateKey;
use crate::keys::{Parity, lift_x};
use crypto_rs::secp256k1::{Secp256k1Point, Secp256k1Scalar};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Round-1 commitment to a public nonce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NonceCommitment(pub [u8; 32]);

impl NonceCommitment {
    /// Commitment to a nonce with the given x-coordinate.
    pub fn for_nonce(x: &[u8; 32]) -> Self {
        NonceCommitment(Sha256::digest(x).into())
    }

    /// Whether `nonce` opens this commitment.
    pub fn verify(&self, nonce: &PublicNonce) -> bool {
        Self::for_nonce(&nonce.x) == *self
    }
}

/// Round-2 reveal: the x-coordinate of `R_i = k_i * G` and its parity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicNonce {
    x: [u8; 32],
    parity: Parity,
}

impl PublicNonce {
    pub(crate) fn from_point(point: &Secp256k1Point) -> Self {
        let mut x = [0u8; 32];
        x.copy_from_slice(&point.x_only_bytes());
        PublicNonce {
            x,
            parity: Parity::of(point),
        }
    }

    /// Parse a revealed nonce. The x-coordinate must lie on the curve.
    pub fn from_bytes(x: &[u8; 32], parity: Parity) -> Result<Self, MusigError> {
        lift_x(x).ok_or(MusigError::InvalidInput("nonce is not on the curve"))?;
        Ok(PublicNonce { x: *x, parity })
    }

    pub fn x(&self) -> &[u8; 32] {
        &self.x
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// Round-1 commitment matching this reveal.
    pub fn commitment(&self) -> NonceCommitment {
        NonceCommitment::for_nonce(&self.x)
    }

    fn lifted(&self) -> Result<Secp256k1Point, MusigError> {
        lift_x(&self.x).ok_or(MusigError::InvalidInput("nonce is not on the curve"))
    }
}

/// Combined nonce and challenge shared by all signers of one ceremony.
///
/// Holds no secret material.
#[derive(Clone, Debug)]
pub struct AggregateNonce {
    combined_nonce: Secp256k1Point,
    combined_nonce_parity: Parity,
    challenge: Secp256k1Scalar,
    participants: usize,
}

impl AggregateNonce {
    /// The summed nonce point `R` before parity normalisation.
    pub fn combined_nonce(&self) -> &Secp256k1Point {
        &self.combined_nonce
    }

    pub fn combined_nonce_parity(&self) -> Parity {
        self.combined_nonce_parity
    }

    /// The challenge scalar `e`.
    pub fn challenge(&self) -> &Secp256k1Scalar {
        &self.challenge
    }

    /// 32-byte x-coordinate of `R`, the first half of the final signature.
    pub fn r_x(&self) -> [u8; 32] {
        let mut r = [0u8; 32];
        r.copy_from_slice(&self.combined_nonce.x_only_bytes());
        r
    }

    /// Number of nonces that went into `R`.
    pub fn participants(&self) -> usize {
        self.participants
    }
}

/// Combine every participant's revealed nonce and derive the challenge.
///
/// The sum is order-independent, but the set must contain exactly one reveal
/// per participant of `key`; a short set is rejected rather than silently
/// excluding a signer.
pub fn aggregate_nonces(
    nonces: &[PublicNonce],
    key: &AggregateKey,
    msg: &[u8],
) -> Result<AggregateNonce, MusigError> {
    if nonces.is_empty() {
        return Err(MusigError::EmptyNonceSet);
    }
    if nonces.len() != key.len() {
        return Err(MusigError::MissingReveals {
            expected: key.len(),
            got: nonces.len(),
        });
    }

    let mut combined_nonce = Secp256k1Point::identity();
    for nonce in nonces {
        combined_nonce = combined_nonce + &nonce.lifted()?;
    }
    if combined_nonce == Secp256k1Point::identity() {
        return Err(MusigError::InvalidInput("combined nonce is the identity"));
    }
    let combined_nonce_parity = Parity::of(&combined_nonce);
    let mut r_x = [0u8; 32];
    r_x.copy_from_slice(&combined_nonce.x_only_bytes());
    let challenge = compute_challenge(&r_x, &key.x_only(), msg);

    debug!(
        nonces = nonces.len(),
        parity = ?combined_nonce_parity,
        "aggregated nonces"
    );

    Ok(AggregateNonce {
        combined_nonce,
        combined_nonce_parity,
        challenge,
        participants: nonces.len(),
    })
}

/// Like [`aggregate_nonces`], but first checks each reveal against the
/// commitment its sender published in round 1.
pub fn aggregate_committed_nonces(
    reveals: &[(NonceCommitment, PublicNonce)],
    key: &AggregateKey,
    msg: &[u8],
) -> Result<AggregateNonce, MusigError> {
    for (index, (commitment, nonce)) in reveals.iter().enumerate() {
        if !commitment.verify(nonce) {
            warn!(index, "nonce reveal does not match commitment");
            return Err(MusigError::MismatchedCommitment { index });
        }
    }
    let nonces: Vec<PublicNonce> = reveals.iter().map(|(_, n)| *n).collect();
    aggregate_nonces(&nonces, key, msg)
}
