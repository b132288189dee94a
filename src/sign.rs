//! Partial signatures, signature aggregation and in-process ceremonies:
//! - `partial_sign`: round-3 contribution of one session
//! - `aggregate_signature`: sum partials into the final `(R.x, s)`
//! - `sign_multi`: every round for n local signers, in order
//! - `sign_single`: the n = 1 convenience

use crate::error::MusigError;
use crate::keyagg::AggregateKey;
use crate::keys::{PublicKey, scalar_from_canonical};
use crate::nonce::{AggregateNonce, aggregate_committed_nonces};
use crate::session::SignerSession;
use crypto_rs::secp256k1::Secp256k1Scalar;
use tracing::debug;

/// One participant's partial signature scalar `s_i`.
#[derive(Clone, Debug, PartialEq)]
pub struct PartialSignature(Secp256k1Scalar);

impl PartialSignature {
    pub(crate) fn new(s: Secp256k1Scalar) -> Self {
        PartialSignature(s)
    }

    /// Decode a partial signature, rejecting scalars not below the group order.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, MusigError> {
        scalar_from_canonical(bytes)
            .map(PartialSignature)
            .ok_or(MusigError::InvalidInput("partial signature out of range"))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.to_bytes_be());
        out
    }

    pub fn scalar(&self) -> &Secp256k1Scalar {
        &self.0
    }
}

/// Final 64-byte signature `R.x || s`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FinalSignature([u8; 64]);

impl FinalSignature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        FinalSignature(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        self.0
    }

    /// x-coordinate of the combined nonce.
    pub fn r_x(&self) -> [u8; 32] {
        let mut r = [0u8; 32];
        r.copy_from_slice(&self.0[..32]);
        r
    }

    /// Big-endian encoding of `s`.
    pub fn s(&self) -> [u8; 32] {
        let mut s = [0u8; 32];
        s.copy_from_slice(&self.0[32..]);
        s
    }
}

impl std::fmt::Debug for FinalSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FinalSignature(")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

/// Compute `session`'s partial signature under the shared aggregate nonce.
///
/// Fails with [`MusigError::StaleSession`] if the session has already signed.
pub fn partial_sign(
    session: &mut SignerSession,
    aggregate: &AggregateNonce,
) -> Result<PartialSignature, MusigError> {
    session.partial_sign(aggregate)
}

/// Sum every participant's partial signature into the final signature.
///
/// The sum is order-independent. Exactly one partial per participant that
/// contributed a nonce is required.
pub fn aggregate_signature(
    partials: &[PartialSignature],
    aggregate: &AggregateNonce,
) -> Result<FinalSignature, MusigError> {
    if partials.len() != aggregate.participants() {
        return Err(MusigError::IncompleteSignature {
            expected: aggregate.participants(),
            got: partials.len(),
        });
    }
    let s = partials
        .iter()
        .fold(Secp256k1Scalar::zero(), |acc, p| acc + &p.0);

    let mut sig = [0u8; 64];
    sig[..32].copy_from_slice(&aggregate.r_x());
    sig[32..].copy_from_slice(&s.to_bytes_be());

    debug!(partials = partials.len(), "aggregated signature");
    Ok(FinalSignature(sig))
}

/// Run a complete n-party ceremony in-process.
///
/// The key list is derived from `private_keys` in order. Rounds run strictly
/// in sequence: every commitment is collected before any nonce is revealed,
/// every reveal is checked against its commitment before aggregation, and every
/// partial is collected before the final sum.
pub fn sign_multi(
    private_keys: &[[u8; 32]],
    msg: &[u8],
) -> Result<(AggregateKey, FinalSignature), MusigError> {
    let public_keys = private_keys
        .iter()
        .map(PublicKey::from_secret)
        .collect::<Result<Vec<_>, _>>()?;
    let key = AggregateKey::new(public_keys)?;

    // 1) One session per participant.
    let mut sessions = private_keys
        .iter()
        .enumerate()
        .map(|(i, sk)| SignerSession::random(i, sk, &key, msg))
        .collect::<Result<Vec<_>, _>>()?;

    // 2) Round 1: collect every commitment.
    let commitments: Vec<_> = sessions.iter().map(|s| s.commitment()).collect();

    // 3) Round 2: reveal only after all commitments are in.
    let mut reveals = Vec::with_capacity(sessions.len());
    for (session, commitment) in sessions.iter_mut().zip(&commitments) {
        reveals.push((*commitment, session.reveal_nonce()?));
    }
    let aggregate = aggregate_committed_nonces(&reveals, &key, msg)?;

    // 4) Round 3: partial signatures.
    let partials = sessions
        .iter_mut()
        .map(|s| s.partial_sign(&aggregate))
        .collect::<Result<Vec<_>, _>>()?;

    let signature = aggregate_signature(&partials, &aggregate)?;
    Ok((key, signature))
}

/// Single-party signature: the protocol with exactly one participant.
pub fn sign_single(
    private_key: &[u8; 32],
    msg: &[u8],
) -> Result<(AggregateKey, FinalSignature), MusigError> {
    sign_multi(std::slice::from_ref(private_key), msg)
}
