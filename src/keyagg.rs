//! MuSig public key aggregation.
//!
//! Given an ordered list of x-only participant keys this module derives
//!
//! 1. the key-list hash `ell = SHA256(x_1 || ... || x_n)`,
//! 2. per-participant coefficients `a_i = SHA256(TAG || TAG || ell || be32(i)) mod n`
//!    where `TAG = SHA256("MuSig coefficient")`,
//! 3. the combined key `X = sum(a_i * P_i)` and the parity of its Y coordinate.
//!
//! Order is part of the key's identity: permuting the list changes `ell`, every
//! coefficient and (barring symmetric cases) `X`.

use crate::error::MusigError;
use crate::keys::{Parity, PublicKey};
use crypto_rs::secp256k1::{Secp256k1Point, Secp256k1Scalar};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use tracing::debug;

static COEFFICIENT_TAG: LazyLock<[u8; 32]> =
    LazyLock::new(|| Sha256::digest(b"MuSig coefficient").into());

/// Coefficient for participant `index` under key-list hash `ell`.
///
/// The index is encoded over the full 4-byte big-endian width, so every
/// position up to `u32::MAX` yields a distinct hash input.
pub fn coefficient(ell: &[u8; 32], index: u32) -> Secp256k1Scalar {
    let digest: [u8; 32] = Sha256::new()
        .chain_update(*COEFFICIENT_TAG)
        .chain_update(*COEFFICIENT_TAG)
        .chain_update(ell)
        .chain_update(index.to_be_bytes())
        .finalize()
        .into();
    Secp256k1Scalar::from_bytes_be(&digest)
}

/// Aggregate public key shared by every participant of a ceremony.
///
/// Immutable once derived; sessions and aggregators borrow it.
#[derive(Clone, Debug)]
pub struct AggregateKey {
    participant_keys: Vec<PublicKey>,
    key_list_hash: [u8; 32],
    coefficients: Vec<Secp256k1Scalar>,
    combined_key: Secp256k1Point,
    combined_key_parity: Parity,
}

impl AggregateKey {
    /// Derive the aggregate key from an ordered list of encoded public keys.
    ///
    /// Each entry is a 32-byte x-only or 33-byte compressed key.
    pub fn from_bytes<B: AsRef<[u8]>>(keys: &[B]) -> Result<Self, MusigError> {
        let parsed = keys
            .iter()
            .map(|k| PublicKey::from_bytes(k.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    /// Derive the aggregate key from an ordered list of parsed public keys.
    pub fn new(participant_keys: Vec<PublicKey>) -> Result<Self, MusigError> {
        if participant_keys.is_empty() {
            return Err(MusigError::InvalidInput("empty key list"));
        }
        if u32::try_from(participant_keys.len() - 1).is_err() {
            return Err(MusigError::InvalidInput("too many participants"));
        }

        let key_list_hash = key_list_hash(&participant_keys);

        let mut coefficients = Vec::with_capacity(participant_keys.len());
        let mut combined_key = Secp256k1Point::identity();
        for (i, key) in participant_keys.iter().enumerate() {
            // Bounded by the length check above.
            let a = coefficient(&key_list_hash, i as u32);
            combined_key = combined_key + &(key.point() * &a);
            coefficients.push(a);
        }
        if combined_key == Secp256k1Point::identity() {
            return Err(MusigError::InvalidInput("combined key is the identity"));
        }
        let combined_key_parity = Parity::of(&combined_key);

        debug!(
            participants = participant_keys.len(),
            parity = ?combined_key_parity,
            "derived aggregate key"
        );

        Ok(AggregateKey {
            participant_keys,
            key_list_hash,
            coefficients,
            combined_key,
            combined_key_parity,
        })
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.participant_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participant_keys.is_empty()
    }

    pub fn participant_keys(&self) -> &[PublicKey] {
        &self.participant_keys
    }

    /// `ell`, the hash of the ordered key list.
    pub fn key_list_hash(&self) -> &[u8; 32] {
        &self.key_list_hash
    }

    /// Coefficient of participant `index`, if in range.
    pub fn coefficient(&self, index: usize) -> Option<&Secp256k1Scalar> {
        self.coefficients.get(index)
    }

    /// The combined point `X` as summed, before any parity normalisation.
    pub fn combined_key(&self) -> &Secp256k1Point {
        &self.combined_key
    }

    pub fn combined_key_parity(&self) -> Parity {
        self.combined_key_parity
    }

    /// 32-byte x-only encoding of `X`, the key a verifier checks against.
    pub fn x_only(&self) -> [u8; 32] {
        let mut x = [0u8; 32];
        x.copy_from_slice(&self.combined_key.x_only_bytes());
        x
    }

    /// Position of `key` in the participant list.
    pub fn position(&self, key: &PublicKey) -> Option<usize> {
        self.participant_keys.iter().position(|k| k == key)
    }

    pub fn contains(&self, key: &PublicKey) -> bool {
        self.position(key).is_some()
    }
}

fn key_list_hash(keys: &[PublicKey]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for key in keys {
        hasher.update(key.to_bytes());
    }
    hasher.finalize().into()
}
