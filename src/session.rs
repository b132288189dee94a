// Per-participant signing session.
//
// A session walks CREATED -> COMMITTED -> REVEALED -> SIGNED. Construction
// derives every secret eagerly and leaves the session COMMITTED with only the
// nonce commitment visible. The nonce is revealed on request, and partial
// signing consumes the secrets exactly once.
use crate::error::MusigError;
use crate::keyagg::AggregateKey;
use crate::keys::{Parity, PublicKey, secret_scalar};
use crate::nonce::{AggregateNonce, NonceCommitment, PublicNonce};
use crate::sign::PartialSignature;
use crypto_rs::secp256k1::{Secp256k1Point, Secp256k1Scalar};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

/// Protocol stage of a [`SignerSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Secrets derived; only the commitment has been exposed.
    Committed,
    /// The public nonce has been released.
    Revealed,
    /// Secrets consumed, either by signing or by a failed signing attempt.
    Signed,
}

/// Secret material owned by one session, wiped on drop.
struct SessionSecrets {
    /// `a_i * x_i`, negated when the signer's own key parity differs from `X`'s.
    adjusted_key: Zeroizing<[u8; 32]>,
    /// `k_i = SHA256(session_id || m || X.x || x_i) mod n`.
    nonce: Zeroizing<[u8; 32]>,
}

/// One participant's state for one signing attempt.
///
/// The private key and secret nonce never leave the session.
pub struct SignerSession {
    session_id: [u8; 32],
    index: usize,
    message: Vec<u8>,
    public_nonce: PublicNonce,
    commitment: NonceCommitment,
    state: SessionState,
    secrets: Option<SessionSecrets>,
}

impl SignerSession {
    /// Start a session with a fresh session id drawn from the OS RNG.
    pub fn random(
        index: usize,
        private_key: &[u8; 32],
        key: &AggregateKey,
        message: &[u8],
    ) -> Result<Self, MusigError> {
        Self::random_from(&mut OsRng, index, private_key, key, message)
    }

    /// Start a session with a session id drawn from `rng`.
    ///
    /// A failing source is reported as [`MusigError::RandomnessUnavailable`].
    pub fn random_from<R: TryRngCore + ?Sized>(
        rng: &mut R,
        index: usize,
        private_key: &[u8; 32],
        key: &AggregateKey,
        message: &[u8],
    ) -> Result<Self, MusigError> {
        let mut session_id = [0u8; 32];
        rng.try_fill_bytes(&mut session_id).map_err(|err| {
            warn!(index, error = ?err, "session id randomness unavailable");
            MusigError::RandomnessUnavailable
        })?;
        Self::with_session_id(session_id, index, private_key, key, message)
    }

    /// Start a session with a caller-supplied session id.
    ///
    /// The id must never be reused for another signing attempt: two partial
    /// signatures sharing a nonce over different challenges reveal the key.
    pub fn with_session_id(
        session_id: [u8; 32],
        index: usize,
        private_key: &[u8; 32],
        key: &AggregateKey,
        message: &[u8],
    ) -> Result<Self, MusigError> {
        let coefficient = key
            .coefficient(index)
            .ok_or(MusigError::InvalidInput("participant index out of range"))?;

        // Scalar temporaries cannot be wiped; each lives only inside its block.
        let mut adjusted_key = Zeroizing::new([0u8; 32]);
        {
            let sk = secret_scalar(private_key)?;
            let own_point = Secp256k1Point::generator() * &sk;
            if PublicKey::from_point(&own_point).to_bytes()
                != key.participant_keys()[index].to_bytes()
            {
                return Err(MusigError::InvalidInput(
                    "private key does not match participant key",
                ));
            }
            let mut adjusted = coefficient * &sk;
            if Parity::of(&own_point) != key.combined_key_parity() {
                adjusted = -adjusted;
            }
            let encoded = Zeroizing::new(adjusted.to_bytes_be());
            adjusted_key.copy_from_slice(&encoded[..]);
        }

        let mut nonce = Zeroizing::new([0u8; 32]);
        let public_nonce = {
            let digest: Zeroizing<[u8; 32]> = Zeroizing::new(
                Sha256::new()
                    .chain_update(session_id)
                    .chain_update(message)
                    .chain_update(key.x_only())
                    .chain_update(private_key)
                    .finalize()
                    .into(),
            );
            let k = Secp256k1Scalar::from_bytes_be(&digest[..]);
            if k.is_zero() {
                return Err(MusigError::ZeroNonce);
            }
            let encoded = Zeroizing::new(k.to_bytes_be());
            nonce.copy_from_slice(&encoded[..]);
            PublicNonce::from_point(&(Secp256k1Point::generator() * &k))
        };
        let commitment = public_nonce.commitment();

        debug!(index, "created signer session");

        Ok(SignerSession {
            session_id,
            index,
            message: message.to_vec(),
            public_nonce,
            commitment,
            state: SessionState::Committed,
            secrets: Some(SessionSecrets {
                adjusted_key,
                nonce,
            }),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn session_id(&self) -> &[u8; 32] {
        &self.session_id
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Round-1 commitment, safe to publish immediately.
    pub fn commitment(&self) -> NonceCommitment {
        self.commitment
    }

    /// Release the public nonce for round 2.
    ///
    /// The caller must not invoke this before every peer's commitment has been
    /// recorded. Revealing again returns the same nonce.
    pub fn reveal_nonce(&mut self) -> Result<PublicNonce, MusigError> {
        match self.state {
            SessionState::Signed => Err(MusigError::StaleSession),
            SessionState::Committed | SessionState::Revealed => {
                self.state = SessionState::Revealed;
                trace!(index = self.index, "revealed nonce");
                Ok(self.public_nonce)
            }
        }
    }

    /// Compute this participant's partial signature `s_i = d_i * e + k_i`.
    ///
    /// `k_i` is negated when the session's nonce parity differs from the
    /// combined nonce parity. The session's secrets are destroyed by this call
    /// whether or not it succeeds, so a second call fails with
    /// [`MusigError::StaleSession`].
    pub fn partial_sign(
        &mut self,
        aggregate: &AggregateNonce,
    ) -> Result<PartialSignature, MusigError> {
        let secrets = self.secrets.take().ok_or(MusigError::StaleSession)?;
        let revealed = self.state == SessionState::Revealed;
        self.state = SessionState::Signed;
        if !revealed {
            return Err(MusigError::NonceNotRevealed);
        }

        let s = {
            let d = Secp256k1Scalar::from_bytes_be(&*secrets.adjusted_key);
            let mut k = Secp256k1Scalar::from_bytes_be(&*secrets.nonce);
            if self.public_nonce.parity() != aggregate.combined_nonce_parity() {
                k = -k;
            }
            d * aggregate.challenge() + &k
        };
        drop(secrets);

        debug!(index = self.index, "produced partial signature");
        Ok(PartialSignature::new(s))
    }

    /// Drop the secret material without signing.
    pub fn abandon(&mut self) {
        if self.secrets.take().is_some() {
            debug!(index = self.index, "abandoned signer session");
        }
        self.state = SessionState::Signed;
    }

    #[cfg(test)]
    pub(crate) fn adjusted_key(&self) -> Option<Secp256k1Scalar> {
        self.secrets
            .as_ref()
            .map(|s| Secp256k1Scalar::from_bytes_be(&*s.adjusted_key))
    }

    #[cfg(test)]
    pub(crate) fn secret_nonce(&self) -> Option<Secp256k1Scalar> {
        self.secrets
            .as_ref()
            .map(|s| Secp256k1Scalar::from_bytes_be(&*s.nonce))
    }

    /// x-coordinate of this session's public nonce, without revealing it.
    #[cfg(test)]
    pub(crate) fn nonce_x(&self) -> [u8; 32] {
        *self.public_nonce.x()
    }
}

impl fmt::Debug for SignerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerSession")
            .field("index", &self.index)
            .field("state", &self.state)
            .field("commitment", &self.commitment)
            .finish_non_exhaustive()
    }
}
