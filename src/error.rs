use thiserror::Error;

/// Errors that can occur during a MuSig signing ceremony.
///
/// Every variant is a local precondition violation reported at the call that
/// caused it. Nothing is retried internally.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MusigError {
    /// Malformed or empty key/point data.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The private key is zero or not below the group order.
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// The OS random source failed while drawing a session id.
    #[error("session id randomness unavailable")]
    RandomnessUnavailable,

    /// The derived secret nonce reduced to zero.
    #[error("secret nonce is zero")]
    ZeroNonce,

    /// The session's secret material has already been consumed or discarded.
    #[error("session secrets already consumed")]
    StaleSession,

    /// Partial signing was attempted before the session revealed its nonce.
    #[error("nonce has not been revealed")]
    NonceNotRevealed,

    /// No public nonces were supplied for aggregation.
    #[error("empty nonce set")]
    EmptyNonceSet,

    /// Not every participant's nonce reveal was supplied.
    #[error("missing {expected} reveals, got {got}")]
    MissingReveals {
        /// Number of participants in the aggregate key.
        expected: usize,
        /// Number of reveals actually supplied.
        got: usize,
    },

    /// The number of partial signatures does not match the participant count.
    #[error("incomplete signature: expected {expected} partials, got {got}")]
    IncompleteSignature {
        /// Number of partials expected (equal to number of participants).
        expected: usize,
        /// Number of partials actually provided.
        got: usize,
    },

    /// A revealed nonce does not hash to the commitment published in round 1.
    #[error("nonce reveal {index} does not match its commitment")]
    MismatchedCommitment {
        /// Position of the offending reveal in the supplied list.
        index: usize,
    },
}
