//! End-to-end MuSig ceremonies driven through the public API, covering:
//!  - 2-of-2 and 1-of-1 signing with known keys
//!  - nonce reuse, tampering and incomplete-round detection
//!  - independent ceremonies running in parallel over one aggregate key
#![allow(non_snake_case)]

use crypto_rs::schnorr::schnorr_verify;
use crypto_rs::secp256k1::{Secp256k1Point, Secp256k1Scalar};
use musig_commit::{
    AggregateKey, FinalSignature, MusigError, Parity, PublicKey, PublicNonce, SignerSession,
    aggregate_committed_nonces, aggregate_nonces, aggregate_signature, compute_challenge,
    partial_sign, verify, verify_x_only,
};
use sha2::{Digest, Sha256};

const SK1: &str = "b7e151628aed2a6abf7158809cf4f3c762e7160f38b4da56a784d9045190cfef";
const SK2: &str = "c90fdaa22168c234c4c6628b80dc1cd129024e088a67cc74020bbea63b14e5c9";
const SK3: &str = "0b432b2677937381aef05bb02a66ecd012773062cf3fa2549e44f58ed2401710";

fn secret(hex_str: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    hex::decode_to_slice(hex_str, &mut out).unwrap();
    out
}

fn aggregate_key(sks: &[[u8; 32]]) -> AggregateKey {
    let keys: Vec<[u8; 32]> = sks
        .iter()
        .map(|sk| PublicKey::from_secret(sk).unwrap().to_bytes())
        .collect();
    AggregateKey::from_bytes(&keys).unwrap()
}

fn sessions(sks: &[[u8; 32]], key: &AggregateKey, msg: &[u8], seed: u8) -> Vec<SignerSession> {
    sks.iter()
        .enumerate()
        .map(|(i, sk)| {
            let mut id = [seed; 32];
            id[0] = i as u8;
            SignerSession::with_session_id(id, i, sk, key, msg).unwrap()
        })
        .collect()
}

/// Runs commit, reveal, aggregate, sign and combine over prepared sessions.
fn ceremony(
    sessions: &mut [SignerSession],
    key: &AggregateKey,
    msg: &[u8],
) -> Result<FinalSignature, MusigError> {
    let commitments: Vec<_> = sessions.iter().map(|s| s.commitment()).collect();
    let mut reveals = Vec::new();
    for (s, c) in sessions.iter_mut().zip(commitments) {
        reveals.push((c, s.reveal_nonce()?));
    }
    let agg = aggregate_committed_nonces(&reveals, key, msg)?;
    let partials = sessions
        .iter_mut()
        .map(|s| partial_sign(s, &agg))
        .collect::<Result<Vec<_>, _>>()?;
    aggregate_signature(&partials, &agg)
}

#[test]
fn two_of_two_verifies() {
    let sks = [secret(SK1), secret(SK2)];
    let msg = b"MuSig 2-of-2 test message";
    let key = aggregate_key(&sks);

    let mut signers = sessions(&sks, &key, msg, 0xA0);
    let sig = ceremony(&mut signers, &key, msg).unwrap();

    assert!(verify(&sig, &key, msg));
    assert!(verify_x_only(&key.x_only(), msg, &sig));
    assert!(!verify(&sig, &key, b"a different message"));
}

#[test]
fn two_of_two_accepted_by_plain_schnorr_verifier() {
    let sks = [secret(SK1), secret(SK2)];
    let msg = b"MuSig 2-of-2 test message";
    let key = aggregate_key(&sks);
    let sig = ceremony(&mut sessions(&sks, &key, msg, 0xA1), &key, msg).unwrap();

    assert!(schnorr_verify(&key.x_only(), msg, &sig.to_bytes()));
    assert!(!schnorr_verify(&key.x_only(), b"a different message", &sig.to_bytes()));
}

#[test]
fn mixed_parity_keys_accepted_by_plain_schnorr_verifier() {
    // Secret keys 6, 9 and 10 have odd-Y public points, 1 and 2 even.
    let sks: Vec<[u8; 32]> = [6u8, 9, 10, 1, 2]
        .iter()
        .map(|v| {
            let mut b = [0u8; 32];
            b[31] = *v;
            b
        })
        .collect();
    let mixed = [sks[0], sks[3], sks[1], sks[4], sks[2]];

    for set in [&sks[..3], &mixed[..]] {
        let msg = b"mixed parity";
        let key = aggregate_key(set);
        let sig = ceremony(&mut sessions(set, &key, msg, 0xB0), &key, msg).unwrap();
        assert!(
            schnorr_verify(&key.x_only(), msg, &sig.to_bytes()),
            "{} signers, combined parity {:?}",
            set.len(),
            key.combined_key_parity()
        );
    }
}

#[test]
fn fixed_session_ids_are_reproducible() {
    let sks = [secret(SK1), secret(SK2), secret(SK3)];
    let msg = b"reproducible";
    let key = aggregate_key(&sks);
    let a = ceremony(&mut sessions(&sks, &key, msg, 1), &key, msg).unwrap();
    let b = ceremony(&mut sessions(&sks, &key, msg, 1), &key, msg).unwrap();
    let c = ceremony(&mut sessions(&sks, &key, msg, 2), &key, msg).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(verify(&a, &key, msg));
    assert!(verify(&c, &key, msg));
}

#[test]
fn single_signer_matches_plain_schnorr() {
    let sk_bytes = secret(SK3);
    let msg = b"single signer";
    let session_id = [0x5A; 32];
    let key = aggregate_key(&[sk_bytes]);

    let mut session = SignerSession::with_session_id(session_id, 0, &sk_bytes, &key, msg).unwrap();
    let nonce = session.reveal_nonce().unwrap();
    let agg = aggregate_nonces(&[nonce], &key, msg).unwrap();
    let partial = partial_sign(&mut session, &agg).unwrap();
    let sig = aggregate_signature(&[partial], &agg).unwrap();

    // A lone signer whose effective key is a_0 * x, with BIP-340 sign conventions.
    let g = Secp256k1Point::generator();
    let x = Secp256k1Scalar::from_bytes_be(&sk_bytes);
    let mut d = key.coefficient(0).unwrap() * &x;
    if (g.clone() * &d).y_is_odd() {
        d = -d;
    }
    let k_bytes: [u8; 32] = Sha256::new()
        .chain_update(session_id)
        .chain_update(msg)
        .chain_update(key.x_only())
        .chain_update(sk_bytes)
        .finalize()
        .into();
    let mut k = Secp256k1Scalar::from_bytes_be(&k_bytes);
    let R = g.clone() * &k;
    if R.y_is_odd() {
        k = -k;
    }
    let r_x = nonce.x();
    let e = compute_challenge(r_x, &key.x_only(), msg);
    let s = k + &(d * &e);

    let mut expected = [0u8; 64];
    expected[..32].copy_from_slice(r_x);
    expected[32..].copy_from_slice(&s.to_bytes_be());

    assert_eq!(sig.to_bytes(), expected);
    assert!(verify(&sig, &key, msg));
}

#[test]
fn second_partial_sign_is_stale() {
    let sks = [secret(SK1), secret(SK2)];
    let msg = b"nonce reuse";
    let key = aggregate_key(&sks);
    let mut signers = sessions(&sks, &key, msg, 3);
    let nonces: Vec<_> = signers.iter_mut().map(|s| s.reveal_nonce().unwrap()).collect();
    let agg = aggregate_nonces(&nonces, &key, msg).unwrap();
    partial_sign(&mut signers[0], &agg).unwrap();
    assert_eq!(
        partial_sign(&mut signers[0], &agg).unwrap_err(),
        MusigError::StaleSession
    );

    // Same session, different challenge: still refused.
    let other = aggregate_nonces(&nonces, &key, b"another message").unwrap();
    assert_eq!(
        partial_sign(&mut signers[0], &other).unwrap_err(),
        MusigError::StaleSession
    );
}

#[test]
fn tampered_nonce_breaks_signature() {
    let sks = [secret(SK1), secret(SK2)];
    let msg = b"tamper";
    let key = aggregate_key(&sks);

    let honest = ceremony(&mut sessions(&sks, &key, msg, 9), &key, msg).unwrap();
    assert!(verify(&honest, &key, msg));

    let mut signers = sessions(&sks, &key, msg, 9);
    let mut nonces: Vec<_> = signers.iter_mut().map(|s| s.reveal_nonce().unwrap()).collect();

    // Flip single bits until the altered x-coordinate is still on the curve.
    let original = *nonces[1].x();
    let tampered = (0..256)
        .find_map(|bit| {
            let mut x = original;
            x[31 - bit / 8] ^= 1 << (bit % 8);
            PublicNonce::from_bytes(&x, nonces[1].parity()).ok()
        })
        .unwrap();
    nonces[1] = tampered;

    let agg = aggregate_nonces(&nonces, &key, msg).unwrap();
    let partials: Vec<_> = signers
        .iter_mut()
        .map(|s| partial_sign(s, &agg).unwrap())
        .collect();
    let forged = aggregate_signature(&partials, &agg).unwrap();

    assert_ne!(forged, honest);
    assert!(!verify(&forged, &key, msg));
}

#[test]
fn reveal_not_matching_commitment_rejected() {
    let sks = [secret(SK1), secret(SK2)];
    let msg = b"commitment check";
    let key = aggregate_key(&sks);
    let mut signers = sessions(&sks, &key, msg, 4);
    let commitments: Vec<_> = signers.iter().map(|s| s.commitment()).collect();

    // Participant 1 swaps in a nonce from an unrelated session after seeing round 1.
    let mut rogue = SignerSession::random(1, &sks[1], &key, msg).unwrap();
    let reveals = [
        (commitments[0], signers[0].reveal_nonce().unwrap()),
        (commitments[1], rogue.reveal_nonce().unwrap()),
    ];
    assert_eq!(
        aggregate_committed_nonces(&reveals, &key, msg).unwrap_err(),
        MusigError::MismatchedCommitment { index: 1 }
    );
}

#[test]
fn incomplete_rounds_rejected() {
    let sks = [secret(SK1), secret(SK2), secret(SK3)];
    let msg = b"incomplete";
    let key = aggregate_key(&sks);
    let mut signers = sessions(&sks, &key, msg, 5);
    let nonces: Vec<_> = signers.iter_mut().map(|s| s.reveal_nonce().unwrap()).collect();

    assert_eq!(
        aggregate_nonces(&nonces[..2], &key, msg).unwrap_err(),
        MusigError::MissingReveals {
            expected: 3,
            got: 2
        }
    );
    assert_eq!(
        aggregate_nonces(&[], &key, msg).unwrap_err(),
        MusigError::EmptyNonceSet
    );

    let agg = aggregate_nonces(&nonces, &key, msg).unwrap();
    let partials: Vec<_> = signers[..2]
        .iter_mut()
        .map(|s| partial_sign(s, &agg).unwrap())
        .collect();
    assert_eq!(
        aggregate_signature(&partials, &agg).unwrap_err(),
        MusigError::IncompleteSignature {
            expected: 3,
            got: 2
        }
    );
}

#[test]
fn key_order_defines_aggregate() {
    let sks = [secret(SK1), secret(SK2)];
    let forward = aggregate_key(&sks);
    let backward = aggregate_key(&[sks[1], sks[0]]);
    assert_ne!(forward.key_list_hash(), backward.key_list_hash());
    assert_ne!(forward.x_only(), backward.x_only());

    // A signature made under one ordering does not verify under the other.
    let msg = b"ordering";
    let sig = ceremony(&mut sessions(&sks, &forward, msg, 6), &forward, msg).unwrap();
    assert!(verify(&sig, &forward, msg));
    assert!(!verify(&sig, &backward, msg));
}

#[test]
fn combined_key_parity_is_reported() {
    let key = aggregate_key(&[secret(SK1), secret(SK2)]);
    let expected = if key.combined_key().y_is_odd() {
        Parity::Odd
    } else {
        Parity::Even
    };
    assert_eq!(key.combined_key_parity(), expected);
}

#[test]
fn parallel_ceremonies_share_one_key() {
    let sks = [secret(SK1), secret(SK2), secret(SK3)];
    let key = aggregate_key(&sks);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let key = &key;
                let sks = &sks;
                scope.spawn(move || {
                    let msg = [t; 16];
                    let mut signers: Vec<_> = sks
                        .iter()
                        .enumerate()
                        .map(|(i, sk)| SignerSession::random(i, sk, key, &msg).unwrap())
                        .collect();
                    let sig = ceremony(&mut signers, key, &msg).unwrap();
                    verify(&sig, key, &msg)
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    });
}
