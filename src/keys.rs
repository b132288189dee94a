//! Key material: x-only public keys, parity and private-key checks.
//!
//! Participant keys are BIP-340 x-only keys: only the 32-byte x-coordinate is
//! significant and the key is always lifted to the point with even Y.

use crate::error::MusigError;
use crypto_rs::secp256k1::{Secp256k1Point, Secp256k1Scalar};
use num_bigint::BigUint;
use num_traits::Zero;
use std::fmt;
use std::sync::LazyLock;

/// Order `n` of the secp256k1 group.
pub const CURVE_ORDER_BYTES: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

static CURVE_ORDER: LazyLock<BigUint> = LazyLock::new(|| BigUint::from_bytes_be(&CURVE_ORDER_BYTES));

/// Parity of a point's Y coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    /// Parity of `point`'s affine Y coordinate.
    pub fn of(point: &Secp256k1Point) -> Self {
        if point.y_is_odd() { Parity::Odd } else { Parity::Even }
    }

    pub fn is_even(self) -> bool {
        self == Parity::Even
    }
}

/// Lift an x-coordinate to the curve point with even Y.
pub(crate) fn lift_x(x: &[u8; 32]) -> Option<Secp256k1Point> {
    let mut compressed = [0u8; 33];
    compressed[0] = 0x02;
    compressed[1..].copy_from_slice(x);
    Secp256k1Point::from_bytes_compressed(&compressed)
}

/// Decode a canonical scalar, rejecting values not below the group order.
pub(crate) fn scalar_from_canonical(bytes: &[u8; 32]) -> Option<Secp256k1Scalar> {
    let v = BigUint::from_bytes_be(bytes);
    if v >= *CURVE_ORDER {
        return None;
    }
    Some(Secp256k1Scalar::from_bytes_be(bytes))
}

/// Validate a private key: it must lie in `[1, n)`.
pub(crate) fn secret_scalar(bytes: &[u8; 32]) -> Result<Secp256k1Scalar, MusigError> {
    if BigUint::from_bytes_be(bytes).is_zero() {
        return Err(MusigError::InvalidPrivateKey);
    }
    scalar_from_canonical(bytes).ok_or(MusigError::InvalidPrivateKey)
}

/// An x-only participant public key.
#[derive(Clone, PartialEq)]
pub struct PublicKey {
    x: [u8; 32],
    point: Secp256k1Point,
}

impl PublicKey {
    /// Parse a 32-byte x-only key or a 33-byte compressed key.
    ///
    /// A compressed key keeps only its x-coordinate; the parity prefix is dropped.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MusigError> {
        let x: [u8; 32] = match bytes.len() {
            32 => bytes.try_into().map_err(|_| MusigError::InvalidInput("public key length"))?,
            33 => {
                if bytes[0] != 0x02 && bytes[0] != 0x03 {
                    return Err(MusigError::InvalidInput("public key prefix"));
                }
                bytes[1..]
                    .try_into()
                    .map_err(|_| MusigError::InvalidInput("public key length"))?
            }
            _ => return Err(MusigError::InvalidInput("public key length")),
        };
        let point = lift_x(&x).ok_or(MusigError::InvalidInput("public key is not on the curve"))?;
        Ok(PublicKey { x, point })
    }

    /// Derive the x-only public key of a private key.
    pub fn from_secret(private_key: &[u8; 32]) -> Result<Self, MusigError> {
        let sk = secret_scalar(private_key)?;
        let full = Secp256k1Point::generator() * &sk;
        Ok(Self::from_point(&full))
    }

    /// The x-only key of an arbitrary non-identity point.
    pub(crate) fn from_point(point: &Secp256k1Point) -> Self {
        let point = if point.y_is_odd() { -point.clone() } else { point.clone() };
        let mut x = [0u8; 32];
        x.copy_from_slice(&point.x_only_bytes());
        PublicKey { x, point }
    }

    /// The 32-byte x-only encoding.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.x
    }

    /// The even-Y curve point this key stands for.
    pub fn point(&self) -> &Secp256k1Point {
        &self.point
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(")?;
        for b in &self.x {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}
