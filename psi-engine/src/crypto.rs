//! Curve and hashing primitives for the PSI engine.
//!
//! Everything here works on the Ristretto group of curve25519: a prime-order
//! group, so every non-zero scalar is invertible and scalar multiplication
//! commutes.

use crate::error::{PsiError, Result};
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::Scalar;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

/// Length in bytes of an exported private key.
pub const KEY_LEN: usize = 32;

/// Length in bytes of an encrypted element (a compressed Ristretto point).
pub const ELEMENT_LEN: usize = 32;

const HASH_TO_CURVE_DOMAIN: &[u8] = b"psi-engine/hash-to-curve/v1";

/// A curve point in its fixed-width wire encoding.
///
/// Produced by encrypting a hashed input item under one or more private
/// keys. Two elements are equal iff their encodings are byte-identical, so
/// any transport must carry these 32 bytes unchanged.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EncryptedElement(pub [u8; ELEMENT_LEN]);

impl EncryptedElement {
    /// Build an element from a byte slice.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if `bytes` is not exactly
    /// [`ELEMENT_LEN`] long. The bytes are not checked to be a valid point.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; ELEMENT_LEN] = bytes.try_into().map_err(|_| {
            PsiError::InvalidArgument(format!(
                "encrypted element must be {} bytes, got {}",
                ELEMENT_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// The raw 32-byte encoding.
    pub fn as_bytes(&self) -> &[u8; ELEMENT_LEN] {
        &self.0
    }
}

impl From<RistrettoPoint> for EncryptedElement {
    fn from(point: RistrettoPoint) -> Self {
        Self(point.compress().to_bytes())
    }
}

impl AsRef<[u8]> for EncryptedElement {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for EncryptedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedElement(")?;
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..)")
    }
}

/// Map an arbitrary byte string to a Ristretto point.
///
/// The input is hashed with SHA-512 under a fixed domain tag and mapped to
/// the group with Ristretto's hash-to-group construction, so nobody knows
/// the discrete log of the result.
///
/// # Arguments
/// * `item` - Input bytes to hash
///
/// # Returns
/// The corresponding Ristretto point
pub fn hash_to_point(item: &[u8]) -> RistrettoPoint {
    let hasher = Sha512::new()
        .chain_update(HASH_TO_CURVE_DOMAIN)
        .chain_update(item);
    RistrettoPoint::from_hash(hasher)
}

/// Generate a uniformly random non-zero scalar.
///
/// # Arguments
/// * `rng` - A cryptographically secure random source
///
/// # Errors
/// Returns `PsiError::Entropy` if the random source fails
pub fn random_scalar<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Scalar> {
    let mut wide = [0u8; 64];
    loop {
        rng.try_fill_bytes(&mut wide)
            .map_err(|e| PsiError::Entropy(e.to_string()))?;
        let scalar = Scalar::from_bytes_mod_order_wide(&wide);
        if scalar != Scalar::ZERO {
            return Ok(scalar);
        }
    }
}

/// Decode a private scalar from its 32-byte little-endian encoding.
///
/// # Errors
/// Returns `PsiError::InvalidKey` if `bytes` has the wrong length, is not a
/// canonical encoding (i.e. not reduced mod the group order), or is zero
pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
        PsiError::InvalidKey(format!(
            "expected {} key bytes, got {}",
            KEY_LEN,
            bytes.len()
        ))
    })?;
    let scalar = Option::<Scalar>::from(Scalar::from_canonical_bytes(array)).ok_or_else(|| {
        PsiError::InvalidKey("key bytes are not a canonical scalar".to_string())
    })?;
    if scalar == Scalar::ZERO {
        return Err(PsiError::InvalidKey("key must be non-zero".to_string()));
    }
    Ok(scalar)
}

/// Decompress an encrypted element back into a curve point.
///
/// # Errors
/// Returns `PsiError::InvalidElement` (at index 0; batch callers re-target
/// it) if the bytes are not a valid Ristretto encoding
pub fn decompress_point(element: &EncryptedElement) -> Result<RistrettoPoint> {
    CompressedRistretto(element.0)
        .decompress()
        .ok_or_else(|| PsiError::InvalidElement {
            index: 0,
            reason: "not a valid Ristretto point encoding".to_string(),
        })
}

/// Hash `input` under `prefix` into the integer range `[0, range)`.
///
/// Used by the Bloom filter probes and the GCS value domain. Takes the first
/// 128 bits of SHA-256, so the modulo bias is negligible for any `u64` range.
pub fn hash_to_range(prefix: &[u8], input: &[u8], range: u64) -> u64 {
    let digest = Sha256::new()
        .chain_update(prefix)
        .chain_update(input)
        .finalize();
    let mut head = [0u8; 16];
    head.copy_from_slice(&digest[..16]);
    (u128::from_be_bytes(head) % u128::from(range.max(1))) as u64
}
