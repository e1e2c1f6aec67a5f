//! Private key material for one protocol party.

use crate::crypto::{random_scalar, scalar_from_bytes, KEY_LEN};
use crate::error::Result;
use curve25519_dalek::Scalar;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::fmt;

/// A party's private scalar together with its inverse.
///
/// Immutable once built; the inverse is computed up front so decryption
/// never has to touch a mutable cache.
#[derive(Clone)]
pub struct KeyMaterial {
    scalar: Scalar,
    inverse: Scalar,
}

impl KeyMaterial {
    /// Create a key from the operating system's secure random source.
    ///
    /// # Errors
    /// Returns `PsiError::Entropy` if the OS cannot supply randomness
    pub fn create_with_new_key() -> Result<Self> {
        Self::create_with_rng(&mut OsRng)
    }

    /// Create a key from a caller-supplied random source.
    ///
    /// Tests pass a seeded RNG here to get reproducible keys.
    ///
    /// # Errors
    /// Returns `PsiError::Entropy` if the random source fails
    pub fn create_with_rng<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Result<Self> {
        Ok(Self::from_scalar(random_scalar(rng)?))
    }

    /// Restore a key from bytes previously returned by [`export_key_bytes`].
    ///
    /// # Errors
    /// Returns `PsiError::InvalidKey` if the bytes are not a canonical,
    /// non-zero 32-byte scalar
    ///
    /// [`export_key_bytes`]: KeyMaterial::export_key_bytes
    pub fn create_from_key(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_scalar(scalar_from_bytes(bytes)?))
    }

    fn from_scalar(scalar: Scalar) -> Self {
        Self {
            scalar,
            inverse: scalar.invert(),
        }
    }

    /// Export the private scalar.
    ///
    /// **The returned bytes are secret. Never send them to the other party.**
    pub fn export_key_bytes(&self) -> [u8; KEY_LEN] {
        self.scalar.to_bytes()
    }

    pub(crate) fn scalar(&self) -> &Scalar {
        &self.scalar
    }

    pub(crate) fn inverse(&self) -> &Scalar {
        &self.inverse
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}
