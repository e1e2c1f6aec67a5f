//! Commutative element encryption.
//!
//! `Encrypt(k, x) = k · H(x)`. Because scalar multiplication in a prime-order
//! group commutes, re-encrypting under a second key gives the same point in
//! either order, and multiplying by `k⁻¹` strips one layer again.

use crate::crypto::{decompress_point, hash_to_point, EncryptedElement};
use crate::error::Result;
use crate::key::KeyMaterial;
use rayon::prelude::*;

/// Encrypt a single input item under `key`.
pub fn encrypt(key: &KeyMaterial, item: &[u8]) -> EncryptedElement {
    EncryptedElement::from(key.scalar() * hash_to_point(item))
}

/// Add `key`'s layer to an already encrypted element.
///
/// # Errors
/// Returns `PsiError::InvalidElement` if `element` is not a valid point
pub fn re_encrypt(key: &KeyMaterial, element: &EncryptedElement) -> Result<EncryptedElement> {
    let point = decompress_point(element)?;
    Ok(EncryptedElement::from(key.scalar() * point))
}

/// Remove `key`'s layer from an encrypted element.
///
/// # Errors
/// Returns `PsiError::InvalidElement` if `element` is not a valid point
pub fn decrypt(key: &KeyMaterial, element: &EncryptedElement) -> Result<EncryptedElement> {
    let point = decompress_point(element)?;
    Ok(EncryptedElement::from(key.inverse() * point))
}

/// Encrypt every item, preserving input order.
pub fn encrypt_batch<T: AsRef<[u8]> + Sync>(
    key: &KeyMaterial,
    items: &[T],
) -> Vec<EncryptedElement> {
    items
        .par_iter()
        .map(|item| encrypt(key, item.as_ref()))
        .collect()
}

/// Re-encrypt every element, preserving order.
///
/// # Errors
/// Returns `PsiError::InvalidElement` carrying the lowest index of a
/// malformed element; no partial output is produced
pub fn re_encrypt_batch(
    key: &KeyMaterial,
    elements: &[EncryptedElement],
) -> Result<Vec<EncryptedElement>> {
    first_error_in_order(
        elements
            .par_iter()
            .map(|element| re_encrypt(key, element))
            .collect(),
    )
}

/// Decrypt every element, preserving order.
///
/// # Errors
/// Same contract as [`re_encrypt_batch`]
pub fn decrypt_batch(
    key: &KeyMaterial,
    elements: &[EncryptedElement],
) -> Result<Vec<EncryptedElement>> {
    first_error_in_order(
        elements
            .par_iter()
            .map(|element| decrypt(key, element))
            .collect(),
    )
}

// A parallel collect into `Result` may stop at any failing element, so the
// results are gathered first and scanned in input order.
fn first_error_in_order(results: Vec<Result<EncryptedElement>>) -> Result<Vec<EncryptedElement>> {
    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| result.map_err(|e| e.at_index(index)))
        .collect()
}
