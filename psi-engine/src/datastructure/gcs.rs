//! Golomb-compressed set (GCS) encoding of the encrypted server set.
//!
//! Every element is hashed into `[0, hash_range)`; the sorted hash values
//! are stored as Golomb-Rice coded gaps. With `n` server elements and a
//! range of `n / p`, a non-member hits a stored value with probability about
//! `p`. The encoding is smaller than a Bloom filter at the same rate but can
//! only be queried by decoding it once, front to back.

use super::golomb::{golomb_compress, golomb_decompress, golomb_intersect, MAX_DIVISOR_BITS};
use super::per_query_fpr;
use crate::crypto::{hash_to_range, EncryptedElement};
use crate::error::{PsiError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

const GCS_HASH_PREFIX: &[u8] = b"gcs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gcs {
    golomb: Vec<u8>,
    div: u32,
    hash_range: u64,
}

impl Gcs {
    /// Build a GCS holding `elements`.
    ///
    /// `fpr` is the false-positive budget for the whole client query set,
    /// so the hash range is sized for `fpr / num_client_inputs` per lookup.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if `fpr` is not in (0,1) or
    /// `num_client_inputs` is zero
    pub fn create(
        fpr: f64,
        num_client_inputs: usize,
        elements: &[EncryptedElement],
    ) -> Result<Self> {
        let rate = per_query_fpr(fpr, num_client_inputs)?;
        // `as` saturates, so absurdly small rates just use the full u64 range.
        let hash_range = ((elements.len().max(1) as f64) / rate).round() as u64;
        let hash_range = hash_range.max(1);

        let mut hashes: Vec<u64> = elements
            .par_iter()
            .map(|element| Self::hash(element, hash_range))
            .collect();
        hashes.par_sort_unstable();

        let compressed = golomb_compress(&hashes);
        debug!(
            num_elements = elements.len(),
            hash_range,
            div = compressed.div,
            num_bytes = compressed.bits.len(),
            "built Golomb-compressed set"
        );
        Ok(Self {
            golomb: compressed.bits,
            div: compressed.div,
            hash_range,
        })
    }

    /// Rebuild a GCS from its parts, e.g. after deserialization.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if the parameters are not usable
    pub fn from_parts(golomb: Vec<u8>, div: u32, hash_range: u64) -> Result<Self> {
        let gcs = Self {
            golomb,
            div,
            hash_range,
        };
        gcs.validate()?;
        Ok(gcs)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.hash_range == 0 {
            return Err(PsiError::InvalidArgument(
                "server setup is corrupt: GCS hash range is zero".to_string(),
            ));
        }
        if self.div > MAX_DIVISOR_BITS {
            return Err(PsiError::InvalidArgument(format!(
                "server setup is corrupt: GCS divisor 2^{} is too large",
                self.div
            )));
        }
        Ok(())
    }

    fn hash(element: &EncryptedElement, hash_range: u64) -> u64 {
        hash_to_range(GCS_HASH_PREFIX, element.as_ref(), hash_range)
    }

    /// Membership test for a single element. Decodes the whole set.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if the encoded stream is corrupt
    pub fn contains(&self, element: &EncryptedElement) -> Result<bool> {
        Ok(!self.intersect(std::slice::from_ref(element))?.is_empty())
    }

    /// Indices of `elements` whose hash is in the set, ascending.
    ///
    /// Hashes and sorts the queries, then merges them against a single
    /// decoding pass over the stored gaps.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if the encoded stream is corrupt
    pub fn intersect(&self, elements: &[EncryptedElement]) -> Result<Vec<usize>> {
        self.validate()?;
        let mut queries: Vec<(u64, usize)> = elements
            .par_iter()
            .enumerate()
            .map(|(index, element)| (Self::hash(element, self.hash_range), index))
            .collect();
        queries.par_sort_unstable();

        let mut result = golomb_intersect(&self.golomb, self.div, &queries)?;
        result.sort_unstable();
        Ok(result)
    }

    /// All stored hash values, ascending.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if the encoded stream is corrupt
    pub fn decode(&self) -> Result<Vec<u64>> {
        self.validate()?;
        golomb_decompress(&self.golomb, self.div)
    }

    pub fn div(&self) -> u32 {
        self.div
    }

    pub fn hash_range(&self) -> u64 {
        self.hash_range
    }

    pub fn golomb(&self) -> &[u8] {
        &self.golomb
    }

    /// Payload size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.golomb.len() + std::mem::size_of::<u32>() + std::mem::size_of::<u64>()
    }
}
