//! Bloom filter encoding of the encrypted server set.
//!
//! An element is inserted by setting `k` probe bits and is reported as a
//! member iff all `k` bits are set, so inserted elements are never missed
//! and non-members collide with probability about `p`. For `n` elements and
//! target rate `p` the filter uses the optimal parameters
//! `m = ceil(-n·ln p / ln²2)` bits and `k = round((m/n)·ln 2)` probes.
//! Probe `i` is an independent SHA-256 based hash of the element, keyed by
//! `i`, reduced into `[0, m)`.

use crate::crypto::{hash_to_range, EncryptedElement};
use crate::error::{PsiError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

use super::per_query_fpr;
use tracing::debug;

const PROBE_HASH_PREFIX: &[u8] = b"bloom";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    num_hash_functions: u32,
    bits: Vec<u8>,
}

impl BloomFilter {
    /// Build a filter holding `elements`.
    ///
    /// `fpr` is the false-positive budget for a whole client query set of
    /// `num_client_inputs` lookups, so each lookup is sized for
    /// `fpr / num_client_inputs`. The filter is sized for at least
    /// `num_client_inputs` elements, so tiny server sets still get a
    /// reasonably large bit array.
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
        let max_elements = elements.len().max(num_client_inputs);
        let mut filter = Self::create_empty(rate, max_elements)?;
        filter.add_all(elements);
        Ok(filter)
    }

    /// Create an empty filter that keeps the false-positive rate below `fpr`
    /// as long as at most `max_elements` are inserted.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if `fpr` is not in (0,1)
    pub fn create_empty(fpr: f64, max_elements: usize) -> Result<Self> {
        if !(fpr > 0.0 && fpr < 1.0) {
            return Err(PsiError::InvalidArgument(
                "`fpr` must be in (0,1)".to_string(),
            ));
        }
        let n = max_elements.max(1) as f64;
        let num_bits = (-n * fpr.ln() / (LN_2 * LN_2)).ceil().max(1.0);
        let num_hash_functions = ((num_bits / n) * LN_2).round().max(1.0) as u32;
        let num_bytes = (num_bits / 8.0).ceil() as usize;
        debug!(
            fpr,
            max_elements,
            num_bits = num_bytes * 8,
            num_hash_functions,
            "sized Bloom filter"
        );
        Ok(Self {
            num_hash_functions,
            bits: vec![0u8; num_bytes],
        })
    }

    /// Rebuild a filter from its parts, e.g. after deserialization.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if the parts are not usable
    pub fn from_parts(num_hash_functions: u32, bits: Vec<u8>) -> Result<Self> {
        let filter = Self {
            num_hash_functions,
            bits,
        };
        filter.validate()?;
        Ok(filter)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.num_hash_functions == 0 {
            return Err(PsiError::InvalidArgument(
                "server setup is corrupt: Bloom filter has no hash functions".to_string(),
            ));
        }
        if self.bits.is_empty() {
            return Err(PsiError::InvalidArgument(
                "server setup is corrupt: Bloom filter has no bits".to_string(),
            ));
        }
        Ok(())
    }

    pub fn add(&mut self, element: &EncryptedElement) {
        for index in self.probes(element) {
            self.bits[(index / 8) as usize] |= 1 << (index % 8);
        }
    }

    pub fn add_all(&mut self, elements: &[EncryptedElement]) {
        let probes: Vec<Vec<u64>> = elements
            .par_iter()
            .map(|element| self.probes(element).collect())
            .collect();
        for index in probes.into_iter().flatten() {
            self.bits[(index / 8) as usize] |= 1 << (index % 8);
        }
    }

    pub fn contains(&self, element: &EncryptedElement) -> bool {
        self.probes(element)
            .all(|index| (self.bits[(index / 8) as usize] >> (index % 8)) & 1 == 1)
    }

    /// Indices of `elements` that test positive, ascending.
    pub fn intersect(&self, elements: &[EncryptedElement]) -> Vec<usize> {
        elements
            .par_iter()
            .enumerate()
            .filter(|(_, element)| self.contains(element))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn num_hash_functions(&self) -> u32 {
        self.num_hash_functions
    }

    pub fn num_bits(&self) -> u64 {
        self.bits.len() as u64 * 8
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Payload size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.bits.len() + std::mem::size_of::<u32>()
    }

    fn probes<'a>(&self, element: &'a EncryptedElement) -> impl Iterator<Item = u64> + 'a {
        let num_bits = self.num_bits();
        (0..self.num_hash_functions).map(move |i| {
            let mut prefix = [0u8; PROBE_HASH_PREFIX.len() + 4];
            prefix[..PROBE_HASH_PREFIX.len()].copy_from_slice(PROBE_HASH_PREFIX);
            prefix[PROBE_HASH_PREFIX.len()..].copy_from_slice(&i.to_le_bytes());
            hash_to_range(&prefix, element.as_ref(), num_bits)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_to_point;

    fn elements(prefix: &str, count: usize) -> Vec<EncryptedElement> {
        (0..count)
            .map(|i| EncryptedElement::from(hash_to_point(format!("{} {}", prefix, i).as_bytes())))
            .collect()
    }

    #[test]
    fn test_create_empty_parameters() {
        // fpr 2^-10 for 100 elements: ~14.4 bits per element, 10 probes
        let filter = BloomFilter::create_empty(1.0 / 1024.0, 100).unwrap();
        assert_eq!(filter.num_hash_functions(), 10);
        assert_eq!(filter.num_bits(), 1448);
    }

    #[test]
    fn test_invalid_fpr() {
        for fpr in [0.0, 1.0, -0.5, 2.0, f64::NAN] {
            assert!(matches!(
                BloomFilter::create_empty(fpr, 10),
                Err(PsiError::InvalidArgument(_))
            ));
        }
        assert!(BloomFilter::create(0.01, 0, &[]).is_err());
    }

    #[test]
    fn test_no_false_negatives() {
        let inserted = elements("Element", 500);
        let filter = BloomFilter::create(0.001, 100, &inserted).unwrap();
        for element in &inserted {
            assert!(filter.contains(element));
        }
        assert_eq!(filter.intersect(&inserted), (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_false_positive_rate() {
        let inserted = elements("Element", 1000);
        let mut filter = BloomFilter::create_empty(0.01, 1000).unwrap();
        filter.add_all(&inserted);

        let others = elements("Other", 10_000);
        let positives = filter.intersect(&others).len();
        // Expected ~100; allow generous slack
        assert!(positives < 200, "too many false positives: {}", positives);
    }

    #[test]
    fn test_add_matches_add_all() {
        let inserted = elements("Element", 20);
        let mut one_by_one = BloomFilter::create_empty(0.01, 20).unwrap();
        for element in &inserted {
            one_by_one.add(element);
        }
        let mut batch = BloomFilter::create_empty(0.01, 20).unwrap();
        batch.add_all(&inserted);
        assert_eq!(one_by_one, batch);
    }

    #[test]
    fn test_from_parts() {
        assert!(BloomFilter::from_parts(0, vec![1]).is_err());
        assert!(BloomFilter::from_parts(3, vec![]).is_err());
        let filter = BloomFilter::from_parts(3, vec![0xff; 4]).unwrap();
        assert!(filter.contains(&EncryptedElement([5; 32])));
    }

    #[test]
    fn test_small_server_set_meets_per_query_rate() {
        // 10 server elements, budget 1e-9 over 1000 client lookups
        let filter = BloomFilter::create(1e-9, 1000, &elements("Element", 10)).unwrap();
        let sized_for_clients = BloomFilter::create_empty(1e-9 / 1000.0, 1000).unwrap();
        assert_eq!(filter.num_bits(), sized_for_clients.num_bits());

        let positives = filter.intersect(&elements("Other", 20_000)).len();
        assert_eq!(positives, 0, "{} false positives at a 1e-12 target", positives);
    }

    #[test]
    fn test_probes_are_spread_out() {
        let filter = BloomFilter::create(1e-9, 1000, &elements("Element", 10)).unwrap();
        let k = filter.num_hash_functions() as usize;
        for element in elements("Other", 1000) {
            let mut probes: Vec<u64> = filter.probes(&element).collect();
            probes.sort_unstable();
            probes.dedup();
            assert!(probes.len() >= k / 2, "only {} distinct probes of {}", probes.len(), k);
        }
    }

    #[test]
    fn test_tiny_fpr_does_not_underflow() {
        let inserted = elements("Element", 5);
        let filter = BloomFilter::create(5e-324, 2, &inserted).unwrap();
        assert!(inserted.iter().all(|element| filter.contains(element)));
    }
}
