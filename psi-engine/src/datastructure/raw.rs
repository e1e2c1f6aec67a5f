//! Exact encoding: the sorted list of encrypted server elements.

use crate::crypto::EncryptedElement;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;

/// Every encrypted server element, sorted by encoding.
///
/// No false positives; size grows linearly with the server set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Raw {
    encrypted: Vec<EncryptedElement>,
}

impl Raw {
    /// Build from the server's encrypted elements.
    pub fn create(mut elements: Vec<EncryptedElement>) -> Self {
        // Sorting also hides the server's input order.
        elements.sort_unstable();
        Self {
            encrypted: elements,
        }
    }

    pub fn len(&self) -> usize {
        self.encrypted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encrypted.is_empty()
    }

    pub fn elements(&self) -> &[EncryptedElement] {
        &self.encrypted
    }

    pub fn contains(&self, element: &EncryptedElement) -> bool {
        match self.encrypted.binary_search(element) {
            Ok(_) => true,
            Err(_) => !is_sorted(&self.encrypted) && self.encrypted.contains(element),
        }
    }

    /// Indices of `elements` present in the set, ascending.
    ///
    /// Sorts a copy of the queries and merges it with the stored list, so a
    /// deserialized (possibly unsorted) list is sorted first.
    pub fn intersect(&self, elements: &[EncryptedElement]) -> Vec<usize> {
        let mut queries: Vec<(EncryptedElement, usize)> = elements
            .iter()
            .copied()
            .enumerate()
            .map(|(i, e)| (e, i))
            .collect();
        queries.sort_unstable();

        let server: Cow<'_, [EncryptedElement]> = if is_sorted(&self.encrypted) {
            Cow::Borrowed(&self.encrypted)
        } else {
            let mut copy = self.encrypted.clone();
            copy.sort_unstable();
            Cow::Owned(copy)
        };

        let mut result = Vec::new();
        let (mut q, mut s) = (0, 0);
        while q < queries.len() && s < server.len() {
            match queries[q].0.cmp(&server[s]) {
                Ordering::Less => q += 1,
                Ordering::Greater => s += 1,
                Ordering::Equal => {
                    result.push(queries[q].1);
                    q += 1;
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Payload size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.encrypted.len() * crate::crypto::ELEMENT_LEN
    }
}

fn is_sorted(elements: &[EncryptedElement]) -> bool {
    elements.windows(2).all(|w| w[0] <= w[1])
}
