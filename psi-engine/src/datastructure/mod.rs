//! Encodings of the server's encrypted set.
//!
//! The server packs its encrypted elements into one of three structures
//! and the client queries them through the single [`SetEncoding`] contract.
//! The variants differ only in size and false-positive behaviour:
//!
//! | Variant       | False positives      | Lookup                        |
//! |---------------|----------------------|-------------------------------|
//! | `Raw`         | none                 | sorted merge                  |
//! | `BloomFilter` | ≤ `fpr` per query set | `k` bit probes per element   |
//! | `Gcs`         | ≤ `fpr` per query set | one full decode per query set |

mod bloom_filter;
mod gcs;
mod golomb;
mod raw;

pub use bloom_filter::BloomFilter;
pub use gcs::Gcs;
pub use golomb::{golomb_compress, golomb_decompress, golomb_intersect, GolombCompressed};
pub use raw::Raw;

use crate::crypto::EncryptedElement;
use crate::error::{PsiError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which encoding the server uses for its setup message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataStructure {
    Raw,
    #[default]
    Gcs,
    BloomFilter,
}

impl DataStructure {
    pub const ALL: [DataStructure; 3] = [
        DataStructure::Raw,
        DataStructure::Gcs,
        DataStructure::BloomFilter,
    ];
}

impl fmt::Display for DataStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataStructure::Raw => write!(f, "raw"),
            DataStructure::Gcs => write!(f, "gcs"),
            DataStructure::BloomFilter => write!(f, "bloomfilter"),
        }
    }
}

/// An encoded server set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetEncoding {
    Raw(Raw),
    BloomFilter(BloomFilter),
    Gcs(Gcs),
}

impl SetEncoding {
    /// Encode `elements` with the chosen data structure.
    ///
    /// # Arguments
    /// * `data_structure` - Which encoding to build
    /// * `fpr` - False-positive budget for a whole client query set
    /// * `num_client_inputs` - Expected number of client lookups
    /// * `elements` - The server's encrypted elements
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` for an out-of-range `fpr` or a
    /// zero `num_client_inputs`
    pub fn create(
        data_structure: DataStructure,
        fpr: f64,
        num_client_inputs: usize,
        elements: Vec<EncryptedElement>,
    ) -> Result<Self> {
        Ok(match data_structure {
            DataStructure::Raw => SetEncoding::Raw(Raw::create(elements)),
            DataStructure::BloomFilter => {
                SetEncoding::BloomFilter(BloomFilter::create(fpr, num_client_inputs, &elements)?)
            }
            DataStructure::Gcs => SetEncoding::Gcs(Gcs::create(fpr, num_client_inputs, &elements)?),
        })
    }

    pub fn data_structure(&self) -> DataStructure {
        match self {
            SetEncoding::Raw(_) => DataStructure::Raw,
            SetEncoding::BloomFilter(_) => DataStructure::BloomFilter,
            SetEncoding::Gcs(_) => DataStructure::Gcs,
        }
    }

    /// Approximate membership test.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if the encoding is corrupt
    pub fn contains(&self, element: &EncryptedElement) -> Result<bool> {
        match self {
            SetEncoding::Raw(raw) => Ok(raw.contains(element)),
            SetEncoding::BloomFilter(filter) => {
                filter.validate()?;
                Ok(filter.contains(element))
            }
            SetEncoding::Gcs(gcs) => gcs.contains(element),
        }
    }

    /// Indices of all `elements` that test as members, ascending.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if the encoding is corrupt
    pub fn intersect(&self, elements: &[EncryptedElement]) -> Result<Vec<usize>> {
        match self {
            SetEncoding::Raw(raw) => Ok(raw.intersect(elements)),
            SetEncoding::BloomFilter(filter) => {
                filter.validate()?;
                Ok(filter.intersect(elements))
            }
            SetEncoding::Gcs(gcs) => gcs.intersect(elements),
        }
    }

    /// Payload size in bytes, excluding serialization framing.
    pub fn encoded_len(&self) -> usize {
        match self {
            SetEncoding::Raw(raw) => raw.encoded_len(),
            SetEncoding::BloomFilter(filter) => filter.encoded_len(),
            SetEncoding::Gcs(gcs) => gcs.encoded_len(),
        }
    }
}

/// Split a whole-query-set budget into a per-lookup rate.
///
/// Never returns zero, even when the division underflows for a tiny `fpr`.
pub(crate) fn per_query_fpr(fpr: f64, num_client_inputs: usize) -> Result<f64> {
    if !(fpr > 0.0 && fpr < 1.0) {
        return Err(PsiError::InvalidArgument(format!(
            "`fpr` must be in (0,1), got {}",
            fpr
        )));
    }
    if num_client_inputs == 0 {
        return Err(PsiError::InvalidArgument(
            "`num_client_inputs` must be positive".to_string(),
        ));
    }
    Ok((fpr / num_client_inputs as f64).max(f64::MIN_POSITIVE))
}
