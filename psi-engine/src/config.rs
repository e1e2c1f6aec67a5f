//! Configuration of the server's setup message.
//!
//! # Example
//!
//! ```rust
//! use psi_engine::{DataStructure, SetupParameters};
//!
//! // 1% total false-positive budget for a client with 1000 items
//! let params = SetupParameters::new(0.01, 1000, DataStructure::BloomFilter)
//!     .expect("valid params");
//! assert_eq!(params.num_client_inputs, 1000);
//! ```

use crate::datastructure::DataStructure;
use crate::error::{PsiError, Result};
use serde::{Deserialize, Serialize};

/// Parameters the server needs to size its encoded set.
///
/// # Fields
///
/// - `fpr`: expected number of false positives over the whole client set;
///   must be in (0,1)
/// - `num_client_inputs`: how many items the client will query; must be
///   positive
/// - `data_structure`: which encoding to build
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetupParameters {
    pub fpr: f64,
    pub num_client_inputs: usize,
    pub data_structure: DataStructure,
}

impl SetupParameters {
    /// Creates and validates setup parameters.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if validation fails
    pub fn new(fpr: f64, num_client_inputs: usize, data_structure: DataStructure) -> Result<Self> {
        let params = Self {
            fpr,
            num_client_inputs,
            data_structure,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks that `fpr` is in (0,1) and `num_client_inputs` is positive.
    ///
    /// The checks apply to every data structure, including `Raw`, so a
    /// configuration stays valid when the encoding is switched.
    pub fn validate(&self) -> Result<()> {
        if !(self.fpr > 0.0 && self.fpr < 1.0) {
            return Err(PsiError::InvalidArgument(format!(
                "`fpr` must be in (0,1), got {}",
                self.fpr
            )));
        }
        if self.num_client_inputs == 0 {
            return Err(PsiError::InvalidArgument(
                "`num_client_inputs` must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SetupParameters {
    fn default() -> Self {
        Self {
            fpr: 1e-6,
            num_client_inputs: 1,
            data_structure: DataStructure::default(),
        }
    }
}
