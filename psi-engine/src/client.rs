//! Client side of the PSI protocol.

use crate::cipher::{decrypt_batch, encrypt_batch};
use crate::crypto::KEY_LEN;
use crate::error::{PsiError, Result};
use crate::key::KeyMaterial;
use crate::messages::{Request, Response, ServerSetup};
use rand::{CryptoRng, RngCore};
use tracing::{debug, instrument};

/// The client party.
///
/// Learns either the intersection of its items with the server's, or only
/// its size, depending on `reveal_intersection`.
#[derive(Debug, Clone)]
pub struct PsiClient {
    key: KeyMaterial,
    reveal_intersection: bool,
}

impl PsiClient {
    /// Create a client with a fresh random key.
    ///
    /// # Errors
    /// Returns `PsiError::Entropy` if no secure randomness is available
    pub fn create_with_new_key(reveal_intersection: bool) -> Result<Self> {
        Ok(Self {
            key: KeyMaterial::create_with_new_key()?,
            reveal_intersection,
        })
    }

    /// Create a client whose key is drawn from `rng`.
    pub fn create_with_rng<R: RngCore + CryptoRng + ?Sized>(
        rng: &mut R,
        reveal_intersection: bool,
    ) -> Result<Self> {
        Ok(Self {
            key: KeyMaterial::create_with_rng(rng)?,
            reveal_intersection,
        })
    }

    /// Create a client from an exported key.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidKey` if `key_bytes` is not a valid key
    pub fn create_from_key(key_bytes: &[u8], reveal_intersection: bool) -> Result<Self> {
        Ok(Self {
            key: KeyMaterial::create_from_key(key_bytes)?,
            reveal_intersection,
        })
    }

    /// Encrypt the client's items into a request for the server.
    ///
    /// Element i of the request is item i; duplicates are kept.
    #[instrument(
        level = "debug",
        skip_all,
        fields(num_items = items.len(), reveal = self.reveal_intersection)
    )]
    pub fn create_request<T: AsRef<[u8]> + Sync>(&self, items: &[T]) -> Result<Request> {
        let encrypted = encrypt_batch(&self.key, items);
        Ok(Request::new(encrypted, self.reveal_intersection))
    }

    /// Indices of the client items that are in the server's set, ascending.
    ///
    /// The result may contain false positives at the rate the server's setup
    /// was built for, and never contains false negatives.
    ///
    /// # Errors
    /// * `PsiError::InvalidArgument` if the client was created with
    ///   `reveal_intersection = false`, or the setup is corrupt
    /// * `PsiError::InvalidElement` if a response element is not a valid point
    #[instrument(
        level = "debug",
        skip_all,
        fields(num_elements = response.len(), data_structure = %setup.data_structure())
    )]
    pub fn get_intersection(&self, setup: &ServerSetup, response: &Response) -> Result<Vec<usize>> {
        if !self.reveal_intersection {
            return Err(PsiError::InvalidArgument(
                "tried calling `get_intersection` when `reveal_intersection` is false".to_string(),
            ));
        }
        self.process_response(setup, response)
    }

    /// Size of the intersection of the client items with the server's set.
    ///
    /// Works in both output modes.
    ///
    /// # Errors
    /// * `PsiError::InvalidArgument` if the setup is corrupt
    /// * `PsiError::InvalidElement` if a response element is not a valid point
    #[instrument(
        level = "debug",
        skip_all,
        fields(num_elements = response.len(), data_structure = %setup.data_structure())
    )]
    pub fn get_intersection_size(&self, setup: &ServerSetup, response: &Response) -> Result<usize> {
        Ok(self.process_response(setup, response)?.len())
    }

    fn process_response(&self, setup: &ServerSetup, response: &Response) -> Result<Vec<usize>> {
        // Strip the client layer, leaving every element under the server key only.
        let decrypted = decrypt_batch(&self.key, &response.encrypted_elements)?;
        let matches = setup.encoding.intersect(&decrypted)?;
        debug!(num_matches = matches.len(), "processed response");
        Ok(matches)
    }

    /// Export the client's private key.
    ///
    /// **Do not send this key to any other party!**
    pub fn export_key_bytes(&self) -> [u8; KEY_LEN] {
        self.key.export_key_bytes()
    }

    pub fn reveal_intersection(&self) -> bool {
        self.reveal_intersection
    }
}
