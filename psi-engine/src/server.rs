//! Server side of the PSI protocol.

use crate::cipher::{encrypt_batch, re_encrypt_batch};
use crate::config::SetupParameters;
use crate::crypto::KEY_LEN;
use crate::datastructure::{DataStructure, SetEncoding};
use crate::error::{PsiError, Result};
use crate::key::KeyMaterial;
use crate::messages::{Request, Response, ServerSetup};
use rand::{CryptoRng, RngCore};
use rayon::slice::ParallelSliceMut;
use tracing::{debug, instrument};

/// The server party.
///
/// Holds the server's private key and output mode. All operations take
/// `&self`, so one server can answer many clients concurrently.
#[derive(Debug, Clone)]
pub struct PsiServer {
    key: KeyMaterial,
    reveal_intersection: bool,
}

impl PsiServer {
    /// Create a server with a fresh random key.
    ///
    /// # Errors
    /// Returns `PsiError::Entropy` if no secure randomness is available
    pub fn create_with_new_key(reveal_intersection: bool) -> Result<Self> {
        Ok(Self {
            key: KeyMaterial::create_with_new_key()?,
            reveal_intersection,
        })
    }

    /// Create a server whose key is drawn from `rng`.
    pub fn create_with_rng<R: RngCore + CryptoRng + ?Sized>(
        rng: &mut R,
        reveal_intersection: bool,
    ) -> Result<Self> {
        Ok(Self {
            key: KeyMaterial::create_with_rng(rng)?,
            reveal_intersection,
        })
    }

    /// Create a server from an exported key.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidKey` if `key_bytes` is not a valid key
    pub fn create_from_key(key_bytes: &[u8], reveal_intersection: bool) -> Result<Self> {
        Ok(Self {
            key: KeyMaterial::create_from_key(key_bytes)?,
            reveal_intersection,
        })
    }

    /// Build the setup message for the server's items.
    ///
    /// Encrypts every item under the server key and packs the result with
    /// `data_structure`, sized so that a client with `num_client_inputs`
    /// items sees at most `fpr` false positives in expectation.
    ///
    /// # Arguments
    /// * `fpr` - False-positive budget, in (0,1)
    /// * `num_client_inputs` - Expected client set size, positive
    /// * `items` - The server's private set
    /// * `data_structure` - Encoding to use
    ///
    /// # Errors
    /// Returns `PsiError::InvalidArgument` if `fpr` or `num_client_inputs`
    /// is out of range
    #[instrument(
        level = "debug",
        skip_all,
        fields(
            num_items = items.len(),
            fpr = fpr,
            num_client_inputs = num_client_inputs,
            data_structure = %data_structure
        )
    )]
    pub fn create_setup_message<T: AsRef<[u8]> + Sync>(
        &self,
        fpr: f64,
        num_client_inputs: usize,
        items: &[T],
        data_structure: DataStructure,
    ) -> Result<ServerSetup> {
        let params = SetupParameters::new(fpr, num_client_inputs, data_structure)?;
        self.setup_message_with(&params, items)
    }

    /// Same as [`create_setup_message`](Self::create_setup_message), taking
    /// the parameters from a [`SetupParameters`] value.
    pub fn setup_message_with<T: AsRef<[u8]> + Sync>(
        &self,
        params: &SetupParameters,
        items: &[T],
    ) -> Result<ServerSetup> {
        params.validate()?;
        let encrypted = encrypt_batch(&self.key, items);
        let encoding = SetEncoding::create(
            params.data_structure,
            params.fpr,
            params.num_client_inputs,
            encrypted,
        )?;
        debug!(
            data_structure = %params.data_structure,
            encoded_len = encoding.encoded_len(),
            "built setup message"
        );
        Ok(ServerSetup::new(params.fpr, params.num_client_inputs, encoding))
    }

    /// Re-encrypt a client request under the server key.
    ///
    /// When the intersection is not revealed the re-encrypted elements are
    /// sorted, so the client learns only how many of them match.
    ///
    /// # Errors
    /// * `PsiError::InvalidArgument` if the request's `reveal_intersection`
    ///   differs from the server's
    /// * `PsiError::InvalidElement` if any element is not a valid point; no
    ///   partial response is returned
    #[instrument(
        level = "debug",
        skip_all,
        fields(num_elements = request.len(), reveal = request.reveal_intersection)
    )]
    pub fn process_request(&self, request: &Request) -> Result<Response> {
        if request.reveal_intersection != self.reveal_intersection {
            return Err(PsiError::InvalidArgument(format!(
                "client expects `reveal_intersection` = {}, but it is actually {}",
                request.reveal_intersection, self.reveal_intersection
            )));
        }

        let mut encrypted = re_encrypt_batch(&self.key, &request.encrypted_elements)?;
        if !self.reveal_intersection {
            encrypted.par_sort_unstable();
        }
        Ok(Response::new(encrypted))
    }

    /// Export the server's private key.
    ///
    /// **Do not send this key to any other party!**
    pub fn export_key_bytes(&self) -> [u8; KEY_LEN] {
        self.key.export_key_bytes()
    }

    pub fn reveal_intersection(&self) -> bool {
        self.reveal_intersection
    }
}
