//! # Private Set Intersection (PSI) Engine
//!
//! This library implements two-party Private Set Intersection using
//! Elliptic Curve Diffie-Hellman (ECDH) on the Ristretto group
//! (curve25519-dalek).
//!
//! A **client** holding a set C and a **server** holding a set S compute
//! either the intersection C∩S (as indices into the client's input) or only
//! its size |C∩S|. Neither party learns anything else about the other's
//! set, assuming both follow the protocol (semi-honest model).
//!
//! ## Features
//!
//! - **Transport Agnostic**: The library produces and consumes messages but
//!   leaves their delivery to the caller.
//! - **Serialization Agnostic**: Every message derives serde's
//!   `Serialize`/`Deserialize`; pick any format (JSON, bincode, CBOR).
//! - **Compact Server Setup**: The server's set can be sent as a raw sorted
//!   list, a Bloom filter, or a Golomb-compressed set (GCS), trading size
//!   against a configurable false-positive rate.
//! - **Cardinality Mode**: With `reveal_intersection = false` the client
//!   learns only how many of its items are shared.
//! - **Parallel**: Batch encryption and set encoding run on rayon.
//!
//! ## Protocol Overview
//!
//! 1. **Request**: The client encrypts its items under its own key.
//! 2. **Setup**: The server encrypts its items under its own key and packs
//!    them into the chosen data structure. One setup serves any number of
//!    requests.
//! 3. **Response**: The server re-encrypts every request element under its
//!    key. When only the size is revealed, it also sorts them.
//! 4. **Intersection**: The client removes its own key from each response
//!    element, leaving its items encrypted under the server key alone, and
//!    looks them up in the setup's encoding.
//!
//! ## Example Usage
//!
//! ```rust
//! use psi_engine::{DataStructure, PsiClient, PsiError, PsiServer};
//!
//! let client = PsiClient::create_with_new_key(true)?;
//! let server = PsiServer::create_with_new_key(true)?;
//!
//! let client_items = ["apple", "banana", "cherry"];
//! let server_items = ["banana", "date", "apple"];
//!
//! // Client -> Server
//! let request = client.create_request(&client_items)?;
//!
//! // Server -> Client
//! let setup = server.create_setup_message(
//!     1e-6,
//!     client_items.len(),
//!     &server_items,
//!     DataStructure::Gcs,
//! )?;
//! let response = server.process_request(&request)?;
//!
//! let intersection = client.get_intersection(&setup, &response)?;
//! assert_eq!(intersection, vec![0, 1]);
//! # Ok::<(), PsiError>(())
//! ```
//!
//! ## Security Considerations
//!
//! - Messages MUST travel over an authenticated, encrypted channel (e.g. TLS)
//!   in production; the protocol does not authenticate the parties.
//! - Bloom filter and GCS setups may report false positives, at most `fpr`
//!   in expectation over the whole client set. Raw setups are exact.
//! - Exported keys are secret and must never be sent to the other party.
//!
//! ## Modules
//!
//! - [`client`] - Client protocol engine
//! - [`server`] - Server protocol engine
//! - [`messages`] - Message types for protocol exchange
//! - [`datastructure`] - Encodings of the server's set
//! - [`config`] - Setup parameters
//! - [`cipher`] - Commutative element encryption
//! - [`key`] - Private key material
//! - [`crypto`] - Curve and hashing primitives
//! - [`error`] - Error types

pub use client::PsiClient;
pub use config::SetupParameters;
pub use crypto::{EncryptedElement, ELEMENT_LEN, KEY_LEN};
pub use datastructure::{DataStructure, SetEncoding};
pub use error::{PsiError, Result};
pub use key::KeyMaterial;
pub use messages::{Request, Response, ServerSetup};
pub use server::PsiServer;

pub mod cipher;
pub mod client;
pub mod config;
pub mod crypto;
pub mod datastructure;
pub mod error;
pub mod key;
pub mod messages;
pub mod server;

/// Integration tests for the full PSI protocol.
#[cfg(test)]
mod integration_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn items(prefix: &str, range: impl Iterator<Item = usize>) -> Vec<String> {
        range.map(|i| format!("{} {}", prefix, i)).collect()
    }

    /// Runs one full exchange and returns the client's matches.
    ///
    /// In size-only mode the matches are just `0..size`.
    fn run_protocol(
        client_items: &[String],
        server_items: &[String],
        fpr: f64,
        data_structure: DataStructure,
        reveal: bool,
    ) -> Vec<usize> {
        let client = PsiClient::create_with_new_key(reveal).unwrap();
        let server = PsiServer::create_with_new_key(reveal).unwrap();

        let setup = server
            .create_setup_message(fpr, client_items.len().max(1), server_items, data_structure)
            .unwrap();
        let request = client.create_request(client_items).unwrap();
        let response = server.process_request(&request).unwrap();
        assert_eq!(response.len(), request.len());

        let size = client.get_intersection_size(&setup, &response).unwrap();
        if reveal {
            let intersection = client.get_intersection(&setup, &response).unwrap();
            assert_eq!(intersection.len(), size);
            intersection
        } else {
            (0..size).collect()
        }
    }

    #[test]
    fn test_full_protocol_every_mode() {
        let client_items = items("Element", 0..20);
        let server_items = items("Element", 10..40);

        for ds in DataStructure::ALL {
            for reveal in [false, true] {
                let result = run_protocol(&client_items, &server_items, 1e-9, ds, reveal);
                if reveal {
                    assert_eq!(result, (10..20).collect::<Vec<_>>(), "{} reveal", ds);
                } else {
                    assert_eq!(result.len(), 10, "{} size only", ds);
                }
            }
        }
    }

    #[test]
    fn test_asymmetric_set_sizes() {
        // 1000 client items against 10 server items
        let client_items = items("Element", 0..1000);
        let server_items = items("Element", (0..10).map(|i| 2 * i));
        let expected: Vec<usize> = (0..10).map(|i| 2 * i).collect();

        for ds in DataStructure::ALL {
            let result = run_protocol(&client_items, &server_items, 1e-9, ds, true);
            assert_eq!(result, expected, "wrong intersection for {}", ds);
        }
    }

    #[test]
    fn test_half_overlap_size() {
        let client_items = items("Element", 0..100);
        let server_items = items("Element", (0..100).map(|i| 2 * i));

        for ds in DataStructure::ALL {
            let size = run_protocol(&client_items, &server_items, 0.01, ds, false).len();
            assert!((50..=55).contains(&size), "{}: size {} out of range", ds, size);
        }
    }

    #[test]
    fn test_disjoint_sets() {
        let client_items = items("Element", 0..100);
        let server_items = items("Other", 0..100);

        for ds in DataStructure::ALL {
            assert!(run_protocol(&client_items, &server_items, 1e-6, ds, true).is_empty());
            assert!(run_protocol(&client_items, &server_items, 1e-6, ds, false).is_empty());
        }
    }

    #[test]
    fn test_false_positive_expectation_over_trials() {
        // 100 client items, 1000 disjoint server items, fresh keys per trial
        const TRIALS: usize = 20;
        let fpr = 0.01;
        let client_items = items("Element", 0..100);
        let server_items = items("Other", 0..1000);

        for ds in [DataStructure::BloomFilter, DataStructure::Gcs] {
            let total: usize = (0..TRIALS)
                .map(|_| run_protocol(&client_items, &server_items, fpr, ds, false).len())
                .sum();
            let mean = total as f64 / TRIALS as f64;
            // Expected mean is at most fpr; the slack absorbs a couple of hits
            assert!(mean <= fpr + 0.15, "{}: {} false positives over {} trials", ds, total, TRIALS);
        }
    }

    #[test]
    fn test_false_positive_bound_large_client_set() {
        let client_items = items("Other", 0..1000);
        let server_items = items("Element", 0..100);

        for ds in DataStructure::ALL {
            let false_positives =
                run_protocol(&client_items, &server_items, 0.01, ds, true).len();
            assert!(false_positives <= 2, "{}: {} false positives", ds, false_positives);
        }
    }

    #[test]
    fn test_empty_sets() {
        let none: Vec<String> = vec![];
        let some = items("Element", 0..5);

        for ds in DataStructure::ALL {
            assert!(run_protocol(&none, &some, 0.01, ds, true).is_empty());
            assert!(run_protocol(&some, &none, 0.01, ds, true).is_empty());
        }
    }

    #[test]
    fn test_duplicate_client_items() {
        let client_items = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let server_items = vec!["a".to_string()];
        let result = run_protocol(&client_items, &server_items, 1e-9, DataStructure::Raw, true);
        assert_eq!(result, vec![0, 2]);
    }

    #[test]
    fn test_reveal_flag_mismatch() {
        let client = PsiClient::create_with_new_key(false).unwrap();
        let server = PsiServer::create_with_new_key(true).unwrap();

        let request = client.create_request(&items("Element", 0..3)).unwrap();
        assert!(matches!(
            server.process_request(&request),
            Err(PsiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_size_only_client_cannot_get_intersection() {
        let client = PsiClient::create_with_new_key(false).unwrap();
        let server = PsiServer::create_with_new_key(false).unwrap();
        let client_items = items("Element", 0..10);

        let setup = server
            .create_setup_message(0.01, client_items.len(), &client_items, DataStructure::Gcs)
            .unwrap();
        let response = server
            .process_request(&client.create_request(&client_items).unwrap())
            .unwrap();

        assert!(matches!(
            client.get_intersection(&setup, &response),
            Err(PsiError::InvalidArgument(_))
        ));
        assert_eq!(client.get_intersection_size(&setup, &response).unwrap(), 10);
    }

    #[test]
    fn test_malformed_request_rejected() {
        let client = PsiClient::create_with_new_key(true).unwrap();
        let server = PsiServer::create_with_new_key(true).unwrap();

        let mut request = client.create_request(&items("Element", 0..5)).unwrap();
        request.encrypted_elements[3] = EncryptedElement([0xff; ELEMENT_LEN]);
        assert!(matches!(
            server.process_request(&request),
            Err(PsiError::InvalidElement { index: 3, .. })
        ));
    }

    #[test]
    fn test_seeded_parties_are_deterministic() {
        let client_items = items("Element", 0..10);
        let server_items = items("Element", 5..15);

        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let client = PsiClient::create_with_rng(&mut rng, true).unwrap();
            let server = PsiServer::create_with_rng(&mut rng, true).unwrap();
            let setup = server
                .create_setup_message(0.01, 10, &server_items, DataStructure::BloomFilter)
                .unwrap();
            let response = server
                .process_request(&client.create_request(&client_items).unwrap())
                .unwrap();
            (setup, response)
        };

        assert_eq!(run(42), run(42));
        assert_ne!(run(42).1, run(43).1);
    }

    #[test]
    fn test_restored_keys_reproduce_messages() {
        let client = PsiClient::create_with_new_key(true).unwrap();
        let server = PsiServer::create_with_new_key(true).unwrap();
        let restored_client = PsiClient::create_from_key(&client.export_key_bytes(), true).unwrap();
        let restored_server = PsiServer::create_from_key(&server.export_key_bytes(), true).unwrap();

        let client_items = items("Element", 0..8);
        assert_eq!(
            client.create_request(&client_items).unwrap(),
            restored_client.create_request(&client_items).unwrap()
        );
        assert_eq!(
            server
                .create_setup_message(0.01, 8, &client_items, DataStructure::Gcs)
                .unwrap(),
            restored_server
                .create_setup_message(0.01, 8, &client_items, DataStructure::Gcs)
                .unwrap()
        );
    }

    #[test]
    fn test_setup_parameters() {
        let server = PsiServer::create_with_new_key(true).unwrap();
        let client = PsiClient::create_with_new_key(true).unwrap();
        let client_items = items("Element", 0..50);
        let server_items = items("Element", 25..75);

        let params =
            SetupParameters::new(1e-6, client_items.len(), DataStructure::BloomFilter).unwrap();
        let setup = server.setup_message_with(&params, &server_items).unwrap();
        assert_eq!(setup.data_structure(), DataStructure::BloomFilter);

        let response = server
            .process_request(&client.create_request(&client_items).unwrap())
            .unwrap();
        assert_eq!(
            client.get_intersection(&setup, &response).unwrap(),
            (25..50).collect::<Vec<_>>()
        );

        let bad = SetupParameters {
            fpr: 0.0,
            ..params
        };
        assert!(matches!(
            server.setup_message_with(&bad, &server_items),
            Err(PsiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_messages_survive_serialization() {
        let client = PsiClient::create_with_new_key(true).unwrap();
        let server = PsiServer::create_with_new_key(true).unwrap();
        let client_items = items("Element", 0..30);
        let server_items = items("Element", (0..30).map(|i| 3 * i));

        for ds in DataStructure::ALL {
            let setup = server
                .create_setup_message(1e-9, client_items.len(), &server_items, ds)
                .unwrap();
            let request = client.create_request(&client_items).unwrap();

            let request: Request =
                serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
            let response = server.process_request(&request).unwrap();

            let setup_json = serde_json::to_vec(&setup).unwrap();
            let response_json = serde_json::to_vec(&response).unwrap();
            let setup: ServerSetup = serde_json::from_slice(&setup_json).unwrap();
            let response: Response = serde_json::from_slice(&response_json).unwrap();

            assert_eq!(
                client.get_intersection(&setup, &response).unwrap(),
                (0..10).map(|i| 3 * i).collect::<Vec<_>>(),
                "{} after serialization",
                ds
            );
        }
    }

    #[test]
    fn test_parties_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PsiClient>();
        assert_send_sync::<PsiServer>();
        assert_send_sync::<ServerSetup>();
    }
}
