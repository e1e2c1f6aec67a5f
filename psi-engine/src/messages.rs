//! Message types exchanged between the PSI client and server.
//!
//! All messages derive serde's `Serialize`/`Deserialize`; the wire format is
//! left to the caller. Elements are fixed 32-byte arrays, so any serde
//! format carries them bit-exactly.

use crate::crypto::EncryptedElement;
use crate::datastructure::{DataStructure, SetEncoding};
use serde::{Deserialize, Serialize};

/// Message sent from the client to the server.
///
/// Holds the client's items encrypted under the client key, in input order
/// with duplicates preserved, plus the client's output mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// One element per client input; position i is client input i
    pub encrypted_elements: Vec<EncryptedElement>,
    /// Whether the client expects the intersection itself or only its size
    pub reveal_intersection: bool,
}

impl Request {
    /// Create a new request.
    pub fn new(encrypted_elements: Vec<EncryptedElement>, reveal_intersection: bool) -> Self {
        Self {
            encrypted_elements,
            reveal_intersection,
        }
    }

    /// Returns the number of elements in this request.
    pub fn len(&self) -> usize {
        self.encrypted_elements.len()
    }

    /// Returns true if this request contains no elements.
    pub fn is_empty(&self) -> bool {
        self.encrypted_elements.is_empty()
    }
}

/// Setup message sent once from the server to the client.
///
/// Carries the server's items, encrypted under the server key and packed
/// into a [`SetEncoding`]. Reusable across any number of client requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSetup {
    /// False-positive budget the encoding was sized for
    pub fpr: f64,
    /// Client set size the encoding was sized for
    pub num_client_inputs: usize,
    pub encoding: SetEncoding,
}

impl ServerSetup {
    pub fn new(fpr: f64, num_client_inputs: usize, encoding: SetEncoding) -> Self {
        Self {
            fpr,
            num_client_inputs,
            encoding,
        }
    }

    /// Which data structure the encoding uses.
    pub fn data_structure(&self) -> DataStructure {
        self.encoding.data_structure()
    }
}

/// Message sent from the server in answer to a [`Request`].
///
/// Each element is a request element re-encrypted under the server key.
/// Same length as the request. The order matches the request only when
/// the intersection is revealed; otherwise the server sorts the elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub encrypted_elements: Vec<EncryptedElement>,
}

impl Response {
    pub fn new(encrypted_elements: Vec<EncryptedElement>) -> Self {
        Self { encrypted_elements }
    }

    /// Returns the number of elements in this response.
    pub fn len(&self) -> usize {
        self.encrypted_elements.len()
    }

    /// Returns true if this response contains no elements.
    pub fn is_empty(&self) -> bool {
        self.encrypted_elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructure::Raw;

    #[test]
    fn test_request_new() {
        let elements = vec![EncryptedElement([1u8; 32]), EncryptedElement([2u8; 32])];
        let request = Request::new(elements.clone(), true);
        assert_eq!(request.encrypted_elements, elements);
        assert_eq!(request.len(), 2);
        assert!(!request.is_empty());
        assert!(request.reveal_intersection);
    }

    #[test]
    fn test_request_empty() {
        let request = Request::new(vec![], false);
        assert_eq!(request.len(), 0);
        assert!(request.is_empty());
    }

    #[test]
    fn test_request_serde_round_trip() {
        let request = Request::new(vec![EncryptedElement([9u8; 32])], true);
        let json = serde_json::to_string(&request).unwrap();
        let restored: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, request);
    }

    #[test]
    fn test_response_serde_round_trip() {
        let response = Response::new(vec![
            EncryptedElement([3u8; 32]),
            EncryptedElement([4u8; 32]),
        ]);
        let json = serde_json::to_vec(&response).unwrap();
        let restored: Response = serde_json::from_slice(&json).unwrap();
        assert_eq!(restored, response);
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn test_server_setup_serde_round_trip() {
        let setup = ServerSetup::new(
            0.01,
            5,
            SetEncoding::Raw(Raw::create(vec![EncryptedElement([5u8; 32])])),
        );
        assert_eq!(setup.data_structure(), DataStructure::Raw);
        let json = serde_json::to_string(&setup).unwrap();
        let restored: ServerSetup = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, setup);
    }
}
