use serde::{Deserialize, Serialize};

/// A key observed by the key-lookup service for a queried window.
///
/// This is a point sample, not a validity interval: rotation boundaries are
/// inferred by comparing successive samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub key: String,
}

/// Wire shape returned by the key-lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyResponse {
    pub keys: Vec<KeyRecord>,
}
