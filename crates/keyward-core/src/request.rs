//! Pending-request identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for a pending approval request.
///
/// A 64-bit random value rendered as exactly 16 lowercase hex characters.
/// The rendered form is what travels in channel callback tokens, drop-file
/// names, and HTTP callback bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Mint a new random request id.
    #[must_use]
    pub fn new() -> Self {
        Self(rand::random::<u64>())
    }

    /// The raw 64-bit value.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Errors from parsing a request id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestIdError {
    /// The input was not exactly 16 characters long.
    #[error("request id must be exactly 16 hex characters, got {0}")]
    BadLength(usize),
    /// The input contained a character outside `[0-9a-f]`.
    #[error("request id must be lowercase hex")]
    BadCharacter,
}

impl FromStr for RequestId {
    type Err = RequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(RequestIdError::BadLength(s.len()));
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(RequestIdError::BadCharacter);
        }
        // Length and alphabet are checked above, so this cannot fail.
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| RequestIdError::BadCharacter)
    }
}

impl Serialize for RequestId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
