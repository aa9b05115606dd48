//! The callback-data token recognised by every callback ingress.
//!
//! Channels embed this token in their prompts (e.g. as Telegram inline
//! keyboard callback data); the HTTP `/channel-callback` endpoint and the
//! session-file tailer deliver it back verbatim.

use crate::request::{RequestId, RequestIdError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Token prefix shared by all callback data.
const PREFIX: &str = "ag";

/// A parsed callback token: `ag:approve:<id>` or `ag:deny:<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    /// The operator approved the request.
    Approve(RequestId),
    /// The operator denied the request.
    Deny(RequestId),
}

impl CallbackData {
    /// The request id the token refers to.
    #[must_use]
    pub fn request_id(self) -> RequestId {
        match self {
            Self::Approve(id) | Self::Deny(id) => id,
        }
    }

    /// Whether the token is an approval.
    #[must_use]
    pub fn approved(self) -> bool {
        matches!(self, Self::Approve(_))
    }
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve(id) => write!(f, "{PREFIX}:approve:{id}"),
            Self::Deny(id) => write!(f, "{PREFIX}:deny:{id}"),
        }
    }
}

/// Errors from parsing a callback token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackDataError {
    /// The token did not have the `ag:<verb>:<id>` shape.
    #[error("malformed callback data")]
    Malformed,
    /// The verb was neither `approve` nor `deny`.
    #[error("unknown callback verb '{0}'")]
    UnknownVerb(String),
    /// The id segment was not a valid request id.
    #[error("invalid request id in callback data: {0}")]
    BadId(#[from] RequestIdError),
}

impl FromStr for CallbackData {
    type Err = CallbackDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (prefix, verb, id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(v), Some(i)) => (p, v, i),
            _ => return Err(CallbackDataError::Malformed),
        };
        if prefix != PREFIX {
            return Err(CallbackDataError::Malformed);
        }
        let id: RequestId = id.parse()?;
        match verb {
            "approve" => Ok(Self::Approve(id)),
            "deny" => Ok(Self::Deny(id)),
            other => Err(CallbackDataError::UnknownVerb(other.to_string())),
        }
    }
}
