//! Core types shared across the Keyward approval broker.
//!
//! This crate defines the vocabulary every other crate speaks:
//! - [`SecretRef`] — a parsed secret reference (vault / item / field)
//! - [`RequestId`] — the 16-hex-character identifier of a pending approval
//! - [`CallbackData`] — the `ag:<verb>:<id>` token carried by channel
//!   callbacks
//!
//! It deliberately has no async machinery and no I/O; everything here is
//! plain data.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod callback;
mod reference;
mod request;

pub use callback::{CallbackData, CallbackDataError};
pub use reference::SecretRef;
pub use request::{RequestId, RequestIdError};
