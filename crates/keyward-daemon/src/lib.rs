//! The Keyward approval broker daemon.
//!
//! Requests enter over a Unix socket ([`socket`]), are classified and
//! orchestrated by the [`broker`], and — for gated vaults — suspend on the
//! [`registry`] until a resolution arrives via the HTTP listener ([`http`]),
//! the drop-directory poller ([`poller`]), or any future ingress speaking
//! `registry.resolve(id, …)`.
//!
//! # Locking design
//!
//! The pending registry is the single rendezvous for resolutions: map
//! removal and resolver firing happen under one lock, so exactly-once
//! resolution holds even when the timer and a callback race. The cache and
//! registry locks are only ever held for map operations, never across an
//! await of provider or channel I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod broker;
pub mod cache;
pub mod http;
pub mod poller;
pub mod registry;
pub mod socket;
pub mod standing;
