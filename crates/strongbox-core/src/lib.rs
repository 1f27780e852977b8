// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Strongbox credential vault.
//!
//! This crate provides the error taxonomy, the narrow interfaces through which
//! the vault core consumes its external collaborators (presence authentication,
//! hardware-bound key wrapping, durable key-value storage, PIN key derivation,
//! and time), and the small types shared across those seams.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{PresenceFailure, StrongboxError};
pub use types::{Namespace, PresenceProof, PRESENCE_PROOF_MAX_AGE};

pub use traits::{
    Clock, HardwareKeyAdapter, KeyValueStore, PinKeyProvider, PresenceAuthenticator, SystemClock,
};
