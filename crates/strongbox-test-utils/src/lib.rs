// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Strongbox.
//!
//! Provides in-process doubles for every external collaborator of the vault
//! core so tests run fast, deterministically, and without secure hardware.
//!
//! # Components
//!
//! - [`MemoryStore`] - in-memory key-value store with write fault injection
//! - [`FakeHardwareKeyAdapter`] - AES-GCM device key with availability toggle
//! - [`ScriptedAuthenticator`] - presence authenticator with scripted outcomes
//! - [`ManualClock`] - clock advanced explicitly by the test

pub mod authenticator;
pub mod clock;
pub mod hardware;
pub mod store;

pub use authenticator::ScriptedAuthenticator;
pub use clock::ManualClock;
pub use hardware::FakeHardwareKeyAdapter;
pub use store::MemoryStore;
