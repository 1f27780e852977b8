// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces through which the vault core consumes its collaborators.
//!
//! Implementations are constructed once at process start and handed to the
//! vault engine as `Arc<dyn Trait>`; async traits use `#[async_trait]` for
//! dynamic dispatch compatibility.

pub mod authenticator;
pub mod clock;
pub mod hardware;
pub mod pin;
pub mod store;

pub use authenticator::PresenceAuthenticator;
pub use clock::{Clock, SystemClock};
pub use hardware::HardwareKeyAdapter;
pub use pin::PinKeyProvider;
pub use store::KeyValueStore;
