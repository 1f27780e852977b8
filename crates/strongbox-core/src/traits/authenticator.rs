// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence authenticator trait (biometric, device passcode, ...).

use async_trait::async_trait;

use crate::error::PresenceFailure;
use crate::types::PresenceProof;

/// Prompts the user and certifies their presence.
///
/// `authenticate` may suspend for a long time while the user interacts with a
/// prompt. Dropping the returned future cancels the request. Lockout after
/// repeated failed checks is the implementor's responsibility; callers treat
/// [`PresenceFailure::LockedOut`] as terminal for the current call.
#[async_trait]
pub trait PresenceAuthenticator: Send + Sync {
    /// Ask the user to confirm presence for `reason`.
    async fn authenticate(&self, reason: &str) -> Result<PresenceProof, PresenceFailure>;
}
