// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PIN-derived key provider for the alternate unlock path.

use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::error::StrongboxError;

/// Derives a 256-bit wrapping key from a user PIN.
///
/// Implementations must use a slow, salted, iterated construction. The call
/// is CPU-bound and may take hundreds of milliseconds.
pub trait PinKeyProvider: Send + Sync {
    fn derive_key(
        &self,
        pin: &SecretString,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; 32]>, StrongboxError>;
}
