// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted credential vault for Strongbox.
//!
//! Credentials are sealed with AES-256-GCM under a content-decryption key
//! (CDK). The CDK is derived with HKDF-SHA256 from a versioned
//! key-encryption key (KEK), which is stored only in hardware-wrapped form.
//! Reading any KEK requires a fresh presence proof from the user.
//!
//! [`VaultEngine`] is the entry point. Platform services are injected
//! through [`Collaborators`]; this crate ships software implementations of
//! each (see [`SoftwareKeyAdapter`], [`PasscodeAuthenticator`], and
//! [`Pbkdf2PinProvider`]).

pub mod credential;
pub mod crypto;
pub mod encoding;
pub mod engine;
pub mod hardware;
pub mod hierarchy;
pub mod kdf;
pub mod metadata;
pub mod passcode;
pub mod pin;
pub mod prompt;
pub mod rotation;
pub mod session;

pub use credential::{Credential, CredentialSummary, CredentialUpdate};
pub use crypto::{CodecError, EncryptedRecord};
pub use engine::{Collaborators, EngineSettings, ListOutcome, VaultEngine, VaultStats};
pub use hardware::SoftwareKeyAdapter;
pub use hierarchy::KeyHierarchy;
pub use kdf::ContentKey;
pub use passcode::PasscodeAuthenticator;
pub use pin::Pbkdf2PinProvider;
pub use prompt::{PasscodePrompt, TtyPrompt};
pub use rotation::RotationReport;
pub use session::SessionController;

/// Mask a secret for display, keeping only the last four characters.
///
/// Returns `"****"` for values of four characters or fewer.
pub fn mask_secret(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = value.chars().skip(count - 4).collect();
    format!("****{tail}")
}
