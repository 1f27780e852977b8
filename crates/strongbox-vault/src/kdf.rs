// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HKDF-SHA256 derivation of content-decryption keys from KEKs.

use std::fmt;

use ring::hkdf::{self, HKDF_SHA256, KeyType};
use strongbox_core::StrongboxError;
use zeroize::Zeroizing;

use crate::crypto::KEY_LEN;

/// Minimum accepted salt length for CDK derivation.
pub const MIN_SALT_LEN: usize = 16;

/// Salt length generated for new key versions.
pub const SALT_LEN: usize = 32;

/// Symmetric key that encrypts credential records. Zeroized on drop.
#[derive(Clone)]
pub struct ContentKey(Zeroizing<[u8; KEY_LEN]>);

impl ContentKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey([REDACTED])")
    }
}

/// HKDF info string for a key version.
pub fn cdk_info(version: u32) -> String {
    format!("strongbox-cdk-v{version}")
}

struct Len(usize);

impl KeyType for Len {
    fn len(&self) -> usize {
        self.0
    }
}

/// Derive a 256-bit CDK from `kek`, `salt`, and `info`.
///
/// Deterministic: identical inputs always yield the identical key.
pub fn derive_cdk(kek: &[u8], salt: &[u8], info: &str) -> Result<ContentKey, StrongboxError> {
    if kek.len() != KEY_LEN {
        return Err(StrongboxError::KeySizeInvalid { len: kek.len() });
    }
    if salt.len() < MIN_SALT_LEN {
        return Err(StrongboxError::MalformedRecord(format!(
            "key salt must be at least {MIN_SALT_LEN} bytes, got {}",
            salt.len()
        )));
    }

    let info = [info.as_bytes()];
    let prk = hkdf::Salt::new(HKDF_SHA256, salt).extract(kek);
    let okm = prk
        .expand(&info, Len(KEY_LEN))
        .map_err(|_| StrongboxError::Internal("HKDF expand failed".to_string()))?;

    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    okm.fill(out.as_mut())
        .map_err(|_| StrongboxError::Internal("HKDF fill failed".to_string()))?;
    Ok(ContentKey(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEK: [u8; 32] = [7u8; 32];
    const SALT: [u8; 32] = [9u8; 32];

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_cdk(&KEK, &SALT, &cdk_info(1)).unwrap();
        let b = derive_cdk(&KEK, &SALT, &cdk_info(1)).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.as_bytes().len(), KEY_LEN);
    }

    #[test]
    fn info_separates_versions() {
        let v1 = derive_cdk(&KEK, &SALT, &cdk_info(1)).unwrap();
        let v2 = derive_cdk(&KEK, &SALT, &cdk_info(2)).unwrap();
        assert_ne!(v1.as_bytes(), v2.as_bytes());
    }

    #[test]
    fn salt_and_kek_change_output() {
        let base = derive_cdk(&KEK, &SALT, "x").unwrap();
        let other_salt = derive_cdk(&KEK, &[1u8; 32], "x").unwrap();
        let other_kek = derive_cdk(&[1u8; 32], &SALT, "x").unwrap();
        assert_ne!(base.as_bytes(), other_salt.as_bytes());
        assert_ne!(base.as_bytes(), other_kek.as_bytes());
    }

    #[test]
    fn rejects_short_inputs() {
        assert!(matches!(
            derive_cdk(&[0u8; 16], &SALT, "x"),
            Err(StrongboxError::KeySizeInvalid { len: 16 })
        ));
        assert!(matches!(
            derive_cdk(&KEK, &[0u8; 8], "x"),
            Err(StrongboxError::MalformedRecord(_))
        ));
    }

    #[test]
    fn info_string_format() {
        assert_eq!(cdk_info(3), "strongbox-cdk-v3");
    }

    #[test]
    fn debug_redacts_key() {
        let cdk = derive_cdk(&KEK, &SALT, "x").unwrap();
        assert_eq!(format!("{cdk:?}"), "ContentKey([REDACTED])");
    }
}
