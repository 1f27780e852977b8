// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AEAD codec: AES-256-GCM records carrying a SHA-256 integrity digest.
//!
//! Every encryption draws a fresh random 96-bit nonce from the system CSPRNG.
//! Nonce reuse under one key would be catastrophic for GCM security.
//!
//! A record is checked twice on the way in. The digest over every serialized
//! field (including `version`) is compared first, with a full-length,
//! no-early-exit comparison, and only then is the AEAD box opened. Both
//! failures surface as [`CodecError::IntegrityViolation`].

use chrono::{DateTime, Utc};
use ring::aead::{Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey, AES_256_GCM};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use strongbox_core::StrongboxError;
use thiserror::Error;
use zeroize::Zeroizing;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// SHA-256 output length in bytes.
pub const DIGEST_LEN: usize = 32;

const DIGEST_DOMAIN: &[u8] = b"strongbox-record-digest-v1";

/// Errors produced by the codec. Closed; callers match exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid key size: expected {KEY_LEN} bytes, got {len}")]
    KeySizeInvalid { len: usize },

    #[error("integrity violation: {0}")]
    IntegrityViolation(&'static str),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// RNG or primitive failure unrelated to the record contents.
    #[error("cryptographic primitive failed: {0}")]
    Primitive(&'static str),
}

impl From<CodecError> for StrongboxError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::KeySizeInvalid { len } => StrongboxError::KeySizeInvalid { len },
            CodecError::IntegrityViolation(what) => StrongboxError::IntegrityViolation(what.into()),
            CodecError::MalformedRecord(what) => StrongboxError::MalformedRecord(what),
            CodecError::Primitive(what) => StrongboxError::Internal(what.into()),
        }
    }
}

/// One encrypted payload with its associated data and integrity proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    #[serde(with = "crate::encoding::b64")]
    pub nonce: Vec<u8>,
    #[serde(with = "crate::encoding::b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "crate::encoding::b64")]
    pub auth_tag: Vec<u8>,
    #[serde(with = "crate::encoding::b64")]
    pub aad: Vec<u8>,
    /// KEK/CDK generation that produced this record.
    pub version: u32,
    #[serde(with = "crate::encoding::b64")]
    pub integrity_digest: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl EncryptedRecord {
    /// SHA-256 over `nonce ∥ ciphertext ∥ auth_tag ∥ aad ∥ version`.
    ///
    /// Variable-length fields are length-prefixed so that bytes cannot be
    /// shifted between adjacent fields without changing the digest.
    fn compute_digest(&self) -> [u8; DIGEST_LEN] {
        let mut ctx = digest::Context::new(&digest::SHA256);
        ctx.update(DIGEST_DOMAIN);
        for field in [&self.nonce, &self.ciphertext, &self.auth_tag, &self.aad] {
            ctx.update(&(field.len() as u64).to_be_bytes());
            ctx.update(field);
        }
        ctx.update(&self.version.to_be_bytes());

        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(ctx.finish().as_ref());
        out
    }

    /// Whether the stored digest matches the record's fields.
    pub fn digest_matches(&self) -> bool {
        constant_time_eq(&self.compute_digest(), &self.integrity_digest)
    }
}

/// Encrypt `plaintext` under `key`, binding `aad`, and stamp the record with `version`.
pub fn encrypt(
    plaintext: &[u8],
    key: &[u8],
    aad: &[u8],
    version: u32,
) -> Result<EncryptedRecord, CodecError> {
    let aead_key = aead_key(key)?;
    let nonce_bytes = random_nonce()?;

    let mut in_out = plaintext.to_vec();
    let tag = aead_key
        .seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::from(aad),
            &mut in_out,
        )
        .map_err(|_| CodecError::Primitive("AES-256-GCM encryption failed"))?;

    let mut record = EncryptedRecord {
        nonce: nonce_bytes.to_vec(),
        ciphertext: in_out,
        auth_tag: tag.as_ref().to_vec(),
        aad: aad.to_vec(),
        version,
        integrity_digest: Vec::new(),
        timestamp: Utc::now(),
    };
    record.integrity_digest = record.compute_digest().to_vec();
    Ok(record)
}

/// Verify and decrypt `record` under `key`.
///
/// Pure function of its inputs; never retries.
pub fn decrypt(record: &EncryptedRecord, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    let aead_key = aead_key(key)?;

    if !record.digest_matches() {
        return Err(CodecError::IntegrityViolation("record digest mismatch"));
    }

    let nonce: [u8; NONCE_LEN] = record.nonce.as_slice().try_into().map_err(|_| {
        CodecError::MalformedRecord(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            record.nonce.len()
        ))
    })?;
    if record.auth_tag.len() != TAG_LEN {
        return Err(CodecError::MalformedRecord(format!(
            "auth tag must be {TAG_LEN} bytes, got {}",
            record.auth_tag.len()
        )));
    }

    let mut in_out = Zeroizing::new(Vec::with_capacity(record.ciphertext.len() + TAG_LEN));
    in_out.extend_from_slice(&record.ciphertext);
    in_out.extend_from_slice(&record.auth_tag);

    let plaintext_len = aead_key
        .open_in_place(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(record.aad.as_slice()),
            &mut in_out,
        )
        .map_err(|_| CodecError::IntegrityViolation("authentication tag or associated data rejected"))?
        .len();
    in_out.truncate(plaintext_len);

    Ok(in_out)
}

/// Seal `plaintext` for key wrapping. Returns `(ciphertext_with_tag, nonce)`.
pub fn seal(
    key: &[u8; KEY_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, [u8; NONCE_LEN]), StrongboxError> {
    let aead_key = aead_key(key)?;
    let nonce_bytes = random_nonce()?;

    let mut in_out = plaintext.to_vec();
    aead_key
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::from(aad),
            &mut in_out,
        )
        .map_err(|_| StrongboxError::Internal("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Open a blob produced by [`seal`]. A wrong key and tampered data are
/// indistinguishable and both return `IntegrityViolation`.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce_bytes: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, StrongboxError> {
    let aead_key = aead_key(key)?;
    let nonce: [u8; NONCE_LEN] = nonce_bytes
        .try_into()
        .map_err(|_| StrongboxError::MalformedRecord("wrapped blob nonce length".to_string()))?;

    let mut in_out = Zeroizing::new(ciphertext.to_vec());
    let len = aead_key
        .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::from(aad), &mut in_out)
        .map_err(|_| {
            StrongboxError::IntegrityViolation("wrapped key failed authentication".to_string())
        })?
        .len();
    in_out.truncate(len);
    Ok(in_out)
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<Zeroizing<[u8; KEY_LEN]>, StrongboxError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    SystemRandom::new()
        .fill(key.as_mut())
        .map_err(|_| StrongboxError::Internal("failed to generate random key".to_string()))?;
    Ok(key)
}

/// Fill a fresh buffer of `len` random bytes.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, StrongboxError> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| StrongboxError::Internal("failed to generate random bytes".to_string()))?;
    Ok(buf)
}

/// Compare two byte strings in time independent of where they differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn aead_key(key: &[u8]) -> Result<LessSafeKey, CodecError> {
    if key.len() != KEY_LEN {
        return Err(CodecError::KeySizeInvalid { len: key.len() });
    }
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| CodecError::Primitive("failed to create AES-256-GCM key"))?;
    Ok(LessSafeKey::new(unbound))
}

fn random_nonce() -> Result<[u8; NONCE_LEN], CodecError> {
    let mut nonce = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| CodecError::Primitive("failed to generate random nonce"))?;
    Ok(nonce)
}
