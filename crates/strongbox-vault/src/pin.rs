// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alternate PIN unlock path.
//!
//! The PIN never wraps a KEK directly. A random PIN secret is stored twice:
//! sealed under a PBKDF2 key derived from the PIN, and wrapped by the
//! hardware adapter. Each KEK version is then sealed under the PIN secret.
//! The hardware copy lets rotation re-seal the new KEK without asking for
//! the PIN.

use std::num::NonZeroU32;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ring::pbkdf2;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strongbox_core::{KeyValueStore, Namespace, PinKeyProvider, StrongboxError};
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_LEN};
use crate::hierarchy::Kek;

const SECRET_KEY: &str = "secret";
const ATTEMPTS_KEY: &str = "attempts";
const SECRET_AAD: &[u8] = b"strongbox-pin-secret-v1";
const PIN_SALT_LEN: usize = 16;

fn kek_aad(version: u32) -> Vec<u8> {
    format!("strongbox-pin-kek-v{version}").into_bytes()
}

/// PBKDF2-HMAC-SHA256 PIN key derivation.
#[derive(Debug, Clone)]
pub struct Pbkdf2PinProvider {
    iterations: NonZeroU32,
}

impl Pbkdf2PinProvider {
    pub fn new(iterations: u32) -> Result<Self, StrongboxError> {
        let iterations = NonZeroU32::new(iterations).ok_or_else(|| {
            StrongboxError::Config("PIN iterations must be greater than zero".to_string())
        })?;
        Ok(Self { iterations })
    }
}

impl PinKeyProvider for Pbkdf2PinProvider {
    fn derive_key(
        &self,
        pin: &SecretString,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; 32]>, StrongboxError> {
        let mut out = Zeroizing::new([0u8; 32]);
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            salt,
            pin.expose_secret().as_bytes(),
            out.as_mut(),
        );
        Ok(out)
    }
}

/// The PIN secret, sealed two ways.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinSecretEnvelope {
    #[serde(with = "crate::encoding::b64")]
    pub salt: Vec<u8>,
    #[serde(with = "crate::encoding::b64")]
    pub nonce: Vec<u8>,
    #[serde(with = "crate::encoding::b64")]
    pub sealed_secret: Vec<u8>,
    #[serde(with = "crate::encoding::b64")]
    pub hardware_wrapped_secret: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// A KEK version sealed under the PIN secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PinWrappedKek {
    version: u32,
    #[serde(with = "crate::encoding::b64")]
    nonce: Vec<u8>,
    #[serde(with = "crate::encoding::b64")]
    ciphertext: Vec<u8>,
}

/// Random key that the PIN unlocks. Zeroized on drop.
pub struct PinSecret(Zeroizing<[u8; KEY_LEN]>);

impl PinSecret {
    pub fn generate() -> Result<Self, StrongboxError> {
        Ok(Self(crypto::generate_random_key()?))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, StrongboxError> {
        let arr: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| StrongboxError::KeySizeInvalid { len: bytes.len() })?;
        Ok(Self(Zeroizing::new(arr)))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for PinSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PinSecret([REDACTED])")
    }
}

/// Fresh random salt for PIN key derivation.
pub fn new_pin_salt() -> Result<Vec<u8>, StrongboxError> {
    crypto::random_bytes(PIN_SALT_LEN)
}

impl PinSecretEnvelope {
    /// Seal `secret` under `pin_key`. `hardware_wrapped_secret` comes from the adapter.
    pub fn seal(
        secret: &PinSecret,
        pin_key: &[u8; 32],
        salt: Vec<u8>,
        hardware_wrapped_secret: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<Self, StrongboxError> {
        let (sealed_secret, nonce) = crypto::seal(pin_key, secret.as_bytes(), SECRET_AAD)?;
        Ok(Self {
            salt,
            nonce: nonce.to_vec(),
            sealed_secret,
            hardware_wrapped_secret,
            created_at: now,
        })
    }

    /// Open with a PIN-derived key. `None` means the PIN was wrong.
    pub fn open(&self, pin_key: &[u8; 32]) -> Result<Option<PinSecret>, StrongboxError> {
        match crypto::open(pin_key, &self.nonce, &self.sealed_secret, SECRET_AAD) {
            Ok(bytes) => Ok(Some(PinSecret::from_slice(&bytes)?)),
            Err(StrongboxError::IntegrityViolation(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StrongboxError> {
        let Some(raw) = store.get(Namespace::Pin, SECRET_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StrongboxError::MalformedRecord(format!("PIN envelope: {e}")))
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<(), StrongboxError> {
        let bytes = serde_json::to_vec(self).map_err(StrongboxError::storage)?;
        store.put(Namespace::Pin, SECRET_KEY, &bytes).await
    }
}

/// Seal `kek` under the PIN secret and store it for `version`.
pub async fn store_kek(
    store: &dyn KeyValueStore,
    secret: &PinSecret,
    kek: &Kek,
    version: u32,
) -> Result<(), StrongboxError> {
    let (ciphertext, nonce) = crypto::seal(secret.as_bytes(), kek.as_bytes(), &kek_aad(version))?;
    let blob = PinWrappedKek {
        version,
        nonce: nonce.to_vec(),
        ciphertext,
    };
    let bytes = serde_json::to_vec(&blob).map_err(StrongboxError::storage)?;
    store
        .put(Namespace::Pin, &version.to_string(), &bytes)
        .await
}

/// Load and open the PIN-sealed KEK for `version`.
pub async fn load_kek(
    store: &dyn KeyValueStore,
    secret: &PinSecret,
    version: u32,
) -> Result<Zeroizing<Vec<u8>>, StrongboxError> {
    let raw = store
        .get(Namespace::Pin, &version.to_string())
        .await?
        .ok_or(StrongboxError::KeyNotFound { version })?;
    let blob: PinWrappedKek = serde_json::from_slice(&raw)
        .map_err(|e| StrongboxError::MalformedRecord(format!("PIN-wrapped KEK: {e}")))?;
    if blob.version != version {
        return Err(StrongboxError::IntegrityViolation(
            "PIN-wrapped KEK version mismatch".to_string(),
        ));
    }
    crypto::open(secret.as_bytes(), &blob.nonce, &blob.ciphertext, &kek_aad(version))
}

/// Remove the PIN-sealed KEK for one version.
pub async fn delete_kek(store: &dyn KeyValueStore, version: u32) -> Result<(), StrongboxError> {
    store.delete(Namespace::Pin, &version.to_string()).await
}

/// Remove every PIN artifact.
pub async fn clear(store: &dyn KeyValueStore) -> Result<(), StrongboxError> {
    for key in store.keys(Namespace::Pin).await? {
        store.delete(Namespace::Pin, &key).await?;
    }
    Ok(())
}

/// Failed-attempt counter with a cooldown lockout.
///
/// Persisted next to the PIN material so the lockout holds across engines
/// and process restarts.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAttempts {
    failures: u32,
    locked_until: Option<DateTime<Utc>>,
}

impl PinAttempts {
    pub async fn load(store: &dyn KeyValueStore) -> Result<Self, StrongboxError> {
        let Some(raw) = store.get(Namespace::Pin, ATTEMPTS_KEY).await? else {
            return Ok(Self::default());
        };
        serde_json::from_slice(&raw)
            .map_err(|e| StrongboxError::MalformedRecord(format!("PIN attempt state: {e}")))
    }

    pub async fn save(&self, store: &dyn KeyValueStore) -> Result<(), StrongboxError> {
        let bytes = serde_json::to_vec(self).map_err(StrongboxError::storage)?;
        store.put(Namespace::Pin, ATTEMPTS_KEY, &bytes).await
    }

    /// Forget every recorded failure.
    pub async fn clear(store: &dyn KeyValueStore) -> Result<(), StrongboxError> {
        store.delete(Namespace::Pin, ATTEMPTS_KEY).await
    }

    pub fn is_clean(&self) -> bool {
        self.failures == 0 && self.locked_until.is_none()
    }

    /// Fails with `PinLockedOut` while a lockout is in force.
    pub fn check(&mut self, now: DateTime<Utc>) -> Result<(), StrongboxError> {
        match self.locked_until {
            Some(until) if now < until => Err(StrongboxError::PinLockedOut {
                retry_after: (until - now).to_std().unwrap_or(Duration::ZERO),
            }),
            Some(_) => {
                self.locked_until = None;
                self.failures = 0;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Count a failure and return the error to surface.
    pub fn record_failure(
        &mut self,
        now: DateTime<Utc>,
        max_attempts: u32,
        lockout: Duration,
    ) -> StrongboxError {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= max_attempts {
            let lockout_delta =
                chrono::Duration::from_std(lockout).unwrap_or(chrono::Duration::MAX);
            self.locked_until = Some(now.checked_add_signed(lockout_delta).unwrap_or(now));
            self.failures = 0;
            StrongboxError::PinLockedOut {
                retry_after: lockout,
            }
        } else {
            StrongboxError::InvalidPin {
                remaining_attempts: max_attempts - self.failures,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use strongbox_test_utils::MemoryStore;

    use super::*;

    fn provider() -> Pbkdf2PinProvider {
        Pbkdf2PinProvider::new(1_000).unwrap()
    }

    #[test]
    fn pbkdf2_is_deterministic_and_salted() {
        let p = provider();
        let pin = SecretString::from("4821");
        let a = p.derive_key(&pin, b"salt-one-16bytes").unwrap();
        let b = p.derive_key(&pin, b"salt-one-16bytes").unwrap();
        let c = p.derive_key(&pin, b"salt-two-16bytes").unwrap();
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }

    #[test]
    fn zero_iterations_rejected() {
        assert!(matches!(
            Pbkdf2PinProvider::new(0),
            Err(StrongboxError::Config(_))
        ));
    }

    #[test]
    fn envelope_opens_only_with_right_pin() {
        let p = provider();
        let salt = new_pin_salt().unwrap();
        let right = p.derive_key(&SecretString::from("4821"), &salt).unwrap();
        let wrong = p.derive_key(&SecretString::from("0000"), &salt).unwrap();

        let secret = PinSecret::generate().unwrap();
        let env = PinSecretEnvelope::seal(&secret, &right, salt, vec![1, 2, 3], Utc::now()).unwrap();

        let opened = env.open(&right).unwrap().unwrap();
        assert_eq!(opened.as_bytes(), secret.as_bytes());
        assert!(env.open(&wrong).unwrap().is_none());
    }

    #[tokio::test]
    async fn kek_sealed_per_version() {
        let store = MemoryStore::new();
        let secret = PinSecret::generate().unwrap();
        let kek_bytes = crypto::generate_random_key().unwrap();
        let kek = Kek::from_slice(kek_bytes.as_slice()).unwrap();

        store_kek(&store, &secret, &kek, 4).await.unwrap();
        let opened = load_kek(&store, &secret, 4).await.unwrap();
        assert_eq!(opened.as_slice(), kek_bytes.as_slice());

        assert!(matches!(
            load_kek(&store, &secret, 5).await,
            Err(StrongboxError::KeyNotFound { version: 5 })
        ));

        delete_kek(&store, 4).await.unwrap();
        assert!(store.raw_get(Namespace::Pin, "4").is_none());
    }

    #[test]
    fn attempts_lock_out_after_max() {
        let now = Utc::now();
        let mut attempts = PinAttempts::default();
        let lockout = Duration::from_secs(300);

        assert!(matches!(
            attempts.record_failure(now, 3, lockout),
            StrongboxError::InvalidPin { remaining_attempts: 2 }
        ));
        assert!(matches!(
            attempts.record_failure(now, 3, lockout),
            StrongboxError::InvalidPin { remaining_attempts: 1 }
        ));
        assert!(matches!(
            attempts.record_failure(now, 3, lockout),
            StrongboxError::PinLockedOut { .. }
        ));

        assert!(matches!(
            attempts.check(now + chrono::Duration::seconds(100)),
            Err(StrongboxError::PinLockedOut { retry_after }) if retry_after == Duration::from_secs(200)
        ));
        assert!(attempts.check(now + chrono::Duration::seconds(300)).is_ok());
    }

    #[tokio::test]
    async fn attempt_state_survives_reload() {
        let store = MemoryStore::new();
        let now = Utc::now();
        assert!(PinAttempts::load(&store).await.unwrap().is_clean());

        let mut attempts = PinAttempts::default();
        attempts.record_failure(now, 2, Duration::from_secs(60));
        attempts.record_failure(now, 2, Duration::from_secs(60));
        attempts.save(&store).await.unwrap();

        let mut reloaded = PinAttempts::load(&store).await.unwrap();
        assert_eq!(reloaded, attempts);
        assert!(matches!(
            reloaded.check(now),
            Err(StrongboxError::PinLockedOut { .. })
        ));

        PinAttempts::clear(&store).await.unwrap();
        assert!(store.raw_get(Namespace::Pin, "attempts").is_none());
    }
}
