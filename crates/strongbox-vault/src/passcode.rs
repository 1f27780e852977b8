// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device passcode presence authenticator.
//!
//! Stands in for a platform biometric prompt on machines without one. The
//! passcode is never stored; an Argon2id verifier is kept in
//! [`Namespace::Auth`] together with a persisted failure counter, so the
//! lockout survives process restarts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strongbox_config::model::PasscodeConfig;
use strongbox_core::{
    Clock, KeyValueStore, Namespace, PresenceAuthenticator, PresenceFailure, PresenceProof,
    StrongboxError,
};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{self, constant_time_eq};
use crate::prompt::PasscodePrompt;

const VERIFIER_KEY: &str = "passcode";
const LOCKOUT_KEY: &str = "lockout";
const ARGON2_SALT_LEN: usize = 16;

/// Minimum accepted passcode length at enrollment.
pub const MIN_PASSCODE_LEN: usize = 4;

/// Derive a 32-byte key from `passcode` using Argon2id.
pub fn derive_key(
    passcode: &[u8],
    salt: &[u8; ARGON2_SALT_LEN],
    memory_cost: u32,
    iterations: u32,
    parallelism: u32,
) -> Result<Zeroizing<[u8; 32]>, StrongboxError> {
    let params = argon2::Params::new(memory_cost, iterations, parallelism, Some(32))
        .map_err(|e| StrongboxError::Config(format!("invalid Argon2id parameters: {e}")))?;
    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passcode, salt, output.as_mut())
        .map_err(|e| StrongboxError::Internal(format!("Argon2id derivation failed: {e}")))?;
    Ok(output)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PasscodeVerifier {
    #[serde(with = "crate::encoding::b64")]
    salt: Vec<u8>,
    #[serde(with = "crate::encoding::b64")]
    verifier: Vec<u8>,
    memory_cost: u32,
    iterations: u32,
    parallelism: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LockoutState {
    failed_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
}

/// Presence authenticator backed by a locally enrolled passcode.
pub struct PasscodeAuthenticator {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    prompt: Arc<dyn PasscodePrompt>,
    config: PasscodeConfig,
}

impl PasscodeAuthenticator {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        prompt: Arc<dyn PasscodePrompt>,
        config: PasscodeConfig,
    ) -> Self {
        Self {
            store,
            clock,
            prompt,
            config,
        }
    }

    pub async fn is_enrolled(&self) -> Result<bool, StrongboxError> {
        self.store.exists(Namespace::Auth, VERIFIER_KEY).await
    }

    /// Store a verifier for `passcode`, replacing any previous one.
    pub async fn enroll(&self, passcode: &SecretString) -> Result<(), StrongboxError> {
        if passcode.expose_secret().chars().count() < MIN_PASSCODE_LEN {
            return Err(StrongboxError::Config(format!(
                "passcode must be at least {MIN_PASSCODE_LEN} characters"
            )));
        }

        let salt: [u8; ARGON2_SALT_LEN] = crypto::random_bytes(ARGON2_SALT_LEN)?
            .try_into()
            .map_err(|_| StrongboxError::Internal("salt length".to_string()))?;
        let (m, t, p) = (
            self.config.kdf_memory_cost,
            self.config.kdf_iterations,
            self.config.kdf_parallelism,
        );
        let secret = SecretString::from(passcode.expose_secret().to_owned());
        let key = tokio::task::spawn_blocking(move || {
            derive_key(secret.expose_secret().as_bytes(), &salt, m, t, p)
        })
        .await
        .map_err(|e| StrongboxError::Internal(format!("key derivation task failed: {e}")))??;

        let verifier = PasscodeVerifier {
            salt: salt.to_vec(),
            verifier: key.to_vec(),
            memory_cost: m,
            iterations: t,
            parallelism: p,
        };
        let bytes = serde_json::to_vec(&verifier).map_err(StrongboxError::storage)?;
        self.store.put(Namespace::Auth, VERIFIER_KEY, &bytes).await?;
        self.save_lockout(&LockoutState::default()).await?;
        info!("device passcode enrolled");
        Ok(())
    }

    async fn load_verifier(&self) -> Result<Option<PasscodeVerifier>, StrongboxError> {
        let Some(raw) = self.store.get(Namespace::Auth, VERIFIER_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StrongboxError::MalformedRecord(format!("passcode verifier: {e}")))
    }

    async fn load_lockout(&self) -> Result<LockoutState, StrongboxError> {
        let Some(raw) = self.store.get(Namespace::Auth, LOCKOUT_KEY).await? else {
            return Ok(LockoutState::default());
        };
        serde_json::from_slice(&raw)
            .map_err(|e| StrongboxError::MalformedRecord(format!("passcode lockout state: {e}")))
    }

    async fn save_lockout(&self, state: &LockoutState) -> Result<(), StrongboxError> {
        let bytes = serde_json::to_vec(state).map_err(StrongboxError::storage)?;
        self.store.put(Namespace::Auth, LOCKOUT_KEY, &bytes).await
    }

    async fn check(&self, reason: &str) -> Result<PresenceProof, PresenceFailure> {
        let verifier = self
            .load_verifier()
            .await
            .map_err(failed)?
            .ok_or(PresenceFailure::NotEnrolled)?;

        let mut lockout = self.load_lockout().await.map_err(failed)?;
        let now = self.clock.now();
        if let Some(until) = lockout.locked_until {
            if now < until {
                let retry_after_secs = (until - now).num_seconds().max(1) as u64;
                return Err(PresenceFailure::LockedOut { retry_after_secs });
            }
            lockout = LockoutState::default();
        }

        let prompt = Arc::clone(&self.prompt);
        let label = reason.to_string();
        let entered = tokio::task::spawn_blocking(move || prompt.read_passcode(&label))
            .await
            .map_err(|e| PresenceFailure::Failed(format!("prompt task failed: {e}")))?
            .map_err(failed)?;
        let Some(passcode) = entered else {
            debug!("passcode prompt dismissed");
            return Err(PresenceFailure::UserCanceled);
        };

        let salt: [u8; ARGON2_SALT_LEN] = verifier
            .salt
            .as_slice()
            .try_into()
            .map_err(|_| PresenceFailure::Failed("corrupt passcode verifier".to_string()))?;
        let (m, t, p) = (verifier.memory_cost, verifier.iterations, verifier.parallelism);
        let candidate = tokio::task::spawn_blocking(move || {
            derive_key(passcode.expose_secret().as_bytes(), &salt, m, t, p)
        })
        .await
        .map_err(|e| PresenceFailure::Failed(format!("key derivation task failed: {e}")))?
        .map_err(failed)?;

        if constant_time_eq(candidate.as_ref(), &verifier.verifier) {
            if lockout.failed_attempts > 0 || lockout.locked_until.is_some() {
                self.save_lockout(&LockoutState::default())
                    .await
                    .map_err(failed)?;
            }
            return Ok(PresenceProof::issue(reason, self.clock.now()));
        }

        lockout.failed_attempts = lockout.failed_attempts.saturating_add(1);
        let max = self.config.max_failed_attempts;
        let outcome = if lockout.failed_attempts >= max {
            lockout.failed_attempts = 0;
            lockout.locked_until =
                Some(now + chrono::Duration::seconds(self.config.lockout_secs as i64));
            warn!(
                target: "strongbox::security",
                lockout_secs = self.config.lockout_secs,
                "passcode locked out after repeated failures"
            );
            PresenceFailure::LockedOut {
                retry_after_secs: self.config.lockout_secs,
            }
        } else {
            PresenceFailure::Failed(format!(
                "incorrect passcode ({} attempt(s) remaining)",
                max - lockout.failed_attempts
            ))
        };
        self.save_lockout(&lockout).await.map_err(failed)?;
        Err(outcome)
    }
}

fn failed(e: StrongboxError) -> PresenceFailure {
    PresenceFailure::Failed(e.to_string())
}

#[async_trait]
impl PresenceAuthenticator for PasscodeAuthenticator {
    async fn authenticate(&self, reason: &str) -> Result<PresenceProof, PresenceFailure> {
        self.check(reason).await
    }
}
