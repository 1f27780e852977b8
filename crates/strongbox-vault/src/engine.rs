// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault engine: the public facade over keys, session, and records.
//!
//! Every operation takes the engine's single async mutex for its whole
//! duration, including any presence prompt. Operations therefore never
//! interleave, and a second `unlock` issued while the first is still
//! prompting observes the finished session instead of prompting again.
//! Dropping an operation's future mid-flight releases the mutex and leaves
//! the session exactly as it was.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use strongbox_config::StrongboxConfig;
use strongbox_core::{
    Clock, HardwareKeyAdapter, KeyValueStore, Namespace, PinKeyProvider, PresenceAuthenticator,
    PresenceFailure, PresenceProof, StrongboxError,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::credential::{Credential, CredentialUpdate, StoredCredential};
use crate::hierarchy::{Kek, KeyHierarchy};
use crate::kdf::ContentKey;
use crate::metadata::{VaultMetadata, record_key};
use crate::pin::{self, PinAttempts, PinSecret, PinSecretEnvelope};
use crate::session::{DEFAULT_SESSION_TIMEOUT, SessionController};

/// Tunables the engine reads from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub session_timeout: Duration,
    pub extend_on_access: bool,
    pub rotation_interval_days: u32,
    pub pin_max_attempts: u32,
    pub pin_lockout: Duration,
    pub pin_min_length: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            extend_on_access: true,
            rotation_interval_days: 90,
            pin_max_attempts: 5,
            pin_lockout: Duration::from_secs(300),
            pin_min_length: 4,
        }
    }
}

impl From<&StrongboxConfig> for EngineSettings {
    fn from(config: &StrongboxConfig) -> Self {
        Self {
            session_timeout: Duration::from_secs(config.session.timeout_secs),
            extend_on_access: config.session.extend_on_access,
            rotation_interval_days: config.vault.rotation_interval_days,
            pin_max_attempts: config.pin.max_attempts,
            pin_lockout: Duration::from_secs(config.pin.lockout_secs),
            pin_min_length: config.pin.min_length,
        }
    }
}

/// Injected platform services.
pub struct Collaborators {
    pub store: Arc<dyn KeyValueStore>,
    pub hardware: Arc<dyn HardwareKeyAdapter>,
    pub authenticator: Arc<dyn PresenceAuthenticator>,
    pub pin_provider: Arc<dyn PinKeyProvider>,
    pub clock: Arc<dyn Clock>,
}

/// Result of [`VaultEngine::list`].
#[derive(Debug)]
pub struct ListOutcome {
    /// Credentials that verified and decrypted, ordered by domain then username.
    pub credentials: Vec<Credential>,
    /// Indexed credentials that could not be read. Each one was logged as a security event.
    pub skipped: usize,
}

/// Snapshot returned by [`VaultEngine::get_stats`]. Never contains secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultStats {
    pub current_version: u32,
    pub total_credentials: usize,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub last_rotation: Option<DateTime<Utc>>,
    pub rotation_interval_days: u32,
    pub rotation_due: bool,
    pub pin_enabled: bool,
    pub unlocked: bool,
    pub session_expires_at: Option<DateTime<Utc>>,
}

pub(crate) struct EngineState {
    pub(crate) session: SessionController,
}

pub struct VaultEngine {
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) hardware: Arc<dyn HardwareKeyAdapter>,
    authenticator: Arc<dyn PresenceAuthenticator>,
    pin_provider: Arc<dyn PinKeyProvider>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) hierarchy: KeyHierarchy,
    settings: EngineSettings,
    pub(crate) state: Mutex<EngineState>,
}

impl std::fmt::Debug for VaultEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl VaultEngine {
    pub fn new(collaborators: Collaborators, settings: EngineSettings) -> Self {
        let Collaborators {
            store,
            hardware,
            authenticator,
            pin_provider,
            clock,
        } = collaborators;
        let hierarchy = KeyHierarchy::new(hardware.clone(), store.clone(), clock.clone());
        let session = SessionController::new(clock.clone(), settings.session_timeout);

        Self {
            store,
            hardware,
            authenticator,
            pin_provider,
            clock,
            hierarchy,
            settings,
            state: Mutex::new(EngineState { session }),
        }
    }

    pub async fn is_initialized(&self) -> Result<bool, StrongboxError> {
        Ok(VaultMetadata::load(&*self.store).await?.is_some())
    }

    /// Create the key hierarchy and an empty vault, leaving the session unlocked.
    pub async fn initialize_vault(&self) -> Result<(), StrongboxError> {
        let mut state = self.state.lock().await;
        if self.hierarchy.is_initialized().await? || self.is_initialized().await? {
            return Err(StrongboxError::AlreadyInitialized);
        }

        let proof = self.authenticate("Create a new vault").await?;
        let kek = self.hierarchy.initialize(&proof).await?;
        let cdk = self.hierarchy.derive_cdk(&kek, 1).await?;

        let meta = VaultMetadata::new(self.clock.now(), self.settings.rotation_interval_days);
        if let Err(err) = meta.save(&*self.store).await {
            if let Err(cleanup) = self.hierarchy.discard_version(1).await {
                warn!(error = %cleanup, "failed to discard KEK after aborted initialization");
            }
            return Err(err);
        }

        let expires_at = state.session.open(cdk, 1);
        info!(version = 1, %expires_at, "vault initialized");
        Ok(())
    }

    /// Unlock with a presence check. A no-op while a current session is live.
    pub async fn unlock(&self) -> Result<(), StrongboxError> {
        let mut state = self.state.lock().await;
        let meta = VaultMetadata::require(&*self.store).await?;
        let version = meta.current_version;
        if self.has_current_session(&mut state, version) {
            debug!("unlock requested while already unlocked");
            return Ok(());
        }

        let proof = self.authenticate("Unlock your vault").await?;
        let kek = self.hierarchy.unwrap_kek(version, &proof).await?;
        let cdk = self.hierarchy.derive_cdk(&kek, version).await?;

        let expires_at = state.session.open(cdk, version);
        if meta.pin_enabled {
            if let Err(err) = PinAttempts::clear(&*self.store).await {
                warn!(error = %err, "failed to reset PIN attempt counter");
            }
        }
        info!(version, %expires_at, "vault unlocked");
        Ok(())
    }

    /// Unlock through the PIN path. A no-op while a session is live.
    ///
    /// Failed attempts are persisted, so the lockout applies across engines.
    pub async fn unlock_with_pin(&self, pin: &SecretString) -> Result<(), StrongboxError> {
        let mut state = self.state.lock().await;
        let meta = VaultMetadata::require(&*self.store).await?;
        let version = meta.current_version;
        if self.has_current_session(&mut state, version) {
            debug!("PIN unlock requested while already unlocked");
            return Ok(());
        }
        if !meta.pin_enabled {
            return Err(StrongboxError::PinNotEnabled);
        }

        let now = self.clock.now();
        let mut attempts = PinAttempts::load(&*self.store).await?;
        let had_failures = !attempts.is_clean();
        if let Err(err) = attempts.check(now) {
            warn!(target: "strongbox::security", error = %err, "PIN unlock attempted during lockout");
            return Err(err);
        }

        let envelope = PinSecretEnvelope::load(&*self.store)
            .await?
            .ok_or(StrongboxError::PinNotEnabled)?;
        let pin_key = self.derive_pin_key(pin, &envelope.salt).await?;
        let Some(secret) = envelope.open(&pin_key)? else {
            let err = attempts.record_failure(
                now,
                self.settings.pin_max_attempts,
                self.settings.pin_lockout,
            );
            attempts.save(&*self.store).await?;
            warn!(target: "strongbox::security", error = %err, "PIN unlock rejected");
            return Err(err);
        };
        if had_failures {
            PinAttempts::clear(&*self.store).await?;
        }

        let kek_bytes = pin::load_kek(&*self.store, &secret, version).await?;
        let kek = Kek::from_slice(&kek_bytes)?;
        let cdk = self.hierarchy.derive_cdk(&kek, version).await?;

        let expires_at = state.session.open(cdk, version);
        info!(version, %expires_at, "vault unlocked with PIN");
        Ok(())
    }

    /// Configure (or replace) the PIN. Requires a presence check.
    pub async fn enable_pin(&self, pin: &SecretString) -> Result<(), StrongboxError> {
        let min_length = self.settings.pin_min_length;
        if pin.expose_secret().chars().count() < min_length {
            return Err(StrongboxError::WeakPin { min_length });
        }

        let _state = self.state.lock().await;
        let mut meta = VaultMetadata::require(&*self.store).await?;
        let version = meta.current_version;
        let proof = self.authenticate("Enable PIN unlock").await?;
        let kek = self.hierarchy.unwrap_kek(version, &proof).await?;

        let secret = PinSecret::generate()?;
        let hardware_wrapped = self.hardware.wrap(secret.as_bytes()).await?;
        let salt = pin::new_pin_salt()?;
        let pin_key = self.derive_pin_key(pin, &salt).await?;
        let now = self.clock.now();
        let envelope = PinSecretEnvelope::seal(&secret, &pin_key, salt, hardware_wrapped, now)?;

        pin::clear(&*self.store).await?;
        pin::store_kek(&*self.store, &secret, &kek, version).await?;
        envelope.save(&*self.store).await?;

        meta.pin_enabled = true;
        meta.touch(now);
        meta.save(&*self.store).await?;
        info!(version, "PIN unlock enabled");
        Ok(())
    }

    pub async fn disable_pin(&self) -> Result<(), StrongboxError> {
        let _state = self.state.lock().await;
        let mut meta = VaultMetadata::require(&*self.store).await?;
        if !meta.pin_enabled {
            return Err(StrongboxError::PinNotEnabled);
        }

        meta.pin_enabled = false;
        meta.touch(self.clock.now());
        meta.save(&*self.store).await?;
        pin::clear(&*self.store).await?;
        info!("PIN unlock disabled");
        Ok(())
    }

    /// Drop the session key. Idempotent.
    pub async fn lock(&self) {
        self.state.lock().await.session.lock();
        info!("vault locked");
    }

    /// Whether a live session holds the CDK for the committed key version.
    pub async fn is_unlocked(&self) -> bool {
        let mut state = self.state.lock().await;
        match VaultMetadata::load(&*self.store).await {
            Ok(Some(meta)) => self.has_current_session(&mut state, meta.current_version),
            _ => state.session.is_unlocked(),
        }
    }

    /// Push the session deadline out by the configured timeout.
    pub async fn extend_session(&self) -> Result<DateTime<Utc>, StrongboxError> {
        self.state.lock().await.session.extend()
    }

    pub async fn session_expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.session.expires_at()
    }

    /// Insert or overwrite a credential.
    ///
    /// The record is written before the index so the index never names a
    /// credential without a record.
    pub async fn save(&self, credential: &Credential) -> Result<(), StrongboxError> {
        let mut state = self.state.lock().await;
        let (cdk, mut meta) = self.session_key(&mut state).await?;
        let version = meta.current_version;

        let stored = StoredCredential::seal(credential, &cdk, version)?;
        self.store
            .put(
                Namespace::Credentials,
                &record_key(version, credential.id),
                &stored.to_bytes()?,
            )
            .await?;

        let created = meta.insert(credential.id, self.clock.now());
        meta.save(&*self.store).await?;
        self.touch_session(&mut state);
        info!(id = %credential.id, domain = %credential.domain, created, "credential saved");
        Ok(())
    }

    /// Decrypt and return the secret of one credential.
    pub async fn retrieve(&self, id: Uuid) -> Result<SecretString, StrongboxError> {
        Ok(self.get(id).await?.password)
    }

    /// Decrypt and return one full credential.
    pub async fn get(&self, id: Uuid) -> Result<Credential, StrongboxError> {
        let mut state = self.state.lock().await;
        let (cdk, meta) = self.session_key(&mut state).await?;
        if !meta.credential_index.contains(&id) {
            return Err(StrongboxError::CredentialNotFound(id));
        }

        let credential = self.open_record(&cdk, meta.current_version, id).await?;
        self.touch_session(&mut state);
        debug!(%id, "credential retrieved");
        Ok(credential)
    }

    /// Decrypt, apply `changes`, and re-encrypt under a fresh nonce.
    pub async fn update(&self, id: Uuid, changes: CredentialUpdate) -> Result<(), StrongboxError> {
        let mut state = self.state.lock().await;
        let (cdk, mut meta) = self.session_key(&mut state).await?;
        if !meta.credential_index.contains(&id) {
            return Err(StrongboxError::CredentialNotFound(id));
        }
        let version = meta.current_version;

        let mut credential = self.open_record(&cdk, version, id).await?;
        if let Some(username) = changes.username {
            credential.username = username;
        }
        if let Some(password) = changes.password {
            credential.password = password;
        }
        if let Some(notes) = changes.notes {
            credential.notes = notes;
        }
        let now = self.clock.now();
        credential.modified_at = now;

        let stored = StoredCredential::seal(&credential, &cdk, version)?;
        self.store
            .put(Namespace::Credentials, &record_key(version, id), &stored.to_bytes()?)
            .await?;
        meta.touch(now);
        meta.save(&*self.store).await?;
        self.touch_session(&mut state);
        info!(%id, "credential updated");
        Ok(())
    }

    /// Remove a credential. The index entry goes first; a leftover record
    /// is unreachable and is swept by the next rotation.
    pub async fn delete(&self, id: Uuid) -> Result<(), StrongboxError> {
        let mut state = self.state.lock().await;
        let (_, mut meta) = self.session_key(&mut state).await?;
        if !meta.remove(&id, self.clock.now()) {
            return Err(StrongboxError::CredentialNotFound(id));
        }
        meta.save(&*self.store).await?;

        let key = record_key(meta.current_version, id);
        if let Err(err) = self.store.delete(Namespace::Credentials, &key).await {
            warn!(%id, error = %err, "credential record left behind after delete");
        }
        self.touch_session(&mut state);
        info!(%id, "credential deleted");
        Ok(())
    }

    /// Every readable credential, plus a count of those that were not.
    pub async fn list(&self) -> Result<ListOutcome, StrongboxError> {
        let mut state = self.state.lock().await;
        let (cdk, meta) = self.session_key(&mut state).await?;

        let mut credentials = Vec::with_capacity(meta.credential_index.len());
        let mut skipped = 0;
        for &id in &meta.credential_index {
            match self.open_record(&cdk, meta.current_version, id).await {
                Ok(credential) => credentials.push(credential),
                Err(err @ StrongboxError::Storage { .. }) => return Err(err),
                Err(err) => {
                    skipped += 1;
                    warn!(target: "strongbox::security", %id, error = %err, "skipping unreadable credential");
                }
            }
        }
        credentials.sort_by(|a, b| (&a.domain, &a.username).cmp(&(&b.domain, &b.username)));

        self.touch_session(&mut state);
        debug!(count = credentials.len(), skipped, "credentials listed");
        Ok(ListOutcome {
            credentials,
            skipped,
        })
    }

    /// Metadata snapshot. Does not require an unlocked session.
    pub async fn get_stats(&self) -> Result<VaultStats, StrongboxError> {
        let mut state = self.state.lock().await;
        let meta = VaultMetadata::require(&*self.store).await?;
        let now = self.clock.now();
        let unlocked = self.has_current_session(&mut state, meta.current_version);

        Ok(VaultStats {
            current_version: meta.current_version,
            total_credentials: meta.total_credentials,
            created_at: meta.created_at,
            last_modified: meta.last_modified,
            last_rotation: meta.last_rotation,
            rotation_interval_days: meta.rotation_interval_days,
            rotation_due: meta.rotation_due(now),
            pin_enabled: meta.pin_enabled,
            unlocked,
            session_expires_at: state.session.expires_at(),
        })
    }

    /// Erase every credential and all key material. Requires a presence check.
    pub async fn reset_vault(&self) -> Result<(), StrongboxError> {
        let mut state = self.state.lock().await;
        self.authenticate("Erase the vault and all credentials").await?;

        for ns in [Namespace::Metadata, Namespace::Credentials, Namespace::Pin] {
            for key in self.store.keys(ns).await? {
                self.store.delete(ns, &key).await?;
            }
        }
        self.hierarchy.wipe().await?;

        state.session.lock();
        warn!(target: "strongbox::security", "vault reset; all credentials and keys erased");
        Ok(())
    }

    pub(crate) async fn authenticate(&self, reason: &str) -> Result<PresenceProof, StrongboxError> {
        match self.authenticator.authenticate(reason).await {
            Ok(proof) => Ok(proof),
            Err(PresenceFailure::UserCanceled) => {
                debug!(reason, "presence prompt canceled");
                Err(StrongboxError::UserCanceled)
            }
            Err(failure) => {
                warn!(target: "strongbox::security", reason, %failure, "presence check failed");
                Err(failure.into())
            }
        }
    }

    /// Load, verify, and decrypt the record for `id` at `version`.
    pub(crate) async fn open_record(
        &self,
        cdk: &ContentKey,
        version: u32,
        id: Uuid,
    ) -> Result<Credential, StrongboxError> {
        let raw = self
            .store
            .get(Namespace::Credentials, &record_key(version, id))
            .await?
            .ok_or_else(|| {
                StrongboxError::MalformedRecord(format!("indexed credential {id} has no record"))
            })?;
        let stored = StoredCredential::from_bytes(&raw)?;
        if stored.id != id {
            return Err(StrongboxError::IntegrityViolation(format!(
                "record under {id} belongs to another credential"
            )));
        }

        stored.open(cdk, version).inspect_err(|err| {
            if err.is_security_event() {
                warn!(target: "strongbox::security", %id, error = %err, "credential failed verification");
            }
        })
    }

    async fn derive_pin_key(
        &self,
        pin: &SecretString,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; 32]>, StrongboxError> {
        let provider = Arc::clone(&self.pin_provider);
        let pin = SecretString::from(pin.expose_secret().to_owned());
        let salt = salt.to_vec();
        tokio::task::spawn_blocking(move || provider.derive_key(&pin, &salt))
            .await
            .map_err(|e| StrongboxError::Internal(format!("PIN derivation task failed: {e}")))?
    }

    /// The session CDK together with the metadata it was checked against.
    ///
    /// A session whose key version is no longer current (another engine
    /// rotated the vault) is locked rather than used.
    async fn session_key(
        &self,
        state: &mut EngineState,
    ) -> Result<(ContentKey, VaultMetadata), StrongboxError> {
        state.session.cdk()?;
        let meta = VaultMetadata::require(&*self.store).await?;
        if !self.has_current_session(state, meta.current_version) {
            return Err(StrongboxError::AuthenticationRequired);
        }
        let cdk = state.session.cdk()?.clone();
        Ok((cdk, meta))
    }

    /// Whether a live session holds the CDK for `current_version`. Drops a stale one.
    fn has_current_session(&self, state: &mut EngineState, current_version: u32) -> bool {
        if state.session.lock_if_stale(current_version) {
            warn!(
                target: "strongbox::security",
                current_version,
                "session key superseded by a rotation; vault locked"
            );
            return false;
        }
        state.session.is_unlocked()
    }

    fn touch_session(&self, state: &mut MutexGuard<'_, EngineState>) {
        if self.settings.extend_on_access {
            // The session was verified live at the start of the operation.
            let _ = state.session.extend();
        }
    }
}
