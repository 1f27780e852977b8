// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unlock session: holds the CDK for a bounded time.
//!
//! Expiry is lazy. There is no timer; every check compares the clock to the
//! stored deadline and drops the key once it has passed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use strongbox_core::{Clock, StrongboxError};
use tracing::debug;

use crate::kdf::ContentKey;

/// Default unlocked-session lifetime.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug)]
enum SessionState {
    Locked,
    Unlocked {
        cdk: ContentKey,
        version: u32,
        expires_at: DateTime<Utc>,
    },
}

/// Tracks whether the vault is unlocked and holds the session CDK.
///
/// Not synchronized; the engine serializes access behind its own mutex.
pub struct SessionController {
    state: SessionState,
    clock: Arc<dyn Clock>,
    timeout: chrono::Duration,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SessionController {
    pub fn new(clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        let timeout = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        Self {
            state: SessionState::Locked,
            clock,
            timeout,
        }
    }

    /// Enter `Unlocked` with the CDK of key `version`, returning the new deadline.
    pub fn open(&mut self, cdk: ContentKey, version: u32) -> DateTime<Utc> {
        let expires_at = self.deadline();
        self.state = SessionState::Unlocked {
            cdk,
            version,
            expires_at,
        };
        debug!(version, %expires_at, "session opened");
        expires_at
    }

    /// Whether a live session exists. Transitions to `Locked` if it has expired.
    pub fn is_unlocked(&mut self) -> bool {
        self.expire_if_due();
        matches!(self.state, SessionState::Unlocked { .. })
    }

    /// The session CDK, or `AuthenticationRequired` when locked or expired.
    pub fn cdk(&mut self) -> Result<&ContentKey, StrongboxError> {
        self.expire_if_due();
        match &self.state {
            SessionState::Unlocked { cdk, .. } => Ok(cdk),
            SessionState::Locked => Err(StrongboxError::AuthenticationRequired),
        }
    }

    /// Key version the session CDK was derived from.
    pub fn version(&mut self) -> Option<u32> {
        self.expire_if_due();
        match &self.state {
            SessionState::Unlocked { version, .. } => Some(*version),
            SessionState::Locked => None,
        }
    }

    /// Lock if the session holds a CDK for any version other than `current`.
    ///
    /// Returns true when a stale session was dropped.
    pub fn lock_if_stale(&mut self, current: u32) -> bool {
        match self.version() {
            Some(version) if version != current => {
                debug!(version, current, "session key superseded");
                self.state = SessionState::Locked;
                true
            }
            _ => false,
        }
    }

    /// Deadline of the live session, if any.
    pub fn expires_at(&mut self) -> Option<DateTime<Utc>> {
        self.expire_if_due();
        match &self.state {
            SessionState::Unlocked { expires_at, .. } => Some(*expires_at),
            SessionState::Locked => None,
        }
    }

    /// Push the deadline to `now + timeout`. Fails if already expired.
    pub fn extend(&mut self) -> Result<DateTime<Utc>, StrongboxError> {
        self.expire_if_due();
        let deadline = self.deadline();
        match &mut self.state {
            SessionState::Unlocked { expires_at, .. } => {
                *expires_at = deadline;
                Ok(deadline)
            }
            SessionState::Locked => Err(StrongboxError::AuthenticationRequired),
        }
    }

    /// Swap in a new CDK after a committed rotation. The deadline is kept.
    pub fn replace_cdk(&mut self, new_cdk: ContentKey, new_version: u32) {
        if let SessionState::Unlocked { cdk, version, .. } = &mut self.state {
            *cdk = new_cdk;
            *version = new_version;
        }
    }

    /// Drop the CDK. Idempotent.
    pub fn lock(&mut self) {
        if matches!(self.state, SessionState::Unlocked { .. }) {
            debug!("session locked");
        }
        self.state = SessionState::Locked;
    }

    fn deadline(&self) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_add_signed(self.timeout)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn expire_if_due(&mut self) {
        let due = match &self.state {
            SessionState::Unlocked { expires_at, .. } => self.clock.now() >= *expires_at,
            SessionState::Locked => false,
        };
        if due {
            debug!("session expired");
            self.state = SessionState::Locked;
        }
    }
}

#[cfg(test)]
mod tests {
    use strongbox_test_utils::ManualClock;

    use super::*;
    use crate::kdf::derive_cdk;

    fn cdk(fill: u8) -> ContentKey {
        derive_cdk(&[fill; 32], &[0u8; 32], "test").unwrap()
    }

    fn controller() -> (Arc<ManualClock>, SessionController) {
        let clock = Arc::new(ManualClock::new());
        let session = SessionController::new(clock.clone(), DEFAULT_SESSION_TIMEOUT);
        (clock, session)
    }

    #[test]
    fn starts_locked() {
        let (_, mut session) = controller();
        assert!(!session.is_unlocked());
        assert!(matches!(session.cdk(), Err(StrongboxError::AuthenticationRequired)));
        assert!(session.expires_at().is_none());
    }

    #[test]
    fn open_sets_deadline_from_timeout() {
        let (clock, mut session) = controller();
        let deadline = session.open(cdk(1), 1);
        assert_eq!(deadline, clock.now() + chrono::Duration::seconds(300));
        assert!(session.is_unlocked());
        assert_eq!(session.cdk().unwrap().as_bytes(), cdk(1).as_bytes());
    }

    #[test]
    fn expires_lazily_at_deadline() {
        let (clock, mut session) = controller();
        session.open(cdk(1), 1);
        clock.advance_secs(299);
        assert!(session.is_unlocked());
        clock.advance_secs(1);
        assert!(!session.is_unlocked());
        assert!(matches!(session.cdk(), Err(StrongboxError::AuthenticationRequired)));
    }

    #[test]
    fn extend_pushes_deadline() {
        let (clock, mut session) = controller();
        session.open(cdk(1), 1);
        clock.advance_secs(200);
        let deadline = session.extend().unwrap();
        assert_eq!(deadline, clock.now() + chrono::Duration::seconds(300));
        clock.advance_secs(200);
        assert!(session.is_unlocked());
    }

    #[test]
    fn extend_after_expiry_fails() {
        let (clock, mut session) = controller();
        session.open(cdk(1), 1);
        clock.advance_secs(301);
        assert!(matches!(
            session.extend(),
            Err(StrongboxError::AuthenticationRequired)
        ));
    }

    #[test]
    fn replace_cdk_keeps_deadline() {
        let (_, mut session) = controller();
        let deadline = session.open(cdk(1), 1);
        session.replace_cdk(cdk(2), 2);
        assert_eq!(session.expires_at(), Some(deadline));
        assert_eq!(session.cdk().unwrap().as_bytes(), cdk(2).as_bytes());
    }

    #[test]
    fn replace_cdk_does_not_unlock() {
        let (_, mut session) = controller();
        session.replace_cdk(cdk(2), 2);
        assert!(!session.is_unlocked());
    }

    #[test]
    fn replace_cdk_advances_version() {
        let (_, mut session) = controller();
        session.open(cdk(1), 1);
        session.replace_cdk(cdk(2), 2);
        assert_eq!(session.version(), Some(2));
        assert!(!session.lock_if_stale(2));
        assert!(session.is_unlocked());
    }

    #[test]
    fn superseded_version_locks() {
        let (_, mut session) = controller();
        session.open(cdk(1), 1);
        assert!(session.lock_if_stale(2));
        assert!(!session.is_unlocked());
        assert!(!session.lock_if_stale(2));
    }

    #[test]
    fn lock_is_idempotent() {
        let (_, mut session) = controller();
        session.open(cdk(1), 1);
        session.lock();
        session.lock();
        assert!(!session.is_unlocked());
    }

    #[test]
    fn custom_timeout() {
        let clock = Arc::new(ManualClock::new());
        let mut session = SessionController::new(clock.clone(), Duration::from_secs(10));
        session.open(cdk(1), 1);
        clock.advance_secs(10);
        assert!(!session.is_unlocked());
    }
}
