// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alternate PIN unlock path.

mod common;

use std::time::Duration;

use common::{Harness, credential};
use secrecy::{ExposeSecret, SecretString};
use strongbox_core::{Namespace, PresenceFailure, StrongboxError};

fn pin(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

async fn with_pin() -> Harness {
    let h = Harness::initialized().await;
    h.engine.enable_pin(&pin("4821")).await.unwrap();
    h
}

#[tokio::test]
async fn pin_unlocks_a_locked_vault() {
    let h = with_pin().await;
    let cred = credential("example.com", "alice", "P@ss1");
    h.engine.save(&cred).await.unwrap();
    assert!(h.engine.get_stats().await.unwrap().pin_enabled);

    h.engine.lock().await;
    let prompts = h.auth.prompts();
    h.engine.unlock_with_pin(&pin("4821")).await.unwrap();

    assert!(h.engine.is_unlocked().await);
    assert_eq!(h.auth.prompts(), prompts, "PIN path needs no presence prompt");
    assert_eq!(h.engine.retrieve(cred.id).await.unwrap().expose_secret(), "P@ss1");
}

#[tokio::test]
async fn pin_never_stored_in_clear() {
    let h = with_pin().await;
    for key in h.store.raw_keys(Namespace::Pin) {
        let raw = h.store.raw_get(Namespace::Pin, &key).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("4821"));
    }
}

#[tokio::test]
async fn wrong_pin_counts_down_then_locks_out() {
    let h = with_pin().await;
    h.engine.lock().await;

    for remaining in (1..=4).rev() {
        match h.engine.unlock_with_pin(&pin("0000")).await {
            Err(StrongboxError::InvalidPin { remaining_attempts }) => {
                assert_eq!(remaining_attempts, remaining)
            }
            other => panic!("expected InvalidPin, got {other:?}"),
        }
    }
    assert!(matches!(
        h.engine.unlock_with_pin(&pin("0000")).await,
        Err(StrongboxError::PinLockedOut { .. })
    ));

    // The right PIN is refused while the lockout lasts.
    assert!(matches!(
        h.engine.unlock_with_pin(&pin("4821")).await,
        Err(StrongboxError::PinLockedOut { retry_after }) if retry_after <= Duration::from_secs(300)
    ));
    assert!(!h.engine.is_unlocked().await);

    h.clock.advance_secs(301);
    h.engine.unlock_with_pin(&pin("4821")).await.unwrap();
    assert!(h.engine.is_unlocked().await);
}

#[tokio::test]
async fn successful_unlock_resets_counter() {
    let h = with_pin().await;
    h.engine.lock().await;

    for _ in 0..3 {
        assert!(h.engine.unlock_with_pin(&pin("0000")).await.is_err());
    }
    h.engine.unlock_with_pin(&pin("4821")).await.unwrap();
    h.engine.lock().await;

    assert!(matches!(
        h.engine.unlock_with_pin(&pin("0000")).await,
        Err(StrongboxError::InvalidPin { remaining_attempts: 4 })
    ));
}

#[tokio::test]
async fn pin_not_enabled() {
    let h = Harness::initialized().await;
    h.engine.lock().await;
    assert!(matches!(
        h.engine.unlock_with_pin(&pin("4821")).await,
        Err(StrongboxError::PinNotEnabled)
    ));
    assert!(matches!(h.engine.disable_pin().await, Err(StrongboxError::PinNotEnabled)));
}

#[tokio::test]
async fn short_pin_rejected() {
    let h = Harness::initialized().await;
    assert!(matches!(
        h.engine.enable_pin(&pin("12")).await,
        Err(StrongboxError::WeakPin { min_length: 4 })
    ));
    assert!(!h.engine.get_stats().await.unwrap().pin_enabled);
}

#[tokio::test]
async fn enabling_requires_presence() {
    let h = Harness::initialized().await;
    h.auth.deny_next(PresenceFailure::UserCanceled);
    assert!(matches!(
        h.engine.enable_pin(&pin("4821")).await,
        Err(StrongboxError::UserCanceled)
    ));
    assert!(h.store.raw_keys(Namespace::Pin).is_empty());
}

#[tokio::test]
async fn changing_the_pin_replaces_the_old_one() {
    let h = with_pin().await;
    h.engine.enable_pin(&pin("9999")).await.unwrap();
    h.engine.lock().await;

    assert!(matches!(
        h.engine.unlock_with_pin(&pin("4821")).await,
        Err(StrongboxError::InvalidPin { .. })
    ));
    h.engine.unlock_with_pin(&pin("9999")).await.unwrap();
}

#[tokio::test]
async fn disable_removes_pin_material() {
    let h = with_pin().await;
    h.engine.disable_pin().await.unwrap();

    assert!(h.store.raw_keys(Namespace::Pin).is_empty());
    assert!(!h.engine.get_stats().await.unwrap().pin_enabled);
    h.engine.lock().await;
    assert!(matches!(
        h.engine.unlock_with_pin(&pin("4821")).await,
        Err(StrongboxError::PinNotEnabled)
    ));
}

#[tokio::test]
async fn pin_unlock_is_idempotent_when_unlocked() {
    let h = with_pin().await;
    assert!(h.engine.is_unlocked().await);
    h.engine.unlock_with_pin(&pin("4821")).await.unwrap();
    assert!(h.engine.is_unlocked().await);
}

#[tokio::test]
async fn lockout_holds_across_engines() {
    let h = with_pin().await;

    for remaining in (1..=4).rev() {
        let engine = h.sibling_engine();
        assert!(matches!(
            engine.unlock_with_pin(&pin("0000")).await,
            Err(StrongboxError::InvalidPin { remaining_attempts }) if remaining_attempts == remaining
        ));
    }
    assert!(matches!(
        h.sibling_engine().unlock_with_pin(&pin("0000")).await,
        Err(StrongboxError::PinLockedOut { .. })
    ));

    let engine = h.sibling_engine();
    assert!(matches!(
        engine.unlock_with_pin(&pin("4821")).await,
        Err(StrongboxError::PinLockedOut { .. })
    ));
    assert!(!engine.is_unlocked().await);

    h.clock.advance_secs(301);
    engine.unlock_with_pin(&pin("4821")).await.unwrap();
    assert!(engine.is_unlocked().await);
    assert!(h.store.raw_get(Namespace::Pin, "attempts").is_none());
}

#[tokio::test]
async fn presence_unlock_clears_recorded_pin_failures() {
    let h = with_pin().await;
    h.engine.lock().await;
    for _ in 0..3 {
        assert!(h.sibling_engine().unlock_with_pin(&pin("0000")).await.is_err());
    }

    h.engine.unlock().await.unwrap();
    h.engine.lock().await;
    assert!(matches!(
        h.sibling_engine().unlock_with_pin(&pin("0000")).await,
        Err(StrongboxError::InvalidPin { remaining_attempts: 4 })
    ));
}
