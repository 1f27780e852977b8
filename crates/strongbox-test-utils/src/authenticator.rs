// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence authenticator that plays back scripted outcomes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use strongbox_core::{Clock, PresenceAuthenticator, PresenceFailure, PresenceProof};

/// Pops one scripted outcome per prompt; succeeds once the script is empty.
///
/// With [`hang`](ScriptedAuthenticator::hang) set, every prompt blocks forever,
/// which lets tests cancel an in-flight unlock by dropping its future.
pub struct ScriptedAuthenticator {
    clock: Arc<dyn Clock>,
    script: Mutex<VecDeque<Result<(), PresenceFailure>>>,
    prompts: AtomicUsize,
    hang: AtomicBool,
    reasons: Mutex<Vec<String>>,
}

impl ScriptedAuthenticator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            script: Mutex::new(VecDeque::new()),
            prompts: AtomicUsize::new(0),
            hang: AtomicBool::new(false),
            reasons: Mutex::new(Vec::new()),
        }
    }

    /// Queue an outcome for the next prompt.
    pub fn push(&self, outcome: Result<(), PresenceFailure>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(outcome);
    }

    pub fn deny_next(&self, failure: PresenceFailure) {
        self.push(Err(failure));
    }

    pub fn hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// How many times the user has been prompted.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Reasons passed to each prompt, in order.
    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PresenceAuthenticator for ScriptedAuthenticator {
    async fn authenticate(&self, reason: &str) -> Result<PresenceProof, PresenceFailure> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.reasons
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(reason.to_string());

        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let outcome = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(Ok(()));
        outcome.map(|()| PresenceProof::issue(reason, self.clock.now()))
    }
}
