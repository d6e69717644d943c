// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Applock Contributors
//
// This file is part of Applock.
//
// Applock is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Applock is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Applock. If not, see <https://www.gnu.org/licenses/>.

//! Lock manager façade and the guard representing a held lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::codes::LockOutcome;
use crate::session::{LockRequest, LockSession, WaitPolicy};
use crate::{LockError, LockResult};

/// Command timeout for non-blocking attempts, in seconds.
const TRY_ACQUIRE_COMMAND_TIMEOUT_SECS: u32 = 30;

/// Blocking attempts disable the command timeout; the caller intends to
/// wait as long as needed.
const ACQUIRE_COMMAND_TIMEOUT_SECS: u32 = 0;

/// Stateless façade bound to one coordination-service session.
///
/// ## Purpose
/// Turns a named-lock request into exactly one round trip to the
/// coordination service and classifies the result: a live [`LockGuard`] on
/// grant, `None` on expected contention, an error for everything else.
///
/// ## Behavior
/// - No retries, no backoff; resilience wrappers belong to the caller
/// - No cancellation of its own: [`acquire`](Self::acquire) blocks its task
///   until the service answers, and the only cancellation signal is the
///   service's own (surfaced as [`LockError::Canceled`])
/// - The session is injected at construction and shared with the guards it
///   produces; it must not serve a second logical lock owner
pub struct SessionLockManager<S> {
    session: Arc<Mutex<S>>,
}

impl<S: LockSession> SessionLockManager<S> {
    /// Bind a manager to the given session.
    pub fn new(session: S) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Acquire the named lock, waiting as long as the service makes us.
    ///
    /// ## Returns
    /// - `Ok(Some(guard))`: lock granted (immediately or after waiting)
    /// - `Ok(None)`: the service reported an explicit non-grant
    /// - `Err(_)`: canceled, deadlock victim, invalid request, unknown
    ///   negative code, or backend failure
    #[instrument(skip(self), fields(lock_name = %name))]
    pub async fn acquire(&self, name: &str) -> LockResult<Option<LockGuard<S>>> {
        self.request_lock(ACQUIRE_COMMAND_TIMEOUT_SECS, name, WaitPolicy::Infinite)
            .await
    }

    /// Acquire the named lock without waiting.
    ///
    /// ## Returns
    /// `Ok(None)` promptly when the lock cannot be granted right away;
    /// otherwise as [`acquire`](Self::acquire).
    #[instrument(skip(self), fields(lock_name = %name))]
    pub async fn try_acquire(&self, name: &str) -> LockResult<Option<LockGuard<S>>> {
        self.request_lock(TRY_ACQUIRE_COMMAND_TIMEOUT_SECS, name, WaitPolicy::Immediate)
            .await
    }

    /// Shared request-construction path: build the request, issue one round
    /// trip on the bound session, classify the outcome.
    async fn request_lock(
        &self,
        command_timeout_secs: u32,
        name: &str,
        wait: WaitPolicy,
    ) -> LockResult<Option<LockGuard<S>>> {
        let request = LockRequest {
            name: name.to_string(),
            wait,
            command_timeout_secs,
        };

        let code = {
            let mut session = self.session.lock().await;
            session.execute_lock_request(&request).await?
        };

        match LockOutcome::classify(code) {
            LockOutcome::Granted | LockOutcome::GrantedAfterWait => {
                debug!(code, "lock granted");
                Ok(Some(LockGuard {
                    session: Arc::clone(&self.session),
                    name: request.name,
                    released: false,
                }))
            }
            LockOutcome::WaitTimedOut | LockOutcome::AlreadyHeld => Ok(None),
            LockOutcome::Canceled => Err(LockError::Canceled),
            LockOutcome::DeadlockVictim => Err(LockError::DeadlockVictim),
            LockOutcome::InvalidRequest => Err(LockError::InvalidRequest(request.name)),
            LockOutcome::Unrecognized(c) if c <= 0 => Err(LockError::UnknownReturnCode(c)),
            // Unrecognized positive codes are non-grants, not faults.
            LockOutcome::Unrecognized(_) => Ok(None),
        }
    }
}

/// A held lock, bound to the session that acquired it.
///
/// Release it exactly once, before the owning session is torn down.
/// `release` consumes the guard, so a second release or a use-after-release
/// does not compile. A guard dropped without release logs a warning; the
/// lock itself stays held until the session ends and the service reclaims
/// it.
pub struct LockGuard<S> {
    session: Arc<Mutex<S>>,
    name: String,
    released: bool,
}

impl<S: LockSession> LockGuard<S> {
    /// Name of the held resource.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release the lock on the bound session.
    #[instrument(skip(self), fields(lock_name = %self.name))]
    pub async fn release(mut self) -> LockResult<()> {
        self.released = true;
        let mut session = self.session.lock().await;
        session.execute_release(&self.name).await
    }
}

impl<S> Drop for LockGuard<S> {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                lock_name = %self.name,
                "lock guard dropped without release; the lock stays held until the session ends"
            );
        }
    }
}

impl<S> std::fmt::Debug for LockGuard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("name", &self.name)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;

    use super::*;

    /// Session that replays a fixed script of return codes and records
    /// every command it is asked to execute.
    struct ScriptedSession {
        script: VecDeque<i32>,
        requests: Arc<SyncMutex<Vec<LockRequest>>>,
        releases: Arc<SyncMutex<Vec<String>>>,
    }

    impl ScriptedSession {
        fn new(codes: &[i32]) -> (Self, Arc<SyncMutex<Vec<LockRequest>>>, Arc<SyncMutex<Vec<String>>>) {
            let requests = Arc::new(SyncMutex::new(Vec::new()));
            let releases = Arc::new(SyncMutex::new(Vec::new()));
            let session = Self {
                script: codes.iter().copied().collect(),
                requests: Arc::clone(&requests),
                releases: Arc::clone(&releases),
            };
            (session, requests, releases)
        }
    }

    #[async_trait]
    impl LockSession for ScriptedSession {
        async fn execute_lock_request(&mut self, request: &LockRequest) -> LockResult<i32> {
            self.requests.lock().push(request.clone());
            Ok(self.script.pop_front().expect("script exhausted"))
        }

        async fn execute_release(&mut self, name: &str) -> LockResult<()> {
            self.releases.lock().push(name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn acquire_returns_guard_on_immediate_grant() {
        let (session, requests, _) = ScriptedSession::new(&[crate::codes::GRANTED]);
        let manager = SessionLockManager::new(session);

        let guard = manager.acquire("orders").await.unwrap().expect("guard");
        assert_eq!(guard.name(), "orders");

        let requests = requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].wait, WaitPolicy::Infinite);
        assert_eq!(requests[0].command_timeout_secs, 0);
    }

    #[tokio::test]
    async fn acquire_returns_guard_after_wait_grant() {
        let (session, _, _) = ScriptedSession::new(&[crate::codes::GRANTED_AFTER_WAIT]);
        let manager = SessionLockManager::new(session);

        let guard = manager.acquire("orders").await.unwrap();
        assert!(guard.is_some());
    }

    #[tokio::test]
    async fn try_acquire_uses_immediate_wait_and_bounded_command_timeout() {
        let (session, requests, _) = ScriptedSession::new(&[crate::codes::GRANTED]);
        let manager = SessionLockManager::new(session);

        let guard = manager.try_acquire("orders").await.unwrap();
        assert!(guard.is_some());

        let requests = requests.lock();
        assert_eq!(requests[0].wait, WaitPolicy::Immediate);
        assert_eq!(requests[0].command_timeout_secs, 30);
    }

    #[tokio::test]
    async fn wait_timeout_is_none_not_error() {
        let (session, _, _) = ScriptedSession::new(&[crate::codes::WAIT_TIMEOUT]);
        let manager = SessionLockManager::new(session);

        let guard = manager.acquire("orders").await.unwrap();
        assert!(guard.is_none());
    }

    #[tokio::test]
    async fn already_held_sentinel_is_none_not_error() {
        let (session, _, _) = ScriptedSession::new(&[crate::codes::ALREADY_HELD]);
        let manager = SessionLockManager::new(session);

        let guard = manager.try_acquire("orders").await.unwrap();
        assert!(guard.is_none());
    }

    #[tokio::test]
    async fn canceled_is_fatal() {
        let (session, _, _) = ScriptedSession::new(&[crate::codes::CANCELED]);
        let manager = SessionLockManager::new(session);

        let err = manager.acquire("orders").await.unwrap_err();
        assert!(matches!(err, LockError::Canceled));
    }

    #[tokio::test]
    async fn deadlock_victim_is_fatal() {
        let (session, _, _) = ScriptedSession::new(&[crate::codes::DEADLOCK_VICTIM]);
        let manager = SessionLockManager::new(session);

        let err = manager.acquire("orders").await.unwrap_err();
        assert!(matches!(err, LockError::DeadlockVictim));
    }

    #[tokio::test]
    async fn validation_error_is_fatal() {
        let (session, _, _) = ScriptedSession::new(&[crate::codes::VALIDATION_ERROR]);
        let manager = SessionLockManager::new(session);

        let err = manager.try_acquire("orders").await.unwrap_err();
        assert!(matches!(err, LockError::InvalidRequest(name) if name == "orders"));
    }

    #[tokio::test]
    async fn unrecognized_negative_codes_are_fatal() {
        for code in [-7, -42, -100] {
            let (session, _, _) = ScriptedSession::new(&[code]);
            let manager = SessionLockManager::new(session);

            let err = manager.acquire("orders").await.unwrap_err();
            assert!(
                matches!(err, LockError::UnknownReturnCode(c) if c == code),
                "code {code}"
            );
        }
    }

    #[tokio::test]
    async fn unrecognized_positive_codes_are_none() {
        let (session, _, _) = ScriptedSession::new(&[7]);
        let manager = SessionLockManager::new(session);

        let guard = manager.acquire("orders").await.unwrap();
        assert!(guard.is_none());
    }

    #[tokio::test]
    async fn release_sends_one_release_command() {
        let (session, _, releases) = ScriptedSession::new(&[crate::codes::GRANTED]);
        let manager = SessionLockManager::new(session);

        let guard = manager.acquire("orders").await.unwrap().expect("guard");
        guard.release().await.unwrap();

        assert_eq!(releases.lock().as_slice(), ["orders"]);
    }

    #[tokio::test]
    async fn dropping_guard_does_not_send_release() {
        let (session, _, releases) = ScriptedSession::new(&[crate::codes::GRANTED]);
        let manager = SessionLockManager::new(session);

        let guard = manager.acquire("orders").await.unwrap();
        drop(guard);

        assert!(releases.lock().is_empty());
    }
}
