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

//! In-memory coordination service (for testing and single-process use).
//!
//! ## Purpose
//! Emulates the advisory-lock primitive faithfully enough to arbitrate
//! between several [`MemoryLockSession`]s in one process: the same integer
//! code space, exclusive session-scoped ownership, the immediate / bounded /
//! infinite wait policies, the "already held" pre-check sentinel, and
//! automatic release when a session is dropped.
//!
//! ## Limitations
//! - Not persistent, not distributed (single process only)
//! - Never produces the canceled or deadlock-victim codes; those paths are
//!   exercised with a scripted session in the manager tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use crate::codes;
use crate::session::{with_command_timeout, LockRequest, LockSession, WaitPolicy, MAX_NAME_LEN};
use crate::{LockError, LockResult};

/// In-process stand-in for the advisory-lock facility.
///
/// Cloning is cheap and every clone arbitrates over the same lock table;
/// call [`session`](Self::session) once per logical lock owner.
#[derive(Clone, Default)]
pub struct MemoryLockService {
    inner: Arc<ServiceInner>,
}

#[derive(Default)]
struct ServiceInner {
    /// Lock name -> owning session id.
    owners: Mutex<HashMap<String, u64>>,
    /// Signaled on every release; waiters re-check the lock table.
    released: Notify,
    next_session_id: AtomicU64,
}

impl MemoryLockService {
    /// Create an empty coordination service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new session. Each session is one logical lock owner.
    pub fn session(&self) -> MemoryLockSession {
        MemoryLockSession {
            service: self.clone(),
            id: self.inner.next_session_id.fetch_add(1, Ordering::Relaxed),
            held: HashSet::new(),
        }
    }

    fn try_claim(&self, name: &str, session_id: u64) -> bool {
        let mut owners = self.inner.owners.lock();
        if owners.contains_key(name) {
            return false;
        }
        owners.insert(name.to_string(), session_id);
        true
    }

    fn release(&self, name: &str, session_id: u64) -> bool {
        let mut owners = self.inner.owners.lock();
        match owners.get(name).copied() {
            Some(owner) if owner == session_id => {
                owners.remove(name);
                drop(owners);
                self.inner.released.notify_waiters();
                true
            }
            _ => false,
        }
    }

    fn release_all(&self, names: &mut HashSet<String>, session_id: u64) {
        if names.is_empty() {
            return;
        }
        let mut owners = self.inner.owners.lock();
        for name in names.drain() {
            if owners.get(&name).copied() == Some(session_id) {
                owners.remove(&name);
            }
        }
        drop(owners);
        self.inner.released.notify_waiters();
    }

    /// Wait for the named lock per the wait policy and return the raw code.
    async fn wait_for_grant(&self, name: &str, session_id: u64, wait: WaitPolicy) -> i32 {
        if self.try_claim(name, session_id) {
            return codes::GRANTED;
        }

        let deadline = match wait {
            WaitPolicy::Immediate => return codes::WAIT_TIMEOUT,
            WaitPolicy::Infinite => None,
            WaitPolicy::BoundedMillis(ms) => {
                Some(Instant::now() + Duration::from_millis(u64::from(ms)))
            }
        };

        loop {
            // Register for the release signal before re-checking the table,
            // so a release between the check and the await is not lost.
            let notified = self.inner.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_claim(name, session_id) {
                return codes::GRANTED_AFTER_WAIT;
            }

            match deadline {
                None => notified.await,
                Some(deadline) => {
                    if timeout_at(deadline, notified).await.is_err() {
                        return codes::WAIT_TIMEOUT;
                    }
                }
            }
        }
    }
}

/// One open session against a [`MemoryLockService`].
///
/// Locks held by the session are released automatically when it is dropped,
/// mirroring the session-scoped ownership of the real service.
pub struct MemoryLockSession {
    service: MemoryLockService,
    id: u64,
    held: HashSet<String>,
}

#[async_trait]
impl LockSession for MemoryLockSession {
    async fn execute_lock_request(&mut self, request: &LockRequest) -> LockResult<i32> {
        if request.name.is_empty() || request.name.len() > MAX_NAME_LEN {
            return Ok(codes::VALIDATION_ERROR);
        }
        // Pre-check: never wait on a lock this session already owns.
        if self.held.contains(&request.name) {
            return Ok(codes::ALREADY_HELD);
        }

        let service = self.service.clone();
        let session_id = self.id;
        let code = with_command_timeout(request.command_timeout_secs, async {
            Ok(service
                .wait_for_grant(&request.name, session_id, request.wait)
                .await)
        })
        .await?;

        if codes::LockOutcome::classify(code).is_acquired() {
            self.held.insert(request.name.clone());
        }
        Ok(code)
    }

    async fn execute_release(&mut self, name: &str) -> LockResult<()> {
        if !self.held.remove(name) {
            return Err(LockError::NotHeld(name.to_string()));
        }
        if !self.service.release(name, self.id) {
            return Err(LockError::Backend(format!(
                "lock table does not record this session as owner of '{name}'"
            )));
        }
        Ok(())
    }
}

impl Drop for MemoryLockSession {
    fn drop(&mut self) {
        self.service.release_all(&mut self.held, self.id);
    }
}
