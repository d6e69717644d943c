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

//! Session handle contract consumed by the lock manager.
//!
//! A [`LockSession`] is an open, exclusive-to-one-owner session against the
//! coordination service. Its lifetime is controlled entirely by the caller;
//! the crate never opens or closes it. Backends implement the two wire
//! commands — one try-lock-with-timeout request with an output integer, and
//! one release — and nothing else.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::{LockError, LockResult};

/// Longest resource name the coordination service accepts.
pub const MAX_NAME_LEN: usize = 255;

/// How long an acquire attempt is willing to block before giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Wait until the lock is granted or the service aborts the request.
    Infinite,
    /// Fail immediately when the lock is held elsewhere.
    Immediate,
    /// Wait up to the given number of milliseconds.
    BoundedMillis(u32),
}

impl WaitPolicy {
    /// Wire encoding of the wait budget: -1 infinite, 0 immediate, n bounded.
    pub fn timeout_millis(&self) -> i64 {
        match self {
            WaitPolicy::Infinite => -1,
            WaitPolicy::Immediate => 0,
            WaitPolicy::BoundedMillis(ms) => i64::from(*ms),
        }
    }
}

/// One advisory-lock request. Constructed fresh per call, never persisted.
#[derive(Clone, Debug)]
pub struct LockRequest {
    /// Resource name. The service validates it (non-empty, at most
    /// [`MAX_NAME_LEN`] bytes); a violation comes back as the validation
    /// error code, not as a transport error.
    pub name: String,
    /// Wait budget forwarded to the coordination service.
    pub wait: WaitPolicy,
    /// Per-call command timeout in seconds; 0 disables the timeout.
    pub command_timeout_secs: u32,
}

/// An open session capable of executing the lock wire commands.
///
/// ## Contract
/// - The session is a single-writer resource: it must not be used
///   concurrently by two logical lock owners. The crate introduces no
///   cross-session coordination of its own; correctness is delegated to the
///   coordination service's atomicity over the session.
/// - The lock mode is exclusive and the owner scope is the session itself;
///   locks still held when the session ends are released by the service.
/// - `execute_lock_request` performs exactly one service round trip and
///   returns the raw outcome code for
///   [`LockOutcome::classify`](crate::codes::LockOutcome::classify); it must
///   report the sentinel "already held" code
///   without attempting the underlying primitive when this session already
///   holds the named lock.
#[async_trait]
pub trait LockSession: Send {
    /// Issue one try-lock-with-timeout command and return the raw service
    /// return code.
    async fn execute_lock_request(&mut self, request: &LockRequest) -> LockResult<i32>;

    /// Release the named resource held by this session.
    async fn execute_release(&mut self, name: &str) -> LockResult<()>;
}

/// Bound a backend round trip by the request's command timeout.
///
/// 0 disables the bound. Expiry is a backend fault, not a "not acquired":
/// a stalled service call is indistinguishable from a dead connection.
pub(crate) async fn with_command_timeout<T, F>(secs: u32, fut: F) -> LockResult<T>
where
    F: Future<Output = LockResult<T>>,
{
    if secs == 0 {
        return fut.await;
    }
    match tokio::time::timeout(Duration::from_secs(u64::from(secs)), fut).await {
        Ok(result) => result,
        Err(_) => Err(LockError::Backend(format!(
            "command timed out after {secs}s"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_policy_wire_encoding() {
        assert_eq!(WaitPolicy::Infinite.timeout_millis(), -1);
        assert_eq!(WaitPolicy::Immediate.timeout_millis(), 0);
        assert_eq!(WaitPolicy::BoundedMillis(1500).timeout_millis(), 1500);
    }

    #[tokio::test]
    async fn command_timeout_disabled_when_zero() {
        let result = with_command_timeout(0, async { Ok(7) }).await.unwrap();
        assert_eq!(result, 7);
    }

    #[tokio::test]
    async fn command_timeout_elapses() {
        let result: LockResult<i32> = with_command_timeout(1, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(7)
        })
        .await;
        assert!(matches!(result, Err(LockError::Backend(_))));
    }
}
