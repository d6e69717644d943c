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

//! Return-code taxonomy of the advisory-lock primitive.
//!
//! The coordination service answers every lock request with a single
//! integer that conflates "granted", "timed out", "canceled", "deadlock
//! victim" and "malformed request". [`LockOutcome::classify`] is the one
//! place where that integer is turned into a tagged outcome; nothing else
//! in the crate compares raw codes.

/// Lock granted synchronously; nobody was holding it.
pub const GRANTED: i32 = 0;

/// Lock granted after waiting for another holder to release it.
pub const GRANTED_AFTER_WAIT: i32 = 1;

/// The wait budget elapsed before the lock could be granted.
pub const WAIT_TIMEOUT: i32 = -1;

/// The request was canceled before it could be granted.
pub const CANCELED: i32 = -2;

/// The service chose this request as a deadlock victim.
pub const DEADLOCK_VICTIM: i32 = -3;

/// Parameter validation or another request-level error.
pub const VALIDATION_ERROR: i32 = -999;

/// Sentinel emitted by the pre-check when this session already holds the
/// named lock; the underlying primitive was never attempted.
pub const ALREADY_HELD: i32 = 103;

/// Classified outcome of one lock-request round trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockOutcome {
    /// Granted immediately (code 0).
    Granted,
    /// Granted after waiting (code 1).
    GrantedAfterWait,
    /// Wait elapsed without a grant (code -1). Expected under contention.
    WaitTimedOut,
    /// Canceled externally (code -2). Fatal.
    Canceled,
    /// Selected as deadlock victim (code -3). Fatal.
    DeadlockVictim,
    /// Parameter/validation error (code -999). Fatal.
    InvalidRequest,
    /// Pre-check short-circuit fired (sentinel code 103). Not a new grant.
    AlreadyHeld,
    /// A code outside the documented taxonomy, carried verbatim.
    /// Non-positive codes are fatal; positive ones are treated as
    /// "not granted".
    Unrecognized(i32),
}

impl LockOutcome {
    /// Map a raw service return code onto the closed outcome taxonomy.
    pub fn classify(code: i32) -> Self {
        match code {
            GRANTED => LockOutcome::Granted,
            GRANTED_AFTER_WAIT => LockOutcome::GrantedAfterWait,
            WAIT_TIMEOUT => LockOutcome::WaitTimedOut,
            CANCELED => LockOutcome::Canceled,
            DEADLOCK_VICTIM => LockOutcome::DeadlockVictim,
            VALIDATION_ERROR => LockOutcome::InvalidRequest,
            ALREADY_HELD => LockOutcome::AlreadyHeld,
            other => LockOutcome::Unrecognized(other),
        }
    }

    /// True when the round trip produced a live lock.
    pub fn is_acquired(&self) -> bool {
        matches!(self, LockOutcome::Granted | LockOutcome::GrantedAfterWait)
    }
}
