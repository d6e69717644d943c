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

//! Error types for lock operations.
//!
//! A lock that could not be granted because of contention is **not** an
//! error: `acquire`/`try_acquire` report it as `Ok(None)`. Everything in
//! [`LockError`] is an operational anomaly the caller must not silently
//! retry.

use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur during lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// The lock request was canceled by the coordination service.
    #[error("lock request was canceled")]
    Canceled,

    /// The coordination service chose this request as a deadlock victim.
    #[error("lock request was chosen as a deadlock victim")]
    DeadlockVictim,

    /// The coordination service rejected the request as malformed.
    #[error("invalid lock request: {0}")]
    InvalidRequest(String),

    /// The service answered with a negative code outside the documented
    /// taxonomy.
    #[error("could not acquire lock, unrecognized return code: {0}")]
    UnknownReturnCode(i32),

    /// A release was issued for a lock this session does not hold.
    #[error("lock not held by this session: {0}")]
    NotHeld(String),

    /// Backend error (database, network, etc.)
    #[error("backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "postgres-backend")]
impl From<sqlx::Error> for LockError {
    fn from(err: sqlx::Error) -> Self {
        LockError::Backend(format!("SQL error: {err}"))
    }
}
