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

//! # Applock — session-scoped advisory locks
//!
//! ## Purpose
//! Lets independent processes agree that at most one of them holds a named
//! lock at any time, using a relational database's advisory-lock facility as
//! the arbiter. The crate owns the acquire/release protocol and the
//! classification of the service's return codes; it deliberately does not own
//! connection pooling, retries, lease renewal, or fencing tokens.
//!
//! ## Architecture Context
//! A [`SessionLockManager`] is bound to exactly one open session against the
//! coordination service (the [`LockSession`] capability, injected at
//! construction). Lock ownership is tied to that session's lifetime: when the
//! session ends, the service releases everything it held. The
//! mutual-exclusion guarantee is void if the caller shares one session
//! between two logical lock owners.
//!
//! ## Backend Support
//!
//! - **Memory** (feature `memory-backend`, default): in-process emulation of
//!   the advisory-lock primitive, for testing and single-process use
//! - **PostgreSQL** (feature `postgres-backend`): session-scoped advisory
//!   locks over a dedicated `sqlx` connection
//!
//! ## Examples
//!
//! ```rust,no_run
//! use applock::memory::MemoryLockService;
//! use applock::SessionLockManager;
//!
//! # async fn example() -> applock::LockResult<()> {
//! let service = MemoryLockService::new();
//! let manager = SessionLockManager::new(service.session());
//!
//! // Non-blocking attempt: None means somebody else holds the lock.
//! if let Some(guard) = manager.try_acquire("inventory-sync").await? {
//!     // ... critical section ...
//!     guard.release().await?;
//! }
//!
//! // Blocking attempt: waits until the service grants the lock.
//! if let Some(guard) = manager.acquire("inventory-sync").await? {
//!     guard.release().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod codes;
pub mod error;
pub mod manager;
pub mod session;

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub use codes::LockOutcome;
pub use error::{LockError, LockResult};
pub use manager::{LockGuard, SessionLockManager};
pub use session::{LockRequest, LockSession, WaitPolicy};
