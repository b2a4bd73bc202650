//! Behavior guard for marketplace actions.
//!
//! Every user-initiated action (search, contact, save, listing creation) is
//! checked by [`Guard::check_and_update`] before it runs. The guard is built
//! from four parts:
//!
//! 1. **ActionLog** (`action_log.rs`): bounded per-(user, action type) history.
//!
//! 2. **SuspicionDetector** (`detector.rs`): too-fast, exact-repetition and
//!    high-frequency heuristics, plus a bounded list of suspicion events.
//!
//! 3. **BlockRegistry** (`block.rs`): temporary blocks with cancellable
//!    per-user expiry.
//!
//! 4. **Guard** (`limiter.rs`): the facade turning the above and the optional
//!    remote quota check into a [`Verdict`].
//!
//! The admin monitor (`monitor.rs`) aggregates suspicion events per user and
//! exposes manual block control.
//!
//! # Example Usage
//!
//! ```ignore
//! use bazaar_guard_lib::config::Config;
//! use bazaar_guard_lib::guard::{ActionType, CheckOptions, Guard, UserId};
//!
//! let guard = Guard::new(&Config::default());
//! let user = UserId::new("user-42")?;
//!
//! let verdict = guard
//!     .check_and_update(&user, &ActionType::Search, CheckOptions::default())
//!     .await;
//! if !verdict.allowed {
//!     println!("refused: {}", verdict.reason.unwrap_or_default());
//! }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [detector]
//! too_fast_window_ms = 1000
//! ceilings = { SEARCH = 30, CONTACT = 10 }
//!
//! [limiter]
//! auto_block_score = 5
//! auto_block_minutes = 30
//! ```

mod action;
mod action_log;
mod block;
mod detector;
mod limiter;
mod monitor;
mod verdict;

pub use action::{ActionRecord, ActionType, Payload, UserId};
pub use action_log::ActionLog;
pub use block::{BlockReceipt, BlockRegistry, BlockSnapshot, MAX_BLOCK};
pub use detector::{Detection, PatternKind, SuspicionDetector, SuspicionEvent};
pub use limiter::{CheckOptions, Guard};
pub use monitor::{aggregate, SuspiciousUser};
pub use verdict::{Verdict, VerdictSource};

use std::sync::{Mutex, MutexGuard};

#[inline]
fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("{what} lock poisoned, recovering");
        poisoned.into_inner()
    })
}
