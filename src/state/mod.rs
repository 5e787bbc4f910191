//! State management module
//!
//! Handles cursor tracking, checkpointing, and resumability.
//! State is persisted between runs so a restarted input neither
//! reprocesses committed objects nor forgets failing ones.
//!
//! # Overview
//!
//! The state module provides:
//! - `Checkpoint` - Watermark (name + time) and the retry ledger
//! - `CursorState` - Serialized mutation of a shared checkpoint
//! - `CommitGuard` - Commit section held across persistence

mod cursor;
mod types;

pub use cursor::{CommitGuard, CursorState, FailureOutcome, DEFAULT_MAX_RETRIES};
pub use types::{cmp_names, is_zero_time, zero_time, Checkpoint};
