// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Poller
//!
//! Incremental object storage poller with crash-safe checkpoints.
//!
//! Lists a bucket on an interval, downloads objects it has not seen yet over a
//! bounded worker pool and publishes their lines downstream. Progress is kept
//! as a watermark (largest object name and modification time committed) plus
//! a retry ledger of failing objects, persisted after every commit.
//!
//! ## Features
//!
//! - **Cloud Sources**: S3, R2, GCS, Azure Blob and local directories via `object_store`
//! - **Exactly-Once Commit Section**: Mutation and persistence under one guard
//! - **Bounded Retries**: Failing objects are retried each cycle, then abandoned
//! - **Rate Limiting**: Token bucket throttling of downloads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_poller::{load_config, StoreSource, WorkerCoordinator, Result};
//! use solidafy_poller::metrics::CursorMetrics;
//! use solidafy_poller::persist::FileCheckpointStore;
//! use solidafy_poller::publish::StdoutPublisher;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("poller.yaml")?;
//!
//!     let coordinator = WorkerCoordinator::start(
//!         &config,
//!         Arc::new(StoreSource::parse(&config.url)?),
//!         Arc::new(StdoutPublisher::stdout()),
//!         Arc::new(FileCheckpointStore::new("./state")),
//!         Arc::new(CursorMetrics::new()),
//!     )
//!     .await?;
//!
//!     coordinator.run(CancellationToken::new()).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      WorkerCoordinator                          │
//! │   list() → plan_cycle() → buffer_unordered(max_workers)         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────┬────────────────┴───┬──────────────┬───────────────┐
//! │   Source    │    CursorState     │   Persist    │   Publish     │
//! ├─────────────┼────────────────────┼──────────────┼───────────────┤
//! │ S3 / R2     │ commit → guard     │ File (JSON)  │ NDJSON writer │
//! │ GCS / Azure │ record_failure     │ Memory       │ Channel       │
//! │ Local       │ discard_failure    │              │               │
//! │ Rate Limit  │ snapshot / restore │              │               │
//! └─────────────┴────────────────────┴──────────────┴───────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the poller
pub mod error;

/// Failed object gauges and counters
pub mod metrics;

/// Cursor state and checkpoints
pub mod state;

/// Checkpoint persistence
pub mod persist;

/// Poller configuration
pub mod config;

/// Object sources
pub mod source;

/// Downstream event publishing
pub mod publish;

/// Poll loop and worker pool
pub mod coordinator;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

// Re-export commonly used types
pub use config::{load_config, load_config_from_str, PollerConfig};
pub use coordinator::{CycleStats, WorkerCoordinator};
pub use source::{ObjectInfo, ObjectSource, StoreSource};
pub use state::{Checkpoint, CommitGuard, CursorState, FailureOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
