//! # Poolworks
//!
//! Reusable resources for long-running services: a bounded, lock-free object
//! pool with RAII leases, and controllable worker threads grouped under a name.
//!
//! ## Key Features
//!
//! - **Object pool**: lease never blocks; a miss creates a fresh object, and a
//!   return over capacity destroys instead of growing the idle set
//! - **Lifecycle hooks**: reset before re-queuing, release on destruction;
//!   failures and panics in either are contained
//! - **Diagnostics**: hit, miss, overflow, reset-failure and resurrection counters
//! - **Processors**: OS threads with cooperative pause, resume and stop,
//!   best-effort core pinning and a graceful-then-detach shutdown
//! - **Fault sink**: worker errors and panics are reported instead of lost
//!
//! ## ObjectPool
//!
//! ```rust
//! use poolworks::pooling::ObjectPool;
//!
//! let pool = ObjectPool::new(2, Vec::<u8>::new).unwrap();
//! let mut buf = pool.lease().unwrap();
//! buf.extend_from_slice(b"hello");
//! buf.dispose();
//!
//! assert_eq!(pool.idle_count(), 2);
//! assert_eq!(pool.diagnostics().hits().value(), 1);
//! ```
//!
//! ## Processors
//!
//! ```rust
//! use poolworks::threading::{Processors, RunOptions};
//! use std::time::Duration;
//!
//! let group = Processors::new("workers");
//! for _ in 0..2 {
//!     group
//!         .add(RunOptions::new(), |p, _index| {
//!             while !p.should_stop(Some(Duration::from_millis(10))) {
//!                 p.could_resume(None);
//!             }
//!             Ok(p.finish(true))
//!         })
//!         .unwrap();
//! }
//!
//! let outcomes = group.remove_all(Some(Duration::from_secs(5)));
//! assert!(outcomes.iter().all(|o| o.is_graceful()));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Error types and fault reporting.
pub mod core;
/// Configuration models for pools and processor groups.
pub mod config;
/// Builders to construct pools from code or configuration.
pub mod builders;
/// Object pool, leases and lifecycle hooks.
pub mod pooling;
/// Controllable worker threads and groups.
pub mod threading;
/// Executors for deferred work.
pub mod runtime;
/// Shared utilities.
pub mod util;
