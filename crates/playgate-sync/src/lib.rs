//! Background jobs for Playgate.
//!
//! Sessions move between two stores over their lifetime:
//!
//! ```text
//!            login (set, 15 min TTL)
//!                    │
//!                    ▼
//!   ┌──────────── SessionCache ────────────┐
//!   │                                      │
//!   │ startup_sync              ExpiryScanner (every tick:
//!   │ (once, at boot,           TTL ≤ threshold → upsert
//!   │  1 h TTL)                 into archive, then delete)
//!   │                                      │
//!   └──────────────── Archive ◄────────────┘
//! ```
//!
//! Neither job takes a lock across stores. Correctness rests on the
//! archive write being an upsert and the cache delete being conditional
//! on the TTL, so any interleaving with a concurrent login leaves the
//! session in the cache, the archive, or both.
//!
//! [`SyncJobs`] owns the running jobs and their shared shutdown signal.

mod config;
mod jobs;
mod scanner;
mod startup;

pub use config::SyncConfig;
pub use jobs::SyncJobs;
pub use scanner::{ExpiryScanner, ScanReport};
pub use startup::{RestoreReport, startup_sync};
