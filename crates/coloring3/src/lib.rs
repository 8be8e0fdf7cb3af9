// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # coloring3
//!
//! The interprocess bounded-buffer coordination layer linking one
//! supervisor (consumer) to N generators (producers) via a fixed-size
//! shared-memory ring, three named counting semaphores, and a shutdown
//! handshake.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coloring3::{Edge, Generator, ResourceNames, Supervisor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let names = ResourceNames::with_default_prefix();
//! let supervisor = Supervisor::create(names.clone())?;
//!
//! // In another process, attached to the same names:
//! let generator = Generator::attach(&names)?;
//! generator.publish(&[Edge::new(1, 2)])?;
//!
//! let result = supervisor.drain(1)?;
//! supervisor.shutdown();
//! # let _ = result;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------+                         +--------------------+
//! |  Supervisor Core    |   Shared Region (SR)   |   Generator Core    |
//! |      (one)          |   ring + cursors +      |      (many)         |
//! |  drains candidates  |   stop_generators       |  publishes          |
//! |  tracks best result |<----------------------->|  candidates         |
//! +--------------------+   Named Semaphore Set    +--------------------+
//!                          (free_slots, used_slots,
//!                           write_mutex)
//! ```
//!
//! ## Modules Overview
//!
//! - [`region`] - the shared memory layout (ring, cursors, stop flag)
//! - [`shm`] - raw POSIX segment and named-semaphore wrappers
//! - [`naming`] - deployment-scoped resource name derivation
//! - [`signal`] - async-signal-safe stop flag adapter
//! - [`context`] - per-process lifecycle: `Supervisor` and `Generator`
//! - [`error`] - the IPC error taxonomy

pub mod context;
pub mod error;
pub mod naming;
pub mod region;
pub mod shm;
pub mod signal;

pub use context::{DrainResult, Generator, PublishOutcome, Supervisor, Termination};
pub use error::{IpcError, Result};
pub use naming::ResourceNames;
pub use region::{CandidateSlot, Edge, SharedRegion};
pub use shm::{NamedSemaphore, ShmSegment, WaitOutcome};
pub use signal::StopFlag;

/// Ring capacity: number of candidate slots.
pub const CAPACITY: usize = 10;

/// Maximum edges representable in one candidate slot. A generator's
/// candidate must have strictly fewer edges than this to leave room for the
/// sentinel.
pub const MAX_EDGES: usize = 10;
