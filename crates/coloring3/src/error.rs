// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy for the IPC coordination core.

use std::fmt;
use std::io;

/// Errors that can occur while creating, attaching to, or operating the
/// shared-memory ring and its named semaphores.
#[derive(Debug)]
pub enum IpcError {
    /// Shared memory segment creation failed (includes "already exists").
    SegmentCreate(io::Error),

    /// Shared memory segment open (attach) failed.
    SegmentOpen(io::Error),

    /// Memory mapping failed.
    Mmap(io::Error),

    /// Invalid segment or semaphore name.
    InvalidName(String),

    /// Named resource not found (generator attach against a missing supervisor).
    NotFound(String),

    /// Semaphore creation failed (includes "already exists").
    SemaphoreCreate(String, io::Error),

    /// Semaphore open (attach) failed.
    SemaphoreOpen(String, io::Error),

    /// A semaphore post or getvalue call failed unexpectedly.
    SemaphoreOp(String, io::Error),

    /// Installing the signal handlers failed.
    SignalInstall(io::Error),
}

impl fmt::Display for IpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SegmentCreate(e) => write!(f, "shared memory segment creation failed: {e}"),
            Self::SegmentOpen(e) => write!(f, "shared memory segment open failed: {e}"),
            Self::Mmap(e) => write!(f, "memory mapping failed: {e}"),
            Self::InvalidName(name) => write!(f, "invalid resource name: {name}"),
            Self::NotFound(name) => write!(f, "resource not found: {name}"),
            Self::SemaphoreCreate(name, e) => write!(f, "semaphore {name} creation failed: {e}"),
            Self::SemaphoreOpen(name, e) => write!(f, "semaphore {name} open failed: {e}"),
            Self::SemaphoreOp(name, e) => write!(f, "semaphore {name} operation failed: {e}"),
            Self::SignalInstall(e) => write!(f, "failed to install signal handlers: {e}"),
        }
    }
}

impl std::error::Error for IpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SegmentCreate(e) | Self::SegmentOpen(e) | Self::Mmap(e) | Self::SignalInstall(e) => Some(e),
            Self::SemaphoreCreate(_, e) | Self::SemaphoreOpen(_, e) | Self::SemaphoreOp(_, e) => {
                Some(e)
            }
            _ => None,
        }
    }
}

/// Result type for IPC coordination operations.
pub type Result<T> = std::result::Result<T, IpcError>;
