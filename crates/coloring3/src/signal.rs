// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Signal Adapter: installs handlers that set a single async-signal-safe
//! stop flag and do nothing else. Uses `signal-hook`'s `flag` module rather
//! than this workspace's usual `ctrlc`, because blocking `sem_wait` calls
//! need to observe `EINTR` and be retried or unwound by the caller —
//! `flag::register` installs exactly a bare `sigaction` writing an
//! `AtomicBool`, with no signal-safety violating work (thread spawn, channel
//! send) in the handler itself.

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, async-signal-safe stop flag backed by an atomic integer.
#[derive(Clone)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Install `SIGINT`/`SIGTERM` handlers that set this flag. Safe to call
    /// once per process; both the supervisor and generator cores call it
    /// during their startup sequence.
    pub fn install() -> io::Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        flag::register(SIGINT, Arc::clone(&flag))?;
        flag::register(SIGTERM, Arc::clone(&flag))?;
        Ok(Self(flag))
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_flag_is_unset() {
        let flag = StopFlag::install().expect("install handlers");
        assert!(!flag.is_set());
    }

    #[test]
    fn clone_shares_state() {
        let flag = StopFlag::install().expect("install handlers");
        let clone = flag.clone();
        flag.0.store(true, Ordering::Relaxed);
        assert!(clone.is_set());
    }
}
