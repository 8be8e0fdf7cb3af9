// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide IPC context for each core: a single owned value per process
//! bundling every attached/created named resource, with a scoped-acquisition
//! cleanup path.

use crate::error::{IpcError, Result};
use crate::naming::ResourceNames;
use crate::region::{CandidateSlot, Edge, SharedRegion};
use crate::shm::{NamedSemaphore, ShmSegment, WaitOutcome};
use crate::signal::StopFlag;
use crate::CAPACITY;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};

/// A stack of rollback actions, run in reverse (LIFO) order on drop unless
/// disarmed. Used during startup so that a failure partway through resource
/// creation tears down exactly what was already created, in the opposite
/// order it was acquired.
#[derive(Default)]
struct CleanupStack {
    actions: Vec<Box<dyn FnOnce()>>,
}

impl CleanupStack {
    fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, action: impl FnOnce() + 'static) {
        self.actions.push(Box::new(action));
    }

    /// Cancel all pending rollback actions; call once startup has fully
    /// succeeded and ownership has moved to a long-lived struct.
    fn disarm(mut self) {
        self.actions.clear();
    }
}

impl Drop for CleanupStack {
    fn drop(&mut self) {
        while let Some(action) = self.actions.pop() {
            action();
        }
    }
}

/// Why the supervisor's main loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// An empty candidate was observed: the graph is 3-colorable.
    ProofFound,
    /// The read counter reached the user-specified positive limit.
    LimitReached,
    /// The async stop flag became true.
    Interrupted,
}

/// Result of draining the ring until a termination condition.
pub struct DrainResult {
    pub termination: Termination,
    pub candidates_read: u64,
    /// `None` only when `termination == ProofFound` with no prior
    /// non-empty candidate observed.
    pub best: Option<Vec<Edge>>,
}

/// The supervisor side of the coordination core: owns the shared region and
/// all three semaphores for their full lifetime.
pub struct Supervisor {
    names: ResourceNames,
    segment: ShmSegment,
    used_slots: NamedSemaphore,
    free_slots: NamedSemaphore,
    write_mutex: NamedSemaphore,
    stop: StopFlag,
    shutdown_done: AtomicBool,
}

impl Supervisor {
    /// Startup sequence: install signal handlers, create the shared region
    /// and initialize it, then create the three semaphores. The optional
    /// startup delay is left to the caller, after construction, so that
    /// logging of "resources ready" and the sleep are clearly separated.
    ///
    /// On any failure, every resource already created is torn down in
    /// reverse order before the error is returned.
    pub fn create(names: ResourceNames) -> Result<Self> {
        let mut cleanup = CleanupStack::new();

        let segment = ShmSegment::create(&names.shm, SharedRegion::SIZE)?;
        {
            let shm_name = names.shm.clone();
            cleanup.push(move || {
                if let Err(e) = ShmSegment::unlink(&shm_name) {
                    warn!("rollback: failed to unlink {shm_name}: {e}");
                }
            });
        }

        // SAFETY: segment maps exactly SharedRegion::SIZE bytes, just created.
        let region = unsafe { SharedRegion::from_ptr(segment.as_ptr()) };
        region.init();

        let used_slots = NamedSemaphore::create(&names.used_slots, 0)?;
        {
            let name = names.used_slots.clone();
            cleanup.push(move || {
                let _ = NamedSemaphore::unlink(&name);
            });
        }

        let free_slots = NamedSemaphore::create(&names.free_slots, CAPACITY as u32)?;
        {
            let name = names.free_slots.clone();
            cleanup.push(move || {
                let _ = NamedSemaphore::unlink(&name);
            });
        }

        let write_mutex = NamedSemaphore::create(&names.write_mutex, 1)?;
        {
            let name = names.write_mutex.clone();
            cleanup.push(move || {
                let _ = NamedSemaphore::unlink(&name);
            });
        }

        let stop = StopFlag::install().map_err(IpcError::SignalInstall)?;

        cleanup.disarm();
        info!(
            "supervisor resources ready: shm={} sems={{{}, {}, {}}}",
            names.shm, names.used_slots, names.free_slots, names.write_mutex
        );

        Ok(Self {
            names,
            segment,
            used_slots,
            free_slots,
            write_mutex,
            stop,
            shutdown_done: AtomicBool::new(false),
        })
    }

    fn region(&self) -> &SharedRegion {
        // SAFETY: self.segment was created/sized for exactly this layout.
        unsafe { SharedRegion::from_ptr(self.segment.as_ptr()) }
    }

    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Main loop. `limit` of 0 means unbounded.
    pub fn drain(&self, limit: u64) -> Result<DrainResult> {
        let mut read_counter: u64 = 0;
        let mut best: Option<Vec<Edge>> = None;
        let mut best_len = usize::MAX;

        loop {
            match self.used_slots.wait() {
                WaitOutcome::Interrupted => {
                    if self.stop.is_set() {
                        return Ok(DrainResult {
                            termination: Termination::Interrupted,
                            candidates_read: read_counter,
                            best,
                        });
                    }
                    // No state mutated yet; retry the wait.
                    continue;
                }
                WaitOutcome::Acquired => {}
            }

            let slot: CandidateSlot = self.region().read_current_slot();
            let count = slot.len();

            if count == 0 {
                self.region().advance_read_pos();
                self.free_slots.post()?;
                read_counter += 1;
                return Ok(DrainResult {
                    termination: Termination::ProofFound,
                    candidates_read: read_counter,
                    best,
                });
            }

            if count < best_len {
                best_len = count;
                best = Some(slot.to_vec());
                report_new_best(best.as_ref().unwrap());
            }

            self.region().advance_read_pos();
            self.free_slots.post()?;
            read_counter += 1;
            debug!("candidates_read={read_counter} best_len={best_len}");

            if self.stop.is_set() {
                return Ok(DrainResult {
                    termination: Termination::Interrupted,
                    candidates_read: read_counter,
                    best,
                });
            }
            if limit > 0 && read_counter >= limit {
                return Ok(DrainResult {
                    termination: Termination::LimitReached,
                    candidates_read: read_counter,
                    best,
                });
            }
        }
    }

    /// Shutdown protocol. Idempotent: a second call observes
    /// `stop_generators` already set and `free_slots` already at capacity,
    /// so it is a no-op beyond re-unlinking already-absent names.
    pub fn shutdown(&self) {
        if self.shutdown_done.swap(true, Ordering::AcqRel) {
            debug!("shutdown already performed, skipping");
            return;
        }

        self.region().request_stop();

        loop {
            let value = match self.free_slots.value() {
                Ok(v) => v,
                Err(e) => {
                    warn!("shutdown: failed to read free_slots value: {e}");
                    break;
                }
            };
            if value >= CAPACITY as i32 {
                break;
            }
            if let Err(e) = self.free_slots.post() {
                warn!("shutdown: failed to post free_slots: {e}");
                break;
            }
        }

        if let Err(e) = ShmSegment::unlink(&self.names.shm) {
            warn!("shutdown: failed to unlink {}: {e}", self.names.shm);
        }
        for name in [
            &self.names.used_slots,
            &self.names.free_slots,
            &self.names.write_mutex,
        ] {
            if let Err(e) = NamedSemaphore::unlink(name) {
                warn!("shutdown: failed to unlink {name}: {e}");
            }
        }
    }
}

fn report_new_best(edges: &[Edge]) {
    eprintln!("New best result found:");
    for edge in edges {
        eprintln!("[{}, {}]", edge.u, edge.v);
    }
}

/// The generator side of the coordination core: attaches to (never creates)
/// the shared region and semaphores.
pub struct Generator {
    segment: ShmSegment,
    used_slots: NamedSemaphore,
    free_slots: NamedSemaphore,
    write_mutex: NamedSemaphore,
    stop: StopFlag,
}

/// Outcome of one publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The candidate was written and the slot advanced.
    Published,
    /// A signal interrupted a suspension point before any state mutated;
    /// the caller should regenerate and retry.
    Interrupted,
}

impl Generator {
    pub fn attach(names: &ResourceNames) -> Result<Self> {
        let segment = ShmSegment::open(&names.shm, SharedRegion::SIZE)?;
        let used_slots = NamedSemaphore::open(&names.used_slots)?;
        let free_slots = NamedSemaphore::open(&names.free_slots)?;
        let write_mutex = NamedSemaphore::open(&names.write_mutex)?;
        let stop = StopFlag::install().map_err(IpcError::SignalInstall)?;
        Ok(Self {
            segment,
            used_slots,
            free_slots,
            write_mutex,
            stop,
        })
    }

    fn region(&self) -> &SharedRegion {
        // SAFETY: self.segment was opened against the supervisor's layout.
        unsafe { SharedRegion::from_ptr(self.segment.as_ptr()) }
    }

    /// Whether the production loop should stop: either the process-local
    /// signal flag, or the supervisor's shared `stop_generators` flag.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop.is_set() || self.region().stop_requested()
    }

    /// Publish one candidate, acquiring `write_mutex` before `free_slots`.
    /// The caller is responsible for generating `edges` externally and
    /// discarding it unpublished if it has `MAX_EDGES` or more entries.
    pub fn publish(&self, edges: &[Edge]) -> Result<PublishOutcome> {
        debug_assert!(edges.len() < crate::MAX_EDGES);

        if self.write_mutex.wait() == WaitOutcome::Interrupted {
            return Ok(PublishOutcome::Interrupted);
        }

        if self.free_slots.wait() == WaitOutcome::Interrupted {
            self.write_mutex.post()?;
            return Ok(PublishOutcome::Interrupted);
        }

        // SAFETY: write_mutex is held and this generator is the only writer
        // touching the slot at write_pos until it posts write_mutex below.
        unsafe { self.region().write_current_slot(edges) };
        self.region().advance_write_pos();
        self.used_slots.post()?;
        self.write_mutex.post()?;
        Ok(PublishOutcome::Published)
    }

    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        // Unmap SR, close (but do not unlink) each semaphore: ShmSegment's
        // and NamedSemaphore's own Drop impls already do exactly that;
        // nothing extra to do here. Kept explicit so lifecycle ownership is
        // documented at the call site rather than left implicit.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn unique_names() -> ResourceNames {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        ResourceNames::new(&format!("test{ts}"))
    }

    #[test]
    fn create_then_shutdown_unlinks_resources() {
        let names = unique_names();
        let supervisor = Supervisor::create(names.clone()).expect("create");
        supervisor.shutdown();
        assert!(ShmSegment::open(&names.shm, SharedRegion::SIZE).is_err());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let names = unique_names();
        let supervisor = Supervisor::create(names).expect("create");
        supervisor.shutdown();
        supervisor.shutdown();
    }

    #[test]
    fn second_create_with_same_names_fails() {
        let names = unique_names();
        let supervisor = Supervisor::create(names.clone()).expect("create");
        let second = Supervisor::create(names.clone());
        assert!(second.is_err());
        supervisor.shutdown();
    }

    #[test]
    fn generator_publish_then_supervisor_drain_roundtrip() {
        let names = unique_names();
        let supervisor = Arc::new(Supervisor::create(names.clone()).expect("create"));
        let generator = Generator::attach(&names).expect("attach");

        let outcome = generator
            .publish(&[Edge::new(1, 2)])
            .expect("publish");
        assert_eq!(outcome, PublishOutcome::Published);

        let sup = Arc::clone(&supervisor);
        let handle = thread::spawn(move || sup.drain(1).expect("drain"));
        let result = handle.join().expect("join");
        assert_eq!(result.termination, Termination::LimitReached);
        assert_eq!(result.best, Some(vec![Edge::new(1, 2)]));

        drop(generator);
        supervisor.shutdown();
    }

    #[test]
    fn empty_candidate_is_proof() {
        let names = unique_names();
        let supervisor = Supervisor::create(names.clone()).expect("create");
        let generator = Generator::attach(&names).expect("attach");

        generator.publish(&[]).expect("publish empty");
        let result = supervisor.drain(0).expect("drain");
        assert_eq!(result.termination, Termination::ProofFound);

        drop(generator);
        supervisor.shutdown();
    }
}
