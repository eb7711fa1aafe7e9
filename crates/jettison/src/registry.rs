//! Root registry of GC-aware stub routines
//!
//! The collector's authoritative set of every live GC-aware routine. It is
//! populated at construction time by the factory and consulted every
//! collection cycle: marks are cleared, the conservative stack scan flags
//! routines whose code appears in a return address, registered routines
//! report their retained objects, and the sweep deletes every routine whose
//! deletion precondition holds. The registry's lifetime is tied to the
//! enclosing heap; teardown detaches any routine the clients still hold.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::routine::StubRoutine;
use crate::tracer::Tracer;

/// Process-wide set of live GC-aware stub routines
#[derive(Default)]
pub struct RootRegistry {
    routines: Mutex<Vec<Arc<StubRoutine>>>,
}

impl RootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a routine at construction time
    ///
    /// Mutator-side registration is synchronized with the collector by the
    /// heap's allocation discipline; plain routines never appear here.
    pub fn register(&self, routine: Arc<StubRoutine>) {
        debug_assert!(routine.is_gc_aware());
        self.routines.lock().push(routine);
    }

    /// Number of registered routines
    pub fn len(&self) -> usize {
        self.routines.lock().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.routines.lock().is_empty()
    }

    /// Start of a collection cycle: forget last cycle's execution marks
    pub fn clear_marks(&self) {
        for routine in self.routines.lock().iter() {
            routine.clear_executing_mark();
        }
    }

    /// Conservative stack-scan hook
    ///
    /// If `addr` (a return address seen on some native call stack) lands in
    /// a registered routine's code, that routine is flagged as possibly
    /// executing and survives this cycle's sweep. Returns whether anything
    /// matched.
    pub fn mark_executing_at(&self, addr: usize) -> bool {
        for routine in self.routines.lock().iter() {
            if routine.code().contains(addr) {
                routine.mark_executing();
                return true;
            }
        }
        false
    }

    /// Mark phase: have every registered routine report what it retains
    pub fn trace(&self, tracer: &mut dyn Tracer) {
        for routine in self.routines.lock().iter() {
            routine.trace(tracer);
        }
    }

    /// Sweep phase: delete every routine whose precondition holds
    ///
    /// A routine is deleted once its refcount is zero, it has been
    /// jettisoned, and the stack scan found no activation of its code.
    /// Returns the number deleted.
    pub fn sweep(&self) -> usize {
        let mut routines = self.routines.lock();
        let before = routines.len();
        routines.retain(|routine| {
            if routine.ref_count() == 0 && routine.is_jettisoned() && !routine.may_be_executing()
            {
                routine.delete_from_gc();
                false
            } else {
                true
            }
        });
        before - routines.len()
    }
}

impl Drop for RootRegistry {
    fn drop(&mut self) {
        // Heap teardown. Routines already at refcount zero die now; the
        // rest are detached so their final release self-deletes instead of
        // waiting for a sweep that will never come.
        for routine in self.routines.get_mut().drain(..) {
            routine.clear_executing_mark();
            if routine.ref_count() == 0 {
                routine.delete_from_gc();
            } else {
                routine.detach_from_registry();
            }
        }
    }
}
