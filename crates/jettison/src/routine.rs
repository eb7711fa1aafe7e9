//! Stub routine lifetimes
//!
//! A stub routine is a fragment of generated executable code kept alive by
//! two independent authorities: the reference-counting client graph, and
//! the tracing collector, which may still see the routine's code on some
//! native call stack after the last client reference is gone. Plain
//! routines die as soon as their count reaches zero; GC-aware routines go
//! through an explicit Live -> Jettisoned -> Dead progression, with the
//! collector as the only party allowed to perform the final transition.
//!
//! The closed set of stub shapes is a sum type dispatched by pattern match:
//! plain, GC-aware, marking (retains managed objects), and handler-owning
//! (linked to an exception-handler table entry).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::code_blob::CodeBlob;
use crate::code_unit::CodeUnitId;
use crate::handler_table::{CallSiteIndex, HandlerTable};
use crate::tracer::{HeapRef, Tracer};

/// Progress of a GC-aware routine toward deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifePhase {
    /// Client references may still exist
    Live,
    /// Refcount reached zero; awaiting the collector's confirmation that no
    /// call stack is still executing this code
    Jettisoned,
    /// Deleted; must not be used again
    Dead,
}

/// State shared by every GC-aware stub shape
struct GcState {
    phase: Mutex<LifePhase>,
    /// Set during the collector's stack scan when a return address lands in
    /// this routine's code, cleared at the start of each cycle
    may_be_executing: AtomicBool,
    /// Set when the registry is torn down before this routine's count
    /// reached zero; the final release then deletes immediately instead of
    /// waiting for a sweep that will never come
    registry_detached: AtomicBool,
}

impl GcState {
    fn new() -> Self {
        GcState {
            phase: Mutex::new(LifePhase::Live),
            may_be_executing: AtomicBool::new(false),
            registry_detached: AtomicBool::new(false),
        }
    }
}

/// Back-reference from a handler-owning stub to its code unit
///
/// The code unit may be torn down independently of the stub, so this is a
/// relation (id + call-site index into the shared table), never an owning
/// pointer. Either side clears it first; the other finds it empty.
struct HandlerSite {
    code_unit: Mutex<Option<CodeUnitId>>,
    call_site: CallSiteIndex,
    table: Arc<HandlerTable>,
}

impl HandlerSite {
    /// Drop this routine's handler entry from the table, if still linked
    fn clear_handler_entry(&self) {
        let mut unit = self.code_unit.lock();
        if let Some(id) = unit.take() {
            // Call-site metadata first, then the entry itself.
            self.table.remove_call_site_metadata(id, self.call_site);
            self.table.remove_entry(id, self.call_site);
        }
    }
}

/// The closed set of stub shapes
enum StubKind {
    /// Never calls back into managed code; no GC involvement
    Plain,
    /// Calls out but retains nothing
    GcAware(GcState),
    /// Retains one or more managed objects, reported during the mark phase
    Marking { gc: GcState, owned: Vec<HeapRef> },
    /// Owns an exception-handler table entry
    ExceptionHandler { gc: GcState, site: HandlerSite },
}

/// A reference-counted fragment of generated executable code
///
/// Construction goes through [`crate::factory::create_stub_routine`]; every
/// borrow is bracketed by `acquire`/`release`. The routine starts with a
/// count of one, owned by the caller of the factory.
pub struct StubRoutine {
    blob: CodeBlob,
    ref_count: AtomicU32,
    kind: StubKind,
}

impl StubRoutine {
    pub(crate) fn plain(blob: CodeBlob) -> Arc<Self> {
        Arc::new(StubRoutine {
            blob,
            ref_count: AtomicU32::new(1),
            kind: StubKind::Plain,
        })
    }

    pub(crate) fn gc_aware(blob: CodeBlob) -> Arc<Self> {
        Arc::new(StubRoutine {
            blob,
            ref_count: AtomicU32::new(1),
            kind: StubKind::GcAware(GcState::new()),
        })
    }

    pub(crate) fn marking(blob: CodeBlob, owned: Vec<HeapRef>) -> Arc<Self> {
        assert!(!owned.is_empty(), "marking stub routine must retain at least one object");
        Arc::new(StubRoutine {
            blob,
            ref_count: AtomicU32::new(1),
            kind: StubKind::Marking { gc: GcState::new(), owned },
        })
    }

    pub(crate) fn with_exception_handler(
        blob: CodeBlob,
        code_unit: CodeUnitId,
        call_site: CallSiteIndex,
        table: Arc<HandlerTable>,
    ) -> Arc<Self> {
        // A handler-owning stub without a registered entry is a caller bug
        // upstream in the compiler.
        assert!(
            table.has_entry(code_unit, call_site),
            "no handler entry registered for unit {:?} call site {}",
            code_unit,
            call_site.raw()
        );
        Arc::new(StubRoutine {
            blob,
            ref_count: AtomicU32::new(1),
            kind: StubKind::ExceptionHandler {
                gc: GcState::new(),
                site: HandlerSite {
                    code_unit: Mutex::new(Some(code_unit)),
                    call_site,
                    table,
                },
            },
        })
    }

    fn gc_state(&self) -> Option<&GcState> {
        match &self.kind {
            StubKind::Plain => None,
            StubKind::GcAware(gc)
            | StubKind::Marking { gc, .. }
            | StubKind::ExceptionHandler { gc, .. } => Some(gc),
        }
    }

    /// The generated code this routine wraps
    pub fn code(&self) -> &CodeBlob {
        &self.blob
    }

    /// Whether this routine participates in the collector's root set
    pub fn is_gc_aware(&self) -> bool {
        self.gc_state().is_some()
    }

    /// Current client reference count
    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Acquire)
    }

    /// Take a client reference
    pub fn acquire(&self) {
        self.ref_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop a client reference
    ///
    /// Decrementing past zero is a fatal contract violation. The zero
    /// crossing runs the teardown observation exactly once.
    pub fn release(&self) {
        let prev = self.ref_count.fetch_sub(1, Ordering::AcqRel);
        assert!(prev > 0, "stub routine reference count underflow");
        if prev == 1 {
            self.observe_zero_ref_count();
        }
    }

    fn observe_zero_ref_count(&self) {
        // Handler-owning stubs drop their table entry before the base
        // teardown: the runtime may consult the table while walking an
        // in-flight stack between now and physical deletion, and must not
        // find an entry pointing at a condemned stub.
        if let StubKind::ExceptionHandler { site, .. } = &self.kind {
            site.clear_handler_entry();
        }

        let Some(gc) = self.gc_state() else {
            // Plain routines are dead as soon as the count hits zero.
            return;
        };

        let mut phase = gc.phase.lock();
        if gc.registry_detached.load(Ordering::Acquire) {
            // The registry was torn down before our count reached zero; no
            // sweep is coming, so the routine dies here.
            *phase = LifePhase::Dead;
            return;
        }
        debug_assert_eq!(*phase, LifePhase::Live);
        *phase = LifePhase::Jettisoned;
    }

    /// Current phase, or `None` for a plain routine
    pub fn life_phase(&self) -> Option<LifePhase> {
        self.gc_state().map(|gc| *gc.phase.lock())
    }

    /// Whether the refcount-zero event has been observed and the collector
    /// told this routine is condemned
    pub fn is_jettisoned(&self) -> bool {
        matches!(self.life_phase(), Some(LifePhase::Jettisoned) | Some(LifePhase::Dead))
    }

    /// Whether this routine has been deleted
    pub fn is_dead(&self) -> bool {
        match self.life_phase() {
            Some(phase) => phase == LifePhase::Dead,
            None => self.ref_count() == 0,
        }
    }

    /// Whether a call stack may still be executing this routine's code
    pub fn may_be_executing(&self) -> bool {
        self.gc_state()
            .map(|gc| gc.may_be_executing.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Report every managed object this routine keeps alive
    ///
    /// Invoked by the collector once per cycle while the routine is
    /// registered. Routines that retain nothing report nothing.
    pub fn trace(&self, tracer: &mut dyn Tracer) {
        if let StubKind::Marking { owned, .. } = &self.kind {
            for &object in owned {
                tracer.visit(object);
            }
        }
    }

    /// Called by the owning code unit when it is being torn down first
    ///
    /// Clears the back-reference so this routine does not later touch a
    /// dead code unit. Idempotent; a no-op for shapes without one.
    pub fn about_to_die(&self) {
        if let StubKind::ExceptionHandler { site, .. } = &self.kind {
            *site.code_unit.lock() = None;
        }
    }

    pub(crate) fn mark_executing(&self) {
        if let Some(gc) = self.gc_state() {
            gc.may_be_executing.store(true, Ordering::Release);
        }
    }

    pub(crate) fn clear_executing_mark(&self) {
        if let Some(gc) = self.gc_state() {
            gc.may_be_executing.store(false, Ordering::Release);
        }
    }

    /// Final transition, performed by the collector during sweep
    ///
    /// The collector is expected to have verified the preconditions; a call
    /// without them is a contract violation, not a recoverable state.
    pub(crate) fn delete_from_gc(&self) {
        let gc = match self.gc_state() {
            Some(gc) => gc,
            None => unreachable!("plain stub routines are never registered with the collector"),
        };
        assert_eq!(self.ref_count(), 0, "deleting a stub routine that still has references");
        assert!(!gc.may_be_executing.load(Ordering::Acquire), "deleting a stub routine that may be executing");
        let mut phase = gc.phase.lock();
        assert_eq!(*phase, LifePhase::Jettisoned, "deleting a stub routine that was not jettisoned");
        *phase = LifePhase::Dead;
    }

    /// Shutdown path: the registry is going away before this routine's
    /// count reached zero
    pub(crate) fn detach_from_registry(&self) {
        let Some(gc) = self.gc_state() else { return };
        gc.registry_detached.store(true, Ordering::Release);
        let mut phase = gc.phase.lock();
        if *phase == LifePhase::Live {
            *phase = LifePhase::Jettisoned;
        }
    }
}
