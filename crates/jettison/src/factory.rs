//! Stub routine construction
//!
//! The single entry point that picks a stub shape from the stub's
//! properties: whether it calls back into managed code, whether it retains
//! a managed object, and whether it owns an exception-handler entry. This
//! is a closed decision table; a new stub shape means a new row and a new
//! variant, not an extension point.

use std::sync::Arc;

use crate::code_blob::CodeBlob;
use crate::code_unit::CodeUnit;
use crate::handler_table::{CallSiteIndex, HandlerTable};
use crate::registry::RootRegistry;
use crate::routine::StubRoutine;
use crate::tracer::HeapRef;

/// Description of the handler entry a stub routine will own
pub struct HandlerSpec {
    pub code_unit: CodeUnit,
    pub call_site: CallSiteIndex,
    pub table: Arc<HandlerTable>,
}

/// Create a stub routine of the appropriate shape
///
/// GC-aware shapes are registered with `registry` before the handle is
/// returned; the caller owns the initial reference.
pub fn create_stub_routine(
    blob: CodeBlob,
    calls_out: bool,
    owned_object: Option<HeapRef>,
    handler: Option<HandlerSpec>,
    registry: &RootRegistry,
) -> Arc<StubRoutine> {
    if !calls_out {
        // Code that cannot call back into managed code cannot retain
        // managed objects across a safepoint, so it need not be a root.
        return StubRoutine::plain(blob);
    }

    if let Some(handler) = handler {
        assert!(
            owned_object.is_none(),
            "a stub routine owns a handler entry or marks an object, never both"
        );
        assert!(
            handler.code_unit.tier.supports_exception_metadata(),
            "handler-owning stub routines require a code unit with unwind metadata"
        );
        let routine = StubRoutine::with_exception_handler(
            blob,
            handler.code_unit.id,
            handler.call_site,
            handler.table,
        );
        registry.register(routine.clone());
        return routine;
    }

    let routine = match owned_object {
        Some(object) => StubRoutine::marking(blob, vec![object]),
        None => StubRoutine::gc_aware(blob),
    };
    registry.register(routine.clone());
    routine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_unit::{CodeUnitId, CompileTier};
    use crate::handler_table::HandlerEntry;

    fn blob() -> CodeBlob {
        CodeBlob::new(0x8000, 256).unwrap()
    }

    fn handler_spec(tier: CompileTier) -> HandlerSpec {
        let table = Arc::new(HandlerTable::new());
        let unit = CodeUnit::new(CodeUnitId::new(1), tier);
        let call_site = CallSiteIndex::new(0);
        table
            .register_entry(unit.id, call_site, HandlerEntry { catch_offset: 0x10 })
            .unwrap();
        HandlerSpec { code_unit: unit, call_site, table }
    }

    #[test]
    fn test_no_calls_out_yields_plain_routine() {
        let registry = RootRegistry::new();
        let routine = create_stub_routine(blob(), false, None, None, &registry);

        assert!(!routine.is_gc_aware());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_calls_out_yields_registered_gc_aware_routine() {
        let registry = RootRegistry::new();
        let routine = create_stub_routine(blob(), true, None, None, &registry);

        assert!(routine.is_gc_aware());
        assert_eq!(registry.len(), 1);
        routine.release();
    }

    #[test]
    fn test_owned_object_yields_marking_routine() {
        let registry = RootRegistry::new();
        let object = HeapRef::new(42);
        let routine = create_stub_routine(blob(), true, Some(object), None, &registry);

        let mut tracer = crate::tracer::RecordingTracer::new();
        routine.trace(&mut tracer);
        assert_eq!(tracer.visit_count(object), 1);
        assert_eq!(registry.len(), 1);
        routine.release();
    }

    #[test]
    fn test_handler_spec_yields_handler_routine() {
        let registry = RootRegistry::new();
        let spec = handler_spec(CompileTier::Optimizing);
        let table = spec.table.clone();
        let unit = spec.code_unit.id;
        let call_site = spec.call_site;

        let routine = create_stub_routine(blob(), true, None, Some(spec), &registry);
        assert!(routine.is_gc_aware());
        assert_eq!(registry.len(), 1);

        routine.release();
        assert!(!table.has_entry(unit, call_site));
    }

    #[test]
    #[should_panic(expected = "never both")]
    fn test_handler_and_object_is_rejected() {
        let registry = RootRegistry::new();
        let spec = handler_spec(CompileTier::Optimizing);
        create_stub_routine(blob(), true, Some(HeapRef::new(1)), Some(spec), &registry);
    }

    #[test]
    #[should_panic(expected = "unwind metadata")]
    fn test_baseline_tier_handler_is_rejected() {
        let registry = RootRegistry::new();
        let spec = handler_spec(CompileTier::Baseline);
        create_stub_routine(blob(), true, None, Some(spec), &registry);
    }
}
