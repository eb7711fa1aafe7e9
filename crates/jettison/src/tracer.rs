//! Tracing interface between stub routines and the collector
//!
//! Stub routines can keep managed heap objects alive. During the mark phase
//! the collector hands each registered routine a [`Tracer`]; the routine
//! reports every object it retains and the collector propagates
//! reachability from there.

/// Opaque reference to a managed heap object
///
/// The collector owns the interpretation of the raw value; this crate only
/// carries it between a stub routine and the tracer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapRef(u64);

impl HeapRef {
    pub fn new(raw: u64) -> Self {
        HeapRef(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Visitor supplied by the collector during the mark phase
///
/// `visit` is called once per retained object per trace pass. The side
/// effect is marking; there is no return value.
pub trait Tracer {
    fn visit(&mut self, object: HeapRef);
}

/// Tracer that records every visited object, for tests and diagnostics
#[derive(Debug, Default)]
pub struct RecordingTracer {
    visited: Vec<HeapRef>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> &[HeapRef] {
        &self.visited
    }

    /// How many times `object` was visited
    pub fn visit_count(&self, object: HeapRef) -> usize {
        self.visited.iter().filter(|&&o| o == object).count()
    }
}

impl Tracer for RecordingTracer {
    fn visit(&mut self, object: HeapRef) {
        self.visited.push(object);
    }
}
