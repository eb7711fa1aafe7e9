//! Lifetime management for GC-aware generated-code stub routines
//!
//! A stub routine is a self-contained fragment of generated executable
//! code, invoked like a function. It must stay valid exactly as long as two
//! independent authorities need it:
//! - the reference-counting client graph (`acquire`/`release`), and
//! - the tracing collector, which may still find the routine's code on a
//!   native call stack after the last client reference is dropped.
//!
//! This crate implements the reconciliation protocol between the two:
//! - [`CodeBlob`]: immutable handle to a region of generated code
//! - [`StubRoutine`]: refcounted wrapper with an explicit
//!   Live -> Jettisoned -> Dead state machine for GC-aware shapes
//! - [`RootRegistry`]: the collector's set of GC-aware routines, driven
//!   through clear-marks / stack-scan / trace / sweep each cycle
//! - [`HandlerTable`] and [`Tracer`]: the collaborator interfaces a routine
//!   interacts with during teardown and the mark phase
//! - [`create_stub_routine`]: the closed decision table choosing the shape

pub mod code_blob;
pub mod code_unit;
pub mod factory;
pub mod handler_table;
pub mod registry;
pub mod routine;
pub mod tracer;

pub use code_blob::{CodeBlob, CodeBlobError};
pub use code_unit::{CodeUnit, CodeUnitId, CompileTier};
pub use factory::{create_stub_routine, HandlerSpec};
pub use handler_table::{CallSiteIndex, HandlerEntry, HandlerTable, HandlerTableError};
pub use registry::RootRegistry;
pub use routine::{LifePhase, StubRoutine};
pub use tracer::{HeapRef, RecordingTracer, Tracer};
