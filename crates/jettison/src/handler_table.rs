//! Exception-handler table
//!
//! Maps a (code unit, call site) pair to the unwind metadata needed to
//! resume execution after a thrown error, plus the auxiliary per-unit list
//! of call sites that currently have handlers. The runtime may consult this
//! table while walking an in-flight call stack, so entries owned by a stub
//! routine must be removed no later than the stub's refcount reaching zero.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::code_unit::CodeUnitId;

/// Index of a call site within a compiled code unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSiteIndex(u32);

impl CallSiteIndex {
    pub fn new(raw: u32) -> Self {
        CallSiteIndex(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Handler table errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerTableError {
    /// An entry for this (unit, call site) pair already exists
    #[error("handler already registered for unit {unit:?} call site {call_site}")]
    DuplicateEntry {
        unit: CodeUnitId,
        call_site: u32,
    },
}

/// Unwind metadata for one handler entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerEntry {
    /// Native-code offset of the catch continuation within the code unit
    pub catch_offset: u32,
}

/// Mapping from call sites to exception-unwinding metadata
///
/// Internals follow the usual keyed-registry shape: an `RwLock` over an
/// `FxHashMap`, readers on the runtime's unwind path, writers on the
/// compiler and teardown paths.
#[derive(Default)]
pub struct HandlerTable {
    entries: RwLock<FxHashMap<(CodeUnitId, CallSiteIndex), HandlerEntry>>,
    /// Auxiliary metadata: which call sites of a unit currently have handlers
    call_sites: RwLock<FxHashMap<CodeUnitId, FxHashSet<CallSiteIndex>>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler entry for a call site
    ///
    /// Registering the same (unit, call site) pair twice is a caller error.
    pub fn register_entry(
        &self,
        unit: CodeUnitId,
        call_site: CallSiteIndex,
        entry: HandlerEntry,
    ) -> Result<(), HandlerTableError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&(unit, call_site)) {
            return Err(HandlerTableError::DuplicateEntry {
                unit,
                call_site: call_site.raw(),
            });
        }
        entries.insert((unit, call_site), entry);
        self.call_sites.write().entry(unit).or_default().insert(call_site);
        Ok(())
    }

    /// Whether an entry exists for this call site
    pub fn has_entry(&self, unit: CodeUnitId, call_site: CallSiteIndex) -> bool {
        self.entries.read().contains_key(&(unit, call_site))
    }

    /// Look up the entry for a call site
    pub fn entry(&self, unit: CodeUnitId, call_site: CallSiteIndex) -> Option<HandlerEntry> {
        self.entries.read().get(&(unit, call_site)).copied()
    }

    /// Remove the handler entry for a call site
    ///
    /// Safe to call when no entry exists.
    pub fn remove_entry(&self, unit: CodeUnitId, call_site: CallSiteIndex) {
        self.entries.write().remove(&(unit, call_site));
    }

    /// Remove a call site from the unit's auxiliary metadata
    ///
    /// Safe to call when the call site is already absent.
    pub fn remove_call_site_metadata(&self, unit: CodeUnitId, call_site: CallSiteIndex) {
        let mut call_sites = self.call_sites.write();
        if let Some(sites) = call_sites.get_mut(&unit) {
            sites.remove(&call_site);
            if sites.is_empty() {
                call_sites.remove(&unit);
            }
        }
    }

    /// Number of call sites of `unit` that currently have handlers
    pub fn call_site_count(&self, unit: CodeUnitId) -> usize {
        self.call_sites.read().get(&unit).map_or(0, |s| s.len())
    }

    /// Total number of registered entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
