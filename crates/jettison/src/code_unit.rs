//! Compiled code unit identity and tiering
//!
//! A code unit is a whole compiled function body produced by one of the
//! compiler tiers. Stub routines that own an exception-handler entry keep a
//! back-reference to the unit the entry belongs to; only the optimizing tier
//! emits the unwind metadata such an entry needs.

/// Identity of a compiled code unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeUnitId(u32);

impl CodeUnitId {
    pub fn new(raw: u32) -> Self {
        CodeUnitId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Compilation tier a code unit was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileTier {
    /// Template-compiled code, no unwind metadata
    Baseline,
    /// Optimizing-compiler output with full unwind metadata
    Optimizing,
}

impl CompileTier {
    /// Whether code of this tier carries exception-unwinding metadata
    ///
    /// Handler-owning stubs may only be attached to units of a tier for
    /// which this returns true.
    #[inline]
    pub fn supports_exception_metadata(self) -> bool {
        matches!(self, CompileTier::Optimizing)
    }
}

/// Descriptor for a compiled code unit
#[derive(Debug, Clone, Copy)]
pub struct CodeUnit {
    pub id: CodeUnitId,
    pub tier: CompileTier,
}

impl CodeUnit {
    pub fn new(id: CodeUnitId, tier: CompileTier) -> Self {
        CodeUnit { id, tier }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_exception_metadata() {
        assert!(!CompileTier::Baseline.supports_exception_metadata());
        assert!(CompileTier::Optimizing.supports_exception_metadata());
    }

    #[test]
    fn test_code_unit_id_roundtrip() {
        let id = CodeUnitId::new(7);
        assert_eq!(id.raw(), 7);
        assert_eq!(id, CodeUnitId::new(7));
    }
}
