//! Handle to a region of generated executable memory
//!
//! A `CodeBlob` is the immutable (address, length) pair identifying one
//! stub's machine code. It is owned by exactly one stub routine; the
//! collector uses `contains` to decide whether a scanned return address
//! lands inside this blob.

use thiserror::Error;

/// Errors constructing a [`CodeBlob`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeBlobError {
    /// The base address was zero
    #[error("code blob base address must be non-null")]
    NullBase,

    /// The region was zero-length
    #[error("code blob must cover at least one byte")]
    EmptyRegion,
}

/// Immutable handle to a region of generated executable memory
///
/// The address is opaque to this crate: nothing here reads or executes the
/// code, it only reasons about the region's extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlob {
    base: usize,
    len: usize,
}

impl CodeBlob {
    /// Create a handle over `len` bytes of generated code at `base`
    pub fn new(base: usize, len: usize) -> Result<Self, CodeBlobError> {
        if base == 0 {
            return Err(CodeBlobError::NullBase);
        }
        if len == 0 {
            return Err(CodeBlobError::EmptyRegion);
        }
        Ok(CodeBlob { base, len })
    }

    /// First address of the region
    #[inline]
    pub fn start_address(&self) -> usize {
        self.base
    }

    /// One past the last address of the region
    #[inline]
    pub fn end_address(&self) -> usize {
        self.base + self.len
    }

    /// Size of the region in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a blob covers at least one byte
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `addr` points into this region
    ///
    /// Used by the collector when scanning return addresses on native call
    /// stacks.
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.base + self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_creation() {
        let blob = CodeBlob::new(0x1000, 64).unwrap();
        assert_eq!(blob.start_address(), 0x1000);
        assert_eq!(blob.end_address(), 0x1040);
        assert_eq!(blob.len(), 64);
        assert!(!blob.is_empty());
    }

    #[test]
    fn test_blob_rejects_null_base() {
        assert_eq!(CodeBlob::new(0, 64), Err(CodeBlobError::NullBase));
    }

    #[test]
    fn test_blob_rejects_empty_region() {
        assert_eq!(CodeBlob::new(0x1000, 0), Err(CodeBlobError::EmptyRegion));
    }

    #[test]
    fn test_blob_contains() {
        let blob = CodeBlob::new(0x1000, 64).unwrap();
        assert!(blob.contains(0x1000));
        assert!(blob.contains(0x103f));
        assert!(!blob.contains(0x0fff));
        assert!(!blob.contains(0x1040));
    }
}
