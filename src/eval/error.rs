//! Execution errors
use std::io;
use thiserror::Error;

use super::memory::{
    heap::HeapError,
    object::{ObjRef, ObjType},
};

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Heap(#[from] HeapError),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ObjType, found: ObjType },
    #[error("type mismatch: expected {0}, found {1}")]
    NotAnObject(ObjType, &'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ExecutionError {
    /// Whether this error is the heap running out of space
    pub fn is_allocation_error(&self) -> bool {
        matches!(
            self,
            ExecutionError::Heap(HeapError::OutOfMemory { .. })
                | ExecutionError::Heap(HeapError::LimitExceeded { .. })
        )
    }

    /// The freed object this error refers to, if any
    pub fn dangling_reference(&self) -> Option<ObjRef> {
        if let ExecutionError::Heap(HeapError::DanglingReference(obj)) = self {
            Some(*obj)
        } else {
            None
        }
    }
}
