//! Overall high-level error type for loxheap
use crate::eval::error::ExecutionError;
use crate::eval::memory::heap::HeapError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoxHeapError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("path {0} could not be read")]
    FileCouldNotBeRead(String),
    #[error("failed to write JSON report: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<HeapError> for LoxHeapError {
    fn from(e: HeapError) -> Self {
        LoxHeapError::Execution(e.into())
    }
}
