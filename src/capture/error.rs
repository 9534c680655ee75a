//! Error types for message capture

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no unique file name in {dir} after {attempts} attempts: {source}")]
    AllocationExhausted {
        dir: String,
        attempts: usize,
        source: io::Error,
    },

    #[error("unable to create {path}: {source}")]
    Create { path: String, source: io::Error },

    #[error("unable to write {path}: {source}")]
    Copy { path: String, source: io::Error },
}

impl CaptureError {
    /// The underlying filesystem error
    pub fn io_error(&self) -> &io::Error {
        match self {
            CaptureError::AllocationExhausted { source, .. }
            | CaptureError::Create { source, .. }
            | CaptureError::Copy { source, .. } => source,
        }
    }
}
