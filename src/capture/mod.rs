//! Message capture: unique file allocation and the per-message handler

pub mod allocator;
pub mod error;
pub mod handler;

pub use allocator::{Allocated, ExclusiveCreate, MAX_ATTEMPTS, OsNamespace, UniqueFileAllocator};
pub use error::CaptureError;
pub use handler::{CaptureHandler, extract_subject};
