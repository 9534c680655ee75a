//! Collision-free file creation.
//!
//! Candidate names come from a cheap clock-and-pid generator; correctness
//! comes from creating each candidate exclusively. A name that already exists
//! is never opened, so a collision costs one retry and never an overwrite.

use crate::capture::error::CaptureError;

use log::trace;
use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

/// Candidate names tried before giving up
pub const MAX_ATTEMPTS: usize = 10_000;

/// Multiplier and increment of the Numerical Recipes LCG
const LCG_MULTIPLIER: isize = 1_664_525;
const LCG_INCREMENT: isize = 1_013_904_223;

/// The filesystem operation the allocator depends on
pub trait ExclusiveCreate: Send + Sync {
    type Handle;

    /// Create `path`, failing with [`io::ErrorKind::AlreadyExists`] if it
    /// is already present.
    fn create_new(&self, path: &Path) -> io::Result<Self::Handle>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNamespace;

impl ExclusiveCreate for OsNamespace {
    type Handle = File;

    fn create_new(&self, path: &Path) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        options.open(path)
    }
}

/// A freshly created, empty file and where it lives
#[derive(Debug)]
pub struct Allocated<H> {
    pub path: PathBuf,
    pub file: H,
}

/// Creates files named `<prefix>_<disambiguator>.<suffix>` that did not exist
/// before the call.
#[derive(Debug, Clone)]
pub struct UniqueFileAllocator<F = OsNamespace> {
    namespace: F,
    max_attempts: usize,
}

impl UniqueFileAllocator {
    pub fn new() -> Self {
        Self::with_namespace(OsNamespace)
    }
}

impl Default for UniqueFileAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ExclusiveCreate> UniqueFileAllocator<F> {
    pub fn with_namespace(namespace: F) -> Self {
        Self {
            namespace,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Create a new file in `dir`, or in the system temporary directory when
    /// `dir` is empty.
    ///
    /// Each attempt samples the clock again, so concurrent callers racing for
    /// one name simply move on to the next. Any error other than "already
    /// exists" ends the search immediately.
    pub fn allocate(
        &self,
        dir: &Path,
        prefix: &str,
        suffix: &str,
    ) -> Result<Allocated<F::Handle>, CaptureError> {
        let dir = if dir.as_os_str().is_empty() {
            env::temp_dir()
        } else {
            dir.to_path_buf()
        };

        let mut last_collision = None;
        for attempt in 0..self.max_attempts {
            let value = disambiguator(unix_nanos(), process::id());
            let path = dir.join(format!("{prefix}_{value}.{suffix}"));

            match self.namespace.create_new(&path) {
                Ok(file) => return Ok(Allocated { path, file }),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    trace!("{} taken (attempt {attempt})", path.display());
                    last_collision = Some(e);
                }
                Err(source) => {
                    return Err(CaptureError::Create {
                        path: path.display().to_string(),
                        source,
                    });
                }
            }
        }

        Err(CaptureError::AllocationExhausted {
            dir: dir.display().to_string(),
            attempts: self.max_attempts,
            source: last_collision.unwrap_or_else(|| io::Error::other("no attempts allowed")),
        })
    }
}

/// `(nanos + pid) * 1664525 + 1013904223`, wrapping at the native signed
/// integer width.
pub fn disambiguator(nanos: i64, pid: u32) -> isize {
    (nanos.wrapping_add(i64::from(pid)) as isize)
        .wrapping_mul(LCG_MULTIPLIER)
        .wrapping_add(LCG_INCREMENT)
}

/// Wall-clock time in nanoseconds since the Unix epoch
pub(crate) fn unix_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as i64)
        .unwrap_or_default()
}
