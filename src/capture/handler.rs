//! Persisting received messages

use crate::capture::allocator::{
    Allocated, ExclusiveCreate, OsNamespace, UniqueFileAllocator, unix_nanos,
};
use crate::capture::error::CaptureError;
use crate::smtp::{Email, MailHandler};

use log::{error, info, warn};
use mailparse::{MailHeaderMap, MailParseError};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Writes every received message, byte for byte, to its own file.
///
/// The handler keeps no state between messages and may be shared by any
/// number of sessions.
#[derive(Debug, Clone)]
pub struct CaptureHandler<F = OsNamespace> {
    output: PathBuf,
    extension: String,
    verbose: bool,
    allocator: UniqueFileAllocator<F>,
}

impl CaptureHandler {
    pub fn new(output: impl Into<PathBuf>, extension: impl Into<String>, verbose: bool) -> Self {
        Self::with_allocator(output, extension, verbose, UniqueFileAllocator::new())
    }
}

impl<F> CaptureHandler<F>
where
    F: ExclusiveCreate,
    F::Handle: Write,
{
    pub fn with_allocator(
        output: impl Into<PathBuf>,
        extension: impl Into<String>,
        verbose: bool,
        allocator: UniqueFileAllocator<F>,
    ) -> Self {
        Self {
            output: output.into(),
            extension: extension.into(),
            verbose,
            allocator,
        }
    }

    /// Write `email` to a new file and return its path.
    ///
    /// Reading the subject for the log is best effort; unparsable headers
    /// never stop the message from being written. If the copy fails the
    /// partial file is removed.
    pub fn capture(&self, email: &Email) -> Result<PathBuf, CaptureError> {
        if self.verbose {
            match extract_subject(&email.data) {
                Ok(subject) => info!(
                    "Received mail from {:?} with subject {:?}",
                    email.from,
                    subject.unwrap_or_default()
                ),
                Err(e) => warn!("Unable to read headers of mail from {:?}: {e}", email.from),
            }
        }

        let prefix = unix_nanos().to_string();
        let Allocated { path, mut file } =
            self.allocator
                .allocate(&self.output, &prefix, &self.extension)?;

        if let Err(source) = file.write_all(&email.data).and_then(|()| file.flush()) {
            drop(file);
            if let Err(e) = fs::remove_file(&path) {
                warn!("Unable to remove partial capture {}: {e}", path.display());
            }
            return Err(CaptureError::Copy {
                path: path.display().to_string(),
                source,
            });
        }

        if self.verbose {
            info!("Wrote {:?}", path.display().to_string());
        }
        Ok(path)
    }
}

impl<F> MailHandler for CaptureHandler<F>
where
    F: ExclusiveCreate,
    F::Handle: Write,
{
    fn handle(&self, email: Email) {
        if let Err(e) = self.capture(&email) {
            error!("Dropped mail from {:?} ({}): {e}", email.from, email.origin);
        }
    }
}

/// The `Subject` header of a raw message, if it has one.
///
/// Fails when the header block holds a line that is neither a `name: value`
/// field nor a continuation of one, which `mailparse` alone would tolerate.
pub fn extract_subject(data: &[u8]) -> Result<Option<String>, MailParseError> {
    check_header_lines(data)?;
    let (headers, _body_offset) = mailparse::parse_headers(data)?;
    Ok(headers.get_first_value("Subject"))
}

fn check_header_lines(data: &[u8]) -> Result<(), MailParseError> {
    for (i, line) in data.split(|&b| b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let Some(&first) = line.first() else {
            break; // end of headers
        };

        if first == b' ' || first == b'\t' {
            if i == 0 {
                return Err(MailParseError::Generic("header block starts with a continuation"));
            }
            continue;
        }

        let name = line
            .iter()
            .position(|&b| b == b':')
            .map(|colon| &line[..colon])
            .ok_or(MailParseError::Generic("header line without a colon"))?;
        if name.is_empty() || !name.iter().all(u8::is_ascii_graphic) {
            return Err(MailParseError::Generic("malformed header field name"));
        }
    }
    Ok(())
}
