//! # SMTPDump
//!
//! SMTPDump is an SMTP sink for debugging mail-sending code.
//!
//! Every message a client delivers is written verbatim to its own file in an
//! output directory, so you can inspect exactly what was sent.
//!
//! ## Quick Start
//!
//! ```no_run
//! use smtpdump::{CaptureHandler, SmtpServer};
//!
//! let handler = CaptureHandler::new("/tmp/mail", "eml", true);
//! let server = SmtpServer::new("test.local");
//!
//! // Blocks, one thread per client connection
//! server.start("127.0.0.1:2525", handler).unwrap();
//! ```
//!
//! ## Captured files
//!
//! Files are named `<nanos>_<disambiguator>.<extension>`, where `<nanos>` is
//! the wall-clock time the message arrived. Each file is created exclusively,
//! so two messages never share a file even when they arrive within the same
//! clock tick.
//!
//! ## Supported SMTP commands
//!
//! `HELO`, `EHLO` (advertising `PIPELINING`, `8BITMIME` and `SIZE`),
//! `MAIL FROM`, `RCPT TO`, `DATA`, `RSET`, `NOOP` and `QUIT`. ESMTP
//! parameters such as `BODY=8BITMIME` are accepted and ignored.
//!
//! ## Notes
//!
//! Messages are never relayed or queued, and there is no SMTP authentication
//! or TLS.
//!
//! ## Limits
//!
//! Envelope limits follow RFC 821 (see [`SmtpLimits`]). A message whose
//! payload breaks the 1000 byte line limit or the 10 MiB size limit is read
//! to the end, rejected and never handed to the handler.
//!
//! ## Email Handling
//!
//! The server hands each message to a [`MailHandler`] and never waits for an
//! outcome. [`CaptureHandler`] writes it to disk; an `mpsc::Sender<Email>`
//! posts it to a channel, which is handy in tests:
//!
//! ```rust
//! use smtpdump::{Email, SmtpServer};
//! use std::sync::mpsc;
//! use std::thread;
//! use std::time::Duration;
//!
//! let (tx, rx) = mpsc::channel::<Email>();
//! let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
//! let server = SmtpServer::new("test.local");
//!
//! thread::spawn(move || {
//!     server.start_with_listener(listener, tx).unwrap();
//! });
//!
//! // Application sends email to the listener's address
//! // ...
//!
//! if let Ok(email) = rx.recv_timeout(Duration::from_millis(100)) {
//!     println!("Received email from: {}", email.from);
//! }
//! ```

pub mod capture;
pub mod config;
mod smtp;

pub use capture::{
    Allocated, CaptureError, CaptureHandler, ExclusiveCreate, OsNamespace, UniqueFileAllocator,
};
pub use config::{Config, StartupError};
pub use smtp::{
    Email, MailHandler, NoopWireLog, SmtpError, SmtpLimits, SmtpResponse, SmtpServer,
    SmtpSession, SmtpState, TransportLog, WireLogger,
};
