//! SMTP server implementation

use crate::smtp::commands::SmtpCommandHandler;
use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::handler::MailHandler;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;
use crate::smtp::wire::{NoopWireLog, TransportLog};

use log::{debug, error, info, warn};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

const DEFAULT_APP_NAME: &str = "SMTPDump";

/// Longest line read in one piece: a full text line plus one byte, so that
/// anything longer is detected without buffering it
const READ_LIMIT: u64 = SmtpLimits::TEXT_LINE_MAX_LENGTH as u64 + 1;

/// Outcome of reading one line from the client
enum LineRead {
    Closed,
    Complete,
    /// The line exceeded [`READ_LIMIT`]; its rest is still unread
    TooLong,
}

/// SMTP server that hands every accepted message to a [`MailHandler`]
#[derive(Clone)]
pub struct SmtpServer {
    /// Server hostname
    hostname: String,
    /// Name announced in the greeting
    app_name: String,
    transport_log: Arc<dyn TransportLog>,
    next_session_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for SmtpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpServer")
            .field("hostname", &self.hostname)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Write side of one client connection
struct Connection<'a> {
    stream: TcpStream,
    origin: SocketAddr,
    session_id: u64,
    transport_log: &'a dyn TransportLog,
}

impl SmtpServer {
    /// Create a new SMTP server
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_owned(),
            app_name: DEFAULT_APP_NAME.to_owned(),
            transport_log: Arc::new(NoopWireLog),
            next_session_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Set the application name announced in the greeting
    pub fn with_app_name(mut self, app_name: &str) -> Self {
        self.app_name = app_name.to_owned();
        self
    }

    /// Observe every line read from and written to clients
    pub fn with_transport_log(mut self, transport_log: impl TransportLog + 'static) -> Self {
        self.transport_log = Arc::new(transport_log);
        self
    }

    /// Start the server on the specified address (blocking)
    pub fn start<A, H>(&self, addr: A, handler: H) -> Result<(), SmtpError>
    where
        A: ToSocketAddrs,
        H: MailHandler + 'static,
    {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener, handler)
    }

    /// Start the server with an existing listener (blocking).
    ///
    /// Each client runs on its own thread, so `handler` may be invoked
    /// concurrently.
    pub fn start_with_listener<H>(&self, listener: TcpListener, handler: H) -> Result<(), SmtpError>
    where
        H: MailHandler + 'static,
    {
        info!(
            "SMTP server listening on {}",
            listener.local_addr().map_err(SmtpError::Io)?
        );

        let handler: Arc<dyn MailHandler> = Arc::new(handler);

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => self.spawn_client(stream, Arc::clone(&handler)),
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }

    fn spawn_client(&self, stream: TcpStream, handler: Arc<dyn MailHandler>) {
        let server = self.clone();
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        let spawned = thread::Builder::new()
            .name(format!("smtp-session-{session_id}"))
            .spawn(move || {
                if let Err(e) = server.handle_client(stream, session_id, handler.as_ref()) {
                    warn!("Error handling client: {e}");
                }
            });

        if let Err(e) = spawned {
            error!("Unable to spawn session thread: {e}");
        }
    }

    /// Handle a client connection
    fn handle_client(
        &self,
        stream: TcpStream,
        session_id: u64,
        handler: &dyn MailHandler,
    ) -> Result<(), SmtpError> {
        let origin = stream.peer_addr()?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut conn = Connection {
            stream,
            origin,
            session_id,
            transport_log: self.transport_log.as_ref(),
        };

        debug!("Session {session_id} opened from {origin}");

        let command_handler = SmtpCommandHandler::new(&self.hostname);
        let mut session = SmtpSession::new();

        conn.send_response(&SmtpResponse::greeting(&self.hostname, &self.app_name))?;

        let mut line_buffer = Vec::new();
        loop {
            let line = match read_line(&mut reader, &mut line_buffer)? {
                LineRead::Closed => break,
                LineRead::Complete => strip_line_ending(&line_buffer),
                LineRead::TooLong if session.in_data_mode => {
                    session.reject_data(SmtpError::LineTooLong {
                        max: SmtpLimits::TEXT_LINE_MAX_LENGTH,
                    });
                    discard_rest_of_line(&mut reader)?;
                    continue;
                }
                LineRead::TooLong => {
                    conn.send_error(&SmtpError::LineTooLong {
                        max: SmtpLimits::COMMAND_LINE_MAX_LENGTH,
                    })?;
                    discard_rest_of_line(&mut reader)?;
                    continue;
                }
            };

            // Handle data mode specially
            if session.in_data_mode {
                if line != b"." {
                    session.add_data_line(line);
                    continue;
                }

                match session.finish_data_collection(origin) {
                    Ok(email) => {
                        debug!(
                            "Session {session_id} received {} bytes from {}",
                            email.data_size(),
                            email.from
                        );
                        conn.send_response(&SmtpResponse::ok())?;
                        handler.handle(email);
                    }
                    Err(e) => {
                        conn.send_error(&e)?;
                    }
                }
                session.reset();
                continue;
            }

            // Handle potential UTF-8 issues gracefully
            let line = String::from_utf8_lossy(line);
            conn.transport_log.log_read(&origin, session_id, &line);

            let command = line.trim();
            if command.is_empty() {
                continue;
            }

            // Normal command processing
            match command_handler.process_command(command, &mut session) {
                Ok(response) => {
                    conn.send_response(&response)?;
                    if response.code == "221" {
                        break; // QUIT command
                    }
                }
                Err(e) => {
                    // Don't automatically reset on all 5xx errors
                    // Let the command handler manage session state
                    conn.send_error(&e)?;
                }
            }
        }

        debug!("Session {session_id} closed");
        Ok(())
    }
}

impl Connection<'_> {
    fn send_error(&mut self, err: &SmtpError) -> Result<(), SmtpError> {
        self.send_response(&SmtpResponse::from(err))
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &SmtpResponse) -> Result<(), SmtpError> {
        // Ensure response doesn't exceed maximum line length
        let mut formatted = response.format();
        if formatted.len() > SmtpLimits::REPLY_LINE_MAX_LENGTH {
            formatted = SmtpResponse::new(&response.code, "Response too long (truncated)").format();
        }

        self.transport_log
            .log_write(&self.origin, self.session_id, &formatted);
        self.stream.write_all(formatted.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }
}

/// Read one line of at most [`READ_LIMIT`] bytes into `buf`
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<LineRead> {
    buf.clear();
    let read = reader.by_ref().take(READ_LIMIT).read_until(b'\n', buf)?;
    if read == 0 {
        Ok(LineRead::Closed)
    } else if buf.ends_with(b"\n") || (read as u64) < READ_LIMIT {
        // A short read without LF means the client closed mid-line
        Ok(LineRead::Complete)
    } else {
        Ok(LineRead::TooLong)
    }
}

/// Skip input up to and including the next LF, without buffering it
fn discard_rest_of_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// Drop a trailing LF or CRLF
fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
