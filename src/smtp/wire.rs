//! Logging of the raw SMTP conversation

use log::info;
use std::net::SocketAddr;

const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Observes each line read from and written to a client.
///
/// Purely observational; implementations must return quickly since they run
/// on the session thread.
pub trait TransportLog: Send + Sync {
    fn log_read(&self, origin: &SocketAddr, session_id: u64, line: &str);
    fn log_write(&self, origin: &SocketAddr, session_id: u64, line: &str);
}

/// Discards every line
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWireLog;

impl TransportLog for NoopWireLog {
    fn log_read(&self, _: &SocketAddr, _: u64, _: &str) {}
    fn log_write(&self, _: &SocketAddr, _: u64, _: &str) {}
}

/// Writes the conversation through the `log` facade under the
/// `smtpdump::wire` target, reads in green and writes in cyan.
#[derive(Debug, Clone, Copy)]
pub struct WireLogger {
    color: bool,
}

impl WireLogger {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn render(&self, color: &str, line: &str) -> String {
        let line = indent(line);
        if self.color {
            format!("{color}  {line}{RESET}")
        } else {
            format!("  {line}")
        }
    }
}

impl TransportLog for WireLogger {
    fn log_read(&self, _origin: &SocketAddr, _session_id: u64, line: &str) {
        info!(target: "smtpdump::wire", "{}", self.render(GREEN, line));
    }

    fn log_write(&self, _origin: &SocketAddr, _session_id: u64, line: &str) {
        info!(target: "smtpdump::wire", "{}", self.render(CYAN, line));
    }
}

/// Indent continuation lines so multiline replies stay readable
fn indent(line: &str) -> String {
    line.trim_end_matches(['\r', '\n']).replace('\n', "\n  ")
}
