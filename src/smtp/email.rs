//! Email data structures and functionality

use std::net::SocketAddr;
use std::time::SystemTime;

/// A message received by the SMTP server, exactly as the client sent it
#[derive(Debug, Clone)]
pub struct Email {
    /// Address of the client that delivered the message
    pub origin: SocketAddr,

    /// The envelope sender address
    pub from: String,

    /// Envelope recipient addresses, in the order they were given
    pub to: Vec<String>,

    /// Raw message bytes, headers and body, with CRLF line endings
    pub data: Vec<u8>,

    /// When the email was received by the server
    pub timestamp: SystemTime,
}

impl Email {
    /// Create a new email
    pub fn new(origin: SocketAddr, from: String, to: Vec<String>, data: Vec<u8>) -> Self {
        Self {
            origin,
            from,
            to,
            data,
            timestamp: SystemTime::now(),
        }
    }

    /// Check if this email was sent to a specific recipient
    pub fn has_recipient(&self, recipient: &str) -> bool {
        self.to.iter().any(|addr| addr == recipient)
    }

    /// Get the size of the email data in bytes
    pub fn data_size(&self) -> usize {
        self.data.len()
    }
}
