//! SMTP session state management

use crate::smtp::email::Email;
use crate::smtp::error::{SmtpError, SmtpLimits};

use std::net::SocketAddr;

/// Represents the current state of an SMTP session
#[derive(Debug, Clone, PartialEq)]
pub enum SmtpState {
    /// Initial state - waiting for HELO
    Initial,
    /// HELO received - ready for MAIL command
    GreetingReceived,
    /// MAIL FROM received - ready for RCPT commands
    MailReceived,
    /// At least one RCPT TO received - ready for DATA or more RCPT commands
    RecipientsReceived,
    /// DATA command received - collecting email data
    DataMode,
}

/// Manages the state and data for a single SMTP session
#[derive(Debug)]
pub struct SmtpSession {
    /// Current state of the session
    pub state: SmtpState,
    /// Sender address from MAIL FROM command
    pub from: Option<String>,
    /// List of recipients from RCPT TO commands
    pub to: Vec<String>,
    /// Raw message bytes collected during DATA mode
    pub data: Vec<u8>,
    /// Whether we're currently in data collection mode
    pub in_data_mode: bool,
    /// First limit violated while collecting data, reported at the terminator
    pub data_error: Option<SmtpError>,
    /// Client domain from HELO command
    pub client_domain: Option<String>,
}

impl SmtpSession {
    /// Create a new SMTP session
    pub fn new() -> Self {
        Self {
            state: SmtpState::Initial,
            from: None,
            to: Vec::new(),
            data: Vec::new(),
            in_data_mode: false,
            data_error: None,
            client_domain: None,
        }
    }

    /// Reset the session to post-HELO state (clears transaction data)
    pub fn reset(&mut self) {
        self.state = if self.client_domain.is_some() {
            SmtpState::GreetingReceived
        } else {
            SmtpState::Initial
        };
        self.from = None;
        self.to.clear();
        self.data.clear();
        self.in_data_mode = false;
        self.data_error = None;
    }

    /// Set the sender address
    pub fn set_sender(&mut self, sender: String) -> Result<(), SmtpError> {
        if sender.len() > SmtpLimits::PATH_MAX_LENGTH {
            return Err(SmtpError::PathTooLong {
                max: SmtpLimits::PATH_MAX_LENGTH,
            });
        }

        self.from = Some(sender);
        self.to.clear();
        self.data.clear();
        self.state = SmtpState::MailReceived;
        Ok(())
    }

    /// Add a recipient address
    pub fn add_recipient(&mut self, recipient: String) -> Result<(), SmtpError> {
        if recipient.len() > SmtpLimits::PATH_MAX_LENGTH {
            return Err(SmtpError::PathTooLong {
                max: SmtpLimits::PATH_MAX_LENGTH,
            });
        }

        if self.to.len() >= SmtpLimits::MAX_RECIPIENTS {
            return Err(SmtpError::TooManyRecipients {
                max: SmtpLimits::MAX_RECIPIENTS,
            });
        }

        self.to.push(recipient);
        self.state = SmtpState::RecipientsReceived;
        Ok(())
    }

    /// Start data collection mode
    pub fn start_data_mode(&mut self) -> Result<(), SmtpError> {
        if self.state != SmtpState::RecipientsReceived {
            return Err(SmtpError::InvalidState(
                "DATA command requires RCPT first".to_string(),
            ));
        }

        self.in_data_mode = true;
        self.data.clear();
        self.data_error = None;
        self.state = SmtpState::DataMode;
        Ok(())
    }

    /// Add one line of data, without its line terminator.
    ///
    /// A single leading dot is removed (RFC 5321 section 4.5.2) and the line
    /// is stored with a CRLF terminator. Once a limit has been exceeded the
    /// rest of the message is discarded and the error is kept for the reply
    /// to the terminating dot.
    pub fn add_data_line(&mut self, line: &[u8]) {
        if self.data_error.is_some() {
            return;
        }

        let line = line.strip_prefix(b".").unwrap_or(line);
        let line_size = line.len() + 2; // +2 for CRLF

        if line_size > SmtpLimits::TEXT_LINE_MAX_LENGTH {
            self.data_error = Some(SmtpError::LineTooLong {
                max: SmtpLimits::TEXT_LINE_MAX_LENGTH,
            });
            return;
        }

        if self.data.len() + line_size > SmtpLimits::MAX_DATA_SIZE {
            self.data_error = Some(SmtpError::TooMuchData {
                max: SmtpLimits::MAX_DATA_SIZE,
            });
            return;
        }

        self.data.extend_from_slice(line);
        self.data.extend_from_slice(b"\r\n");
    }

    /// Fail the message being collected. Only the first error is kept.
    pub fn reject_data(&mut self, err: SmtpError) {
        self.data.clear();
        if self.data_error.is_none() {
            self.data_error = Some(err);
        }
    }

    /// Finish data collection and create an email
    pub fn finish_data_collection(&mut self, origin: SocketAddr) -> Result<Email, SmtpError> {
        if !self.in_data_mode {
            return Err(SmtpError::InvalidState(
                "Not in data collection mode".to_string(),
            ));
        }

        if let Some(err) = self.data_error.take() {
            return Err(err);
        }

        let from = self
            .from
            .take()
            .ok_or_else(|| SmtpError::InvalidState("No sender specified".to_string()))?;

        if self.to.is_empty() {
            return Err(SmtpError::InvalidState(
                "No recipients specified".to_string(),
            ));
        }

        let to = std::mem::take(&mut self.to);
        let data = std::mem::take(&mut self.data);

        self.in_data_mode = false;
        self.state = SmtpState::GreetingReceived;
        Ok(Email::new(origin, from, to, data))
    }

    /// Set the client domain from HELO command
    pub fn set_client_domain(&mut self, domain: String) -> Result<(), SmtpError> {
        if domain.len() > SmtpLimits::DOMAIN_MAX_LENGTH {
            return Err(SmtpError::DomainTooLong {
                max: SmtpLimits::DOMAIN_MAX_LENGTH,
            });
        }

        self.client_domain = Some(domain);
        self.reset(); // Clear any existing transaction
        Ok(())
    }

    /// Check if the session is ready for a specific command
    pub fn can_execute_command(&self, command: &str) -> bool {
        match command.to_uppercase().as_str() {
            "EHLO" | "HELO" => true, // can be sent at any time
            "MAIL" => self.state == SmtpState::GreetingReceived,
            "RCPT" => {
                self.state == SmtpState::MailReceived || self.state == SmtpState::RecipientsReceived
            }
            "DATA" => self.state == SmtpState::RecipientsReceived,
            "RSET" => self.state != SmtpState::Initial,
            "NOOP" => true, // NOOP can be sent at any time
            "QUIT" => true, // QUIT can be sent at any time
            _ => false,
        }
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new()
    }
}
