//! Errors raised while serving a client, and the limits that trigger them

use thiserror::Error;

/// A failed command or message. Apart from `Io`, the display text is the
/// human-readable part of the reply sent to the client.
#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error, command unrecognized")]
    InvalidCommand,

    #[error("Bad sequence of commands: {0}")]
    InvalidState(String),

    #[error("Syntax error: {0}")]
    InvalidSyntax(String),

    #[error("Line too long (max {max} characters)")]
    LineTooLong { max: usize },

    #[error("Path too long (max {max} characters)")]
    PathTooLong { max: usize },

    #[error("Too many recipients (max {max})")]
    TooManyRecipients { max: usize },

    #[error("Too much mail data (max {max} bytes)")]
    TooMuchData { max: usize },

    #[error("Domain name too long (max {max} characters)")]
    DomainTooLong { max: usize },

    #[error("User name too long (max {max} characters)")]
    UserTooLong { max: usize },
}

impl SmtpError {
    /// Reply code for this error
    pub fn reply_code(&self) -> &'static str {
        match self {
            SmtpError::Io(_) => "421",
            SmtpError::InvalidCommand | SmtpError::LineTooLong { .. } => "500",
            SmtpError::InvalidState(_) => "503",
            SmtpError::TooManyRecipients { .. } | SmtpError::TooMuchData { .. } => "552",
            SmtpError::InvalidSyntax(_)
            | SmtpError::PathTooLong { .. }
            | SmtpError::DomainTooLong { .. }
            | SmtpError::UserTooLong { .. } => "501",
        }
    }
}

/// Size limits from RFC 821 section 4.5.3. Lengths count the CRLF where
/// the RFC says so.
pub struct SmtpLimits;

impl SmtpLimits {
    pub const USER_MAX_LENGTH: usize = 64;
    pub const DOMAIN_MAX_LENGTH: usize = 64;
    /// Reverse-path or forward-path, brackets excluded
    pub const PATH_MAX_LENGTH: usize = 256;
    pub const COMMAND_LINE_MAX_LENGTH: usize = 512;
    pub const REPLY_LINE_MAX_LENGTH: usize = 512;
    /// A line of message data, CRLF included
    pub const TEXT_LINE_MAX_LENGTH: usize = 1000;
    pub const MAX_RECIPIENTS: usize = 100;

    /// Largest accepted message, advertised through the SIZE extension
    pub const MAX_DATA_SIZE: usize = 10 * 1024 * 1024;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_codes() {
        assert_eq!(SmtpError::TooMuchData { max: 1 }.reply_code(), "552");
        assert_eq!(SmtpError::LineTooLong { max: 1 }.reply_code(), "500");
        assert_eq!(SmtpError::UserTooLong { max: 1 }.reply_code(), "501");
        assert_eq!(
            SmtpError::InvalidState("x".to_string()).reply_code(),
            "503"
        );
    }

    #[test]
    fn test_display_is_reply_text() {
        assert_eq!(
            SmtpError::InvalidState("x".to_string()).to_string(),
            "Bad sequence of commands: x"
        );
        assert_eq!(
            SmtpError::LineTooLong { max: 512 }.to_string(),
            "Line too long (max 512 characters)"
        );
    }
}
