//! Replies sent to the client

use crate::smtp::error::{SmtpError, SmtpLimits};

/// One reply. `multiline` holds the lines after the first, as used by EHLO.
#[derive(Debug, Clone)]
pub struct SmtpResponse {
    pub code: String,
    pub message: String,
    pub multiline: Option<Vec<String>>,
}

impl SmtpResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_owned(),
            message: message.to_owned(),
            multiline: None,
        }
    }

    pub fn new_multiline(code: &str, message: &str, lines: Vec<String>) -> Self {
        Self {
            multiline: Some(lines),
            ..Self::new(code, message)
        }
    }

    pub fn ok() -> Self {
        Self::new("250", "OK")
    }

    /// `220 <hostname> <app name> ESMTP Service ready`
    pub fn greeting(hostname: &str, app_name: &str) -> Self {
        Self::new("220", &format!("{hostname} {app_name} ESMTP Service ready"))
    }

    pub fn helo(hostname: &str, client_domain: &str) -> Self {
        Self::new("250", &format!("{hostname} Hello {client_domain}"))
    }

    /// HELO reply followed by the supported extensions
    pub fn ehlo(hostname: &str, client_domain: &str) -> Self {
        let extensions = vec![
            "PIPELINING".to_owned(),
            "8BITMIME".to_owned(),
            format!("SIZE {}", SmtpLimits::MAX_DATA_SIZE),
        ];
        Self {
            multiline: Some(extensions),
            ..Self::helo(hostname, client_domain)
        }
    }

    pub fn data_start() -> Self {
        Self::new("354", "End data with <CR><LF>.<CR><LF>")
    }

    pub fn quit() -> Self {
        Self::new("221", "Bye")
    }

    /// Wire form of the reply. Every line of a multiline reply but the last
    /// carries a dash after the code.
    pub fn format(&self) -> String {
        let Some(lines) = &self.multiline else {
            return format!("{} {}\r\n", self.code, self.message);
        };

        let mut result = format!("{}-{}\r\n", self.code, self.message);
        for (i, line) in lines.iter().enumerate() {
            let separator = if i + 1 == lines.len() { ' ' } else { '-' };
            result.push_str(&format!("{}{separator}{line}\r\n", self.code));
        }
        result
    }
}

impl From<&SmtpError> for SmtpResponse {
    fn from(err: &SmtpError) -> Self {
        let message = match err {
            SmtpError::Io(_) => "Service not available".to_owned(),
            other => other.to_string(),
        };
        Self::new(err.reply_code(), &message)
    }
}
