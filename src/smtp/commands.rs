//! Implementation of SMTP commands

use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;

/// Handles SMTP commands and returns appropriate responses
#[derive(Debug)]
pub struct SmtpCommandHandler<'a> {
    hostname: &'a str,
}

impl<'a> SmtpCommandHandler<'a> {
    /// Create a new command handler
    pub fn new(hostname: &'a str) -> Self {
        Self { hostname }
    }

    /// Process a command line and return a response
    pub fn process_command(
        &self,
        command_line: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        // Check command line length
        if command_line.len() > SmtpLimits::COMMAND_LINE_MAX_LENGTH {
            return Err(SmtpError::LineTooLong {
                max: SmtpLimits::COMMAND_LINE_MAX_LENGTH,
            });
        }

        let parts: Vec<&str> = command_line.split_whitespace().collect();
        if parts.is_empty() {
            return Err(SmtpError::InvalidCommand);
        }

        let cmd = parts[0].to_uppercase();

        match cmd.as_str() {
            "HELO" | "EHLO" => self.handle_greeting(parts, session),
            "MAIL" => self.handle_mail(command_line, session),
            "RCPT" => self.handle_rcpt(command_line, session),
            "DATA" => self.handle_data(parts, session),
            "RSET" => self.handle_rset(session),
            "NOOP" => self.handle_noop(),
            "QUIT" => self.handle_quit(),
            _ => Err(SmtpError::InvalidCommand),
        }
    }

    /// Handle HELO and EHLO. Both restart the session; only EHLO lists
    /// extensions in its reply.
    fn handle_greeting(
        &self,
        parts: Vec<&str>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        let verb = parts[0].to_uppercase();
        let Some(&client_domain) = parts.get(1) else {
            return Err(SmtpError::InvalidSyntax(format!(
                "{verb} requires domain argument"
            )));
        };

        session.set_client_domain(client_domain.to_string())?;

        if verb == "EHLO" {
            Ok(SmtpResponse::ehlo(self.hostname, client_domain))
        } else {
            Ok(SmtpResponse::helo(self.hostname, client_domain))
        }
    }

    /// Handle MAIL command
    fn handle_mail(
        &self,
        command_line: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("MAIL") {
            return Err(SmtpError::InvalidState(
                "MAIL command requires HELO first".to_string(),
            ));
        }

        // An empty reverse path is how bounces and DSNs are sent
        let addr = self.parse_path(command_line, "FROM:", "MAIL")?;
        if !addr.is_empty() {
            self.validate_email_address(addr)?;
        }
        session.set_sender(addr.to_string())?;

        Ok(SmtpResponse::ok())
    }

    /// Handle RCPT command
    fn handle_rcpt(
        &self,
        command_line: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("RCPT") {
            return Err(SmtpError::InvalidState(
                "RCPT command requires MAIL first".to_string(),
            ));
        }

        let addr = self.parse_path(command_line, "TO:", "RCPT")?;
        if addr.is_empty() {
            return Err(SmtpError::InvalidSyntax(
                "recipient address cannot be empty".to_string(),
            ));
        }
        self.validate_email_address(addr)?;
        session.add_recipient(addr.to_string())?;

        Ok(SmtpResponse::ok())
    }

    /// Extract the address from `VERB KEYWORD<address> [params]`, which may
    /// be empty. ESMTP parameters after the closing bracket are ignored.
    fn parse_path<'l>(
        &self,
        command_line: &'l str,
        keyword: &str,
        verb: &str,
    ) -> Result<&'l str, SmtpError> {
        let argument = command_line.trim_start()[verb.len()..].trim_start();
        if argument.is_empty() {
            return Err(SmtpError::InvalidSyntax(format!(
                "{verb} requires {} argument",
                &keyword[..keyword.len() - 1]
            )));
        }

        let prefix = argument.get(..keyword.len()).unwrap_or_default();
        if !prefix.eq_ignore_ascii_case(keyword) {
            return Err(SmtpError::InvalidSyntax(format!(
                "{verb} command must be '{verb} {keyword}<address>'"
            )));
        }

        argument[keyword.len()..]
            .trim_start()
            .strip_prefix('<')
            .and_then(|rest| rest.split_once('>'))
            .map(|(addr, _params)| addr)
            .ok_or_else(|| {
                SmtpError::InvalidSyntax("address must be enclosed in angle brackets".to_string())
            })
    }

    /// Handle DATA command
    fn handle_data(
        &self,
        parts: Vec<&str>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("DATA") {
            return Err(SmtpError::InvalidState(
                "DATA command requires RCPT first".to_string(),
            ));
        }

        if parts.len() > 1 {
            return Err(SmtpError::InvalidSyntax(
                "DATA command takes no arguments".to_string(),
            ));
        }

        session.start_data_mode()?;

        Ok(SmtpResponse::data_start())
    }

    /// Handle RSET command
    fn handle_rset(&self, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("RSET") {
            return Err(SmtpError::InvalidState(
                "RSET command requires HELO first".to_string(),
            ));
        }

        session.reset();
        Ok(SmtpResponse::ok())
    }

    /// Handle NOOP command
    fn handle_noop(&self) -> Result<SmtpResponse, SmtpError> {
        Ok(SmtpResponse::ok())
    }

    /// Handle QUIT command
    fn handle_quit(&self) -> Result<SmtpResponse, SmtpError> {
        Ok(SmtpResponse::quit())
    }

    /// Check the address has both parts and that each fits its limit
    fn validate_email_address(&self, addr: &str) -> Result<(), SmtpError> {
        let (user, domain) = addr.split_once('@').ok_or_else(|| {
            SmtpError::InvalidSyntax("Email address must contain @ symbol".to_string())
        })?;

        if user.len() > SmtpLimits::USER_MAX_LENGTH {
            return Err(SmtpError::UserTooLong {
                max: SmtpLimits::USER_MAX_LENGTH,
            });
        }

        if domain.len() > SmtpLimits::DOMAIN_MAX_LENGTH {
            return Err(SmtpError::DomainTooLong {
                max: SmtpLimits::DOMAIN_MAX_LENGTH,
            });
        }

        if user.is_empty() || domain.is_empty() {
            return Err(SmtpError::InvalidSyntax(
                "Invalid email address format".to_string(),
            ));
        }

        Ok(())
    }
}
