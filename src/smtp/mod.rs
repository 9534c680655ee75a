//! SMTP server implementation

pub mod commands;
pub mod email;
pub mod error;
pub mod handler;
pub mod response;
pub mod server;
pub mod session;
pub mod wire;

pub use email::Email;
pub use error::{SmtpError, SmtpLimits};
pub use handler::MailHandler;
pub use response::SmtpResponse;
pub use server::SmtpServer;
pub use session::{SmtpSession, SmtpState};
pub use wire::{NoopWireLog, TransportLog, WireLogger};
