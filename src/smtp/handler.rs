//! Delivery of received messages

use crate::smtp::email::Email;

use std::sync::{Arc, mpsc};

/// Receives every message the server accepts.
///
/// Delivery is one-way: the server posts the message and moves on, so an
/// implementation reports failures through logging rather than a return
/// value. Sessions run on their own threads, so `handle` may be called
/// concurrently.
pub trait MailHandler: Send + Sync {
    fn handle(&self, email: Email);
}

impl MailHandler for mpsc::Sender<Email> {
    fn handle(&self, email: Email) {
        // A closed channel means nobody is listening any more
        let _ = self.send(email);
    }
}

impl<H: MailHandler + ?Sized> MailHandler for Arc<H> {
    fn handle(&self, email: Email) {
        (**self).handle(email)
    }
}
