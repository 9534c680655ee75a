//! Integration tests for size limits, raw payload handling, and multi-session SMTP scenarios

use smtpdump::{Email, SmtpLimits, SmtpServer};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn start_test_server() -> (String, mpsc::Receiver<Email>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = SmtpServer::new("test.local");
    let (tx, rx) = mpsc::channel::<Email>();

    // Start server in background thread
    thread::spawn(move || {
        if let Err(e) = server.start_with_listener(listener, tx) {
            eprintln!("Error starting server: {e}");
        }
    });

    (addr, rx)
}

/// A line-oriented SMTP client
struct Client {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        let mut client = Self { stream, reader };

        let greeting = client.read_reply();
        assert!(greeting.starts_with("220"), "unexpected greeting {greeting}");
        client
    }

    fn read_reply(&mut self) -> String {
        let mut reply = String::new();
        self.reader.read_line(&mut reply).unwrap();
        reply.trim().to_string()
    }

    fn command(&mut self, command: &str) -> String {
        write!(self.stream, "{command}\r\n").unwrap();
        self.stream.flush().unwrap();
        self.read_reply()
    }

    fn envelope(&mut self, from: &str, to: &[&str]) {
        assert!(self.command(&format!("MAIL FROM:<{from}>")).starts_with("250"));
        for rcpt in to {
            assert!(self.command(&format!("RCPT TO:<{rcpt}>")).starts_with("250"));
        }
    }

    /// Send DATA, the raw (already dot-stuffed) payload and the terminator
    fn data(&mut self, payload: &[u8]) -> String {
        assert!(self.command("DATA").starts_with("354"));
        self.stream.write_all(payload).unwrap();
        self.stream.write_all(b".\r\n").unwrap();
        self.stream.flush().unwrap();
        self.read_reply()
    }
}

#[test]
fn test_command_line_length_limit() {
    let (addr, _rx) = start_test_server();
    let mut client = Client::connect(&addr);

    let long_command = "HELO ".to_string() + &"a".repeat(SmtpLimits::COMMAND_LINE_MAX_LENGTH);
    assert!(client.command(&long_command).starts_with("500")); // Line too long

    assert!(client.command("QUIT").starts_with("221"));
}

#[test]
fn test_address_component_limits() {
    let (addr, _rx) = start_test_server();
    let mut client = Client::connect(&addr);
    client.command("HELO client.local");

    let long_user = "a".repeat(SmtpLimits::USER_MAX_LENGTH + 1);
    let reply = client.command(&format!("MAIL FROM:<{long_user}@example.com>"));
    assert!(reply.starts_with("501")); // User too long

    let long_domain = "a".repeat(SmtpLimits::DOMAIN_MAX_LENGTH + 1);
    let reply = client.command(&format!("MAIL FROM:<user@{long_domain}>"));
    assert!(reply.starts_with("501")); // Domain too long

    let reply = client.command(&format!("HELO {long_domain}"));
    assert!(reply.starts_with("501"));
}

#[test]
fn test_recipient_limit() {
    let (addr, _rx) = start_test_server();
    let mut client = Client::connect(&addr);
    client.command("HELO client.local");
    client.command("MAIL FROM:<sender@example.com>");

    for i in 0..SmtpLimits::MAX_RECIPIENTS {
        let reply = client.command(&format!("RCPT TO:<user{i}@example.com>"));
        assert!(reply.starts_with("250"));
    }

    let reply = client.command("RCPT TO:<extra@example.com>");
    assert!(reply.starts_with("552")); // Too many recipients
}

#[test]
fn test_payload_is_delivered_verbatim() {
    let (addr, rx) = start_test_server();
    let mut client = Client::connect(&addr);
    client.command("EHLO client.local");
    // EHLO replies span several lines
    while !client.read_reply().starts_with("250 ") {}

    client.envelope("a@example.com", &["b@example.com"]);
    let payload = b"Subject: Hi\r\nX-Bytes: \xC3\xA9\xFF\r\n\r\nBody\r\n\r\n..stuffed\r\n";
    assert!(client.data(payload).starts_with("250"));

    let email = rx.recv_timeout(Duration::from_millis(500)).unwrap();
    assert_eq!(email.from, "a@example.com");
    assert_eq!(email.to, vec!["b@example.com"]);
    assert_eq!(
        email.data,
        b"Subject: Hi\r\nX-Bytes: \xC3\xA9\xFF\r\n\r\nBody\r\n\r\n.stuffed\r\n"
    );
}

#[test]
fn test_empty_payload() {
    let (addr, rx) = start_test_server();
    let mut client = Client::connect(&addr);
    client.command("HELO client.local");
    client.envelope("a@example.com", &["b@example.com"]);

    assert!(client.data(b"").starts_with("250"));

    let email = rx.recv_timeout(Duration::from_millis(500)).unwrap();
    assert!(email.data.is_empty());
}

#[test]
fn test_data_size_limit() {
    let (addr, rx) = start_test_server();
    let mut client = Client::connect(&addr);
    client.command("HELO client.local");
    client.envelope("sender@example.com", &["recipient@example.com"]);

    let line = format!("{}\r\n", "a".repeat(998));
    let lines = SmtpLimits::MAX_DATA_SIZE / line.len() + 1;
    let payload = line.repeat(lines);

    let reply = client.data(payload.as_bytes());
    assert!(reply.starts_with("552"));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    // The session survives the rejected message
    client.envelope("sender@example.com", &["recipient@example.com"]);
    assert!(client.data(b"small\r\n").starts_with("250"));
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(500)).unwrap().data,
        b"small\r\n"
    );
}

#[test]
fn test_non_utf8_input_handling() {
    let (addr, _rx) = start_test_server();
    let mut client = Client::connect(&addr);

    client.stream.write_all(&[0xFF, 0xFE, 0xFD]).unwrap();
    let reply = client.command(" HELO client.local");
    assert!(reply.starts_with("500"));

    // Server should still be responsive to valid commands
    assert!(client.command("HELO client.local").starts_with("250"));
    assert!(client.command("QUIT").starts_with("221"));
}

#[test]
fn test_several_messages_in_one_session() {
    let (addr, rx) = start_test_server();
    let mut client = Client::connect(&addr);
    client.command("HELO client.local");

    for n in 0..5 {
        client.envelope(
            &format!("sender{n}@example.com"),
            &["r0@example.com", "r1@example.com"],
        );
        let payload = format!("Subject: Test Email {n}\r\n\r\nMessage number {n}\r\n");
        assert!(client.data(payload.as_bytes()).starts_with("250"));
    }
    client.command("QUIT");

    let emails: Vec<Email> = (0..5)
        .map(|_| rx.recv_timeout(Duration::from_millis(500)).unwrap())
        .collect();
    for (n, email) in emails.iter().enumerate() {
        assert_eq!(email.from, format!("sender{n}@example.com"));
        assert_eq!(email.to.len(), 2);
    }
}

#[test]
fn test_rset_discards_transaction() {
    let (addr, rx) = start_test_server();
    let mut client = Client::connect(&addr);
    client.command("HELO client.local");
    client.command("MAIL FROM:<sender@example.com>");
    for i in 0..50 {
        client.command(&format!("RCPT TO:<user{i}@example.com>"));
    }

    assert!(client.command("RSET").starts_with("250"));

    client.envelope("newsender@example.com", &["newrecipient@example.com"]);
    assert!(client.data(b"Subject: After Reset\r\n\r\n").starts_with("250"));
    client.command("QUIT");

    let email = rx.recv_timeout(Duration::from_millis(500)).unwrap();
    assert_eq!(email.from, "newsender@example.com");
    assert_eq!(email.to, vec!["newrecipient@example.com"]);
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_concurrent_sessions() {
    let (addr, rx) = start_test_server();

    // Hold every session open before any of them sends data
    let clients: Vec<Client> = (0..5)
        .map(|id| {
            let mut client = Client::connect(&addr);
            client.command(&format!("HELO client{id}.local"));
            client.envelope(&format!("sender{id}@example.com"), &["r@example.com"]);
            client
        })
        .collect();

    let handles: Vec<_> = clients
        .into_iter()
        .enumerate()
        .map(|(id, mut client)| {
            thread::spawn(move || {
                let payload = format!("Subject: Concurrent {id}\r\n\r\nfrom {id}\r\n");
                assert!(client.data(payload.as_bytes()).starts_with("250"));
                client.command("QUIT");
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut senders: Vec<String> = (0..5)
        .map(|_| rx.recv_timeout(Duration::from_millis(500)).unwrap().from)
        .collect();
    senders.sort();
    let expected: Vec<String> = (0..5).map(|id| format!("sender{id}@example.com")).collect();
    assert_eq!(senders, expected);
}

#[test]
fn test_unterminated_command_line_is_bounded() {
    let (addr, _rx) = start_test_server();
    let mut client = Client::connect(&addr);

    // More than a megabyte with no line ending; the reply comes before the
    // line is over
    let flood = vec![b'a'; 1024 * 1024 + 1];
    client.stream.write_all(b"HELO ").unwrap();
    client.stream.write_all(&flood).unwrap();
    client.stream.flush().unwrap();
    assert!(client.read_reply().starts_with("500"));

    // The rest of the line is skipped once it ends
    client.stream.write_all(b"\r\n").unwrap();
    assert!(client.command("NOOP").starts_with("250"));
}

#[test]
fn test_unterminated_data_line_is_bounded() {
    let (addr, rx) = start_test_server();
    let mut client = Client::connect(&addr);
    client.command("HELO client.local");
    client.envelope("sender@example.com", &["recipient@example.com"]);

    let mut payload = b"Subject: flood\r\n".to_vec();
    payload.extend(vec![b'a'; 1024 * 1024 + 1]);
    payload.extend_from_slice(b"\r\n");
    let reply = client.data(&payload);
    assert!(reply.starts_with("500"), "{reply}");
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    client.envelope("sender@example.com", &["recipient@example.com"]);
    assert!(client.data(b"fine\r\n").starts_with("250"));
}

#[test]
fn test_null_reverse_path_is_captured() {
    let (addr, rx) = start_test_server();
    let mut client = Client::connect(&addr);
    client.command("HELO client.local");

    assert!(client.command("MAIL FROM:<>").starts_with("250"));
    assert!(client.command("RCPT TO:<>").starts_with("501"));
    assert!(client.command("RCPT TO:<postmaster@example.com>").starts_with("250"));
    assert!(client.data(b"Subject: Undeliverable\r\n\r\n").starts_with("250"));

    let email = rx.recv_timeout(Duration::from_millis(500)).unwrap();
    assert_eq!(email.from, "");
    assert_eq!(email.to, vec!["postmaster@example.com"]);
}
