use clap::{ArgAction, Parser};
use env_logger::WriteStyle;
use log::{error, info};
use smtpdump::config::{DEFAULT_ADDR, DEFAULT_EXTENSION, default_hostname};
use smtpdump::{CaptureHandler, Config, SmtpServer, StartupError, WireLogger};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "smtpdump")]
#[command(version)]
#[command(about = "SMTP sink that writes every received message to a file")]
struct Args {
    /// Server host name (defaults to this machine's name)
    #[arg(long, env = "SMTPDUMP_HOSTNAME")]
    hostname: Option<String>,

    /// Listen address:port
    #[arg(long, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Output directory (defaults to the current directory)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Saved file extension
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Colour debug output
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    /// Log the SMTP conversation (implies --verbose)
    #[arg(long)]
    debug: bool,

    /// Log every received message
    #[arg(long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<Config, StartupError> {
        let hostname = match self.hostname {
            Some(hostname) => hostname,
            None => default_hostname()?,
        };

        Config {
            addr: self.addr,
            hostname,
            output: self.output.unwrap_or_default(),
            extension: self.extension,
            color: self.color,
            debug: self.debug,
            verbose: self.verbose,
        }
        .validate()
    }
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .write_style(if args.color {
            WriteStyle::Auto
        } else {
            WriteStyle::Never
        })
        .init();

    let config = args.into_config().unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1);
    });

    let handler = CaptureHandler::new(&config.output, &config.extension, config.verbose);

    let mut server = SmtpServer::new(&config.hostname);
    if config.debug {
        server = server.with_transport_log(WireLogger::new(config.color));
    }

    if config.verbose {
        info!(
            "Listening on {:?}, writing to {}",
            config.addr,
            config.output.display()
        );
    }

    if let Err(e) = server.start(config.addr.as_str(), handler) {
        error!("Failed to start server: {e}");
        process::exit(1);
    }
}
