//! Startup configuration

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_ADDR: &str = "127.0.0.1:2525";
pub const DEFAULT_EXTENSION: &str = "eml";

/// Fatal problems found before the server starts listening
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Hostname cannot be empty")]
    EmptyHostname,

    #[error("Unable to determine hostname: {0}")]
    Hostname(#[source] io::Error),

    #[error("Unable to determine current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("Output directory {path}: {source}")]
    OutputDir { path: String, source: io::Error },

    #[error("Output path {0} is not a directory")]
    NotADirectory(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listen address:port
    pub addr: String,
    /// Name the server announces to clients
    pub hostname: String,
    /// Directory captured messages are written to; empty means the current
    /// directory
    pub output: PathBuf,
    /// Extension of captured files, without the dot
    pub extension: String,
    /// Colour the conversation log
    pub color: bool,
    /// Log the SMTP conversation; implies `verbose`
    pub debug: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_owned(),
            hostname: String::new(),
            output: PathBuf::new(),
            extension: DEFAULT_EXTENSION.to_owned(),
            color: true,
            debug: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Resolve defaults and check everything that must hold before any
    /// session is accepted.
    pub fn validate(mut self) -> Result<Self, StartupError> {
        if self.hostname.is_empty() {
            return Err(StartupError::EmptyHostname);
        }

        if self.debug {
            self.verbose = true;
        }

        if self.output.as_os_str().is_empty() {
            self.output = env::current_dir().map_err(StartupError::CurrentDir)?;
        }

        let metadata = fs::metadata(&self.output).map_err(|source| StartupError::OutputDir {
            path: self.output.display().to_string(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(StartupError::NotADirectory(
                self.output.display().to_string(),
            ));
        }

        Ok(self)
    }
}

/// This machine's host name
pub fn default_hostname() -> Result<String, StartupError> {
    let name = hostname::get().map_err(StartupError::Hostname)?;
    Ok(name.to_string_lossy().into_owned())
}
