//! Module `commands`
//!
//! Data structures for parsed commands and the results of running them.

use crate::error::ShareServerError;
use crate::error::handlers::error_reply;
use crate::storage::FileDownload;

/// A command parsed from one client line.
///
/// Arguments are whitespace separated, so paths and names cannot contain
/// spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Request a login code for a phone number
    Login(String),
    /// Trade a login code for a bearer token
    Verify { phone: String, code: String },
    /// Resume a session with an existing bearer token
    Auth(String),
    /// List a directory (blank means the principal root)
    List(Option<String>),
    Get(String),
    /// Upload header; `len` raw bytes follow the line
    Put {
        name: String,
        len: u64,
        dir: Option<String>,
    },
    Share {
        path: String,
        days: Option<u32>,
        phone: Option<String>,
    },
    /// Download through a share token, no login required
    Fetch(String),
    Quit,
    /// Known verb with missing or malformed arguments
    Malformed(&'static str),
    Unknown(String),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login(_) => "LOGIN",
            Command::Verify { .. } => "VERIFY",
            Command::Auth(_) => "AUTH",
            Command::List(_) => "LIST",
            Command::Get(_) => "GET",
            Command::Put { .. } => "PUT",
            Command::Share { .. } => "SHARE",
            Command::Fetch(_) => "FETCH",
            Command::Quit => "QUIT",
            Command::Malformed(verb) => *verb,
            Command::Unknown(_) => "UNKNOWN",
        }
    }

    /// Codes and tokens that must stay out of info-level logs.
    pub fn carries_secret(&self) -> bool {
        matches!(
            self,
            Command::Verify { .. } | Command::Auth(_) | Command::Fetch(_)
        )
    }

    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Command::List(_) | Command::Get(_) | Command::Put { .. } | Command::Share { .. }
        )
    }
}

/// Represents the outcome status of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

/// Payload sent after the reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandData {
    Download(FileDownload),
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
    pub data: Option<CommandData>,
}

impl CommandResult {
    pub fn success(message: String) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message),
            data: None,
        }
    }

    /// Logs the error and renders it as the reply.
    pub fn from_error(err: ShareServerError) -> Self {
        Self {
            message: Some(error_reply(&err)),
            status: CommandStatus::Failure(err.to_string()),
            data: None,
        }
    }
}
