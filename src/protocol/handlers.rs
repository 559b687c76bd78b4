//! Command handlers
//!
//! One handler per command. Each returns a [`CommandResult`] and never
//! touches the socket; the session loop writes replies and payloads.

use crate::cache::CacheStore;
use crate::client::Client;
use crate::error::AuthError;
use crate::identity::PrincipalId;
use crate::protocol::responses::{
    ACTION_OK, ARGUMENT_ERROR, BAD_SEQUENCE, GOODBYE, LOGIN_SUCCESS, NOT_LOGGED_IN, OK, SYNTAX_ERROR,
    TRANSFER_COMPLETE, format_listing, format_response, format_transfer_header,
};
use crate::protocol::{Command, CommandData, CommandResult, CommandStatus};
use crate::service::{ShareRequest, Services};
use crate::storage::{FileDownload, ObjectStore};
use log::info;
use std::time::UNIX_EPOCH;

/// Dispatches a parsed command to its handler.
///
/// `PUT` needs its payload read from the socket first and goes through
/// [`handle_upload`] instead.
pub async fn handle_command<C: CacheStore, S: ObjectStore>(
    client: &mut Client,
    command: Command,
    services: &Services<C, S>,
) -> CommandResult {
    match command {
        Command::Login(phone) => handle_cmd_login(services, &phone).await,
        Command::Verify { phone, code } => handle_cmd_verify(client, services, &phone, &code).await,
        Command::Auth(bearer) => handle_cmd_auth(client, services, &bearer),
        Command::List(path) => handle_cmd_list(client, services, path.as_deref()).await,
        Command::Get(path) => handle_cmd_get(client, services, &path).await,
        Command::Share { path, days, phone } => {
            handle_cmd_share(client, services, path, days, phone).await
        }
        Command::Fetch(token) => handle_cmd_fetch(services, &token).await,
        Command::Quit => handle_cmd_quit(client),
        Command::Put { .. } => CommandResult {
            status: CommandStatus::Failure("Upload payload not received".into()),
            message: Some(format_response(BAD_SEQUENCE, "Bad sequence of commands")),
            data: None,
        },
        Command::Malformed(verb) => handle_cmd_malformed(verb),
        Command::Unknown(_) => handle_cmd_unknown(),
    }
}

/// Stores an upload whose payload has already been read in full.
pub async fn handle_upload<C: CacheStore, S: ObjectStore>(
    client: &Client,
    services: &Services<C, S>,
    name: &str,
    dir: Option<&str>,
    bytes: Vec<u8>,
) -> CommandResult {
    let principal = match require_login(client) {
        Ok(principal) => principal,
        Err(result) => return result,
    };

    match services
        .files
        .upload(principal, dir.unwrap_or(""), name, bytes)
        .await
    {
        Ok(entry) => {
            info!("Principal {} stored {} ({} bytes)", principal, entry.path, entry.size);
            CommandResult::success(format_response(
                TRANSFER_COMPLETE,
                &format!("Stored {}", entry.path),
            ))
        }
        Err(e) => CommandResult::from_error(e),
    }
}

/// Trailer written after a download payload.
pub fn transfer_complete() -> String {
    format_response(TRANSFER_COMPLETE, "Transfer complete")
}

/// The session's principal, or the `530` reply to send instead.
pub(crate) fn require_login(client: &Client) -> Result<PrincipalId, CommandResult> {
    client.principal().ok_or_else(|| CommandResult {
        status: CommandStatus::Failure(AuthError::NotLoggedIn.to_string()),
        message: Some(format_response(NOT_LOGGED_IN, "Not logged in")),
        data: None,
    })
}

async fn handle_cmd_login<C: CacheStore, S: ObjectStore>(
    services: &Services<C, S>,
    phone: &str,
) -> CommandResult {
    match services.auth.login(phone).await {
        Ok(()) => CommandResult::success(format_response(OK, "OTP sent")),
        Err(e) => CommandResult::from_error(e),
    }
}

/// Handles VERIFY: consumes the code and authenticates the session.
async fn handle_cmd_verify<C: CacheStore, S: ObjectStore>(
    client: &mut Client,
    services: &Services<C, S>,
    phone: &str,
    code: &str,
) -> CommandResult {
    let bearer = match services.auth.validate(phone, code).await {
        Ok(bearer) => bearer,
        Err(e) => {
            client.logout();
            return CommandResult::from_error(e);
        }
    };

    match services.auth.authenticate(&bearer) {
        Ok(principal) => {
            client.login(principal);
            CommandResult::success(format_response(LOGIN_SUCCESS, &bearer))
        }
        Err(e) => CommandResult::from_error(e.into()),
    }
}

fn handle_cmd_auth<C: CacheStore, S: ObjectStore>(
    client: &mut Client,
    services: &Services<C, S>,
    bearer: &str,
) -> CommandResult {
    match services.auth.authenticate(bearer) {
        Ok(principal) => {
            client.login(principal);
            CommandResult::success(format_response(LOGIN_SUCCESS, "Authenticated"))
        }
        Err(e) => {
            client.logout();
            CommandResult::from_error(e.into())
        }
    }
}

async fn handle_cmd_list<C: CacheStore, S: ObjectStore>(
    client: &Client,
    services: &Services<C, S>,
    path: Option<&str>,
) -> CommandResult {
    let principal = match require_login(client) {
        Ok(principal) => principal,
        Err(result) => return result,
    };
    let path = path.unwrap_or("");

    match services.files.list(principal, path).await {
        Ok(entries) => {
            let shown = if path.is_empty() { "/" } else { path };
            CommandResult::success(format_listing(shown, &entries))
        }
        Err(e) => CommandResult::from_error(e),
    }
}

async fn handle_cmd_get<C: CacheStore, S: ObjectStore>(
    client: &Client,
    services: &Services<C, S>,
    path: &str,
) -> CommandResult {
    let principal = match require_login(client) {
        Ok(principal) => principal,
        Err(result) => return result,
    };

    match services.files.download(principal, path).await {
        Ok(download) => download_result(download),
        Err(e) => CommandResult::from_error(e),
    }
}

async fn handle_cmd_share<C: CacheStore, S: ObjectStore>(
    client: &Client,
    services: &Services<C, S>,
    path: String,
    days: Option<u32>,
    phone: Option<String>,
) -> CommandResult {
    let principal = match require_login(client) {
        Ok(principal) => principal,
        Err(result) => return result,
    };

    let request = ShareRequest {
        path,
        recipient_phone: phone,
        expiration_days: days,
    };
    match services.shares.create_share(principal, request).await {
        Ok(link) => {
            let expires = link
                .expires_at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            CommandResult::success(format_response(
                ACTION_OK,
                &format!("{} {}", link.url, expires),
            ))
        }
        Err(e) => CommandResult::from_error(e),
    }
}

async fn handle_cmd_fetch<C: CacheStore, S: ObjectStore>(
    services: &Services<C, S>,
    token: &str,
) -> CommandResult {
    match services.shares.download(token).await {
        Ok(download) => download_result(download),
        Err(e) => CommandResult::from_error(e),
    }
}

/// Handles QUIT: logs out the client and signals connection close.
fn handle_cmd_quit(client: &mut Client) -> CommandResult {
    client.logout();

    CommandResult {
        status: CommandStatus::CloseConnection,
        message: Some(format_response(GOODBYE, "Goodbye")),
        data: None,
    }
}

fn handle_cmd_malformed(verb: &str) -> CommandResult {
    CommandResult {
        status: CommandStatus::Failure(format!("Malformed {}", verb)),
        message: Some(format_response(
            ARGUMENT_ERROR,
            "Syntax error in parameters or arguments",
        )),
        data: None,
    }
}

/// Handles unknown or unsupported commands: returns error response.
fn handle_cmd_unknown() -> CommandResult {
    CommandResult {
        status: CommandStatus::Failure("Unknown command".into()),
        message: Some(format_response(
            SYNTAX_ERROR,
            "Syntax error, command unrecognized",
        )),
        data: None,
    }
}

fn download_result(download: FileDownload) -> CommandResult {
    CommandResult {
        status: CommandStatus::Success,
        message: Some(format_transfer_header(&download.name, download.bytes.len())),
        data: Some(CommandData::Download(download)),
    }
}
