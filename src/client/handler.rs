use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::cache::CacheStore;
use crate::client::Client;
use crate::error::StorageError;
use crate::middleware::logging::{log_command, log_connection, log_disconnection};
use crate::protocol::handlers::{require_login, transfer_complete};
use crate::protocol::responses::{READY, SYNTAX_ERROR, format_response};
use crate::protocol::{
    Command, CommandData, CommandResult, CommandStatus, handle_command, handle_upload,
    parse_command,
};
use crate::service::Services;
use crate::storage::ObjectStore;

/// Outcome of reading one command line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LineRead {
    Line(String),
    TooLong,
    Eof,
}

/// Handles one client session.
///
/// - Greets, then reads CRLF-terminated command lines with a length cap.
/// - `PUT` payloads are read in full (bounded by the upload limit) before
///   the upload handler runs.
/// - Download payloads are written right after their `150` header.
pub async fn handle_client<C: CacheStore, S: ObjectStore>(
    stream: TcpStream,
    client_addr: SocketAddr,
    services: Arc<Services<C, S>>,
    max_command_length: usize,
) {
    log_connection(&client_addr);

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut client = Client::new(client_addr);

    let greeting = format_response(READY, "RAX Share Server ready");
    if let Err(e) = write_half.write_all(greeting.as_bytes()).await {
        warn!("Failed to greet {}: {}", client_addr, e);
        return;
    }

    loop {
        let command = match read_command_line(&mut reader, max_command_length).await {
            Ok(LineRead::Line(line)) => parse_command(&line),
            Ok(LineRead::TooLong) => {
                let reply = format_response(SYNTAX_ERROR, "Command too long");
                if write_half.write_all(reply.as_bytes()).await.is_err() {
                    break;
                }
                continue;
            }
            Ok(LineRead::Eof) => {
                info!("Connection closed by client {}", client_addr);
                break;
            }
            Err(e) => {
                error!("Failed to read from {}: {}", client_addr, e);
                break;
            }
        };
        log_command(&client_addr, &command);

        let result = match command {
            Command::Put { name, len, dir } => {
                // The payload is not drained, so the session cannot continue.
                if let Some(refusal) = refuse_upload(&client, len, services.files.max_upload()) {
                    warn!("Refusing {} byte upload from {}", len, client_addr);
                    let _ = send_result(&mut write_half, &refusal).await;
                    break;
                }

                let mut body = Vec::new();
                match (&mut reader).take(len).read_to_end(&mut body).await {
                    Ok(n) if n as u64 == len => {}
                    Ok(n) => {
                        warn!(
                            "Client {} disconnected after {} of {} upload bytes",
                            client_addr, n, len
                        );
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read upload from {}: {}", client_addr, e);
                        break;
                    }
                }

                handle_upload(&client, &services, &name, dir.as_deref(), body).await
            }
            other => handle_command(&mut client, other, &services).await,
        };

        if let Err(e) = send_result(&mut write_half, &result).await {
            error!("Failed to reply to {}: {}", client_addr, e);
            break;
        }

        if result.status == CommandStatus::CloseConnection {
            info!("Client {} requested to quit", client_addr);
            break;
        }
    }

    log_disconnection(&client_addr);
}

/// The reply that ends the session instead of reading a `PUT` payload:
/// anonymous sessions and oversized uploads never get their bytes buffered.
pub(crate) fn refuse_upload(client: &Client, len: u64, max: u64) -> Option<CommandResult> {
    if let Err(refusal) = require_login(client) {
        return Some(refusal);
    }
    if len > max {
        return Some(CommandResult::from_error(
            StorageError::FileTooLarge { size: len, max }.into(),
        ));
    }
    None
}

/// Writes the reply line, then any payload and its trailer.
pub(crate) async fn send_result<W: AsyncWrite + Unpin>(
    writer: &mut W,
    result: &CommandResult,
) -> io::Result<()> {
    if let Some(message) = &result.message {
        writer.write_all(message.as_bytes()).await?;
    }

    if let Some(CommandData::Download(download)) = &result.data {
        writer.write_all(&download.bytes).await?;
        writer.write_all(transfer_complete().as_bytes()).await?;
    }

    writer.flush().await
}

/// Reads one line of at most `max_len` bytes, CRLF excluded.
///
/// An overlong line is consumed up to and including its newline and reported
/// as [`LineRead::TooLong`], so the session can continue.
pub(crate) async fn read_command_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_len: usize,
) -> io::Result<LineRead> {
    let limit = max_len as u64 + 2;
    let mut buf = Vec::new();
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if n == 0 {
        return Ok(LineRead::Eof);
    }

    if buf.last() != Some(&b'\n') {
        if (n as u64) < limit {
            // EOF in the middle of a line
            return Ok(LineRead::Eof);
        }
        discard_rest_of_line(reader).await?;
        return Ok(LineRead::TooLong);
    }

    let line = String::from_utf8_lossy(&buf);
    let line = line.trim_end_matches(['\r', '\n']);
    if line.len() > max_len {
        return Ok(LineRead::TooLong);
    }
    Ok(LineRead::Line(line.to_string()))
}

async fn discard_rest_of_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<()> {
    loop {
        let (consumed, found) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(consumed);
        if found {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::PrincipalId;
    use crate::storage::FileDownload;

    #[tokio::test]
    async fn reads_lines_and_strips_crlf() {
        let mut input: &[u8] = b"LIST docs\r\nQUIT\n";
        assert_eq!(
            read_command_line(&mut input, 512).await.unwrap(),
            LineRead::Line("LIST docs".into())
        );
        assert_eq!(
            read_command_line(&mut input, 512).await.unwrap(),
            LineRead::Line("QUIT".into())
        );
        assert_eq!(read_command_line(&mut input, 512).await.unwrap(), LineRead::Eof);
    }

    #[tokio::test]
    async fn overlong_line_is_skipped_and_session_continues() {
        let mut data = vec![b'A'; 100];
        data.extend_from_slice(b"\r\nQUIT\r\n");
        let mut input: &[u8] = &data;

        assert_eq!(read_command_line(&mut input, 16).await.unwrap(), LineRead::TooLong);
        assert_eq!(
            read_command_line(&mut input, 16).await.unwrap(),
            LineRead::Line("QUIT".into())
        );
    }

    #[tokio::test]
    async fn line_at_the_limit_is_accepted() {
        let mut input: &[u8] = b"0123456789\r\n01234567890\r\n";
        assert_eq!(
            read_command_line(&mut input, 10).await.unwrap(),
            LineRead::Line("0123456789".into())
        );
        assert_eq!(read_command_line(&mut input, 10).await.unwrap(), LineRead::TooLong);
    }

    #[test]
    fn anonymous_upload_is_refused_before_reading() {
        let client = Client::default();
        let refusal = refuse_upload(&client, 10, 1024).expect("anonymous upload refused");
        assert_eq!(refusal.message.as_deref(), Some("530 Not logged in\r\n"));
    }

    #[test]
    fn oversized_upload_is_refused_before_reading() {
        let mut client = Client::default();
        client.login(PrincipalId(1));
        let refusal = refuse_upload(&client, 2048, 1024).expect("oversized upload refused");
        assert!(refusal.message.as_deref().unwrap().starts_with("552 "));
        assert!(refuse_upload(&client, 1024, 1024).is_none());
    }

    #[tokio::test]
    async fn download_is_header_bytes_trailer() {
        let result = CommandResult {
            status: CommandStatus::Success,
            message: Some("150 a.txt 3\r\n".into()),
            data: Some(CommandData::Download(FileDownload {
                name: "a.txt".into(),
                bytes: b"abc".to_vec(),
            })),
        };
        let mut out = Vec::new();
        send_result(&mut out, &result).await.unwrap();
        assert_eq!(out, b"150 a.txt 3\r\nabc226 Transfer complete\r\n");
    }
}
