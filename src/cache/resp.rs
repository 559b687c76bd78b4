//! Minimal RESP (REdis Serialization Protocol) codec
//!
//! Only what the remote cache needs: commands as arrays of bulk strings and
//! the scalar reply types.

use crate::error::CacheError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Upper bound on a bulk reply we are willing to buffer.
const MAX_BULK_LEN: usize = 16 * 1024 * 1024;

/// A decoded server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    /// `None` is the nil bulk string (`$-1`).
    Bulk(Option<Vec<u8>>),
}

/// Encodes a command as a RESP array of bulk strings.
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Reads exactly one reply.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply, CacheError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let mut chars = line.chars();
    let kind = chars.next().unwrap_or_default();
    let rest = chars.as_str();

    match kind {
        '+' => Ok(Reply::Simple(rest.to_string())),
        '-' => Ok(Reply::Error(rest.to_string())),
        ':' => rest
            .parse::<i64>()
            .map(Reply::Integer)
            .map_err(|_| CacheError::Protocol(format!("bad integer reply {:?}", rest))),
        '$' => {
            let len: i64 = rest
                .parse()
                .map_err(|_| CacheError::Protocol(format!("bad bulk length {:?}", rest)))?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let len = usize::try_from(len)
                .ok()
                .filter(|l| *l <= MAX_BULK_LEN)
                .ok_or_else(|| CacheError::Protocol(format!("bulk reply too large: {}", len)))?;

            let mut payload = vec![0u8; len + 2];
            reader.read_exact(&mut payload).await?;
            if !payload.ends_with(b"\r\n") {
                return Err(CacheError::Protocol("bulk reply not CRLF terminated".into()));
            }
            payload.truncate(len);
            Ok(Reply::Bulk(Some(payload)))
        }
        other => Err(CacheError::Protocol(format!(
            "unsupported reply type {:?}",
            other
        ))),
    }
}

async fn read_line<R>(reader: &mut R) -> Result<String, CacheError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        return Err(CacheError::Unavailable(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "cache server closed the connection",
        )));
    }

    let trimmed = line.trim_end_matches("\r\n");
    if trimmed.is_empty() || trimmed.len() == line.len() {
        return Err(CacheError::Protocol(format!("malformed reply line {:?}", line)));
    }
    Ok(trimmed.to_string())
}
