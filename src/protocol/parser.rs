//! Command parsing
//!
//! Handles parsing of commands from client input.

use crate::protocol::Command;

/// Placeholder for "use the default" in optional positional arguments.
const DEFAULT_ARG: &str = "-";

/// Parses a raw command line into a [`Command`].
///
/// The verb is case-insensitive. A known verb with the wrong arguments
/// becomes [`Command::Malformed`].
pub fn parse_command(raw: &str) -> Command {
    let mut parts = raw.split_whitespace();
    let verb = parts.next().unwrap_or("").to_ascii_uppercase();
    let args: Vec<&str> = parts.collect();

    match verb.as_str() {
        "LOGIN" => match args.as_slice() {
            [phone] => Command::Login(phone.to_string()),
            _ => Command::Malformed("LOGIN"),
        },
        "VERIFY" => match args.as_slice() {
            [phone, code] => Command::Verify {
                phone: phone.to_string(),
                code: code.to_string(),
            },
            _ => Command::Malformed("VERIFY"),
        },
        "AUTH" => match args.as_slice() {
            [bearer] => Command::Auth(bearer.to_string()),
            _ => Command::Malformed("AUTH"),
        },
        "LIST" => match args.as_slice() {
            [] => Command::List(None),
            [path] => Command::List(Some(path.to_string())),
            _ => Command::Malformed("LIST"),
        },
        "GET" => match args.as_slice() {
            [path] => Command::Get(path.to_string()),
            _ => Command::Malformed("GET"),
        },
        "PUT" => parse_put(&args).unwrap_or(Command::Malformed("PUT")),
        "SHARE" => parse_share(&args).unwrap_or(Command::Malformed("SHARE")),
        "FETCH" => match args.as_slice() {
            [token] => Command::Fetch(token.to_string()),
            _ => Command::Malformed("FETCH"),
        },
        "QUIT" | "Q" if args.is_empty() => Command::Quit,
        "QUIT" | "Q" => Command::Malformed("QUIT"),
        _ => Command::Unknown(verb),
    }
}

fn parse_put(args: &[&str]) -> Option<Command> {
    let (name, len, dir) = match args {
        [name, len] => (name, len, None),
        [name, len, dir] => (name, len, Some(dir.to_string())),
        _ => return None,
    };
    Some(Command::Put {
        name: name.to_string(),
        len: len.parse().ok()?,
        dir,
    })
}

fn parse_share(args: &[&str]) -> Option<Command> {
    let (path, days, phone) = match args {
        [path] => (path, None, None),
        [path, days] => (path, Some(*days), None),
        [path, days, phone] => (path, Some(*days), Some(phone.to_string())),
        _ => return None,
    };
    let days = match days {
        None | Some(DEFAULT_ARG) => None,
        Some(days) => Some(days.parse().ok()?),
    };
    Some(Command::Share {
        path: path.to_string(),
        days,
        phone,
    })
}
