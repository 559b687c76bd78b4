//! Response handling
//!
//! Defines reply codes and formatting.

use crate::storage::FileEntry;

/// Standard reply codes
pub const OPENING_TRANSFER: u16 = 150;
pub const OK: u16 = 200;
pub const DIRECTORY_STATUS: u16 = 211;
pub const READY: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const LOGIN_SUCCESS: u16 = 230;
pub const ACTION_OK: u16 = 250;
pub const TOO_MANY_CONNECTIONS: u16 = 421;
pub const SYNTAX_ERROR: u16 = 500;
pub const ARGUMENT_ERROR: u16 = 501;
pub const BAD_SEQUENCE: u16 = 503;
pub const NOT_LOGGED_IN: u16 = 530;

/// Format a reply line
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

/// Multi-line listing reply: `211-` header, one line per entry, `211 End`.
pub fn format_listing(path: &str, entries: &[FileEntry]) -> String {
    let mut reply = format!("{}-Listing {}\r\n", DIRECTORY_STATUS, path);
    for entry in entries {
        reply.push_str(&entry.to_listing_line());
        reply.push_str("\r\n");
    }
    reply.push_str(&format_response(DIRECTORY_STATUS, "End"));
    reply
}

/// Header announcing a raw byte payload.
pub fn format_transfer_header(name: &str, len: usize) -> String {
    format!("{} {} {}\r\n", OPENING_TRANSFER, name, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_is_framed() {
        let entries = vec![FileEntry {
            name: "a.txt".into(),
            path: "1/a.txt".into(),
            size: 3,
            is_dir: false,
            modified: 1_700_000_000,
        }];
        assert_eq!(
            format_listing("/", &entries),
            "211-Listing /\r\na.txt|3|1700000000|file\r\n211 End\r\n"
        );
        assert_eq!(format_listing("/", &[]), "211-Listing /\r\n211 End\r\n");
    }
}
