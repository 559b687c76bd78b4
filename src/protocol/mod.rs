//! Control protocol
//!
//! Line-oriented commands in, `<code> <text>` replies out.

pub mod commands;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::{Command, CommandData, CommandResult, CommandStatus};
pub use handlers::{handle_command, handle_upload};
pub use parser::parse_command;
