//! Client sessions
//!
//! Per-connection state and the command loop that drives it.

pub mod handler;
pub mod state;

pub use handler::handle_client;
pub use state::Client;
