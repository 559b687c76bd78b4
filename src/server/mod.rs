//! Server core functionality
//!
//! Binds the control listener and runs one task per connection.

pub mod core;

pub use core::Server;
