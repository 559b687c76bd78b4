//! Logging middleware
//!
//! Provides request logging functionality.

use crate::protocol::Command;
use log::{debug, info};
use std::net::SocketAddr;

/// Log a client connection
pub fn log_connection(client_addr: &SocketAddr) {
    info!("Client connected: {}", client_addr);
}

pub fn log_disconnection(client_addr: &SocketAddr) {
    info!("Client {} disconnected", client_addr);
}

/// Log a client command. Commands carrying secrets are only logged in full at debug.
pub fn log_command(client_addr: &SocketAddr, command: &Command) {
    if command.carries_secret() {
        info!("Client {} executed: {}", client_addr, command.name());
        debug!("Client {} command detail: {:?}", client_addr, command);
    } else {
        info!("Client {} executed: {:?}", client_addr, command);
    }
}
