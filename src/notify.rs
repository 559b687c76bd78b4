//! Outbound notifications (SMS stand-in)

use log::{debug, info};

/// Fire-and-forget delivery of a text message to a phone number.
pub trait Notifier: Send + Sync {
    fn send(&self, destination: &str, message: &str);
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, destination: &str, message: &str) {
        info!("Sending message to {}", destination);
        debug!("Message for {}: {}", destination, message);
    }
}
