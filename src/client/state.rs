//! Module `state`
//!
//! Per-connection session state.

use crate::identity::PrincipalId;
use std::net::SocketAddr;

/// Represents the state of a connected client.
///
/// A session is authenticated once it carries a principal, either from
/// VERIFY or from AUTH with a previously issued bearer token.
#[derive(Debug, Default, Clone)]
pub struct Client {
    client_addr: Option<SocketAddr>,
    principal: Option<PrincipalId>,
}

impl Client {
    pub fn new(client_addr: SocketAddr) -> Self {
        Self {
            client_addr: Some(client_addr),
            principal: None,
        }
    }

    pub fn login(&mut self, principal: PrincipalId) {
        self.principal = Some(principal);
    }

    /// Drops the authenticated principal; the address is kept for logging.
    pub fn logout(&mut self) {
        self.principal = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.principal.is_some()
    }

    pub fn principal(&self) -> Option<PrincipalId> {
        self.principal
    }

    /// Returns the client's socket address if known.
    pub fn client_addr(&self) -> Option<&SocketAddr> {
        self.client_addr.as_ref()
    }
}
