use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::client::handle_client;
use crate::config::ServerConfig;
use crate::protocol::responses::{TOO_MANY_CONNECTIONS, format_response};
use crate::service::Services;

const ACCEPT_BACKOFF_START: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

pub struct Server {
    listener: TcpListener,
    services: Arc<Services>,
    config: Arc<ServerConfig>,
    sessions: Arc<Semaphore>,
}

impl Server {
    /// Binds the control listener. Port 0 picks a free port.
    pub async fn bind(config: Arc<ServerConfig>, services: Arc<Services>) -> io::Result<Self> {
        let socket = config.server.control_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e);
            }
        };

        Ok(Self {
            listener,
            services,
            sessions: Arc::new(Semaphore::new(config.server.max_clients)),
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the task is dropped.
    pub async fn run(&self) {
        info!(
            "Starting RAX share server on {} (max {} clients)",
            self.local_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| self.config.server.control_socket()),
            self.config.server.max_clients
        );

        let mut backoff = ACCEPT_BACKOFF_START;
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    backoff = ACCEPT_BACKOFF_START;
                    self.dispatch(stream, addr);
                }
                Err(e) => {
                    // Typically EMFILE; retrying at once would spin.
                    error!("Error accepting connection: {}; retrying in {:?}", e, backoff);
                    tokio::time::sleep(backoff).await;
                    backoff = next_backoff(backoff);
                }
            }
        }
    }

    fn dispatch(&self, stream: TcpStream, addr: SocketAddr) {
        let permit = match Arc::clone(&self.sessions).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Rejecting {}: too many connections", addr);
                tokio::spawn(reject(stream));
                return;
            }
        };

        let services = Arc::clone(&self.services);
        let max_command_length = self.config.server.max_command_length;

        // Spawn a task for each client so accept loop doesn't block
        tokio::spawn(async move {
            handle_client(stream, addr, services, max_command_length).await;
            drop(permit);
        });
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(ACCEPT_BACKOFF_MAX)
}

async fn reject(mut stream: TcpStream) {
    let reply = format_response(TOO_MANY_CONNECTIONS, "Too many connections. Try again later.");
    let _ = stream.write_all(reply.as_bytes()).await;
    let _ = stream.shutdown().await;
}
