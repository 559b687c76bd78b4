//! Networked cache backend
//!
//! Talks RESP to a key/value server with native per-key expiry (Redis or
//! compatible). Expiry and eviction are the server's job. Every call is
//! bounded by the configured I/O timeout.

use crate::cache::resp::{Reply, encode_command, read_reply};
use crate::cache::{CacheStore, namespaced_key};
use crate::error::CacheError;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Idle connections kept for reuse.
const MAX_IDLE_CONNECTIONS: usize = 8;

struct Connection {
    stream: BufReader<TcpStream>,
}

impl Connection {
    async fn open(address: &str) -> Result<Self, CacheError> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: BufReader::new(stream),
        })
    }

    async fn call(&mut self, args: &[&[u8]]) -> Result<Reply, CacheError> {
        let request = encode_command(args);
        self.stream.get_mut().write_all(&request).await?;
        self.stream.get_mut().flush().await?;
        read_reply(&mut self.stream).await
    }
}

pub struct RemoteCacheStore {
    address: String,
    io_timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl RemoteCacheStore {
    /// Creates a client; no connection is made until the first call.
    pub fn new(address: impl Into<String>, io_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            io_timeout,
            idle: Mutex::new(Vec::new()),
        }
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.io_timeout, operation)
            .await
            .map_err(|_| CacheError::Timeout(self.io_timeout))?
    }

    /// Runs one command on a pooled connection.
    ///
    /// A connection that failed mid-call is dropped, never returned to the pool.
    async fn execute(&self, args: &[&[u8]]) -> Result<Reply, CacheError> {
        let pooled = self.idle.lock().await.pop();
        let mut connection = match pooled {
            Some(connection) => connection,
            None => {
                debug!("Opening cache connection to {}", self.address);
                self.bounded(Connection::open(&self.address)).await?
            }
        };

        let reply = match self.bounded(connection.call(args)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Cache call to {} failed: {}", self.address, e);
                return Err(e);
            }
        };

        let mut idle = self.idle.lock().await;
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(connection);
        }
        drop(idle);

        match reply {
            Reply::Error(message) => Err(CacheError::Protocol(message)),
            other => Ok(other),
        }
    }
}

impl CacheStore for RemoteCacheStore {
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let full_key = namespaced_key(namespace, key);

        // PX rejects zero; a zero lifetime just means the key must not exist.
        if ttl.is_zero() {
            self.execute(&[b"DEL", full_key.as_bytes()]).await?;
            return Ok(());
        }

        let millis = ttl.as_millis().max(1).to_string();
        match self
            .execute(&[
                b"SET",
                full_key.as_bytes(),
                value.as_bytes(),
                b"PX",
                millis.as_bytes(),
            ])
            .await?
        {
            Reply::Simple(ref ok) if ok == "OK" => {
                debug!("Set {} with ttl {}ms", full_key, millis);
                Ok(())
            }
            other => Err(CacheError::Protocol(format!(
                "unexpected SET reply {:?}",
                other
            ))),
        }
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>, CacheError> {
        let full_key = namespaced_key(namespace, key);
        match self.execute(&[b"GET", full_key.as_bytes()]).await? {
            Reply::Bulk(None) => Ok(None),
            Reply::Bulk(Some(bytes)) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| CacheError::Protocol(format!("non UTF-8 value under {}", full_key))),
            other => Err(CacheError::Protocol(format!(
                "unexpected GET reply {:?}",
                other
            ))),
        }
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<bool, CacheError> {
        let full_key = namespaced_key(namespace, key);
        match self.execute(&[b"DEL", full_key.as_bytes()]).await? {
            Reply::Integer(removed) => Ok(removed > 0),
            other => Err(CacheError::Protocol(format!(
                "unexpected DEL reply {:?}",
                other
            ))),
        }
    }
}
