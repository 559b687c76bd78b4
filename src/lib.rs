//! RAX Share Server
//!
//! File sharing over a line-oriented TCP protocol: phone + OTP login,
//! per-principal storage roots with strict path confinement, and expiring
//! share links backed by a TTL cache.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod notify;
pub mod path;
pub mod protocol;
pub mod server;
pub mod service;
pub mod storage;
pub mod token;

pub use config::ServerConfig;
pub use server::Server;
pub use service::{Services, build_services};
