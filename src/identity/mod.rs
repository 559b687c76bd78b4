//! Principals and their bearer tokens

pub mod bearer;
pub mod directory;

pub use bearer::{HmacBearer, IdentityTokens};
pub use directory::{InMemoryDirectory, Principal, PrincipalDirectory, PrincipalId};
