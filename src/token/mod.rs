//! One-time codes and share tokens
//!
//! Generation lives in [`generator`]; binding tokens to values in the
//! expiring cache lives in [`issuer`].

pub mod generator;
pub mod issuer;

pub use generator::{OTP_LENGTH, generate_otp, generate_share_token};
pub use issuer::{Consumption, IssuedToken, TokenIssuer};

/// Cache namespace for login codes, keyed by phone number.
pub const OTP_NAMESPACE: &str = "login-otp";

/// Cache namespace for share links, keyed by share token.
pub const SHARE_NAMESPACE: &str = "share-links";
