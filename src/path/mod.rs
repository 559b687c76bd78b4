//! Path confinement engine
//!
//! Turns untrusted relative paths into locations that cannot leave a
//! per-principal root. Pure string and component reasoning only.

pub mod confiner;
pub mod guard;
pub mod normalize;

pub use confiner::{ConfinedPath, confine, ensure_within};
pub use guard::validate;
