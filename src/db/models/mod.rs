//! Database models split into domain-specific modules.

pub mod common;
pub mod qualification;
pub mod user;

pub use common::*;
pub use qualification::*;
pub use user::*;
