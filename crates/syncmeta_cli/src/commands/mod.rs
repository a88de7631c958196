//! CLI command implementations.

pub mod inspect;
pub mod status;
pub mod verify;
