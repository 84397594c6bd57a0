//! Core types used across the SDK.

mod common;
mod intent;

pub use common::*;
pub use intent::*;
