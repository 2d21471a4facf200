//! Shared foundational types used across the Kairos retiming toolchain.
//!
//! This crate provides the latch initial-value algebra, floating-point
//! tolerance helpers for arrival-time comparisons, and common result types.

#![warn(missing_docs)]

pub mod init;
pub mod result;
pub mod tolerance;

pub use init::InitValue;
pub use result::{InternalError, KairosResult};
pub use tolerance::Tolerance;
