//! Diagnostic creation, severity management, and terminal rendering.
//!
//! This crate provides structured [`Diagnostic`] messages with severity levels,
//! error codes, an optional subject (the network node a message is about),
//! and notes. The [`DiagnosticSink`] accumulates diagnostics during a retiming
//! invocation and gates informational output behind a verbosity flag, and
//! [`DiagnosticRenderer`] implementations format them for display.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
