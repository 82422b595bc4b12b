//! Foundation types for the GraphQL client project model.
//!
//! This crate provides shared types used across the project crates.
//! It has zero external dependencies, making it suitable as a foundation layer.
//!
//! # Type Categories
//!
//! - **File types**: [`FileUri`]
//! - **Position types**: [`Position`], [`Range`]
//! - **Severity types**: [`DiagnosticSeverity`]

mod file;
mod position;
mod severity;

pub use file::FileUri;
pub use position::{Position, Range};
pub use severity::DiagnosticSeverity;
