//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] — domain-level errors
//! - [`string`] — small text helpers used when folding backend output
//!   into agent turns and trace events

pub mod error;
pub mod string;
