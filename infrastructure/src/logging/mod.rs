//! Structured trace logging adapters.

pub mod trace_log;

pub use trace_log::JsonlTraceSink;
