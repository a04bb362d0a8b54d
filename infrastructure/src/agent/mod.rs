//! Agent gateway adapters.

pub mod gateway;
