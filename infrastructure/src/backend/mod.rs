//! Backend adapters.
//!
//! Everything between a resolved tool call and a backend response lives
//! here:
//!
//! - [`protocol`] — the JSON-RPC 2.0 envelope and the legacy gateway
//!   envelope
//! - [`error`] — transport/normalization errors
//! - [`supervisor`] — lifecycle owner for subprocess backends speaking
//!   newline-delimited JSON-RPC over stdio
//! - [`http`] — JSON-RPC over HTTP for remote backends
//! - [`legacy`] — the `{server, tool, params}` gateway client
//! - [`router`] — the [`ExecutionRouter`](router::ExecutionRouter) that
//!   ties them together behind the application's `ToolRouterPort`

pub mod error;
pub mod http;
pub mod legacy;
pub mod protocol;
pub mod router;
pub mod supervisor;
