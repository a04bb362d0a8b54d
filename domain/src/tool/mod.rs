//! Tool domain model.
//!
//! - [`family::ToolFamily`] — the tool-name → backend/resolution family
//!   mapping, derived once per name and shared by the parameter resolver
//!   and the execution router
//! - [`entities`] — the tool catalog and call/argument types
//! - [`value_objects`] — immutable outcome and error-type values

pub mod entities;
pub mod family;
pub mod value_objects;
