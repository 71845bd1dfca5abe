//! Wire and in-process message types shared by the coordinator and page agents.
//!
//! `types` holds the data model (tab and status records, injection
//! requests, capture results); `messages` holds the request/reply and event
//! types that cross the coordinator/agent boundary, plus the uniform
//! `{success, ...|error}` envelope used on every boundary.

pub mod messages;
pub mod types;

pub use messages::*;
pub use types::*;
