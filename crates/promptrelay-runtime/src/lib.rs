//! PromptRelay runtime: the coordinator that owns page agents.
//!
//! The [`Coordinator`] scans the browser for chat tabs, keeps one
//! [`PageAgent`](promptrelay_browser::PageAgent) per tab, fans external
//! commands out to them and records the status updates they push.

pub mod coordinator;

pub use coordinator::Coordinator;
