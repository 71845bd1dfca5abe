//! Browser side of PromptRelay: tab hosts, site adapters, page agents.
//!
//! A [`BrowserHost`] enumerates tabs and attaches a [`PageDriver`] to one of
//! them. [`PageAgent`] runs per attached tab: it identifies the platform,
//! fills and submits prompts through the matching [`SiteAdapter`], watches
//! the page for a finished reply and pushes status changes to the
//! coordinator.

pub mod agent;
pub mod cdp;
pub mod host;
pub mod memory;
mod monitor;
mod scripts;
pub mod sites;

pub use agent::{AgentHandle, PageAgent};
pub use cdp::{CdpHost, CdpPage};
pub use host::{BrowserHost, FillStyle, PageDriver, TabInfo};
pub use memory::{MemoryElement, MemoryHost, MemoryPage};
pub use sites::{adapter_for, SiteAdapter, SiteTable, SubmitMethod};
