//! PromptRelay Core: platform detection, configuration, errors, retry.

pub mod config;
pub mod error;
pub mod platform;
pub mod retry;

pub use config::{AgentSettings, BrowserBackend, RelayConfig};
pub use error::{Error, Result};
pub use platform::Platform;
pub use retry::{retry_fixed, RetryPolicy};
