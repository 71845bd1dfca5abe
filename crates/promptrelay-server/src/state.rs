//! Shared application state.

use std::sync::Arc;

use promptrelay_browser::{BrowserHost, CdpHost, MemoryHost};
use promptrelay_core::{BrowserBackend, RelayConfig};
use promptrelay_runtime::Coordinator;
use tracing::info;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: RelayConfig,
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    /// Build the state with the browser host selected by the configuration.
    pub fn new(config: RelayConfig) -> Self {
        let host: Arc<dyn BrowserHost> = match config.backend {
            BrowserBackend::Cdp => {
                info!("Using Chrome DevTools at {}", config.cdp_url);
                Arc::new(CdpHost::new(config.cdp_url.clone()))
            }
            BrowserBackend::Memory => {
                info!("Using the in-memory browser");
                Arc::new(MemoryHost::demo())
            }
        };
        Self::with_host(config, host)
    }

    pub fn with_host(config: RelayConfig, host: Arc<dyn BrowserHost>) -> Self {
        let coordinator = Arc::new(Coordinator::new(host, config.agent.clone()));
        Self {
            config,
            coordinator,
        }
    }

    /// Start the coordinator's event loop. Must run inside a tokio runtime.
    pub fn start(&self) {
        self.coordinator.spawn_event_loop();
    }
}
