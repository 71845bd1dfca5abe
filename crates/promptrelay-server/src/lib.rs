//! PromptRelay server: HTTP command surface and the tab panel.

pub mod panel;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
