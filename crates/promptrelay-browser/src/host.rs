//! Host abstractions: tab enumeration and per-page DOM operations.

use std::sync::Arc;

use async_trait::async_trait;
use promptrelay_core::Result;
use promptrelay_protocol::TabId;

/// A tab as reported by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: String,
}

/// How text is written into an input control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStyle {
    /// Native value setter for `<textarea>`/`<input>`, `textContent` for
    /// contenteditable elements.
    Auto,
    /// Replace the editor content with a single `<p>` holding the text.
    Paragraph,
}

/// DOM operations a page agent needs from its tab.
///
/// Selector lookups never fail on a selector the page does not support:
/// an invalid selector behaves like one that matches nothing. Errors are
/// reserved for transport problems.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Current `location.href`.
    async fn location(&self) -> Result<String>;

    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Rendered text of every element matching `selector`, in document order.
    async fn texts(&self, selector: &str) -> Result<Vec<String>>;

    /// Focus the first match and replace its content with `text`.
    /// Returns false when nothing matched.
    async fn fill(&self, selector: &str, text: &str, style: FillStyle) -> Result<bool>;

    /// Click the first enabled, visible match whose label does not contain
    /// `skip_label`. Returns false when no element qualified.
    async fn click(&self, selector: &str, skip_label: Option<&str>) -> Result<bool>;

    /// Send an Enter key press to the first match.
    async fn press_enter(&self, selector: &str) -> Result<bool>;

    /// Resolves once the page is gone (tab closed, transport dropped).
    async fn closed(&self);
}

/// Source of tabs and the means to attach to them.
#[async_trait]
pub trait BrowserHost: Send + Sync {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>>;

    /// Open a page session on `tab`.
    async fn attach(&self, tab: &TabInfo) -> Result<Arc<dyn PageDriver>>;
}
