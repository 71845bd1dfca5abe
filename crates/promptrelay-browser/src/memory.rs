//! In-memory browser host.
//!
//! Pages are a map from selector to matching elements; no CSS is evaluated,
//! a selector matches exactly the elements inserted under it. Simulated
//! pages answer a submitted prompt by appending a reply to the site's reply
//! regions, which is enough to drive the whole inject → monitor → capture
//! cycle without Chromium.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use promptrelay_core::{Error, Platform, Result};
use promptrelay_protocol::TabId;
use tokio::sync::Notify;
use tracing::debug;

use crate::host::{BrowserHost, FillStyle, PageDriver, TabInfo};
use crate::sites::adapter_for;

/// One element matched by a selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryElement {
    pub text: String,
    pub label: String,
    pub disabled: bool,
}

impl MemoryElement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

struct Responder {
    label: &'static str,
    regions: Vec<&'static str>,
}

struct PageState {
    url: String,
    elements: HashMap<String, Vec<MemoryElement>>,
    fills: Vec<(String, String)>,
    clicks: Vec<String>,
    key_presses: Vec<String>,
    failure: Option<String>,
    responder: Option<Responder>,
}

/// A page whose DOM is a selector → elements map.
pub struct MemoryPage {
    state: Mutex<PageState>,
    is_closed: AtomicBool,
    closed_notify: Notify,
}

impl MemoryPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(PageState {
                url: url.into(),
                elements: HashMap::new(),
                fills: Vec::new(),
                clicks: Vec::new(),
                key_presses: Vec::new(),
                failure: None,
                responder: None,
            }),
            is_closed: AtomicBool::new(false),
            closed_notify: Notify::new(),
        }
    }

    /// A page laid out like `platform`'s chat UI that replies to every
    /// submitted prompt.
    pub fn simulated(platform: Platform) -> Self {
        let url = platform.base_url();
        let adapter = adapter_for(platform);
        let table = adapter.table(url);
        let page = Self::new(url);

        page.insert(table.input[0], MemoryElement::new(""));
        if let Some(send) = table.send.first() {
            page.insert(send, MemoryElement::new("").labelled("Send"));
        }
        let mut regions = vec![table.response[0]];
        if let Some(ready) = table.ready.first() {
            if *ready != table.response[0] {
                regions.push(*ready);
            }
        }
        page.state.lock().responder = Some(Responder {
            label: adapter.label(),
            regions,
        });
        page
    }

    /// Append an element under `selector`.
    pub fn insert(&self, selector: &str, element: MemoryElement) {
        self.state
            .lock()
            .elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
    }

    pub fn remove(&self, selector: &str) {
        self.state.lock().elements.remove(selector);
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.state.lock().url = url.into();
    }

    /// Make every following operation fail with a transport error.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().failure = Some(message.into());
    }

    /// Undo [`fail_with`](Self::fail_with).
    pub fn recover(&self) {
        self.state.lock().failure = None;
    }

    pub fn close(&self) {
        self.is_closed.store(true, Ordering::SeqCst);
        self.closed_notify.notify_waiters();
    }

    /// `(selector, text)` of every successful fill.
    pub fn fills(&self) -> Vec<(String, String)> {
        self.state.lock().fills.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn key_presses(&self) -> Vec<String> {
        self.state.lock().key_presses.clone()
    }

    fn check(&self) -> Result<()> {
        if self.is_closed.load(Ordering::SeqCst) {
            return Err(Error::Transport("Page closed".into()));
        }
        match &self.state.lock().failure {
            Some(message) => Err(Error::Transport(message.clone())),
            None => Ok(()),
        }
    }

    fn respond(state: &mut PageState) {
        let Some(responder) = &state.responder else {
            return;
        };
        let Some((_, prompt)) = state.fills.last() else {
            return;
        };
        let reply = format!("Simulated {} reply to: {}", responder.label, prompt);
        debug!("Simulated page replying on {}", state.url);
        for region in responder.regions.clone() {
            state
                .elements
                .entry(region.to_string())
                .or_default()
                .push(MemoryElement::new(reply.clone()));
        }
    }
}

#[async_trait]
impl PageDriver for MemoryPage {
    async fn location(&self) -> Result<String> {
        self.check()?;
        Ok(self.state.lock().url.clone())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .elements
            .get(selector)
            .is_some_and(|els| !els.is_empty()))
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .elements
            .get(selector)
            .map(|els| els.iter().map(|e| e.text.clone()).collect())
            .unwrap_or_default())
    }

    async fn fill(&self, selector: &str, text: &str, _style: FillStyle) -> Result<bool> {
        self.check()?;
        let mut state = self.state.lock();
        let Some(element) = state.elements.get_mut(selector).and_then(|els| els.first_mut()) else {
            return Ok(false);
        };
        element.text = text.to_string();
        state.fills.push((selector.to_string(), text.to_string()));
        Ok(true)
    }

    async fn click(&self, selector: &str, skip_label: Option<&str>) -> Result<bool> {
        self.check()?;
        let mut state = self.state.lock();
        let skip = skip_label.map(|s| s.to_lowercase());
        let usable = state.elements.get(selector).is_some_and(|els| {
            els.iter().any(|e| {
                !e.disabled
                    && skip
                        .as_deref()
                        .map_or(true, |s| !e.label.to_lowercase().contains(s))
            })
        });
        if !usable {
            return Ok(false);
        }
        state.clicks.push(selector.to_string());
        Self::respond(&mut state);
        Ok(true)
    }

    async fn press_enter(&self, selector: &str) -> Result<bool> {
        self.check()?;
        let mut state = self.state.lock();
        if !state.elements.contains_key(selector) {
            return Ok(false);
        }
        state.key_presses.push(selector.to_string());
        Self::respond(&mut state);
        Ok(true)
    }

    async fn closed(&self) {
        loop {
            let notified = self.closed_notify.notified();
            if self.is_closed.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

struct MemoryTab {
    info: TabInfo,
    page: Arc<MemoryPage>,
    attach_error: Option<String>,
    attaches: usize,
}

/// Browser host holding [`MemoryPage`] tabs.
#[derive(Default)]
pub struct MemoryHost {
    tabs: Mutex<Vec<MemoryTab>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// One simulated tab per supported platform plus an unrelated tab.
    pub fn demo() -> Self {
        let host = Self::new();
        for platform in Platform::all() {
            host.open_simulated(*platform);
        }
        host.open_tab("https://example.com/", "Example Domain");
        host
    }

    pub fn open_tab(&self, url: &str, title: &str) -> (TabId, Arc<MemoryPage>) {
        self.add(url, title, Arc::new(MemoryPage::new(url)))
    }

    pub fn open_simulated(&self, platform: Platform) -> (TabId, Arc<MemoryPage>) {
        let title = format!("{} (simulated)", adapter_for(platform).label());
        self.add(
            platform.base_url(),
            &title,
            Arc::new(MemoryPage::simulated(platform)),
        )
    }

    fn add(&self, url: &str, title: &str, page: Arc<MemoryPage>) -> (TabId, Arc<MemoryPage>) {
        let id = uuid::Uuid::new_v4().to_string();
        self.tabs.lock().push(MemoryTab {
            info: TabInfo {
                id: id.clone(),
                url: url.to_string(),
                title: title.to_string(),
            },
            page: page.clone(),
            attach_error: None,
            attaches: 0,
        });
        (id, page)
    }

    /// Make attaching to `tab_id` fail with `message`.
    pub fn refuse_attach(&self, tab_id: &str, message: impl Into<String>) {
        if let Some(tab) = self.tabs.lock().iter_mut().find(|t| t.info.id == tab_id) {
            tab.attach_error = Some(message.into());
        }
    }

    /// Point the tab, and its open page, at `url`. The page keeps its
    /// elements and its session, as a DevTools session survives navigation.
    pub fn navigate(&self, tab_id: &str, url: &str) {
        if let Some(tab) = self.tabs.lock().iter_mut().find(|t| t.info.id == tab_id) {
            tab.info.url = url.to_string();
            tab.page.set_url(url);
        }
    }

    /// Remove the tab and close its page.
    pub fn close_tab(&self, tab_id: &str) {
        let mut tabs = self.tabs.lock();
        if let Some(pos) = tabs.iter().position(|t| t.info.id == tab_id) {
            let tab = tabs.remove(pos);
            tab.page.close();
        }
    }

    /// How many times a session was opened on `tab_id`.
    pub fn attach_count(&self, tab_id: &str) -> usize {
        self.tabs
            .lock()
            .iter()
            .find(|t| t.info.id == tab_id)
            .map_or(0, |t| t.attaches)
    }
}

#[async_trait]
impl BrowserHost for MemoryHost {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        Ok(self.tabs.lock().iter().map(|t| t.info.clone()).collect())
    }

    async fn attach(&self, tab: &TabInfo) -> Result<Arc<dyn PageDriver>> {
        let mut tabs = self.tabs.lock();
        let entry = tabs
            .iter_mut()
            .find(|t| t.info.id == tab.id)
            .ok_or_else(|| Error::Transport(format!("Tab {} is gone", tab.id)))?;
        if let Some(message) = &entry.attach_error {
            return Err(Error::Transport(message.clone()));
        }
        entry.attaches += 1;
        Ok(entry.page.clone())
    }
}
