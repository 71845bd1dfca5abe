//! Chrome DevTools Protocol host: tab discovery over HTTP, page sessions
//! over WebSocket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use promptrelay_core::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::host::{BrowserHost, FillStyle, PageDriver, TabInfo};
use crate::scripts;

/// Entry of `GET /json/list`.
#[derive(Debug, Clone, Deserialize)]
struct DevtoolsTarget {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    ws_url: Option<String>,
}

/// Browser host backed by a Chromium started with `--remote-debugging-port`.
pub struct CdpHost {
    endpoint: String,
    client: reqwest::Client,
}

impl CdpHost {
    /// `endpoint` is the DevTools HTTP base, e.g. `http://127.0.0.1:9222`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn targets(&self) -> Result<Vec<DevtoolsTarget>> {
        let url = format!("{}/json/list", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(Error::Http(format!("{} returned {}", url, response.status())));
        }
        response
            .json::<Vec<DevtoolsTarget>>()
            .await
            .map_err(|e| Error::Http(format!("Invalid target list: {}", e)))
    }
}

#[async_trait]
impl BrowserHost for CdpHost {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>> {
        Ok(self
            .targets()
            .await?
            .into_iter()
            .filter(|t| t.kind == "page")
            .map(|t| TabInfo {
                id: t.id,
                url: t.url,
                title: t.title,
            })
            .collect())
    }

    async fn attach(&self, tab: &TabInfo) -> Result<Arc<dyn PageDriver>> {
        let target = self
            .targets()
            .await?
            .into_iter()
            .find(|t| t.id == tab.id)
            .ok_or_else(|| Error::Transport(format!("Tab {} is gone", tab.id)))?;
        let ws_url = target.ws_url.ok_or_else(|| {
            Error::Transport(format!(
                "Tab {} has no debugger URL (another client attached?)",
                tab.id
            ))
        })?;
        let page = CdpPage::connect(&ws_url).await?;
        info!("Attached to tab {} ({})", tab.id, tab.url);
        Ok(Arc::new(page))
    }
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

/// One DevTools WebSocket session on a page target.
///
/// Commands are correlated with their responses through the JSON-RPC `id`;
/// events are ignored.
pub struct CdpPage {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Pending,
    next_id: AtomicU64,
    is_closed: Arc<AtomicBool>,
    closed_notify: Arc<Notify>,
}

impl CdpPage {
    pub async fn connect(ws_url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| Error::Transport(format!("WebSocket connect failed: {}", e)))?;
        let (mut sink, mut source) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    debug!("CDP write failed: {}", e);
                    break;
                }
            }
            // Session dropped: close the socket so the reader task ends too.
            let _ = sink.close().await;
        });

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let is_closed = Arc::new(AtomicBool::new(false));
        let closed_notify = Arc::new(Notify::new());

        {
            let pending = pending.clone();
            let is_closed = is_closed.clone();
            let closed_notify = closed_notify.clone();
            tokio::spawn(async move {
                while let Some(frame) = source.next().await {
                    match frame {
                        Ok(Message::Text(text)) => dispatch(&pending, &text),
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            debug!("CDP read failed: {}", e);
                            break;
                        }
                    }
                }
                is_closed.store(true, Ordering::SeqCst);
                for (_, waiter) in pending.lock().drain() {
                    let _ = waiter.send(Err(Error::Transport("Page closed".into())));
                }
                closed_notify.notify_waiters();
            });
        }

        Ok(Self {
            outgoing,
            pending,
            next_id: AtomicU64::new(1),
            is_closed,
            closed_notify,
        })
    }

    /// Send one CDP command and wait for its result.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        if self.is_closed.load(Ordering::SeqCst) {
            return Err(Error::Transport("Page closed".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let frame = json!({ "id": id, "method": method, "params": params });
        if self.outgoing.send(Message::Text(frame.to_string())).is_err() {
            self.pending.lock().remove(&id);
            return Err(Error::Transport("Page connection is gone".into()));
        }

        rx.await
            .map_err(|_| Error::Transport(format!("No reply to {}", method)))?
    }

    /// Evaluate `expression` and return its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let msg = exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .or_else(|| exception.get("text"))
                .and_then(|v| v.as_str())
                .unwrap_or("JavaScript exception");
            return Err(Error::Cdp(msg.to_string()));
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn evaluate_bool(&self, expression: &str) -> Result<bool> {
        Ok(self.evaluate(expression).await?.as_bool().unwrap_or(false))
    }

    async fn key_event(&self, kind: &str) -> Result<()> {
        let mut params = json!({
            "type": kind,
            "key": "Enter",
            "code": "Enter",
            "windowsVirtualKeyCode": 13,
            "nativeVirtualKeyCode": 13,
        });
        if kind == "keyDown" {
            params["text"] = json!("\r");
        }
        self.call("Input.dispatchKeyEvent", params).await.map(|_| ())
    }
}

fn dispatch(pending: &Pending, text: &str) {
    let frame: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!("Unparseable CDP frame: {}", e);
            return;
        }
    };
    let Some(id) = frame.get("id").and_then(|v| v.as_u64()) else {
        return;
    };
    let Some(waiter) = pending.lock().remove(&id) else {
        return;
    };
    let outcome = match frame.get("error") {
        Some(error) => Err(Error::Cdp(
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown CDP error")
                .to_string(),
        )),
        None => Ok(frame.get("result").cloned().unwrap_or(Value::Null)),
    };
    let _ = waiter.send(outcome);
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn location(&self) -> Result<String> {
        Ok(self
            .evaluate(&scripts::location())
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.evaluate_bool(&scripts::exists(selector)).await
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let value = self.evaluate(&scripts::texts(selector)).await?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    async fn fill(&self, selector: &str, text: &str, style: FillStyle) -> Result<bool> {
        self.evaluate_bool(&scripts::fill(selector, text, style)).await
    }

    async fn click(&self, selector: &str, skip_label: Option<&str>) -> Result<bool> {
        self.evaluate_bool(&scripts::click(selector, skip_label)).await
    }

    async fn press_enter(&self, selector: &str) -> Result<bool> {
        if !self.evaluate_bool(&scripts::focus(selector)).await? {
            return Ok(false);
        }
        self.key_event("keyDown").await?;
        self.key_event("keyUp").await?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_routes_result_by_id() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (tx, mut rx) = oneshot::channel();
        pending.lock().insert(7, tx);

        dispatch(&pending, r#"{"method": "Page.loadEventFired", "params": {}}"#);
        assert!(rx.try_recv().is_err());

        dispatch(&pending, r#"{"id": 7, "result": {"result": {"value": true}}}"#);
        let value = rx.try_recv().unwrap().unwrap();
        assert_eq!(value["result"]["value"], true);
        assert!(pending.lock().is_empty());
    }

    #[test]
    fn test_dispatch_surfaces_protocol_errors() {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (tx, mut rx) = oneshot::channel();
        pending.lock().insert(1, tx);
        dispatch(
            &pending,
            r#"{"id": 1, "error": {"code": -32000, "message": "Cannot find context"}}"#,
        );
        match rx.try_recv().unwrap() {
            Err(Error::Cdp(msg)) => assert_eq!(msg, "Cannot find context"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_target_list_parsing() {
        let targets: Vec<DevtoolsTarget> = serde_json::from_str(
            r#"[
                {"id": "A", "type": "page", "title": "ChatGPT", "url": "https://chatgpt.com/",
                 "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/A"},
                {"id": "B", "type": "service_worker", "url": "chrome-extension://x/sw.js"}
            ]"#,
        )
        .unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].ws_url.as_deref(), Some("ws://127.0.0.1:9222/devtools/page/A"));
        assert_eq!(targets[1].kind, "service_worker");
        assert!(targets[1].ws_url.is_none());
        assert_eq!(targets[1].title, "");
    }
}
