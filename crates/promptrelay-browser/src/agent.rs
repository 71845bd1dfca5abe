//! Page agent: one actor per attached tab.
//!
//! The agent owns the tab's status (`idle → submitting → processing →
//! ready`, `error` from anywhere), answers coordinator requests, and runs
//! at most one reply monitor at a time. Every status change is pushed to
//! the coordinator as a `statusUpdate` event.
//!
//! The platform is re-derived from the page location on every request, so
//! a tab that navigates to another site is routed by where it is now.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use promptrelay_core::{retry_fixed, AgentSettings, Error, Platform, Result};
use promptrelay_protocol::{
    AgentCall, AgentEvent, AgentId, AgentMessage, AgentPayload, AgentReply, AgentRequest,
    AgentStatus, Envelope, TabId,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::host::PageDriver;
use crate::monitor::{MonitorSlot, MonitorState, Verdict};
use crate::sites::{adapter_for, SiteAdapter};

/// Capacity of the request queue of one agent.
const REQUEST_QUEUE: usize = 32;

static NEXT_AGENT_ID: AtomicU64 = AtomicU64::new(1);

struct StatusState {
    status: AgentStatus,
    message: String,
}

pub struct PageAgent {
    tab_id: TabId,
    agent_id: AgentId,
    page: Arc<dyn PageDriver>,
    /// Platform of the last location read.
    platform: Mutex<Option<Platform>>,
    settings: AgentSettings,
    state: Mutex<StatusState>,
    events: mpsc::UnboundedSender<AgentMessage>,
    monitor: MonitorSlot,
}

/// Coordinator-side handle of a running agent.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    tab_id: TabId,
    agent_id: AgentId,
    tx: mpsc::Sender<AgentCall>,
}

impl AgentHandle {
    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Send `request` and wait for its reply. A failure reported by the
    /// agent comes back as [`Error::Agent`] carrying the agent's message.
    pub async fn call(&self, request: AgentRequest) -> Result<AgentPayload> {
        let name = request.name();
        let (call, reply) = AgentCall::new(request);
        self.tx
            .send(call)
            .await
            .map_err(|_| Error::Transport(format!("Agent for tab {} is gone", self.tab_id)))?;
        let reply = reply.await.map_err(|_| {
            Error::Transport(format!("No reply to {} from tab {}", name, self.tab_id))
        })?;
        reply.into_result().map_err(Error::Agent)
    }

    /// False once the agent's request loop has exited.
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl PageAgent {
    pub(crate) fn new(
        tab_id: TabId,
        page: Arc<dyn PageDriver>,
        platform: Option<Platform>,
        settings: AgentSettings,
        events: mpsc::UnboundedSender<AgentMessage>,
    ) -> Arc<Self> {
        Arc::new(Self {
            tab_id,
            agent_id: NEXT_AGENT_ID.fetch_add(1, Ordering::Relaxed),
            page,
            platform: Mutex::new(platform),
            settings,
            state: Mutex::new(StatusState {
                status: AgentStatus::Idle,
                message: String::new(),
            }),
            events,
            monitor: MonitorSlot::default(),
        })
    }

    /// Identify the page, announce it with `tabReady` and start serving
    /// requests. The agent stops when its page closes (after emitting
    /// `tabClosed`) or when every handle is dropped.
    pub async fn spawn(
        tab_id: TabId,
        page: Arc<dyn PageDriver>,
        settings: AgentSettings,
        events: mpsc::UnboundedSender<AgentMessage>,
    ) -> Result<AgentHandle> {
        let url = page.location().await?;
        let platform = Platform::from_url(&url);
        let agent = Self::new(tab_id.clone(), page, platform, settings, events);
        let agent_id = agent.agent_id;
        info!(
            "Agent {} started for tab {} ({})",
            agent_id,
            tab_id,
            platform.map_or("unsupported", |p| p.name())
        );
        agent.announce(url);

        let (tx, mut rx) = mpsc::channel::<AgentCall>(REQUEST_QUEUE);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    call = rx.recv() => match call {
                        Some(AgentCall { request, reply }) => {
                            let agent = agent.clone();
                            tokio::spawn(async move {
                                let _ = reply.send(agent.handle(request).await);
                            });
                        }
                        None => break,
                    },
                    _ = agent.page.closed() => {
                        info!("Tab {} closed", agent.tab_id);
                        agent.emit(AgentEvent::TabClosed);
                        break;
                    }
                }
            }
            agent.monitor.stop();
            debug!("Agent for tab {} stopped", agent.tab_id);
        });

        Ok(AgentHandle {
            tab_id,
            agent_id,
            tx,
        })
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    fn platform(&self) -> Option<Platform> {
        *self.platform.lock()
    }

    async fn handle(self: Arc<Self>, request: AgentRequest) -> AgentReply {
        debug!("Tab {} handling {}", self.tab_id, request.name());
        let result = match request {
            AgentRequest::Ping => self
                .locate()
                .await
                .map(|(_, platform)| AgentPayload::Pong { platform }),
            AgentRequest::GetStatus => Ok(AgentPayload::Status {
                status: self.status(),
            }),
            AgentRequest::GetResponse => self
                .capture()
                .await
                .map(|text| AgentPayload::Response { text }),
            AgentRequest::InjectPrompt { prompt, auto_send } => self
                .inject(&prompt, auto_send)
                .await
                .map(|_| AgentPayload::Injected),
        };
        Envelope::from(result)
    }

    /// Read the page location and derive the platform from it. When the
    /// platform changed since the last read the tab has navigated: the
    /// running cycle is dropped and the agent starts over from `idle`.
    async fn locate(&self) -> Result<(String, Option<Platform>)> {
        let url = self.page.location().await?;
        let platform = Platform::from_url(&url);
        let previous = std::mem::replace(&mut *self.platform.lock(), platform);
        if previous != platform {
            info!(
                "Tab {} navigated to {}",
                self.tab_id,
                platform.map_or("an unsupported page", |p| p.name())
            );
            self.monitor.stop();
            self.reset();
        }
        Ok((url, platform))
    }

    fn adapter(&self, platform: Option<Platform>) -> Result<&'static dyn SiteAdapter> {
        platform
            .map(adapter_for)
            .ok_or_else(|| Error::UnsupportedPlatform(format!("tab {}", self.tab_id)))
    }

    async fn capture(&self) -> Result<String> {
        let (url, platform) = self.locate().await?;
        let adapter = self.adapter(platform)?;
        adapter.capture_response(self.page.as_ref(), &url).await
    }

    async fn inject(self: &Arc<Self>, prompt: &str, auto_send: bool) -> Result<()> {
        match self.fill_and_submit(prompt, auto_send).await {
            Ok((adapter, url)) => {
                self.emit(AgentEvent::InjectionComplete {
                    platform: Some(adapter.platform()),
                    success: true,
                    error: None,
                });
                if auto_send {
                    self.start_monitoring(adapter, url);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Injection into tab {} failed: {}", self.tab_id, e);
                self.emit(AgentEvent::InjectionComplete {
                    platform: self.platform(),
                    success: false,
                    error: Some(e.to_string()),
                });
                self.set_status(AgentStatus::Error, e.to_string());
                Err(e)
            }
        }
    }

    /// Returns the adapter used and the page location the prompt was
    /// written on.
    async fn fill_and_submit(
        &self,
        prompt: &str,
        auto_send: bool,
    ) -> Result<(&'static dyn SiteAdapter, String)> {
        let (url, platform) = self.locate().await?;
        let adapter = self.adapter(platform)?;
        if auto_send {
            self.monitor.stop();
            self.set_status(
                AgentStatus::Submitting,
                format!("Submitting prompt to {}", adapter.platform()),
            );
        }

        let page = self.page.as_ref();
        let location = url.as_str();
        let not_found = || {
            Error::NotFound(format!("{} {} not found", adapter.label(), adapter.input_name()))
        };

        let input = retry_fixed(self.settings.input_retry(), move |_| {
            adapter.locate_input(page, location)
        })
        .await?
        .ok_or_else(not_found)?;

        let table = adapter.table(location);
        if !page.fill(input, prompt, table.fill).await? {
            return Err(not_found());
        }
        debug!("Filled {} on tab {}", input, self.tab_id);
        tokio::time::sleep(self.settings.settle()).await;

        if auto_send {
            let method = adapter.submit(page, location, input).await?;
            debug!("Submitted on tab {} via {:?}", self.tab_id, method);
        }
        Ok((adapter, url))
    }

    fn start_monitoring(self: &Arc<Self>, adapter: &'static dyn SiteAdapter, url: String) {
        let guard = self.monitor.enter();
        let agent = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            agent.watch_reply(adapter, &url).await;
        });
        self.monitor.replace(handle);
    }

    async fn watch_reply(&self, adapter: &'static dyn SiteAdapter, url: &str) {
        let platform = adapter.platform();
        let mut state = MonitorState::new(&self.settings, platform.throttles_background());
        let page = self.page.as_ref();

        loop {
            tokio::time::sleep(self.settings.monitor_interval()).await;

            let signals = async {
                let busy = adapter.is_busy(page, url).await?;
                let ready = !busy && adapter.is_ready(page, url).await?;
                Ok::<_, Error>((busy, ready))
            };
            let (busy, ready) = match signals.await {
                Ok(signals) => signals,
                Err(e) => {
                    warn!("Monitor on tab {} failed: {}", self.tab_id, e);
                    self.set_status(AgentStatus::Error, format!("Monitoring failed: {}", e));
                    return;
                }
            };

            match state.observe(busy, ready) {
                Verdict::Nothing => {}
                Verdict::Busy => {
                    self.set_status(AgentStatus::Processing, "AI is generating response")
                }
                Verdict::Ready => {
                    self.set_status(AgentStatus::Ready, "Response ready to collect");
                    return;
                }
                Verdict::Stalled => self.set_status(
                    AgentStatus::Error,
                    format!("Tab activation required - please visit the {} tab", platform),
                ),
                Verdict::TimedOut => {
                    self.set_status(AgentStatus::Error, "Response timeout");
                    return;
                }
            }
        }
    }

    /// Move to `next` and push the change. Repeating the current status
    /// with the same message is a no-op.
    fn set_status(&self, next: AgentStatus, message: impl Into<String>) {
        let message = message.into();
        let mut state = self.state.lock();
        if state.status == next && state.message == message {
            return;
        }
        if state.status != next && !state.status.can_transition_to(next) {
            let err = Error::InvalidTransition {
                from: state.status.to_string(),
                to: next.to_string(),
            };
            warn!("Tab {}: {}", self.tab_id, err);
            return;
        }
        state.status = next;
        state.message = message.clone();
        // Sent under the lock so concurrent updates reach the coordinator
        // in the order they were applied.
        self.emit_status(next, message);
    }

    /// Back to a fresh `idle`, the state of an agent on a newly loaded page.
    fn reset(&self) {
        let mut state = self.state.lock();
        if state.status == AgentStatus::Idle && state.message.is_empty() {
            return;
        }
        state.status = AgentStatus::Idle;
        state.message.clear();
        self.emit_status(AgentStatus::Idle, String::new());
    }

    fn emit_status(&self, status: AgentStatus, message: String) {
        self.emit(AgentEvent::StatusUpdate {
            platform: self.platform(),
            status,
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
    }

    fn emit(&self, event: AgentEvent) {
        let name = event.name();
        let message = AgentMessage {
            tab_id: self.tab_id.clone(),
            agent_id: self.agent_id,
            event,
            ack: None,
        };
        if self.events.send(message).is_err() {
            debug!("Coordinator gone, dropped {} from tab {}", name, self.tab_id);
        }
    }

    fn announce(&self, url: String) {
        let (ack, acked) = oneshot::channel();
        let message = AgentMessage {
            tab_id: self.tab_id.clone(),
            agent_id: self.agent_id,
            event: AgentEvent::TabReady {
                platform: self.platform(),
                url,
            },
            ack: Some(ack),
        };
        if self.events.send(message).is_err() {
            warn!("Coordinator gone before tab {} was announced", self.tab_id);
            return;
        }
        let tab_id = self.tab_id.clone();
        tokio::spawn(async move {
            match acked.await {
                Ok(()) => debug!("Tab {} registered", tab_id),
                Err(_) => debug!("tabReady for tab {} was not acknowledged", tab_id),
            }
        });
    }
}
