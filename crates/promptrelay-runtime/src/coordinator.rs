//! Coordinator: tab registry, command fan-out, status aggregation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use promptrelay_browser::{AgentHandle, BrowserHost, PageAgent, TabInfo};
use promptrelay_core::{AgentSettings, Error, Platform, Result};
use promptrelay_protocol::*;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Owns every page agent and the registries built from their events.
///
/// Registries are plain maps behind `RwLock`s; no guard is held across an
/// await. Agents push events into one channel consumed by the task started
/// with [`Coordinator::spawn_event_loop`].
pub struct Coordinator {
    host: Arc<dyn BrowserHost>,
    settings: AgentSettings,
    tabs: RwLock<HashMap<TabId, TabRecord>>,
    statuses: RwLock<HashMap<TabId, StatusRecord>>,
    agents: RwLock<HashMap<TabId, AgentHandle>>,
    events_tx: mpsc::UnboundedSender<AgentMessage>,
    events_rx: Mutex<Option<mpsc::UnboundedReceiver<AgentMessage>>>,
}

impl Coordinator {
    pub fn new(host: Arc<dyn BrowserHost>, settings: AgentSettings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            host,
            settings,
            tabs: RwLock::new(HashMap::new()),
            statuses: RwLock::new(HashMap::new()),
            agents: RwLock::new(HashMap::new()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Start consuming agent events. Only the first call starts a loop;
    /// the loop ends once the coordinator is dropped.
    pub fn spawn_event_loop(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut rx = self.events_rx.lock().take()?;
        let weak: Weak<Self> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let Some(coordinator) = weak.upgrade() else {
                    break;
                };
                coordinator.handle_event(message);
            }
            debug!("Agent event loop stopped");
        }))
    }

    // ---------------------------------------------------------------
    // External commands
    // ---------------------------------------------------------------

    /// Run one external command and wrap the outcome in an envelope.
    pub async fn execute(&self, command: ExternalCommand) -> CommandReply {
        let name = command.name();
        info!("Command: {}", name);
        let result = match command {
            ExternalCommand::CheckConnection => self
                .check_connection()
                .await
                .map(|tabs| CommandPayload::Tabs { tabs }),
            ExternalCommand::InjectPrompt(request) => self
                .inject_prompt(&request)
                .await
                .map(|results| CommandPayload::Results { results }),
            ExternalCommand::CollectResponses(request) => self
                .collect_responses(&request.targets)
                .await
                .map(|responses| CommandPayload::Responses { responses }),
            ExternalCommand::GetStatuses(request) => self
                .get_statuses(&request.targets)
                .await
                .map(|statuses| CommandPayload::Statuses { statuses }),
        };
        if let Err(e) = &result {
            error!("Command {} failed: {}", name, e);
        }
        Envelope::from(result)
    }

    /// Scan the browser's tabs, make sure each supported one has a live
    /// agent, and return the refreshed inventory.
    ///
    /// A tab whose agent cannot be reached is reported with status `error`
    /// instead of failing the scan. Tabs that disappeared since the last
    /// scan are forgotten.
    pub async fn check_connection(&self) -> Result<Vec<TabRecord>> {
        let listed = self.host.list_tabs().await?;
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for tab in listed {
            let Some(detected) = Platform::from_url(&tab.url) else {
                continue;
            };
            seen.insert(tab.id.clone());

            let record = match self.ensure_agent(&tab).await {
                Ok(reported) => TabRecord {
                    tab_id: tab.id.clone(),
                    url: tab.url.clone(),
                    title: tab.title.clone(),
                    platform: reported.unwrap_or(detected),
                    status: TabStatus::Ready,
                    error: None,
                },
                Err(e) => {
                    warn!("Tab {} ({}) unreachable: {}", tab.id, tab.url, e);
                    TabRecord {
                        tab_id: tab.id.clone(),
                        url: tab.url.clone(),
                        title: tab.title.clone(),
                        platform: detected,
                        status: TabStatus::Error,
                        error: Some(e.to_string()),
                    }
                }
            };
            self.tabs.write().insert(tab.id.clone(), record.clone());
            records.push(record);
        }

        self.evict_unseen(&seen);
        debug!("Scan found {} supported tabs", records.len());
        Ok(records)
    }

    /// Send a prompt to every ready tab in `targets`, concurrently.
    pub async fn inject_prompt(&self, request: &InjectionRequest) -> Result<Vec<InjectResult>> {
        let selected = self.select(&request.targets).await?;
        info!(
            "Injecting prompt into {} tabs (autoSend={})",
            selected.len(),
            request.auto_send
        );

        let calls = selected.into_iter().map(|(tab, agent)| async move {
            let outcome = agent
                .call(AgentRequest::InjectPrompt {
                    prompt: request.prompt.clone(),
                    auto_send: request.auto_send,
                })
                .await;
            InjectResult {
                tab_id: tab.tab_id,
                platform: tab.platform,
                success: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
            }
        });
        Ok(join_all(calls).await)
    }

    /// Capture the latest reply of every ready tab in `targets`.
    pub async fn collect_responses(&self, targets: &Targets) -> Result<Vec<ResponseCapture>> {
        let selected = self.select(targets).await?;

        let calls = selected.into_iter().map(|(tab, agent)| async move {
            let outcome = match agent.call(AgentRequest::GetResponse).await {
                Ok(AgentPayload::Response { text }) => Ok(text),
                Ok(other) => Err(unexpected_reply("getResponse", &other)),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(text) => ResponseCapture {
                    tab_id: tab.tab_id,
                    platform: tab.platform,
                    title: tab.title,
                    text: Some(text),
                    success: true,
                    error: None,
                },
                Err(e) => ResponseCapture {
                    tab_id: tab.tab_id,
                    platform: tab.platform,
                    title: tab.title,
                    text: None,
                    success: false,
                    error: Some(e.to_string()),
                },
            }
        });
        Ok(join_all(calls).await)
    }

    /// Status of every ready tab in `targets`: the last pushed record when
    /// there is one, otherwise whatever the agent answers right now.
    pub async fn get_statuses(&self, targets: &Targets) -> Result<Vec<StatusRecord>> {
        let selected = self.select(targets).await?;

        let calls = selected.into_iter().map(|(tab, agent)| async move {
            let pushed = self.statuses.read().get(&tab.tab_id).cloned();
            match pushed {
                Some(record) => record,
                None => queried_status(&tab, agent.call(AgentRequest::GetStatus).await),
            }
        });
        Ok(join_all(calls).await)
    }

    // ---------------------------------------------------------------
    // Agent events
    // ---------------------------------------------------------------

    /// Apply one agent event to the registries and acknowledge it.
    ///
    /// Events from an agent that has since been replaced on its tab are
    /// dropped, so a late `tabClosed` cannot evict the live successor.
    pub fn handle_event(&self, message: AgentMessage) {
        let AgentMessage {
            tab_id,
            agent_id,
            event,
            ack,
        } = message;
        debug!("Event {} from tab {} (agent {})", event.name(), tab_id, agent_id);

        if self.is_superseded(&tab_id, agent_id) {
            debug!(
                "Dropping {} from replaced agent {} of tab {}",
                event.name(),
                agent_id,
                tab_id
            );
        } else {
            self.apply(tab_id, event);
        }

        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    fn apply(&self, tab_id: TabId, event: AgentEvent) {
        match event {
            AgentEvent::TabReady { platform, url } => {
                let mut tabs = self.tabs.write();
                let known = tabs.get(&tab_id);
                let platform = platform
                    .or_else(|| known.map(|t| t.platform))
                    .or_else(|| Platform::from_url(&url));
                let title = known.map(|t| t.title.clone()).unwrap_or_default();
                if let Some(platform) = platform {
                    tabs.insert(
                        tab_id.clone(),
                        TabRecord {
                            tab_id: tab_id.clone(),
                            url,
                            title,
                            platform,
                            status: TabStatus::Ready,
                            error: None,
                        },
                    );
                }
            }
            AgentEvent::InjectionComplete {
                platform,
                success,
                error,
            } => {
                let platform = platform.map_or("unknown", |p| p.name());
                if success {
                    info!("Injection complete on tab {} ({})", tab_id, platform);
                } else {
                    warn!(
                        "Injection failed on tab {} ({}): {}",
                        tab_id,
                        platform,
                        error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            AgentEvent::StatusUpdate {
                platform,
                status,
                message,
                timestamp,
            } => {
                let platform =
                    platform.or_else(|| self.tabs.read().get(&tab_id).map(|t| t.platform));
                match platform {
                    Some(platform) => {
                        debug!("Tab {} is {}: {}", tab_id, status, message);
                        self.statuses.write().insert(
                            tab_id.clone(),
                            StatusRecord {
                                tab_id: tab_id.clone(),
                                platform,
                                status,
                                message,
                                timestamp,
                            },
                        );
                    }
                    None => debug!("Ignoring status of unsupported tab {}", tab_id),
                }
            }
            AgentEvent::TabClosed => self.evict(&tab_id),
        }
    }

    /// True when another agent than `agent_id` is registered for the tab.
    fn is_superseded(&self, tab_id: &str, agent_id: AgentId) -> bool {
        self.agents
            .read()
            .get(tab_id)
            .is_some_and(|agent| agent.agent_id() != agent_id)
    }

    // ---------------------------------------------------------------
    // Registry access
    // ---------------------------------------------------------------

    /// Inventory as of the last scan or event, ordered by tab id.
    pub fn tabs(&self) -> Vec<TabRecord> {
        let mut tabs: Vec<TabRecord> = self.tabs.read().values().cloned().collect();
        tabs.sort_by(|a, b| a.tab_id.cmp(&b.tab_id));
        tabs
    }

    /// Last status pushed by the tab's agent.
    pub fn status_of(&self, tab_id: &str) -> Option<StatusRecord> {
        self.statuses.read().get(tab_id).cloned()
    }

    async fn ensure_agent(&self, tab: &TabInfo) -> Result<Option<Platform>> {
        let existing = self.agents.read().get(&tab.id).cloned();
        if let Some(agent) = existing {
            match agent.call(AgentRequest::Ping).await {
                Ok(AgentPayload::Pong { platform }) => return Ok(platform),
                Ok(other) => warn!("{}", unexpected_reply("ping", &other)),
                Err(e) => debug!("Agent for tab {} did not answer: {}", tab.id, e),
            }
            self.agents.write().remove(&tab.id);
        }

        let page = self.host.attach(tab).await?;
        let agent = PageAgent::spawn(
            tab.id.clone(),
            page,
            self.settings.clone(),
            self.events_tx.clone(),
        )
        .await?;
        let platform = match agent.call(AgentRequest::Ping).await {
            Ok(AgentPayload::Pong { platform }) => platform,
            _ => None,
        };
        self.agents.write().insert(tab.id.clone(), agent);
        Ok(platform)
    }

    /// Scan, then keep the ready tabs addressed by `targets`.
    async fn select(&self, targets: &Targets) -> Result<Vec<(TabRecord, AgentHandle)>> {
        let tabs = self.check_connection().await?;
        let agents = self.agents.read();
        Ok(tabs
            .into_iter()
            .filter(|t| t.is_ready() && targets.includes(t.platform))
            .filter_map(|t| agents.get(&t.tab_id).cloned().map(|agent| (t, agent)))
            .collect())
    }

    fn evict(&self, tab_id: &str) {
        let known = self.tabs.write().remove(tab_id).is_some();
        self.statuses.write().remove(tab_id);
        self.agents.write().remove(tab_id);
        if known {
            info!("Tab {} removed", tab_id);
        }
    }

    fn evict_unseen(&self, seen: &HashSet<TabId>) {
        let gone: Vec<TabId> = self
            .tabs
            .read()
            .keys()
            .chain(self.agents.read().keys())
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for tab_id in gone {
            self.evict(&tab_id);
        }
    }
}

fn unexpected_reply(request: &str, payload: &AgentPayload) -> Error {
    Error::Agent(format!("Unexpected reply to {}: {:?}", request, payload))
}

/// Status record for a tab without a pushed one, from a live `getStatus`.
fn queried_status(tab: &TabRecord, reply: Result<AgentPayload>) -> StatusRecord {
    let (status, message) = match reply {
        Ok(AgentPayload::Status { status }) => (status, String::new()),
        Ok(other) => (
            AgentStatus::Unknown,
            unexpected_reply("getStatus", &other).to_string(),
        ),
        Err(e) => (AgentStatus::Unknown, e.to_string()),
    };
    StatusRecord {
        tab_id: tab.tab_id.clone(),
        platform: tab.platform,
        status,
        message,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptrelay_browser::{MemoryElement, MemoryHost};
    use std::time::Duration;

    fn coordinator(host: &Arc<MemoryHost>) -> Arc<Coordinator> {
        let settings = AgentSettings {
            input_attempts: 2,
            ..Default::default()
        };
        let coordinator = Arc::new(Coordinator::new(host.clone(), settings));
        coordinator.spawn_event_loop();
        coordinator
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_skips_unsupported_and_reuses_agents() {
        let host = Arc::new(MemoryHost::new());
        let (chatgpt, _) = host.open_simulated(Platform::ChatGPT);
        host.open_tab("https://example.com/", "Example");
        let coordinator = coordinator(&host);

        let tabs = coordinator.check_connection().await.unwrap();
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].tab_id, chatgpt);
        assert_eq!(tabs[0].platform, Platform::ChatGPT);
        assert!(tabs[0].is_ready());

        coordinator.check_connection().await.unwrap();
        assert_eq!(host.attach_count(&chatgpt), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_tab_is_reported_not_raised() {
        let host = Arc::new(MemoryHost::new());
        host.open_simulated(Platform::Claude);
        let (grok, _) = host.open_simulated(Platform::Grok);
        host.refuse_attach(&grok, "Cannot access contents of the page");
        let coordinator = coordinator(&host);

        let tabs = coordinator.check_connection().await.unwrap();
        assert_eq!(tabs.len(), 2);
        let grok_tab = tabs.iter().find(|t| t.tab_id == grok).unwrap();
        assert_eq!(grok_tab.status, TabStatus::Error);
        assert_eq!(
            grok_tab.error.as_deref(),
            Some("Transport error: Cannot access contents of the page")
        );
        assert_eq!(tabs.iter().filter(|t| t.is_ready()).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inject_only_reaches_targets() {
        let host = Arc::new(MemoryHost::new());
        let (chatgpt, chatgpt_page) = host.open_simulated(Platform::ChatGPT);
        let (_, claude_page) = host.open_simulated(Platform::Claude);
        let coordinator = coordinator(&host);

        let results = coordinator
            .inject_prompt(&InjectionRequest {
                prompt: "Hello".into(),
                targets: Targets::only([Platform::ChatGPT]),
                auto_send: true,
            })
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![InjectResult {
                tab_id: chatgpt,
                platform: Platform::ChatGPT,
                success: true,
                error: None,
            }]
        );
        assert_eq!(chatgpt_page.fills().len(), 1);
        assert!(claude_page.fills().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inject_failure_is_per_tab() {
        let host = Arc::new(MemoryHost::new());
        host.open_simulated(Platform::Gemini);
        host.open_tab("https://chat.deepseek.com/", "DeepSeek");
        let coordinator = coordinator(&host);

        let mut results = coordinator
            .inject_prompt(&InjectionRequest {
                prompt: "Hi".into(),
                targets: Targets::All,
                auto_send: true,
            })
            .await
            .unwrap();
        results.sort_by_key(|r| r.platform.name());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].platform, Platform::DeepSeek);
        assert!(!results[0].success);
        assert_eq!(
            results[0].error.as_deref(),
            Some("DeepSeek input element not found")
        );
        assert_eq!(results[1].platform, Platform::Gemini);
        assert!(results[1].success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_mixes_successes_and_failures() {
        let host = Arc::new(MemoryHost::new());
        let (_, chatgpt) = host.open_tab("https://chatgpt.com/c/1", "Rust question");
        chatgpt.insert(
            "div[data-message-author-role=\"assistant\"]",
            MemoryElement::new("Ownership is checked at compile time."),
        );
        let (_, gemini) = host.open_tab("https://gemini.google.com/app", "Gemini");
        gemini.insert("div.model-response", MemoryElement::new("Borrowing rules."));
        host.open_tab("https://claude.ai/chat/2", "Claude");
        let coordinator = coordinator(&host);

        let mut responses = coordinator.collect_responses(&Targets::All).await.unwrap();
        responses.sort_by_key(|r| r.platform.name());

        assert_eq!(responses.len(), 3);
        assert_eq!(responses.iter().filter(|r| r.success).count(), 2);
        assert_eq!(responses[0].platform, Platform::ChatGPT);
        assert_eq!(responses[0].title, "Rust question");
        assert_eq!(
            responses[0].text.as_deref(),
            Some("Ownership is checked at compile time.")
        );
        assert_eq!(responses[1].platform, Platform::Claude);
        assert_eq!(
            responses[1].error.as_deref(),
            Some("No Claude response found")
        );
        assert!(responses[1].text.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_statuses_prefer_pushed_records() {
        let host = Arc::new(MemoryHost::new());
        let (chatgpt, _) = host.open_simulated(Platform::ChatGPT);
        let (claude, _) = host.open_simulated(Platform::Claude);
        let coordinator = coordinator(&host);

        coordinator
            .inject_prompt(&InjectionRequest {
                prompt: "Hello".into(),
                targets: Targets::only([Platform::ChatGPT]),
                auto_send: true,
            })
            .await
            .unwrap();
        for _ in 0..50 {
            if coordinator.status_of(&chatgpt).map(|s| s.status) == Some(AgentStatus::Ready) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let statuses = coordinator.get_statuses(&Targets::All).await.unwrap();
        let pushed = statuses.iter().find(|s| s.tab_id == chatgpt).unwrap();
        assert_eq!(pushed.status, AgentStatus::Ready);
        assert_eq!(pushed.message, "Response ready to collect");

        let queried = statuses.iter().find(|s| s.tab_id == claude).unwrap();
        assert_eq!(queried.status, AgentStatus::Idle);
        assert_eq!(queried.message, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_tabs_are_evicted() {
        let host = Arc::new(MemoryHost::new());
        let (chatgpt, _) = host.open_simulated(Platform::ChatGPT);
        let (grok, _) = host.open_simulated(Platform::Grok);
        let coordinator = coordinator(&host);

        coordinator.check_connection().await.unwrap();
        assert_eq!(coordinator.tabs().len(), 2);

        host.close_tab(&grok);
        settle().await;
        let remaining: Vec<_> = coordinator.tabs().into_iter().map(|t| t.tab_id).collect();
        assert_eq!(remaining, vec![chatgpt.clone()]);

        let tabs = coordinator.check_connection().await.unwrap();
        assert_eq!(tabs.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_from_replaced_agent_is_ignored() {
        let host = Arc::new(MemoryHost::new());
        let (grok, _) = host.open_simulated(Platform::Grok);
        let coordinator = coordinator(&host);
        coordinator.check_connection().await.unwrap();

        let live = coordinator.agents.read().get(&grok).unwrap().agent_id();
        let (ack, acked) = tokio::sync::oneshot::channel();
        coordinator.handle_event(AgentMessage {
            tab_id: grok.clone(),
            agent_id: live + 1000,
            event: AgentEvent::TabClosed,
            ack: Some(ack),
        });
        acked.await.unwrap();
        assert_eq!(coordinator.tabs().len(), 1);
        assert!(coordinator.agents.read().contains_key(&grok));

        coordinator.handle_event(AgentMessage {
            tab_id: grok.clone(),
            agent_id: live,
            event: AgentEvent::TabClosed,
            ack: None,
        });
        assert!(coordinator.tabs().is_empty());
        assert!(coordinator.agents.read().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresponsive_agent_is_reattached() {
        let host = Arc::new(MemoryHost::new());
        let (claude, page) = host.open_simulated(Platform::Claude);
        let coordinator = coordinator(&host);
        coordinator.check_connection().await.unwrap();
        let first = coordinator.agents.read().get(&claude).unwrap().agent_id();

        page.fail_with("Receiving end does not exist");
        let tabs = coordinator.check_connection().await.unwrap();
        assert_eq!(tabs[0].status, TabStatus::Error);
        assert_eq!(
            tabs[0].error.as_deref(),
            Some("Transport error: Receiving end does not exist")
        );
        assert_eq!(host.attach_count(&claude), 2);
        assert!(coordinator.agents.read().is_empty());

        page.recover();
        let tabs = coordinator.check_connection().await.unwrap();
        assert!(tabs[0].is_ready());
        assert_eq!(host.attach_count(&claude), 3);
        let second = coordinator.agents.read().get(&claude).unwrap().agent_id();
        assert_ne!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigated_tab_is_routed_by_new_site() {
        let host = Arc::new(MemoryHost::new());
        let (tab, _) = host.open_simulated(Platform::ChatGPT);
        let coordinator = coordinator(&host);
        let tabs = coordinator.check_connection().await.unwrap();
        assert_eq!(tabs[0].platform, Platform::ChatGPT);

        host.navigate(&tab, "https://claude.ai/chat/1");
        let tabs = coordinator.check_connection().await.unwrap();
        assert_eq!(tabs[0].platform, Platform::Claude);
        assert_eq!(host.attach_count(&tab), 1);

        let request = |platform: Platform| InjectionRequest {
            prompt: "Hello".into(),
            targets: Targets::only([platform]),
            auto_send: true,
        };
        let results = coordinator
            .inject_prompt(&request(Platform::ChatGPT))
            .await
            .unwrap();
        assert!(results.is_empty());

        let results = coordinator
            .inject_prompt(&request(Platform::Claude))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].platform, Platform::Claude);
        assert_eq!(results[0].error.as_deref(), Some("Claude editor not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_ready_is_acknowledged() {
        let host: Arc<dyn BrowserHost> = Arc::new(MemoryHost::new());
        let coordinator = Coordinator::new(host, AgentSettings::default());

        let (ack, acked) = tokio::sync::oneshot::channel();
        coordinator.handle_event(AgentMessage {
            tab_id: "t1".into(),
            agent_id: 1,
            event: AgentEvent::TabReady {
                platform: Some(Platform::Grok),
                url: "https://x.com/i/grok".into(),
            },
            ack: Some(ack),
        });
        acked.await.unwrap();

        let tabs = coordinator.tabs();
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].platform, Platform::Grok);
        assert!(tabs[0].is_ready());
    }

    #[test]
    fn test_failed_status_query_is_unknown() {
        let tab = TabRecord {
            tab_id: "t1".into(),
            url: "https://claude.ai/".into(),
            title: "Claude".into(),
            platform: Platform::Claude,
            status: TabStatus::Ready,
            error: None,
        };
        let record = queried_status(&tab, Err(Error::Transport("Page closed".into())));
        assert_eq!(record.status, AgentStatus::Unknown);
        assert_eq!(record.message, "Transport error: Page closed");
        assert_eq!(record.platform, Platform::Claude);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_wraps_payloads() {
        let host = Arc::new(MemoryHost::demo());
        let coordinator = coordinator(&host);

        let reply = coordinator.execute(ExternalCommand::CheckConnection).await;
        assert!(reply.success);
        match reply.payload {
            Some(CommandPayload::Tabs { tabs }) => assert_eq!(tabs.len(), Platform::all().len()),
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
