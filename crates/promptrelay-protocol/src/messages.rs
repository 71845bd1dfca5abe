//! Coordinator ⇄ page agent messages and the external command surface.

use promptrelay_core::Platform;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::types::*;

/// Uniform result shape on every context boundary: `{success, ...}` on
/// success, `{success: false, error}` on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
        }
    }

    /// Collapse back into a `Result`, keeping the error text.
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.payload) {
            (true, Some(payload)) => Ok(payload),
            (_, _) => Err(self.error.unwrap_or_else(|| "unknown error".to_string())),
        }
    }
}

impl<T> From<promptrelay_core::Result<T>> for Envelope<T> {
    fn from(result: promptrelay_core::Result<T>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------
// Coordinator → agent
// ---------------------------------------------------------------

/// Operations a page agent exposes to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentRequest {
    Ping,
    InjectPrompt { prompt: String, auto_send: bool },
    GetResponse,
    GetStatus,
}

impl AgentRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::InjectPrompt { .. } => "injectPrompt",
            Self::GetResponse => "getResponse",
            Self::GetStatus => "getStatus",
        }
    }
}

/// Successful agent replies, one variant per request kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentPayload {
    Pong { platform: Option<Platform> },
    Injected,
    Response { text: String },
    Status { status: AgentStatus },
}

pub type AgentReply = Envelope<AgentPayload>;

/// A request paired with its reply slot. The oneshot sender makes the
/// one-request/at-most-one-reply contract structural.
#[derive(Debug)]
pub struct AgentCall {
    pub request: AgentRequest,
    pub reply: oneshot::Sender<AgentReply>,
}

impl AgentCall {
    pub fn new(request: AgentRequest) -> (Self, oneshot::Receiver<AgentReply>) {
        let (tx, rx) = oneshot::channel();
        (Self { request, reply: tx }, rx)
    }
}

// ---------------------------------------------------------------
// Agent → coordinator
// ---------------------------------------------------------------

/// Unsolicited events pushed by page agents.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Agent attached and identified its page.
    TabReady {
        platform: Option<Platform>,
        url: String,
    },
    InjectionComplete {
        platform: Option<Platform>,
        success: bool,
        error: Option<String>,
    },
    StatusUpdate {
        platform: Option<Platform>,
        status: AgentStatus,
        message: String,
        timestamp: String,
    },
    /// The page transport went away; the agent has stopped.
    TabClosed,
}

impl AgentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TabReady { .. } => "tabReady",
            Self::InjectionComplete { .. } => "injectionComplete",
            Self::StatusUpdate { .. } => "statusUpdate",
            Self::TabClosed => "tabClosed",
        }
    }
}

/// An event tagged with its sending tab and agent. When `ack` is set the
/// coordinator answers on it once the event is recorded.
#[derive(Debug)]
pub struct AgentMessage {
    pub tab_id: TabId,
    pub agent_id: AgentId,
    pub event: AgentEvent,
    pub ack: Option<oneshot::Sender<()>>,
}

// ---------------------------------------------------------------
// External caller → coordinator
// ---------------------------------------------------------------

/// Commands accepted from the companion application.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ExternalCommand {
    InjectPrompt(InjectionRequest),
    CheckConnection,
    CollectResponses(TargetedRequest),
    GetStatuses(TargetedRequest),
}

impl ExternalCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InjectPrompt(_) => "injectPrompt",
            Self::CheckConnection => "checkConnection",
            Self::CollectResponses(_) => "collectResponses",
            Self::GetStatuses(_) => "getStatuses",
        }
    }
}

/// Success payload of an external command, keyed the way the companion
/// application reads it.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandPayload {
    Tabs { tabs: Vec<TabRecord> },
    Results { results: Vec<InjectResult> },
    Responses { responses: Vec<ResponseCapture> },
    Statuses { statuses: Vec<StatusRecord> },
}

pub type CommandReply = Envelope<CommandPayload>;

#[cfg(test)]
mod tests {
    use super::*;
    use promptrelay_core::Error;

    #[test]
    fn test_envelope_success_flattens_payload() {
        let reply: CommandReply = Envelope::ok(CommandPayload::Tabs { tabs: vec![] });
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "tabs": []}));
    }

    #[test]
    fn test_envelope_failure_shape() {
        let reply: CommandReply = Envelope::from(Err::<CommandPayload, _>(Error::Transport(
            "browser unreachable".into(),
        )));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Transport error: browser unreachable");
        assert!(json.get("tabs").is_none());
    }

    #[test]
    fn test_envelope_into_result() {
        let ok: AgentReply = Envelope::ok(AgentPayload::Injected);
        assert_eq!(ok.into_result(), Ok(AgentPayload::Injected));
        let err: AgentReply = Envelope::err("Claude editor not found");
        assert_eq!(err.into_result(), Err("Claude editor not found".to_string()));
    }

    #[test]
    fn test_external_command_parsing() {
        let cmd: ExternalCommand = serde_json::from_str(
            r#"{"action": "injectPrompt", "prompt": "Hello", "targets": ["chatgpt"], "autoSend": true}"#,
        )
        .unwrap();
        match cmd {
            ExternalCommand::InjectPrompt(req) => {
                assert_eq!(req.prompt, "Hello");
                assert!(req.targets.includes(Platform::ChatGPT));
                assert!(!req.targets.includes(Platform::Claude));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cmd: ExternalCommand =
            serde_json::from_str(r#"{"action": "checkConnection"}"#).unwrap();
        assert_eq!(cmd.name(), "checkConnection");

        let cmd: ExternalCommand =
            serde_json::from_str(r#"{"action": "getStatuses"}"#).unwrap();
        match cmd {
            ExternalCommand::GetStatuses(req) => assert_eq!(req.targets, Targets::All),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(serde_json::from_str::<ExternalCommand>(r#"{"action": "reboot"}"#).is_err());
    }

    #[tokio::test]
    async fn test_agent_call_single_reply() {
        let (call, rx) = AgentCall::new(AgentRequest::Ping);
        call.reply
            .send(Envelope::ok(AgentPayload::Pong {
                platform: Some(Platform::Grok),
            }))
            .unwrap();
        let reply = rx.await.unwrap();
        assert_eq!(
            reply.into_result(),
            Ok(AgentPayload::Pong {
                platform: Some(Platform::Grok)
            })
        );
    }
}
