//! Data model: tab inventory, status snapshots, injection and capture results.

use std::collections::HashSet;

use promptrelay_core::Platform;
use serde::{Deserialize, Serialize};

/// DevTools target id of a browser tab.
pub type TabId = String;

/// Generation of a page agent. A tab that is re-attached gets a new agent
/// with a higher id, so events from its predecessor can be told apart.
pub type AgentId = u64;

/// Reachability of a tab's page agent, as seen by the last scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabStatus {
    Ready,
    NotReady,
    Error,
}

/// One tab of a known platform, refreshed on every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabRecord {
    #[serde(rename = "id")]
    pub tab_id: TabId,
    pub url: String,
    pub title: String,
    pub platform: Platform,
    pub status: TabStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TabRecord {
    pub fn is_ready(&self) -> bool {
        self.status == TabStatus::Ready
    }
}

/// Lifecycle state of a page agent's injection/response cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Submitting,
    Processing,
    Ready,
    Error,
    /// Coordinator-side placeholder when a tab could not be queried.
    /// Agents never enter it.
    Unknown,
}

impl AgentStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Whether an agent in `self` may move to `next`.
    ///
    /// `processing` and `ready` are only reachable once a submission has
    /// started; `error` can recover into either while the monitor still
    /// runs (background-tab stalls).
    pub fn can_transition_to(self, next: AgentStatus) -> bool {
        use AgentStatus::*;
        match (self, next) {
            (Unknown, _) | (_, Unknown) | (_, Idle) => false,
            (_, Submitting) | (_, Error) => true,
            (Submitting | Processing | Error, Processing) => true,
            (Submitting | Processing | Error, Ready) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Last status pushed by (or synthesised for) a tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub tab_id: TabId,
    pub platform: Platform,
    pub status: AgentStatus,
    pub message: String,
    /// RFC 3339.
    pub timestamp: String,
}

/// Platforms a command is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum Targets {
    #[default]
    All,
    Only(HashSet<Platform>),
}

impl Targets {
    pub fn only(platforms: impl IntoIterator<Item = Platform>) -> Self {
        Self::Only(platforms.into_iter().collect())
    }

    pub fn includes(&self, platform: Platform) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(&platform),
        }
    }
}

impl From<Vec<String>> for Targets {
    fn from(names: Vec<String>) -> Self {
        if names.iter().any(|n| n.eq_ignore_ascii_case("all")) {
            return Self::All;
        }
        Self::Only(names.iter().filter_map(|n| Platform::from_name(n)).collect())
    }
}

impl From<Targets> for Vec<String> {
    fn from(targets: Targets) -> Self {
        match targets {
            Targets::All => vec!["all".to_string()],
            Targets::Only(set) => {
                let mut names: Vec<String> = set.iter().map(|p| p.name().to_string()).collect();
                names.sort();
                names
            }
        }
    }
}

fn default_auto_send() -> bool {
    true
}

/// A prompt to fan out to the selected platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionRequest {
    pub prompt: String,
    #[serde(default)]
    pub targets: Targets,
    #[serde(default = "default_auto_send")]
    pub auto_send: bool,
}

/// Target selection for commands that carry nothing else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetedRequest {
    #[serde(default)]
    pub targets: Targets,
}

/// Per-tab outcome of a prompt injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectResult {
    pub tab_id: TabId,
    pub platform: Platform,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-tab outcome of a response capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCapture {
    pub tab_id: TabId,
    pub platform: Platform,
    pub title: String,
    #[serde(rename = "response", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
