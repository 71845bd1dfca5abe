//! Control surface: the tab list shown at `/panel` and by `promptrelay tabs`.

use maud::{html, Markup, PreEscaped, DOCTYPE};
use promptrelay_protocol::{TabRecord, TabStatus};

/// Titles longer than this are cut and suffixed with `...`.
pub const TITLE_LIMIT: usize = 30;

const EMPTY_HINT: &str = "Open ChatGPT, Claude, Grok, Gemini, or DeepSeek in a tab";

/// One rendered line of the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRow {
    /// Upper-cased platform name, shown as a badge.
    pub badge: String,
    pub title: String,
    pub status: TabStatus,
}

impl From<&TabRecord> for PanelRow {
    fn from(tab: &TabRecord) -> Self {
        Self {
            badge: tab.platform.name().to_uppercase(),
            title: truncate_title(&tab.title),
            status: tab.status,
        }
    }
}

/// What a panel load produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelView {
    Tabs(Vec<PanelRow>),
    /// The scan itself failed.
    Failed(String),
}

impl PanelView {
    pub fn from_scan(scan: Result<Vec<TabRecord>, String>) -> Self {
        match scan {
            Ok(tabs) => Self::Tabs(tabs.iter().map(PanelRow::from).collect()),
            Err(e) => Self::Failed(e),
        }
    }

    fn headline(&self) -> String {
        match self {
            Self::Tabs(rows) if rows.is_empty() => "No LLM tabs found".to_string(),
            Self::Tabs(rows) => format!("Found {} LLM tab(s)", rows.len()),
            Self::Failed(_) => "Error checking tabs".to_string(),
        }
    }
}

pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_LIMIT {
        let head: String = title.chars().take(TITLE_LIMIT).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

fn status_class(status: TabStatus) -> &'static str {
    match status {
        TabStatus::Ready => "ready",
        TabStatus::NotReady => "not-ready",
        TabStatus::Error => "error",
    }
}

const STYLE: &str = "\
body { font-family: sans-serif; width: 320px; margin: 12px; }
.tab-item { padding: 6px; margin: 4px 0; border-radius: 4px; background: #f3f3f3; }
.tab-item.error { background: #fde2e2; }
.platform-badge { font-weight: bold; margin-right: 8px; }
.empty-state, .error { color: #666; padding: 8px 0; }
";

fn tab_list(view: &PanelView) -> Markup {
    html! {
        div #tabs-list {
            @match view {
                PanelView::Tabs(rows) if rows.is_empty() => {
                    div.empty-state { (EMPTY_HINT) }
                }
                PanelView::Tabs(rows) => {
                    @for row in rows {
                        div class={ "tab-item " (status_class(row.status)) } {
                            span.platform-badge { (row.badge) }
                            span { (row.title) }
                        }
                    }
                }
                PanelView::Failed(error) => {
                    div.error { (error) }
                }
            }
        }
    }
}

pub fn render_html(view: &PanelView) -> String {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { "PromptRelay" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "PromptRelay" }
                p #status-text { (view.headline()) }
                (tab_list(view))
                a #refresh-btn href="/panel" { "Refresh" }
            }
        }
    }
    .into_string()
}

pub fn render_text(view: &PanelView) -> String {
    let mut out = format!("{}\n", view.headline());
    match view {
        PanelView::Tabs(rows) if rows.is_empty() => {
            out.push_str(EMPTY_HINT);
            out.push('\n');
        }
        PanelView::Tabs(rows) => {
            for row in rows {
                out.push_str(&format!(
                    "  {:<9} {:<33} {}\n",
                    row.badge,
                    row.title,
                    status_class(row.status)
                ));
            }
        }
        PanelView::Failed(error) => {
            out.push_str(error);
            out.push('\n');
        }
    }
    out
}
