//! Per-platform site adapters.
//!
//! Each adapter owns the selector tables of one chat site and answers five
//! questions about a page: where is the input, how do we submit, is a reply
//! being generated, is a reply finished, and what does the last reply say.
//! The tables track live UIs and go stale; keeping them here keeps the agent
//! state machine free of site knowledge.

use async_trait::async_trait;
use promptrelay_core::{Error, Platform, Result};

use crate::host::{FillStyle, PageDriver};

/// Selector tables for one site layout. Every list is ordered by preference.
#[derive(Debug)]
pub struct SiteTable {
    pub input: &'static [&'static str],
    pub send: &'static [&'static str],
    /// Send candidates whose label contains this text are skipped.
    pub skip_label: Option<&'static str>,
    pub fill: FillStyle,
    /// Generation-in-progress indicators.
    pub busy: &'static [&'static str],
    /// Reply regions checked for a finished answer.
    pub ready: &'static [&'static str],
    /// Reply regions read by capture.
    pub response: &'static [&'static str],
    /// Texts that mean "this is UI chrome, not a reply".
    pub placeholders: &'static [&'static str],
    /// Minimum trimmed length of a captured reply.
    pub min_response_len: usize,
    /// Walk matches from the newest backwards instead of only looking at
    /// the newest one.
    pub scan_back: bool,
}

/// Length a reply region must exceed before the monitor calls it ready.
const READY_MIN_CHARS: usize = 10;

/// How a prompt was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitMethod {
    Clicked(&'static str),
    KeyPress,
}

#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Human name used in messages.
    fn label(&self) -> &'static str;

    /// Name of the input control in "not found" errors.
    fn input_name(&self) -> &'static str {
        "input element"
    }

    /// Selector table for the page at `url`.
    fn table(&self, url: &str) -> &'static SiteTable;

    /// First input selector present on the page, if any.
    async fn locate_input(&self, page: &dyn PageDriver, url: &str) -> Result<Option<&'static str>> {
        for selector in self.table(url).input {
            if page.exists(selector).await? {
                return Ok(Some(*selector));
            }
        }
        Ok(None)
    }

    /// Click the first usable send control, or press Enter on `input`.
    async fn submit(&self, page: &dyn PageDriver, url: &str, input: &str) -> Result<SubmitMethod> {
        let table = self.table(url);
        for selector in table.send {
            if page.click(selector, table.skip_label).await? {
                return Ok(SubmitMethod::Clicked(*selector));
            }
        }
        if page.press_enter(input).await? {
            return Ok(SubmitMethod::KeyPress);
        }
        Err(Error::NotFound(format!(
            "{} send control not found",
            self.label()
        )))
    }

    async fn is_busy(&self, page: &dyn PageDriver, url: &str) -> Result<bool> {
        for selector in self.table(url).busy {
            if page.exists(selector).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn is_ready(&self, page: &dyn PageDriver, url: &str) -> Result<bool> {
        for selector in self.table(url).ready {
            let texts = page.texts(selector).await?;
            if let Some(last) = texts.last() {
                if last.trim().chars().count() > READY_MIN_CHARS {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn capture_response(&self, page: &dyn PageDriver, url: &str) -> Result<String> {
        let table = self.table(url);
        for selector in table.response {
            let texts = page.texts(selector).await?;
            let candidates: Vec<&String> = if table.scan_back {
                texts.iter().rev().collect()
            } else {
                texts.last().into_iter().collect()
            };
            for text in candidates {
                if is_reply(text, table) {
                    return Ok(text.trim().to_string());
                }
            }
        }
        Err(Error::NotFound(format!("No {} response found", self.label())))
    }
}

fn is_reply(text: &str, table: &SiteTable) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() >= table.min_response_len
        && !table.placeholders.iter().any(|p| trimmed.contains(p))
}

// ---------------------------------------------------------------
// ChatGPT
// ---------------------------------------------------------------

static CHATGPT: SiteTable = SiteTable {
    input: &[
        "#prompt-textarea",
        "textarea[data-id=\"prompt-textarea\"]",
        "textarea[placeholder*=\"Message\"]",
        "textarea[placeholder*=\"Send a message\"]",
        "div[contenteditable=\"true\"]",
        "textarea[rows=\"1\"]",
    ],
    send: &[
        "button[data-testid=\"send-button\"]",
        "button[data-testid=\"fruitjuice-send-button\"]",
        "button[aria-label*=\"Send\"]",
        "form button[type=\"submit\"]",
    ],
    skip_label: None,
    fill: FillStyle::Auto,
    busy: &[
        ".result-streaming",
        "[data-testid=\"typing-indicator\"]",
        "button[aria-label*=\"Stop generating\"]",
        "button[data-testid=\"stop-button\"]",
    ],
    ready: &["div[data-message-author-role=\"assistant\"]"],
    response: &[
        "div[data-message-author-role=\"assistant\"]",
        "div.markdown.prose",
        "div[class*=\"assistant\"]",
    ],
    placeholders: &[],
    min_response_len: 1,
    scan_back: false,
};

pub struct ChatGpt;

#[async_trait]
impl SiteAdapter for ChatGpt {
    fn platform(&self) -> Platform {
        Platform::ChatGPT
    }
    fn label(&self) -> &'static str {
        "ChatGPT"
    }
    fn table(&self, _url: &str) -> &'static SiteTable {
        &CHATGPT
    }
}

// ---------------------------------------------------------------
// Claude
// ---------------------------------------------------------------

static CLAUDE: SiteTable = SiteTable {
    input: &[
        "div.ProseMirror[contenteditable=\"true\"]",
        "div[contenteditable=\"true\"]",
        "div[aria-label*=\"Message\"]",
        "div[data-placeholder]",
    ],
    send: &[
        "button[aria-label*=\"Send\"]",
        "button[type=\"submit\"]",
    ],
    skip_label: None,
    fill: FillStyle::Auto,
    busy: &[
        "[data-is-streaming=\"true\"]",
        "button[aria-label*=\"Stop\"]",
    ],
    ready: &["div[data-is-streaming=\"false\"]"],
    response: &[
        "div[data-is-streaming=\"false\"]",
        "div.font-claude-message",
        "div[class*=\"message-content\"]",
    ],
    placeholders: &["Type a message"],
    min_response_len: 1,
    scan_back: false,
};

pub struct Claude;

#[async_trait]
impl SiteAdapter for Claude {
    fn platform(&self) -> Platform {
        Platform::Claude
    }
    fn label(&self) -> &'static str {
        "Claude"
    }
    fn input_name(&self) -> &'static str {
        "editor"
    }
    fn table(&self, _url: &str) -> &'static SiteTable {
        &CLAUDE
    }
}

// ---------------------------------------------------------------
// Grok (grok.com and the X-embedded variant)
// ---------------------------------------------------------------

static GROK_COM: SiteTable = SiteTable {
    input: &[
        "textarea[name=\"message\"]",
        "textarea[placeholder*=\"Ask Grok\"]",
        "textarea[placeholder*=\"Ask anything\"]",
        "div[contenteditable=\"true\"]",
    ],
    send: &[
        "button[type=\"submit\"]:not([aria-label*=\"Search\"])",
        "button[aria-label=\"Send message\"]",
        "button[aria-label=\"Send\"]",
        "form button[type=\"submit\"]",
    ],
    skip_label: Some("search"),
    fill: FillStyle::Auto,
    busy: &[
        ".loading",
        "[aria-busy=\"true\"]",
        "button[aria-label*=\"Stop\"]",
    ],
    ready: &["div.message-bubble", "div[class*=\"assistant\"]"],
    response: &[
        "div.message-bubble",
        "div[class*=\"assistant\"] div[class*=\"content\"]",
        "div[data-role=\"assistant\"]",
        "div.prose",
        "div[class*=\"markdown\"]",
    ],
    placeholders: &["Type your message", "Ask Grok"],
    min_response_len: 6,
    scan_back: true,
};

static GROK_X: SiteTable = SiteTable {
    input: &[
        "textarea[placeholder*=\"Ask anything\"]",
        "textarea[placeholder*=\"Ask Grok\"]",
        "div[data-testid=\"grok-input\"] textarea",
    ],
    send: &[
        "button[aria-label*=\"Send\"]",
        "div[data-testid=\"grok-send-button\"]",
    ],
    skip_label: Some("search"),
    fill: FillStyle::Auto,
    busy: &[".loading", "[aria-busy=\"true\"]"],
    ready: &["div[data-testid=\"grok-message\"]"],
    response: &["div[data-testid=\"grok-message\"]", "article[role=\"article\"]"],
    placeholders: &["Ask Grok"],
    min_response_len: 6,
    scan_back: false,
};

pub struct Grok;

#[async_trait]
impl SiteAdapter for Grok {
    fn platform(&self) -> Platform {
        Platform::Grok
    }
    fn label(&self) -> &'static str {
        "Grok"
    }
    fn table(&self, url: &str) -> &'static SiteTable {
        if url.contains("grok.com") {
            &GROK_COM
        } else {
            &GROK_X
        }
    }
}

// ---------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------

static GEMINI: SiteTable = SiteTable {
    input: &[
        "div.ql-editor",
        "rich-textarea div[contenteditable=\"true\"]",
        "div[aria-label*=\"Enter a prompt\"]",
        "div[contenteditable=\"true\"]",
    ],
    send: &[
        "button[aria-label*=\"Send\"]",
        "button[aria-label*=\"Submit\"]",
        "button.send-button",
    ],
    skip_label: None,
    fill: FillStyle::Paragraph,
    busy: &[
        ".loading-indicator",
        "[aria-busy=\"true\"]",
        ".response-loading",
    ],
    ready: &["model-response", "div.model-response", "div.response-container"],
    response: &[
        "model-response message-content",
        "div.model-response",
        "div[class*=\"response-container\"]",
        "div.markdown-container",
    ],
    placeholders: &[],
    min_response_len: 1,
    scan_back: false,
};

pub struct Gemini;

#[async_trait]
impl SiteAdapter for Gemini {
    fn platform(&self) -> Platform {
        Platform::Gemini
    }
    fn label(&self) -> &'static str {
        "Gemini"
    }
    fn input_name(&self) -> &'static str {
        "editor"
    }
    fn table(&self, _url: &str) -> &'static SiteTable {
        &GEMINI
    }
}

// ---------------------------------------------------------------
// DeepSeek
// ---------------------------------------------------------------

static DEEPSEEK: SiteTable = SiteTable {
    input: &[
        "textarea#chat-input",
        "textarea[placeholder*=\"DeepSeek\"]",
        "textarea",
    ],
    send: &[
        "div[role=\"button\"][aria-disabled=\"false\"]",
        "button[type=\"submit\"]",
    ],
    skip_label: Some("deepthink"),
    fill: FillStyle::Auto,
    busy: &[
        "div[class*=\"stop\"]",
        "[aria-busy=\"true\"]",
    ],
    ready: &["div.ds-markdown"],
    response: &["div.ds-markdown", "div[class*=\"markdown\"]"],
    placeholders: &[],
    min_response_len: 1,
    scan_back: false,
};

pub struct DeepSeek;

#[async_trait]
impl SiteAdapter for DeepSeek {
    fn platform(&self) -> Platform {
        Platform::DeepSeek
    }
    fn label(&self) -> &'static str {
        "DeepSeek"
    }
    fn table(&self, _url: &str) -> &'static SiteTable {
        &DEEPSEEK
    }
}

/// Adapter registered for `platform`.
pub fn adapter_for(platform: Platform) -> &'static dyn SiteAdapter {
    match platform {
        Platform::ChatGPT => &ChatGpt,
        Platform::Claude => &Claude,
        Platform::Grok => &Grok,
        Platform::Gemini => &Gemini,
        Platform::DeepSeek => &DeepSeek,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryElement, MemoryPage};

    #[test]
    fn test_registry_covers_every_platform() {
        for platform in Platform::all() {
            let adapter = adapter_for(*platform);
            assert_eq!(adapter.platform(), *platform);
            let table = adapter.table(platform.base_url());
            assert!(!table.input.is_empty());
            assert!(!table.response.is_empty());
        }
    }

    #[test]
    fn test_grok_table_depends_on_host() {
        let com = Grok.table("https://grok.com/chat/1");
        let x = Grok.table("https://x.com/i/grok");
        assert_eq!(com.input[0], "textarea[name=\"message\"]");
        assert_eq!(x.input[0], "textarea[placeholder*=\"Ask anything\"]");
    }

    #[tokio::test]
    async fn test_locate_input_follows_preference_order() {
        let page = MemoryPage::new("https://chatgpt.com/");
        page.insert("textarea[rows=\"1\"]", MemoryElement::new(""));
        page.insert("textarea[placeholder*=\"Message\"]", MemoryElement::new(""));
        let found = ChatGpt
            .locate_input(&page, "https://chatgpt.com/")
            .await
            .unwrap();
        assert_eq!(found, Some("textarea[placeholder*=\"Message\"]"));
    }

    #[tokio::test]
    async fn test_submit_falls_back_to_enter() {
        let page = MemoryPage::new("https://claude.ai/");
        page.insert("div[contenteditable=\"true\"]", MemoryElement::new(""));
        page.insert(
            "button[aria-label*=\"Send\"]",
            MemoryElement::new("").disabled(),
        );
        let method = Claude
            .submit(&page, "https://claude.ai/", "div[contenteditable=\"true\"]")
            .await
            .unwrap();
        assert_eq!(method, SubmitMethod::KeyPress);
        assert!(page.clicks().is_empty());
        assert_eq!(page.key_presses(), vec!["div[contenteditable=\"true\"]".to_string()]);
    }

    #[tokio::test]
    async fn test_grok_skips_search_button() {
        let url = "https://grok.com/";
        let page = MemoryPage::new(url);
        let selector = "button[type=\"submit\"]:not([aria-label*=\"Search\"])";
        page.insert(selector, MemoryElement::new("").labelled("Search the web"));
        page.insert("button[aria-label=\"Send message\"]", MemoryElement::new(""));
        let method = Grok.submit(&page, url, "textarea[name=\"message\"]").await.unwrap();
        assert_eq!(method, SubmitMethod::Clicked("button[aria-label=\"Send message\"]"));
    }

    #[tokio::test]
    async fn test_ready_needs_substantial_reply() {
        let url = "https://chatgpt.com/";
        let page = MemoryPage::new(url);
        let region = "div[data-message-author-role=\"assistant\"]";
        page.insert(region, MemoryElement::new("Hi"));
        assert!(!ChatGpt.is_ready(&page, url).await.unwrap());
        page.insert(region, MemoryElement::new("Here is a longer answer."));
        assert!(ChatGpt.is_ready(&page, url).await.unwrap());
    }

    #[tokio::test]
    async fn test_capture_takes_latest_reply() {
        let url = "https://gemini.google.com/app";
        let page = MemoryPage::new(url);
        page.insert("div.model-response", MemoryElement::new("first answer"));
        page.insert("div.model-response", MemoryElement::new("  second answer \n"));
        let text = Gemini.capture_response(&page, url).await.unwrap();
        assert_eq!(text, "second answer");
    }

    #[tokio::test]
    async fn test_capture_skips_placeholders() {
        let url = "https://claude.ai/chat/1";
        let page = MemoryPage::new(url);
        page.insert(
            "div[data-is-streaming=\"false\"]",
            MemoryElement::new("Type a message..."),
        );
        let err = Claude.capture_response(&page, url).await.unwrap_err();
        assert_eq!(err.to_string(), "No Claude response found");
    }

    #[tokio::test]
    async fn test_grok_scans_back_past_short_entries() {
        let url = "https://grok.com/chat/9";
        let page = MemoryPage::new(url);
        page.insert("div.message-bubble", MemoryElement::new("The answer is 42."));
        page.insert("div.message-bubble", MemoryElement::new("ok"));
        let text = Grok.capture_response(&page, url).await.unwrap();
        assert_eq!(text, "The answer is 42.");
    }
}
