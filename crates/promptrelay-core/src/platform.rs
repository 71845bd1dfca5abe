//! Supported chat platforms and URL-based detection.

use serde::{Deserialize, Serialize};
use url::Url;

/// Supported AI chat sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(rename = "chatgpt")]
    ChatGPT,
    Claude,
    Grok,
    Gemini,
    DeepSeek,
}

impl Platform {
    pub fn all() -> &'static [Platform] {
        &[
            Self::ChatGPT,
            Self::Claude,
            Self::Grok,
            Self::Gemini,
            Self::DeepSeek,
        ]
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::ChatGPT => "https://chatgpt.com",
            Self::Claude => "https://claude.ai",
            Self::Grok => "https://grok.com",
            Self::Gemini => "https://gemini.google.com",
            Self::DeepSeek => "https://chat.deepseek.com",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatGPT => "chatgpt",
            Self::Claude => "claude",
            Self::Grok => "grok",
            Self::Gemini => "gemini",
            Self::DeepSeek => "deepseek",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "chatgpt" => Some(Self::ChatGPT),
            "claude" => Some(Self::Claude),
            "grok" => Some(Self::Grok),
            "gemini" => Some(Self::Gemini),
            "deepseek" => Some(Self::DeepSeek),
            _ => None,
        }
    }

    /// Derive the platform hosting `url`.
    ///
    /// Matching is done on the parsed host (and path for Grok on X), so a
    /// platform domain appearing in a query string does not count.
    pub fn from_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_lowercase();
        let path = parsed.path();

        if host_is(&host, "chat.openai.com") || host_is(&host, "chatgpt.com") {
            Some(Self::ChatGPT)
        } else if host_is(&host, "claude.ai") {
            Some(Self::Claude)
        } else if host_is(&host, "grok.com")
            || ((host_is(&host, "x.com") || host_is(&host, "twitter.com"))
                && path.starts_with("/i/grok"))
        {
            Some(Self::Grok)
        } else if host_is(&host, "gemini.google.com") {
            Some(Self::Gemini)
        } else if host_is(&host, "chat.deepseek.com") {
            Some(Self::DeepSeek)
        } else {
            None
        }
    }

    /// Sites that throttle background tabs hard enough that generation can
    /// stall until the tab is brought to the foreground.
    pub fn throttles_background(&self) -> bool {
        matches!(self, Self::ChatGPT | Self::Claude)
    }
}

fn host_is(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_known_hosts() {
        let cases = [
            ("https://chatgpt.com/c/abc", Platform::ChatGPT),
            ("https://chat.openai.com/", Platform::ChatGPT),
            ("https://claude.ai/new", Platform::Claude),
            ("https://grok.com/chat/1", Platform::Grok),
            ("https://x.com/i/grok?conversation=1", Platform::Grok),
            ("https://twitter.com/i/grok", Platform::Grok),
            ("https://gemini.google.com/app", Platform::Gemini),
            ("https://chat.deepseek.com/a/chat/s/1", Platform::DeepSeek),
        ];
        for (url, expected) in cases {
            assert_eq!(Platform::from_url(url), Some(expected), "{url}");
        }
    }

    #[test]
    fn test_rejects_unrelated_urls() {
        assert_eq!(Platform::from_url("https://example.com/?q=claude.ai"), None);
        assert_eq!(Platform::from_url("https://x.com/home"), None);
        assert_eq!(Platform::from_url("https://notclaude.ai/"), None);
        assert_eq!(Platform::from_url("chrome://newtab/"), None);
        assert_eq!(Platform::from_url(""), None);
    }

    #[test]
    fn test_detection_is_stable() {
        let url = "https://claude.ai/chat/123";
        let first = Platform::from_url(url);
        for _ in 0..10 {
            assert_eq!(Platform::from_url(url), first);
        }
    }

    #[test]
    fn test_name_roundtrip() {
        for platform in Platform::all() {
            assert_eq!(Platform::from_name(platform.name()), Some(*platform));
            assert_eq!(Platform::from_url(platform.base_url()), Some(*platform));
        }
        assert_eq!(Platform::from_name("ChatGPT"), Some(Platform::ChatGPT));
        assert_eq!(Platform::from_name("bard"), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Platform::ChatGPT).unwrap();
        assert_eq!(json, "\"chatgpt\"");
        let parsed: Platform = serde_json::from_str("\"deepseek\"").unwrap();
        assert_eq!(parsed, Platform::DeepSeek);
    }
}
