//! JavaScript snippets evaluated in the page through `Runtime.evaluate`.
//!
//! Every interpolated string goes through `serde_json` so selectors and
//! prompts containing quotes or newlines stay valid JS literals.

use crate::host::FillStyle;

fn literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn location() -> String {
    "window.location.href".to_string()
}

pub(crate) fn exists(selector: &str) -> String {
    format!(
        "(() => {{ try {{ return document.querySelector({sel}) !== null; }} catch (e) {{ return false; }} }})()",
        sel = literal(selector)
    )
}

pub(crate) fn texts(selector: &str) -> String {
    format!(
        "(() => {{ try {{ return Array.from(document.querySelectorAll({sel})).map(e => e.innerText || e.textContent || ''); }} catch (e) {{ return []; }} }})()",
        sel = literal(selector)
    )
}

pub(crate) fn fill(selector: &str, text: &str, style: FillStyle) -> String {
    let paragraph = matches!(style, FillStyle::Paragraph);
    format!(
        r#"(() => {{
  let el;
  try {{ el = document.querySelector({sel}); }} catch (e) {{ return false; }}
  if (!el) return false;
  const text = {text};
  el.focus();
  if (el.tagName === 'TEXTAREA' || el.tagName === 'INPUT') {{
    el.click();
    const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
    Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, text);
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return true;
  }}
  el.innerHTML = '';
  if ({paragraph}) {{
    const p = document.createElement('p');
    p.textContent = text;
    el.appendChild(p);
  }} else {{
    el.textContent = text;
  }}
  el.dispatchEvent(new InputEvent('input', {{ bubbles: true, cancelable: true, data: text }}));
  return true;
}})()"#,
        sel = literal(selector),
        text = literal(text),
        paragraph = paragraph,
    )
}

pub(crate) fn click(selector: &str, skip_label: Option<&str>) -> String {
    let skip = skip_label
        .map(|s| literal(&s.to_lowercase()))
        .unwrap_or_else(|| "null".to_string());
    format!(
        r#"(() => {{
  let nodes;
  try {{ nodes = document.querySelectorAll({sel}); }} catch (e) {{ return false; }}
  const skip = {skip};
  for (const node of nodes) {{
    const btn = node.closest('button, [role="button"]') || node;
    const label = ((btn.getAttribute('aria-label') || '') + ' ' + (btn.textContent || '')).toLowerCase();
    if (skip && label.includes(skip)) continue;
    if (btn.disabled || btn.getAttribute('aria-disabled') === 'true') continue;
    if (btn.getClientRects().length === 0) continue;
    btn.click();
    return true;
  }}
  return false;
}})()"#,
        sel = literal(selector),
        skip = skip,
    )
}

pub(crate) fn focus(selector: &str) -> String {
    format!(
        "(() => {{ try {{ const el = document.querySelector({sel}); if (!el) return false; el.focus(); return true; }} catch (e) {{ return false; }} }})()",
        sel = literal(selector)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_quotes_are_escaped() {
        let js = exists(r#"textarea[placeholder*="Message"]"#);
        assert!(js.contains(r#""textarea[placeholder*=\"Message\"]""#));
    }

    #[test]
    fn test_prompt_is_a_single_literal() {
        let js = fill("#prompt-textarea", "line one\nsays \"hi\"", FillStyle::Auto);
        assert!(js.contains(r#"const text = "line one\nsays \"hi\"";"#));
        assert!(js.contains("if (false)"));
    }

    #[test]
    fn test_paragraph_fill_flag() {
        let js = fill("div.ql-editor", "hello", FillStyle::Paragraph);
        assert!(js.contains("if (true)"));
    }

    #[test]
    fn test_click_skip_label() {
        assert!(click("button", None).contains("const skip = null;"));
        assert!(click("button", Some("Search")).contains(r#"const skip = "search";"#));
    }
}
