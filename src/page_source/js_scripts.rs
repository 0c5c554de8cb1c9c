//! JavaScript snippets evaluated in the rendered page
//!
//! Selectors are embedded as JSON string literals so arbitrary CSS survives
//! quoting.

/// Scroll to the end of the document to trigger lazy loaders
pub const SCROLL_TO_BOTTOM_SCRIPT: &str = r"
    (function() {
        const height = Math.max(
            document.body ? document.body.scrollHeight : 0,
            document.documentElement ? document.documentElement.scrollHeight : 0
        );
        window.scrollTo(0, height);
        return height;
    })()
";

/// Tag the current document so a completed navigation can be told apart
/// from the page it replaced
pub const MARK_DOCUMENT_SCRIPT: &str = "window.__imagegrabPreviousPage = true; true";

/// Navigation probe: `{ fresh, readyState }`; `fresh` is true once the tagged
/// document has been replaced
pub const NAVIGATION_PROBE_SCRIPT: &str = r"
    (function() {
        return {
            fresh: window.__imagegrabPreviousPage !== true,
            readyState: document.readyState
        };
    })()
";

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Readiness probe: `{ readyState, imageCount }`
#[must_use]
pub fn document_snapshot_script(image_selector: &str) -> String {
    format!(
        r"
    (function() {{
        return {{
            readyState: document.readyState,
            imageCount: document.querySelectorAll({selector}).length
        }};
    }})()
",
        selector = js_string(image_selector)
    )
}

/// Next-control probe: `{ found, href }`
#[must_use]
pub fn next_control_probe_script(next_selector: &str) -> String {
    format!(
        r"
    (function() {{
        const el = document.querySelector({selector});
        if (!el) {{
            return {{ found: false, href: null }};
        }}
        return {{ found: true, href: el.href || el.getAttribute('href') || null }};
    }})()
",
        selector = js_string(next_selector)
    )
}

/// Script click on the next control; returns whether an element was clicked
#[must_use]
pub fn click_next_control_script(next_selector: &str) -> String {
    format!(
        r"
    (function() {{
        const el = document.querySelector({selector});
        if (!el) {{
            return false;
        }}
        el.click();
        return true;
    }})()
",
        selector = js_string(next_selector)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_is_quoted() {
        let script = next_control_probe_script(r#"a[rel="next"]"#);
        assert!(script.contains(r#"document.querySelector("a[rel=\"next\"]")"#));
    }

    #[test]
    fn test_snapshot_script_uses_image_selector() {
        let script = document_snapshot_script("img.photo");
        assert!(script.contains(r#"querySelectorAll("img.photo")"#));
        assert!(script.contains("imageCount"));
    }
}
