//! HTML rendering of the display state.
//!
//! The template ships inside the binary. While the state is `Loading` the
//! page polls `/state` and swaps the message in place once it settles.

use tera::{Context, Tera};

use crate::client::DisplayState;

const INDEX: &str = "index.html";
const POLL_INTERVAL_MS: u64 = 1000;

/// Compiled page template plus its static text.
pub struct PageTemplate {
    tera: Tera,
    title: String,
    loading_text: String,
}

impl PageTemplate {
    pub fn new(title: &str, loading_text: &str) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template(INDEX, include_str!("../../templates/index.html"))?;
        Ok(Self {
            tera,
            title: title.to_string(),
            loading_text: loading_text.to_string(),
        })
    }

    /// Render the whole document for the given state.
    ///
    /// `Failed` keeps the placeholder and adds a `#reason` element so the
    /// failure is not mistaken for slowness.
    pub fn render(&self, state: &DisplayState) -> Result<String, tera::Error> {
        let view = state.view();
        let mut context = Context::new();
        context.insert("title", &self.title);
        context.insert("loading_text", &self.loading_text);
        context.insert("status", view.status);
        context.insert("text", &view.text);
        context.insert("reason", &view.reason);
        context.insert("poll_interval_ms", &POLL_INTERVAL_MS);
        self.tera.render(INDEX, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FetchError;

    fn template() -> PageTemplate {
        PageTemplate::new("hello-mesh", "Loading...").unwrap()
    }

    #[test]
    fn test_loading_shows_placeholder_and_polls() {
        let html = template().render(&DisplayState::Loading).unwrap();
        assert!(html.contains(r#"data-status="loading">Loading...</p>"#));
        assert!(!html.contains(r#"id="reason""#));
        assert!(html.contains(r#"<script id="state-poller">"#));
        assert!(html.contains(r#"fetch("/state""#));
    }

    #[test]
    fn test_success_shows_text_without_polling() {
        let html = template()
            .render(&DisplayState::Success("Hello from Go API!".into()))
            .unwrap();
        assert!(html.contains(r#"data-status="success">Hello from Go API!</p>"#));
        assert!(!html.contains("state-poller"));
    }

    #[test]
    fn test_failure_shows_reason_without_polling() {
        let html = template()
            .render(&DisplayState::Failed(FetchError::Status(503)))
            .unwrap();
        assert!(html.contains(r#"data-status="failed">Loading...</p>"#));
        assert!(html.contains(r#"<p id="reason">backend answered with status 503</p>"#));
        assert!(!html.contains("state-poller"));
    }

    #[test]
    fn test_payload_is_escaped() {
        let html = template()
            .render(&DisplayState::Success("<script>alert(1)</script>".into()))
            .unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)"));
        assert!(!html.contains("<script>alert(1)"));
    }
}
