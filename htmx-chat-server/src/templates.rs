//! HTML templates, loaded once from disk at startup.
//!
//! All three templates must exist when the server starts; a missing file is
//! a startup error rather than a per-request failure.  Templates ending in
//! `.html` are auto-escaped by minijinja, so user and model text is inserted
//! as text, never as markup.

use std::path::Path;

use anyhow::Context;
use minijinja::{context, Environment};

use crate::history::ChatEntry;

pub const PAGE: &str = "index.html";
pub const USER_MESSAGE: &str = "message.html";
pub const AI_MESSAGE: &str = "ai_message.html";

const REQUIRED: [&str; 3] = [PAGE, USER_MESSAGE, AI_MESSAGE];

#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Load and compile every required template from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut env = Environment::new();
        for name in REQUIRED {
            let path = dir.join(name);
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("missing template {}", path.display()))?;
            env.add_template_owned(name, source)
                .with_context(|| format!("invalid template {}", path.display()))?;
        }
        Ok(Self { env })
    }

    /// Full chat page with prior messages.
    pub fn render_page(&self, messages: &[ChatEntry]) -> Result<String, minijinja::Error> {
        self.env.get_template(PAGE)?.render(context! { messages => messages })
    }

    /// Fragment for a message typed by the user.
    pub fn render_user_message(&self, message: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template(USER_MESSAGE)?
            .render(context! { message => message })
    }

    /// Fragment for a model reply.
    pub fn render_ai_message(&self, ai_response_text: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template(AI_MESSAGE)?
            .render(context! { ai_response_text => ai_response_text })
    }
}

#[cfg(test)]
pub(crate) fn test_templates() -> Templates {
    Templates::load(concat!(env!("CARGO_MANIFEST_DIR"), "/templates")).expect("bundled templates load")
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_directory_fails_fast() {
        let err = Templates::load("/definitely/not/here").unwrap_err();
        assert!(err.to_string().contains("missing template"));
    }

    #[test]
    fn user_text_is_escaped() {
        let html = test_templates().render_user_message("<script>x</script>").unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn page_renders_prior_messages() {
        let html = test_templates()
            .render_page(&[ChatEntry::user("first question"), ChatEntry::assistant("first answer")])
            .unwrap();
        let q = html.find("first question").expect("user message present");
        let a = html.find("first answer").expect("assistant message present");
        assert!(q < a);
    }

    #[test]
    fn ai_fragment_contains_reply() {
        let html = test_templates().render_ai_message("nice weather").unwrap();
        assert!(html.contains("nice weather"));
    }
}
