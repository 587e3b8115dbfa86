//! Template and rendered-content types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A renderable template for one channel.
///
/// Placeholders are literal `{name}` tokens; see [`crate::render`] for the
/// substitution rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Subject line. Email templates always carry one; push and in-app
    /// templates may leave it out.
    #[serde(default)]
    pub subject: Option<String>,
    /// Message body.
    pub body: String,
}

impl Template {
    /// A body-only template.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            subject: None,
            body: body.into(),
        }
    }

    /// Attach a subject line.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Every placeholder name referenced by the subject or body.
    #[must_use]
    pub fn placeholders(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        if let Some(subject) = &self.subject {
            crate::render::collect_placeholders(subject, &mut names);
        }
        crate::render::collect_placeholders(&self.body, &mut names);
        names
    }
}

/// Fully rendered content handed to channel adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedContent {
    pub subject: Option<String>,
    pub body: String,
}
