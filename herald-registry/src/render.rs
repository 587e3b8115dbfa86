//! Literal `{name}` template substitution.
//!
//! Substitution is single-pass plain text replacement: no escaping syntax,
//! no nesting, no conditionals, no filters. Substituted values are never
//! re-scanned, so a value containing `{token}` stays as-is.

use std::collections::BTreeSet;
use std::fmt;

use herald_common::Variables;

use crate::template::{RenderedContent, Template};

/// Which part of a template an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateField {
    Subject,
    Body,
}

impl fmt::Display for TemplateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Subject => "subject",
            Self::Body => "body",
        })
    }
}

/// Error raised when a template references a variable the request did not
/// supply. Missing data is a hard failure, never an empty substitution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("template {field} references missing variable `{name}`")]
    MissingVariable { field: TemplateField, name: String },
}

/// Render a template against the supplied variables.
///
/// Rendering is pure: the same template and variables always produce the
/// same output. Variables that no placeholder references are ignored.
pub fn render(template: &Template, variables: &Variables) -> Result<RenderedContent, RenderError> {
    let subject = template
        .subject
        .as_deref()
        .map(|subject| render_str(subject, variables, TemplateField::Subject))
        .transpose()?;
    let body = render_str(&template.body, variables, TemplateField::Body)?;

    Ok(RenderedContent { subject, body })
}

fn render_str(
    input: &str,
    variables: &Variables,
    field: TemplateField,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        if let Some((name, consumed)) = parse_placeholder(after) {
            match variables.get(name) {
                Some(value) => out.push_str(value),
                None => {
                    return Err(RenderError::MissingVariable {
                        field,
                        name: name.to_owned(),
                    });
                }
            }
            rest = &after[consumed..];
        } else {
            // Not a placeholder, the brace is ordinary text.
            out.push('{');
            rest = after;
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// When `input` starts with `name}` for a non-empty identifier, returns the
/// identifier and the bytes consumed including the closing brace.
fn parse_placeholder(input: &str) -> Option<(&str, usize)> {
    let end = input.find(|c: char| !is_ident_char(c))?;
    if end == 0 || !input[end..].starts_with('}') {
        return None;
    }

    Some((&input[..end], end + 1))
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Collect every placeholder name in `input` into `names`.
pub(crate) fn collect_placeholders(input: &str, names: &mut BTreeSet<String>) {
    let mut rest = input;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        if let Some((name, consumed)) = parse_placeholder(after) {
            names.insert(name.to_owned());
            rest = &after[consumed..];
        } else {
            rest = after;
        }
    }
}
