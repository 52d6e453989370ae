//! `{{TOKEN}}` placeholder substitution for compose templates.
//!
//! A placeholder is `{{` + optional spaces + a token + optional spaces + `}}`,
//! where a token is an uppercase letter followed by uppercase letters, digits
//! and underscores. Brace pairs around anything else (for example Go template
//! expressions such as `{{.Name}}`) are not placeholders and pass through
//! unchanged.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

/// Template rendering errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// One or more placeholders have no value.
    #[error("unresolved placeholder(s): {}", join(.missing))]
    Unresolved { missing: Vec<String> },
}

fn join(tokens: &[String]) -> String {
    tokens.join(", ")
}

/// Check whether a name follows the `UPPER_SNAKE` token convention.
pub fn is_token(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Collect the distinct placeholder tokens used in a template.
pub fn placeholders(template: &str) -> BTreeSet<String> {
    Segments::new(template)
        .filter_map(|segment| match segment {
            Segment::Placeholder(token) => Some(token.to_string()),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Replace every placeholder in a template with its value.
///
/// Fails without producing output when any placeholder is missing from
/// `values`; the error lists every missing token. Substituted values are not
/// scanned for further placeholders.
pub fn render(template: &str, values: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut missing = BTreeSet::new();

    for segment in Segments::new(template) {
        match segment {
            Segment::Text(text) => output.push_str(text),
            Segment::Placeholder(token) => match values.get(token) {
                Some(value) => output.push_str(value),
                None => {
                    missing.insert(token.to_string());
                }
            },
        }
    }

    if missing.is_empty() {
        Ok(output)
    } else {
        Err(TemplateError::Unresolved {
            missing: missing.into_iter().collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Splits a template into literal text and placeholders.
struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn new(template: &'a str) -> Self {
        Self { rest: template }
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Segment<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        let mut search_from = 0;
        while let Some(offset) = self.rest[search_from..].find("{{") {
            let open = search_from + offset;
            let body = &self.rest[open + 2..];

            if let Some(close) = body.find("}}") {
                if let Some(token) = placeholder_token(&body[..close]) {
                    if open > 0 {
                        let (text, rest) = self.rest.split_at(open);
                        self.rest = rest;
                        return Some(Segment::Text(text));
                    }
                    self.rest = &body[close + 2..];
                    return Some(Segment::Placeholder(token));
                }
            }

            // `{` is a single byte, so this stays on a char boundary.
            search_from = open + 1;
        }

        let text = self.rest;
        self.rest = "";
        Some(Segment::Text(text))
    }
}

fn placeholder_token(inner: &str) -> Option<&str> {
    let token = inner.trim_matches(|c| c == ' ' || c == '\t');
    is_token(token).then_some(token)
}
