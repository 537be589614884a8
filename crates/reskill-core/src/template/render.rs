//! Phase 1: synchronous `{{ ... }}` expansion.
//!
//! Grammar inside the delimiters, after trimming:
//!
//! - `name` / `a.b.c` — variable interpolation with dotted lookup into the
//!   JSON variable bag
//! - `context("path")` / `context(var)` — directive, replaced by a token
//! - `read("p1, p2")` / `read(var)` — directive, replaced by a token
//!
//! No directive I/O happens here. Undefined variables and malformed
//! expressions are fatal render errors; this renderer refuses to guess.

use crate::error::{ReskillError, Result};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Output of phase 1: expanded text with directive tokens still embedded,
/// plus the pending directive descriptors keyed by token.
#[derive(Debug)]
pub struct RenderedTemplate {
    pub text: String,
    pub pending: Vec<PendingDirective>,
}

/// One directive invocation awaiting asynchronous resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDirective {
    /// Unique placeholder minted into the rendered text.
    pub token: String,
    pub kind: DirectiveKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    /// `context(path)` — file or directory aggregated into a context blob.
    Context { path: String },
    /// `read(paths)` — one or more files read as text, blank-line joined.
    Read { paths: Vec<String> },
}

/// Expand `source` against `variables`.
pub fn render(source: &str, variables: &Map<String, Value>) -> Result<RenderedTemplate> {
    let mut text = String::with_capacity(source.len());
    let mut pending = Vec::new();
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        text.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            return Err(ReskillError::TemplateRender(format!(
                "unmatched '{{{{' near: {}",
                snippet(&rest[open..])
            )));
        };
        let expr = after_open[..close].trim();
        if expr.is_empty() {
            return Err(ReskillError::TemplateRender(
                "empty expression '{{ }}'".to_string(),
            ));
        }

        match parse_call(expr) {
            Some((name, arg)) => {
                let kind = directive_kind(name, arg, variables)?;
                let token = format!("%%reskill-directive-{}%%", Uuid::new_v4());
                text.push_str(&token);
                pending.push(PendingDirective { token, kind });
            }
            None => {
                let value = lookup(variables, expr).ok_or_else(|| {
                    ReskillError::TemplateRender(format!("undefined variable '{expr}'"))
                })?;
                text.push_str(&value_to_string(value));
            }
        }

        rest = &after_open[close + 2..];
    }
    text.push_str(rest);

    Ok(RenderedTemplate { text, pending })
}

/// Split `name(arg)` call syntax; returns `None` for plain variables.
fn parse_call(expr: &str) -> Option<(&str, &str)> {
    let open = expr.find('(')?;
    let name = expr[..open].trim();
    let rest = expr[open + 1..].trim_end();
    let arg = rest.strip_suffix(')')?;
    Some((name, arg.trim()))
}

fn directive_kind(
    name: &str,
    arg: &str,
    variables: &Map<String, Value>,
) -> Result<DirectiveKind> {
    match name {
        "context" => Ok(DirectiveKind::Context {
            path: string_arg(arg, variables)?,
        }),
        "read" => Ok(DirectiveKind::Read {
            paths: path_list_arg(arg, variables)?,
        }),
        other => Err(ReskillError::TemplateRender(format!(
            "unknown directive '{other}'"
        ))),
    }
}

/// A directive argument: a quoted literal, or a variable resolving to a
/// string.
fn string_arg(arg: &str, variables: &Map<String, Value>) -> Result<String> {
    if let Some(lit) = unquote(arg) {
        return Ok(lit.to_string());
    }
    match lookup(variables, arg) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ReskillError::TemplateRender(format!(
            "directive argument '{arg}' must be a string, got {other}"
        ))),
        None => Err(ReskillError::TemplateRender(format!(
            "undefined variable '{arg}' in directive argument"
        ))),
    }
}

/// A `read` argument: a comma-separated literal, or a variable resolving to
/// a string (comma-split) or an array of path strings.
fn path_list_arg(arg: &str, variables: &Map<String, Value>) -> Result<Vec<String>> {
    if let Some(lit) = unquote(arg) {
        return Ok(split_paths(lit));
    }
    match lookup(variables, arg) {
        Some(Value::String(s)) => Ok(split_paths(s)),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(ReskillError::TemplateRender(format!(
                    "read({arg}): expected path string, got {other}"
                ))),
            })
            .collect(),
        Some(other) => Err(ReskillError::TemplateRender(format!(
            "read({arg}): expected string or array of paths, got {other}"
        ))),
        None => Err(ReskillError::TemplateRender(format!(
            "undefined variable '{arg}' in directive argument"
        ))),
    }
}

fn split_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn unquote(arg: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if let Some(inner) = arg
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(inner);
        }
    }
    None
}

/// Dotted-path lookup into the variable bag. `Null` counts as absent.
fn lookup<'a>(variables: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = variables.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Render a JSON value as prompt text. Arrays join element renderings with
/// newlines, which is what makes the `constitution.patterns` normalization
/// observable: `"x"` and `["x"]` render identically.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        // Nested objects interpolate as compact JSON.
        other => other.to_string(),
    }
}

fn snippet(s: &str) -> String {
    s.chars().take(40).collect()
}
