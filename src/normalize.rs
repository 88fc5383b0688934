//! Conversion of failure values to canonical text.
//!
//! Every [`Failure`] shape has a conversion that always produces a string:
//!
//! - errors use their `Display` message,
//! - text is used verbatim,
//! - other values use their default text conversion,
//! - records are rendered according to a [`RecordStyle`].
//!
//! Record rendering walks a fallback chain. The structural [`inspect`]
//! rendering and the [`to_json`] serialization both refuse circular records;
//! when they do, the next style is tried, ending at [`flat_join`], which only
//! looks one level deep and therefore cannot fail.

use std::{fmt::Write as _, str::FromStr};

use crate::{
    failure::Failure,
    value::{Ancestors, MAX_DEPTH, Record, Value, write_number},
};

/// How records are turned into text, and where the fallback chain starts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RecordStyle {
    /// Full-depth structural rendering, e.g. `{ id: 7, tags: [ 'a' ] }`.
    ///
    /// Falls back to [`RecordStyle::Json`].
    #[default]
    Inspect,
    /// JSON serialization, e.g. `{"id":7,"tags":["a"]}`.
    ///
    /// Falls back to [`RecordStyle::Flat`].
    Json,
    /// One level of `key:value` pairs joined with commas, e.g. `id:7,tags:a`.
    Flat,
}

impl RecordStyle {
    /// The style tried when this one fails.
    pub fn fallback(self) -> Option<Self> {
        match self {
            RecordStyle::Inspect => Some(RecordStyle::Json),
            RecordStyle::Json => Some(RecordStyle::Flat),
            RecordStyle::Flat => None,
        }
    }
}

/// Error returned when parsing an unknown [`RecordStyle`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown record style `{0}`, expected one of `inspect`, `json`, `flat`")]
pub struct UnknownRecordStyle(pub String);

impl FromStr for RecordStyle {
    type Err = UnknownRecordStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("inspect") || s.eq_ignore_ascii_case("deep") {
            Ok(RecordStyle::Inspect)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(RecordStyle::Json)
        } else if s.eq_ignore_ascii_case("flat") {
            Ok(RecordStyle::Flat)
        } else {
            Err(UnknownRecordStyle(s.to_owned()))
        }
    }
}

/// Error produced by the fallible record renderers.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The structure contains itself.
    #[error("the value contains a circular reference")]
    Circular,
    /// Lists and records are nested deeper than the renderers descend.
    #[error("the value is nested too deeply")]
    TooDeep,
    /// JSON serialization failed.
    #[error("the value could not be serialized: {0}")]
    Json(#[from] serde_json::Error),
}

/// Converts a failure value to text. Never fails.
///
/// `style` only matters for [`Failure::Record`].
pub fn normalize(failure: &Failure, style: RecordStyle) -> String {
    match failure {
        Failure::Error(error) => error.to_string(),
        Failure::Record(record) => render_record(record, style),
        Failure::Text(text) => text.clone(),
        Failure::Other(value) => value.to_string(),
    }
}

/// Renders a record, starting at `style` and falling back until a style
/// succeeds.
pub fn render_record(record: &Record, style: RecordStyle) -> String {
    let mut style = style;
    loop {
        let attempt = match style {
            RecordStyle::Inspect => inspect(&Value::Record(record.clone())),
            RecordStyle::Json => to_json(&Value::Record(record.clone())),
            RecordStyle::Flat => return flat_join(record),
        };

        match attempt {
            Ok(rendered) => return rendered,
            Err(error) => {
                // Flat is the last style and never fails.
                let next = style.fallback().unwrap_or(RecordStyle::Flat);
                tracing::trace!(
                    %error,
                    from = ?style,
                    to = ?next,
                    "record rendering failed, falling back"
                );
                style = next;
            }
        }
    }
}

/// Renders a value structurally at full depth, on a single line.
///
/// Text nested in lists and records is single-quoted; keys that are not
/// identifiers are quoted too. Fails with [`RenderError::Circular`] if a record
/// contains itself, and with [`RenderError::TooDeep`] past 128 levels of
/// nesting.
///
/// ```
/// use moth::{Record, Value, normalize::inspect};
///
/// let record = Record::new()
///     .with("id", 7)
///     .with("content-type", "json")
///     .with("tags", vec!["a", "b"]);
///
/// assert_eq!(
///     inspect(&Value::Record(record)).unwrap(),
///     "{ id: 7, 'content-type': 'json', tags: [ 'a', 'b' ] }"
/// );
/// ```
pub fn inspect(value: &Value) -> Result<String, RenderError> {
    let mut out = String::new();
    let mut ancestors = Ancestors::default();
    inspect_into(&mut out, value, &mut ancestors, 1)?;
    Ok(out)
}

fn inspect_into(
    out: &mut String,
    value: &Value,
    ancestors: &mut Ancestors,
    depth: usize,
) -> Result<(), RenderError> {
    if depth > MAX_DEPTH && matches!(value, Value::List(_) | Value::Record(_)) {
        return Err(RenderError::TooDeep);
    }
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
        Value::Int(value) => push_display(out, value),
        Value::UInt(value) => push_display(out, value),
        Value::Float(value) => {
            let _ = write_number(out, *value);
        }
        Value::Text(text) => push_quoted(out, text),
        Value::List(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return Ok(());
            }
            out.push_str("[ ");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                inspect_into(out, item, ancestors, depth + 1)?;
            }
            out.push_str(" ]");
        }
        Value::Record(record) => {
            if !ancestors.enter(record) {
                return Err(RenderError::Circular);
            }
            let entries = record.entries();
            if entries.is_empty() {
                out.push_str("{}");
            } else {
                out.push_str("{ ");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    push_key(out, key);
                    out.push_str(": ");
                    inspect_into(out, value, ancestors, depth + 1)?;
                }
                out.push_str(" }");
            }
            ancestors.leave(record);
        }
    }
    Ok(())
}

fn push_display(out: &mut String, value: &impl std::fmt::Display) {
    let _ = write!(out, "{value}");
}

fn push_key(out: &mut String, key: &str) {
    if is_identifier(key) {
        out.push_str(key);
    } else {
        push_quoted(out, key);
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let is_start = |c: char| c == '_' || c == '$' || unicode_ident::is_xid_start(c);
    let is_continue = |c: char| c == '$' || unicode_ident::is_xid_continue(c);
    is_start(first) && chars.all(is_continue)
}

fn push_quoted(out: &mut String, text: &str) {
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:04x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
}

/// Serializes a value to compact JSON.
///
/// Fails if the value contains a circular record.
pub fn to_json(value: &Value) -> Result<String, RenderError> {
    Ok(serde_json::to_string(value)?)
}

/// Joins one level of a record's fields as `key:value` pairs separated by
/// commas.
///
/// Field values use their default text conversion, which never descends into
/// nested records, so this works on any record, circular or not.
///
/// ```
/// use moth::{Record, normalize::flat_join};
///
/// let record = Record::new().with("code", 404).with("nested", Record::new());
/// record.insert("me", record.clone());
///
/// assert_eq!(
///     flat_join(&record),
///     "code:404,nested:[object Object],me:[object Object]"
/// );
/// ```
pub fn flat_join(record: &Record) -> String {
    let mut out = String::new();
    for (i, (key, value)) in record.entries().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{key}:{value}");
    }
    out
}
