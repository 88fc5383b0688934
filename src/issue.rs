use std::{error::Error, fmt};

use serde::Serialize;

use crate::{
    capture::capture_stack,
    config::IssueConfig,
    failure::{BoxError, Failure},
    normalize::normalize,
    timestamp::Timestamp,
    trace::{Frame, parse_stack},
};

/// The state used when the primary value normalizes to empty text.
pub(crate) const EMPTY_STATE: &str = "<empty>";

/// A normalized failure with its context and the stack it was built at.
///
/// An issue is built once from a primary failure value and any number of
/// context values, and is immutable afterwards.
///
/// ```
/// use moth::{Issue, Record};
///
/// let issue = Issue::builder("upload failed")
///     .context(Record::new().with("bucket", "media").with("attempt", 3))
///     .context(404)
///     .build();
///
/// let snapshot = issue.issue();
/// assert_eq!(snapshot.state, "upload failed");
/// assert_eq!(snapshot.states, ["bucket:media,attempt:3", "404"]);
/// ```
///
/// An issue is an [`Error`], so it can be returned and propagated with `?`.
/// When the primary value was itself an error, that error is the issue's
/// [`source`](Error::source).
#[derive(Debug)]
pub struct Issue {
    state: String,
    states: Vec<String>,
    traces: Vec<Frame>,
    timestamp: Timestamp,
    stack: String,
    source: Option<BoxError>,
}

/// An owned copy of an issue's data.
///
/// Returned by [`Issue::issue`]. Serializes as
/// `{"state": .., "states": [..], "traces": [..], "timestamp": ".."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IssueSnapshot {
    /// The canonical description of the primary value. Never empty.
    pub state: String,
    /// The normalized context values, in the order they were supplied.
    pub states: Vec<String>,
    /// The parsed stack frames.
    pub traces: Vec<Frame>,
    /// When the issue was built.
    pub timestamp: Timestamp,
}

/// Builder for an [`Issue`].
///
/// Created with [`Issue::builder`].
#[must_use]
#[derive(Debug)]
pub struct IssueBuilder {
    primary: Failure,
    contexts: Vec<Failure>,
    config: Option<IssueConfig>,
    stack: Option<String>,
}

impl Issue {
    /// Builds an issue from a primary value, with no context.
    ///
    /// Text, records and plain values convert into a [`Failure`] on their
    /// own. Native errors are wrapped with [`Failure::error`], or passed to
    /// [`issue!`](crate::issue!), which wraps them itself.
    ///
    /// ```
    /// use moth::{Failure, Issue};
    ///
    /// let issue = Issue::new(Failure::error(std::io::Error::other("disk full")));
    /// assert_eq!(issue.state(), "disk full");
    /// assert_eq!(issue.to_string(), "disk full");
    /// assert!(std::error::Error::source(&issue).is_some());
    ///
    /// assert_eq!(Issue::new("disk full").state(), "disk full");
    /// ```
    pub fn new(primary: impl Into<Failure>) -> Self {
        Self::builder(primary).build()
    }

    /// Starts building an issue from a primary value.
    ///
    /// Accepts the same values as [`Issue::new`].
    pub fn builder(primary: impl Into<Failure>) -> IssueBuilder {
        IssueBuilder {
            primary: primary.into(),
            contexts: Vec::new(),
            config: None,
            stack: None,
        }
    }

    /// Returns an owned copy of the issue's data.
    pub fn issue(&self) -> IssueSnapshot {
        IssueSnapshot {
            state: self.state.clone(),
            states: self.states.clone(),
            traces: self.traces.clone(),
            timestamp: self.timestamp,
        }
    }

    /// The canonical description of the primary value.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// The normalized context values.
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// The parsed stack frames.
    pub fn traces(&self) -> &[Frame] {
        &self.traces
    }

    /// When the issue was built.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// The stack text the traces were parsed from.
    pub fn stack(&self) -> &str {
        &self.stack
    }
}

impl IssueBuilder {
    /// Adds a context value.
    pub fn context(mut self, value: impl Into<Failure>) -> Self {
        self.contexts.push(value.into());
        self
    }

    /// Adds several context values, in iteration order.
    pub fn contexts<I>(mut self, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Failure>,
    {
        self.contexts.extend(values.into_iter().map(Into::into));
        self
    }

    /// Uses `config` instead of [`IssueConfig::current`].
    pub fn config(mut self, config: IssueConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Parses `text` instead of capturing the current stack.
    ///
    /// The first line of `text` describes the issue and does not become a
    /// frame. The trace limit does not apply.
    ///
    /// ```
    /// use moth::Issue;
    ///
    /// let issue = Issue::builder("boom")
    ///     .stack("Error: boom\n    at run (job.js:1:1)\n    at job.js:2:2")
    ///     .build();
    /// assert_eq!(issue.traces().len(), 2);
    /// ```
    pub fn stack(mut self, text: impl Into<String>) -> Self {
        self.stack = Some(text.into());
        self
    }

    /// Builds the issue.
    pub fn build(self) -> Issue {
        let config = self.config.unwrap_or_else(IssueConfig::current);

        let (mut state, source) = match self.primary {
            Failure::Error(error) => (error.to_string(), Some(error)),
            primary => (normalize(&primary, config.record_style), None),
        };
        if state.is_empty() {
            state = EMPTY_STATE.to_owned();
        }

        let states: Vec<String> = self
            .contexts
            .iter()
            .map(|context| normalize(context, config.context_record_style))
            .collect();

        let stack = match self.stack {
            Some(stack) => stack,
            None => capture_stack(&state, config.trace_limit),
        };
        let traces = parse_stack(&stack);
        let timestamp = Timestamp::now();

        tracing::debug!(
            state = %state,
            contexts = states.len(),
            traces = traces.len(),
            %timestamp,
            "built issue"
        );

        Issue {
            state,
            states,
            traces,
            timestamp,
            stack,
            source,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.state)?;
        if f.alternate() {
            for state in &self.states {
                write!(f, "\n  - {state}")?;
            }
            for frame in &self.traces {
                write!(f, "\n    at {frame}")?;
            }
        }
        Ok(())
    }
}

impl Error for Issue {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

impl From<Issue> for IssueSnapshot {
    fn from(issue: Issue) -> Self {
        IssueSnapshot {
            state: issue.state,
            states: issue.states,
            traces: issue.traces,
            timestamp: issue.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::{
        normalize::RecordStyle,
        value::{Record, Value},
    };

    assert_impl_all!(Issue: Error, Send, Sync);
    assert_impl_all!(IssueSnapshot: Send, Sync, Clone);

    const EXPLICIT: IssueConfig = IssueConfig::DEFAULT;

    #[derive(Debug, thiserror::Error)]
    #[error("checksum mismatch")]
    struct ChecksumError;

    fn issue(primary: impl Into<Failure>) -> Issue {
        Issue::builder(primary).config(EXPLICIT).build()
    }

    #[test]
    fn test_error_primary() {
        let issue = issue(Failure::error(ChecksumError));
        assert_eq!(issue.state(), "checksum mismatch");
        assert_eq!(issue.to_string(), "checksum mismatch");

        let source = issue.source().unwrap();
        assert!(source.is::<ChecksumError>());
    }

    #[test]
    fn test_new_with_wrapped_native_error() {
        let issue = Issue::new(Failure::error(std::io::Error::other("disk full")));
        assert_eq!(issue.state(), "disk full");

        let source = issue.source().unwrap();
        assert!(source.is::<std::io::Error>());
    }

    #[test]
    fn test_deeply_nested_record_primary() {
        let mut record = Record::new().with("leaf", 1);
        for _ in 0..300 {
            record = Record::new().with("next", record);
        }
        assert_eq!(issue(record).state(), "next:[object Object]");
    }

    #[test]
    fn test_record_primary() {
        let record = Record::new()
            .with("user", "ada")
            .with("roles", vec!["admin", "ops"])
            .with("limits", Record::new().with("rpm", 60));
        let issue = issue(record);
        assert_eq!(
            issue.state(),
            "{ user: 'ada', roles: [ 'admin', 'ops' ], limits: { rpm: 60 } }"
        );
        assert!(issue.source().is_none());
    }

    #[test]
    fn test_cyclic_record_primary() {
        let record = Record::new().with("name", "loop");
        record.insert("self", record.clone());
        let issue = issue(record.clone());
        assert_eq!(issue.state(), "name:loop,self:[object Object]");

        // Break the cycle so the record is freed.
        record.insert("self", Value::Null);
    }

    #[test]
    fn test_text_and_other_primary() {
        assert_eq!(issue("plain words").state(), "plain words");
        assert_eq!(issue(42).state(), "42");
        assert_eq!(issue(vec![1, 2, 3]).state(), "1,2,3");
        assert_eq!(issue(Value::Null).state(), "null");
    }

    #[test]
    fn test_empty_state_gets_placeholder() {
        assert_eq!(issue("").state(), EMPTY_STATE);
        assert_eq!(issue(Vec::<i32>::new()).state(), EMPTY_STATE);
        assert_eq!(
            issue(Failure::error(std::io::Error::other(""))).state(),
            EMPTY_STATE
        );
    }

    #[test]
    fn test_contexts_keep_order_and_count() {
        let issue = Issue::builder("primary")
            .config(EXPLICIT)
            .context("first")
            .context(Record::new().with("a", 1).with("b", Record::new()))
            .contexts([1.5, f64::NAN])
            .context(Failure::error(ChecksumError))
            .build();

        assert_eq!(
            issue.states(),
            [
                "first",
                "a:1,b:[object Object]",
                "1.5",
                "NaN",
                "checksum mismatch"
            ]
        );
    }

    #[test]
    fn test_context_record_style_is_configurable() {
        let config = IssueConfig {
            context_record_style: RecordStyle::Json,
            ..EXPLICIT
        };
        let issue = Issue::builder("primary")
            .config(config)
            .context(Record::new().with("a", 1))
            .build();
        assert_eq!(issue.states(), [r#"{"a":1}"#]);
    }

    #[test]
    fn test_supplied_stack_is_parsed() {
        let text = "Error: boom\n    at run (job.js:1:1)\n    at job.js:2:2\n    at native";
        let issue = Issue::builder("boom").stack(text).build();

        assert_eq!(issue.stack(), text);
        assert_eq!(issue.traces().len(), 3);
        assert_eq!(issue.traces()[0].caller.as_deref(), Some("run"));
        assert_eq!(issue.traces()[2], Frame::log_only("native"));
    }

    #[test]
    fn test_supplied_stack_ignores_trace_limit() {
        let text = "Error: deep\n    at a (a.rs:1:1)\n    at b (b.rs:2:2)\n    at c (c.rs:3:3)";
        let config = IssueConfig {
            trace_limit: 1,
            ..EXPLICIT
        };
        let issue = Issue::builder("deep").config(config).stack(text).build();
        assert_eq!(issue.traces().len(), 3);
    }

    #[test]
    fn test_captured_stack() {
        let issue = issue("captured\nsecond line");
        let stack = issue.stack();
        assert!(stack.starts_with("Issue: captured"));
        assert_eq!(issue.traces().len(), stack.lines().count() - 1);
    }

    #[test]
    fn test_trace_limit() {
        for trace_limit in [0, 1, 2] {
            let issue = Issue::builder("limited")
                .config(IssueConfig {
                    trace_limit,
                    ..EXPLICIT
                })
                .build();
            assert!(issue.traces().len() <= trace_limit);
        }
    }

    #[test]
    fn test_timestamps_are_non_decreasing() {
        let first = issue("first");
        let second = issue("second");
        assert!(second.timestamp() >= first.timestamp());
    }

    #[test]
    fn test_alternate_display() {
        let issue = Issue::builder("boom")
            .context("while saving")
            .stack("Issue: boom\n    at save (store.rs:4:2)")
            .build();
        assert_eq!(format!("{issue}"), "boom");
        assert_eq!(
            format!("{issue:#}"),
            "boom\n  - while saving\n    at save store.rs:4:2"
        );
    }

    #[test]
    fn test_snapshot() {
        let issue = Issue::builder("boom")
            .config(EXPLICIT)
            .context(7)
            .stack("Issue: boom\n    at f (lib.rs:1:2)")
            .build();
        let snapshot = issue.issue();
        assert_eq!(snapshot.timestamp, issue.timestamp());

        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "boom");
        assert_eq!(json["states"], serde_json::json!(["7"]));
        assert_eq!(
            json["traces"],
            serde_json::json!([{
                "caller": "f",
                "file": "lib.rs",
                "line": "1",
                "index": "2",
                "log": "f lib.rs:1:2"
            }])
        );
        assert_eq!(json["timestamp"], issue.timestamp().to_string());

        assert_eq!(IssueSnapshot::from(issue), snapshot);
    }
}
