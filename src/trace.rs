//! Parsing of stack-trace text into frames.
//!
//! The parser understands the line layout most runtimes use: a prefix word,
//! then either a caller followed by a location, or a location alone.
//!
//! ```text
//! Issue: connection refused
//!     at connect (/srv/app/db.js:41:17)
//!     at /srv/app/main.js:9:3
//!     at <anonymous>
//! ```
//!
//! A location in parentheses may contain whitespace, as in
//! `at main (C:\Users\Ada Lovelace\app.js:3:1)`. The first line describes the
//! issue itself and is not a frame. Lines that match neither shape are kept as
//! log-only frames.

use std::fmt;

use serde::Serialize;

/// One parsed stack frame.
///
/// `log` is always present. The other fields are set only when the line
/// matched one of the recognized shapes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Frame {
    /// Name of the function active at this frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    /// Source file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based line number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    /// 1-based column index, or `0` when a natively captured frame has no
    /// column information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// The frame text without its prefix word.
    pub log: String,
}

impl Frame {
    /// Parses a single stack line.
    ///
    /// The first whitespace-separated token is a prefix word (such as `at`)
    /// and is discarded.
    ///
    /// ```
    /// use moth::Frame;
    ///
    /// let frame = Frame::parse("    at foo (bar.js:12:5)");
    /// assert_eq!(frame.caller.as_deref(), Some("foo"));
    /// assert_eq!(frame.file.as_deref(), Some("bar.js"));
    /// assert_eq!(frame.line.as_deref(), Some("12"));
    /// assert_eq!(frame.index.as_deref(), Some("5"));
    /// assert_eq!(frame.log, "foo bar.js:12:5");
    ///
    /// let frame = Frame::parse("    at native code");
    /// assert!(!frame.has_location());
    /// assert_eq!(frame.log, "native code");
    /// ```
    pub fn parse(line: &str) -> Self {
        let rest = without_prefix(line);

        match LineShape::of(rest) {
            LineShape::CallerAndLocation { caller, location } => Frame {
                log: format!("{caller} {}", location.text),
                caller: Some(caller.to_owned()),
                file: Some(location.file),
                line: Some(location.line),
                index: Some(location.index),
            },
            LineShape::LocationOnly(location) => Frame {
                caller: None,
                file: Some(location.file),
                line: Some(location.line),
                index: Some(location.index),
                log: location.text,
            },
            LineShape::Unrecognized => {
                tracing::trace!(line, "stack line matches no frame shape");
                if rest.is_empty() {
                    Frame::log_only(line.trim())
                } else {
                    Frame::log_only(rest.split_whitespace().collect::<Vec<_>>().join(" "))
                }
            }
        }
    }

    /// Creates a frame with only its log text.
    pub fn log_only(log: impl Into<String>) -> Self {
        Frame {
            log: log.into(),
            ..Frame::default()
        }
    }

    /// Returns `true` if the file, line and index are known.
    pub fn has_location(&self) -> bool {
        self.file.is_some() && self.line.is_some() && self.index.is_some()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.log)
    }
}

enum LineShape<'a> {
    CallerAndLocation {
        caller: &'a str,
        location: Location,
    },
    LocationOnly(Location),
    Unrecognized,
}

impl<'a> LineShape<'a> {
    fn of(rest: &'a str) -> Self {
        // A parenthesized location may contain whitespace.
        if let Some(inner) = rest.strip_suffix(')') {
            if let Some(location) = inner.strip_prefix('(') {
                return match Location::parse(location) {
                    Some(location) => LineShape::LocationOnly(location),
                    None => LineShape::Unrecognized,
                };
            }
            if let Some((caller, location)) = inner.split_once(" (") {
                let caller = caller.trim_end();
                if !caller.is_empty() && !caller.contains(char::is_whitespace) {
                    return match Location::parse(location) {
                        Some(location) => LineShape::CallerAndLocation { caller, location },
                        None => LineShape::Unrecognized,
                    };
                }
            }
        }

        let tokens: Vec<&str> = rest.split_whitespace().collect();
        match *tokens {
            [caller, location] => match Location::parse(location) {
                Some(location) => LineShape::CallerAndLocation { caller, location },
                None => LineShape::Unrecognized,
            },
            [location] => match Location::parse(location) {
                Some(location) => LineShape::LocationOnly(location),
                None => LineShape::Unrecognized,
            },
            _ => LineShape::Unrecognized,
        }
    }
}

/// Returns the line without its leading prefix word and surrounding
/// whitespace.
fn without_prefix(line: &str) -> &str {
    line.trim()
        .split_once(char::is_whitespace)
        .map_or("", |(_, rest)| rest.trim_start())
}

/// A `file:line:index` location, optionally wrapped in parentheses.
struct Location {
    /// The token with its parentheses removed.
    text: String,
    file: String,
    line: String,
    index: String,
}

impl Location {
    fn parse(token: &str) -> Option<Self> {
        let text: String = token.chars().filter(|c| !matches!(c, '(' | ')')).collect();

        // Split from the right so that colons inside the file part
        // (`C:\src\app.js`, `http://host/app.js`) stay with the file.
        let mut parts = text.rsplitn(3, ':');
        let index = parts.next()?.trim();
        let line = parts.next()?.trim();
        let file = parts.next()?.trim();

        if file.is_empty() || !is_number(line) || !is_number(index) {
            return None;
        }

        let (file, line, index) = (file.to_owned(), line.to_owned(), index.to_owned());
        Some(Location {
            text,
            file,
            line,
            index,
        })
    }
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Returns the non-blank lines of a stack text.
///
/// Lines are separated by `\n`; a trailing `\r` or a leading tab is left for
/// the tokenizer to discard.
pub fn stack_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').filter(|line| !line.trim().is_empty())
}

/// Parses a stack text into frames, skipping its first line.
///
/// The result has one frame per remaining non-blank line.
///
/// ```
/// use moth::trace::parse_stack;
///
/// let frames = parse_stack(
///     "Issue: boom\n    at handler (src/app.js:10:3)\n\tat src/main.js:2:1\n    at <anonymous>",
/// );
/// assert_eq!(frames.len(), 3);
/// assert_eq!(frames[0].caller.as_deref(), Some("handler"));
/// assert_eq!(frames[1].caller, None);
/// assert_eq!(frames[1].file.as_deref(), Some("src/main.js"));
/// assert_eq!(frames[2].log, "<anonymous>");
/// ```
pub fn parse_stack(text: &str) -> Vec<Frame> {
    stack_lines(text).skip(1).map(Frame::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_and_location() {
        assert_eq!(
            Frame::parse("at foo (bar.js:12:5)"),
            Frame {
                caller: Some("foo".to_owned()),
                file: Some("bar.js".to_owned()),
                line: Some("12".to_owned()),
                index: Some("5".to_owned()),
                log: "foo bar.js:12:5".to_owned(),
            }
        );
    }

    #[test]
    fn test_location_only() {
        let expected = Frame {
            caller: None,
            file: Some("bar.js".to_owned()),
            line: Some("12".to_owned()),
            index: Some("5".to_owned()),
            log: "bar.js:12:5".to_owned(),
        };
        assert_eq!(Frame::parse("at (bar.js:12:5)"), expected);
        assert_eq!(Frame::parse("    at bar.js:12:5"), expected);
    }

    #[test]
    fn test_line_without_colons_is_log_only() {
        let frame = Frame::parse("    at somewhere");
        assert_eq!(frame, Frame::log_only("somewhere"));
        assert!(!frame.has_location());

        let frame = Frame::parse("at foo bar");
        assert_eq!(frame, Frame::log_only("foo bar"));
    }

    #[test]
    fn test_incomplete_location_is_log_only() {
        assert_eq!(
            Frame::parse("at foo (bar.js:12)"),
            Frame::log_only("foo (bar.js:12)")
        );
        assert_eq!(
            Frame::parse("at foo (bar.js:x:5)"),
            Frame::log_only("foo (bar.js:x:5)")
        );
        assert_eq!(Frame::parse("at (:1:2)"), Frame::log_only("(:1:2)"));
    }

    #[test]
    fn test_three_tokens_is_log_only() {
        let frame = Frame::parse("    at new Connection (/srv/db.js:4:9)");
        assert_eq!(frame, Frame::log_only("new Connection (/srv/db.js:4:9)"));
    }

    #[test]
    fn test_prefix_only_line_keeps_original_text() {
        assert_eq!(Frame::parse("   at   "), Frame::log_only("at"));
    }

    #[test]
    fn test_colons_in_file_part() {
        let frame = Frame::parse(r"   at main (C:\src\app.js:3:14)");
        assert_eq!(frame.file.as_deref(), Some(r"C:\src\app.js"));
        assert_eq!(frame.line.as_deref(), Some("3"));
        assert_eq!(frame.index.as_deref(), Some("14"));

        let frame = Frame::parse("    at http://localhost:8080/app.js:10:5");
        assert_eq!(frame.caller, None);
        assert_eq!(frame.file.as_deref(), Some("http://localhost:8080/app.js"));
    }

    #[test]
    fn test_tabs_and_carriage_returns() {
        let frames = parse_stack("Error: x\r\n\tat run (job.js:1:1)\r\n\tat job.js:2:2\r\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].caller.as_deref(), Some("run"));
        assert_eq!(frames[1].index.as_deref(), Some("2"));
    }

    #[test]
    fn test_frame_count_is_lines_minus_one() {
        for depth in 1..6 {
            let mut text = String::from("Issue: depth");
            for i in 1..depth {
                text.push_str(&format!("\n    at f{i} (lib.rs:{i}:1)"));
            }
            assert_eq!(parse_stack(&text).len(), depth - 1);
        }
        assert!(parse_stack("").is_empty());
    }

    #[test]
    fn test_blank_lines_are_not_frames() {
        let frames = parse_stack("\nIssue: x\n\n    at a (a.rs:1:1)\n   \n");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_locations_with_spaces() {
        let frame = Frame::parse("    at connect (/home/ada/My Projects/app/src/db.rs:41:17)");
        assert_eq!(frame.caller.as_deref(), Some("connect"));
        assert_eq!(
            frame.file.as_deref(),
            Some("/home/ada/My Projects/app/src/db.rs")
        );
        assert_eq!(frame.line.as_deref(), Some("41"));
        assert_eq!(frame.index.as_deref(), Some("17"));
        assert_eq!(frame.log, "connect /home/ada/My Projects/app/src/db.rs:41:17");

        let frame = Frame::parse(r"    at (C:\Users\John Doe\app\main.rs:9:0)");
        assert_eq!(frame.caller, None);
        assert_eq!(frame.file.as_deref(), Some(r"C:\Users\John Doe\app\main.rs"));
        assert_eq!(frame.index.as_deref(), Some("0"));
        assert!(frame.has_location());

        // Without parentheses, whitespace still separates tokens.
        assert!(!Frame::parse("    at /home/ada/My Projects/x.rs:1:2").has_location());
    }

    #[test]
    fn test_serialized_frame_omits_absent_fields() {
        let json = serde_json::to_string(&Frame::log_only("native")).unwrap();
        assert_eq!(json, r#"{"log":"native"}"#);
    }
}
