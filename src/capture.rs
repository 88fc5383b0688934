//! Native stack capture.
//!
//! When an issue is built without explicit stack text, the current call stack
//! is captured and rendered in the common runtime layout, one frame per line:
//!
//! ```text
//! Issue: connection refused
//!     at connect (/build/src/db.rs:41:17)
//!     at main (/build/src/main.rs:9:5)
//! ```
//!
//! That text is what the [trace parser](crate::trace) reads back into frames.
//! Capturing needs the `backtrace` feature (enabled by default); without it the
//! captured text is the first line only.
//!
//! # Debugging symbols in release builds
//!
//! Frames without symbol or file information are left out. To keep useful
//! frames in release builds, keep debug information:
//!
//! ```toml
//! [profile.release]
//! strip = false
//! debug = "line-tables-only"
//! ```

/// Returns the first line of a stack text for an issue with the given state.
///
/// Only the first line of the state is used, so the header is always exactly
/// one line.
pub fn header(state: &str) -> String {
    format!("Issue: {}", state.lines().next().unwrap_or_default())
}

/// Captures the current stack as text, with at most `limit` frame lines after
/// the header.
pub fn capture_stack(state: &str, limit: usize) -> String {
    #[cfg(feature = "backtrace")]
    {
        let filter = CaptureFilter {
            max_frames: limit,
            ..CaptureFilter::DEFAULT
        };
        NativeStack::capture(&filter).render(state)
    }

    #[cfg(not(feature = "backtrace"))]
    {
        let _ = limit;
        header(state)
    }
}

#[cfg(feature = "backtrace")]
pub use self::native::{CaptureFilter, FramePath, NativeFrame, NativeStack};

#[cfg(feature = "backtrace")]
mod native {
    use std::{fmt::Write as _, sync::OnceLock};

    use backtrace::BytesOrWideString;

    use super::header;
    use crate::config::DEFAULT_TRACE_LIMIT;

    /// A captured native call stack, most recent call first.
    #[derive(Debug)]
    pub struct NativeStack {
        /// The kept frames.
        pub frames: Vec<NativeFrame>,
        /// Number of frames dropped by the frame limit or by trailing
        /// runtime-frame trimming.
        pub omitted: usize,
    }

    /// A single resolved native frame.
    #[derive(Debug)]
    pub struct NativeFrame {
        /// The demangled symbol, without its hash.
        pub symbol: String,
        /// The function name: the last path segment of the symbol, without
        /// whitespace.
        pub caller: String,
        /// The source file.
        pub path: FramePath,
        /// 1-based line number.
        pub line: u32,
        /// 1-based column, or 0 when the debug information has none.
        pub column: u32,
    }

    /// The source file of a frame.
    #[derive(Debug)]
    pub struct FramePath {
        /// The path as recorded in the debug information.
        pub raw_path: String,
        /// The crate the file belongs to, when it can be told from the path.
        ///
        /// Recognizes the Rust standard library sources (`std`, `core`,
        /// `alloc`, `test`) and crates from the Cargo registry.
        pub crate_name: Option<String>,
    }

    /// Which frames a capture keeps.
    ///
    /// ```rust
    /// use moth::capture::{CaptureFilter, NativeStack};
    ///
    /// let stack = NativeStack::capture(&CaptureFilter {
    ///     max_frames: 5,
    ///     ..CaptureFilter::DEFAULT
    /// });
    /// assert!(stack.frames.len() <= 5);
    /// ```
    #[derive(Copy, Clone, Debug)]
    pub struct CaptureFilter {
        /// Symbol prefixes of frames skipped while they appear at the start of
        /// the stack. These are the frames of the capture itself and of the
        /// issue constructor.
        pub skipped_initial_symbols: &'static [&'static str],
        /// Crates whose frames are trimmed from the end of the stack.
        pub skipped_final_crates: &'static [&'static str],
        /// Symbols trimmed from the end of the stack.
        pub skipped_final_symbols: &'static [&'static str],
        /// Maximum number of frames to keep.
        pub max_frames: usize,
    }

    impl CaptureFilter {
        /// Default filter settings.
        pub const DEFAULT: Self = Self {
            skipped_initial_symbols: &[
                "backtrace::",
                "moth::capture::",
                "moth::issue::Issue::",
                "moth::issue::IssueBuilder::",
            ],
            skipped_final_crates: &["std", "core", "alloc", "test"],
            skipped_final_symbols: &[
                "__libc_start_call_main",
                "__libc_start_main_impl",
                "__libc_start_main",
                "_start",
                "start_thread",
                "__clone",
                "__clone3",
                "clone3",
            ],
            max_frames: DEFAULT_TRACE_LIMIT,
        };
    }

    impl Default for CaptureFilter {
        fn default() -> Self {
            Self::DEFAULT
        }
    }

    impl NativeStack {
        /// Captures the current stack.
        pub fn capture(filter: &CaptureFilter) -> Self {
            let mut initial_filtering = !filter.skipped_initial_symbols.is_empty();
            let mut frames: Vec<NativeFrame> = Vec::new();
            let mut omitted = 0;

            backtrace::trace(|frame| {
                backtrace::resolve_frame(frame, |symbol| {
                    // Frames without a name, file or line cannot be rendered
                    // as a location.
                    let (Some(name), Some(filename_raw), Some(line)) =
                        (symbol.name(), symbol.filename_raw(), symbol.lineno())
                    else {
                        return;
                    };

                    let symbol_name = format!("{name:#}");

                    if initial_filtering {
                        if filter
                            .skipped_initial_symbols
                            .iter()
                            .any(|prefix| symbol_name.starts_with(prefix))
                        {
                            return;
                        }
                        initial_filtering = false;
                    }

                    if frames.len() >= filter.max_frames {
                        omitted += 1;
                        return;
                    }

                    frames.push(NativeFrame {
                        caller: function_name(&symbol_name).split_whitespace().collect(),
                        symbol: symbol_name,
                        path: FramePath::new(filename_raw),
                        line,
                        column: symbol.colno().unwrap_or(0),
                    });
                });

                true
            });

            while let Some(last) = frames.last() {
                if last.is_runtime(filter) {
                    frames.pop();
                    omitted += 1;
                } else {
                    break;
                }
            }

            tracing::trace!(frames = frames.len(), omitted, "captured native stack");

            Self { frames, omitted }
        }

        /// Renders the stack as text: the header line for `state`, then one
        /// `at` line per frame.
        pub fn render(&self, state: &str) -> String {
            let mut text = header(state);
            for frame in &self.frames {
                let path = &frame.path.raw_path;
                let (line, column) = (frame.line, frame.column);
                let _ = if frame.caller.is_empty() {
                    write!(text, "\n    at ({path}:{line}:{column})")
                } else {
                    write!(text, "\n    at {} ({path}:{line}:{column})", frame.caller)
                };
            }
            text
        }
    }

    impl NativeFrame {
        fn is_runtime(&self, filter: &CaptureFilter) -> bool {
            self.path
                .crate_name
                .as_deref()
                .is_some_and(|crate_name| filter.skipped_final_crates.contains(&crate_name))
                || filter.skipped_final_symbols.contains(&self.symbol.as_str())
        }
    }

    impl FramePath {
        fn new(path: BytesOrWideString<'_>) -> Self {
            static REGEXES: OnceLock<Option<[regex::Regex; 2]>> = OnceLock::new();
            let regexes = REGEXES.get_or_init(|| {
                Some([
                    // Rust standard library paths:
                    // - /lib/rustlib/src/rust/library/{std|core|alloc|test}/src/...
                    // - /rustc/{40-char-hash}/library/{std|core|alloc|test}/src/...
                    regex::Regex::new(
                        r"(?:/lib/rustlib/src/rust|^/rustc/[0-9a-f]{40})/library/(std|core|alloc|test)/src/.*$",
                    )
                    .ok()?,
                    // Cargo registry paths:
                    // - /.cargo/registry/src/{index}-{16-char-hash}/{crate}-{version}/src/...
                    regex::Regex::new(
                        r"/\.cargo/registry/src/[^/]+-[0-9a-f]{16}/([^./]+)-[0-9]+\.[^/]*/src/.*$",
                    )
                    .ok()?,
                ])
            });

            let raw_path = path.to_str_lossy().into_owned();
            let crate_name = regexes.as_ref().and_then(|regexes| {
                regexes.iter().find_map(|regex| {
                    regex
                        .captures(&raw_path)
                        .and_then(|captures| captures.get(1))
                        .map(|crate_capture| crate_capture.as_str().to_owned())
                })
            });

            Self {
                raw_path,
                crate_name,
            }
        }
    }

    /// Returns the last path segment of a demangled symbol.
    ///
    /// Segments are split on `::` outside of generic arguments and closure
    /// markers. Trailing generic segments (`parse::<u32>`) and trait
    /// qualifications (`<T as Trait>::fmt`) are not names.
    fn function_name(symbol: &str) -> &str {
        let mut depth = 0usize;
        let mut previous = 0u8;
        let mut segment_start = 0;
        let mut name = symbol;

        for (i, byte) in symbol.bytes().enumerate() {
            match byte {
                b'<' | b'{' | b'(' | b'[' => depth += 1,
                // `->` in a function pointer type does not close a bracket.
                b'>' if previous != b'-' => depth = depth.saturating_sub(1),
                b'}' | b')' | b']' => depth = depth.saturating_sub(1),
                b':' if depth == 0 && previous == b':' => {
                    let segment = &symbol[segment_start..i - 1];
                    if is_name(segment) {
                        name = segment;
                    }
                    segment_start = i + 1;
                    previous = 0;
                    continue;
                }
                _ => {}
            }
            previous = byte;
        }

        let last = &symbol[segment_start..];
        if is_name(last) { last } else { name }
    }

    fn is_name(segment: &str) -> bool {
        !segment.is_empty() && !segment.starts_with('<')
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_function_name() {
            assert_eq!(function_name("moth::issue::tests::builds"), "builds");
            assert_eq!(
                function_name("<moth::Issue as core::fmt::Display>::fmt"),
                "fmt"
            );
            assert_eq!(
                function_name("moth::capture::NativeStack::capture::{{closure}}"),
                "{{closure}}"
            );
            assert_eq!(function_name("main"), "main");
            assert_eq!(function_name("app::parse::<u32>"), "parse");
            assert_eq!(
                function_name("app::run::<fn() -> u8>::{{closure}}"),
                "{{closure}}"
            );
        }

        #[test]
        fn test_render_layout() {
            let stack = NativeStack {
                frames: vec![
                    NativeFrame {
                        symbol: "app::connect".to_owned(),
                        caller: "connect".to_owned(),
                        path: FramePath {
                            raw_path: "/build/src/db.rs".to_owned(),
                            crate_name: None,
                        },
                        line: 41,
                        column: 17,
                    },
                    NativeFrame {
                        symbol: String::new(),
                        caller: String::new(),
                        path: FramePath {
                            raw_path: "/build/src/main.rs".to_owned(),
                            crate_name: None,
                        },
                        line: 9,
                        column: 0,
                    },
                ],
                omitted: 0,
            };

            assert_eq!(
                stack.render("connection refused\nretrying"),
                "Issue: connection refused\n    at connect (/build/src/db.rs:41:17)\n    at (/build/src/main.rs:9:0)"
            );
        }

        #[test]
        fn test_rendered_paths_with_spaces_parse_back() {
            let frame = |caller: &str, raw_path: &str| NativeFrame {
                symbol: String::new(),
                caller: caller.to_owned(),
                path: FramePath {
                    raw_path: raw_path.to_owned(),
                    crate_name: None,
                },
                line: 41,
                column: 17,
            };
            let stack = NativeStack {
                frames: vec![
                    frame("connect", "/home/ada/My Projects/app/src/db.rs"),
                    frame("", r"C:\Users\John Doe\app\src\main.rs"),
                ],
                omitted: 0,
            };

            let frames = crate::trace::parse_stack(&stack.render("refused"));
            assert_eq!(frames.len(), 2);
            assert!(frames.iter().all(crate::Frame::has_location));
            assert_eq!(frames[0].caller.as_deref(), Some("connect"));
            assert_eq!(
                frames[0].file.as_deref(),
                Some("/home/ada/My Projects/app/src/db.rs")
            );
            assert_eq!(frames[1].caller, None);
            assert_eq!(
                frames[1].file.as_deref(),
                Some(r"C:\Users\John Doe\app\src\main.rs")
            );
        }

        #[test]
        fn test_capture_respects_frame_limit() {
            for max_frames in [0, 1, 3] {
                let stack = NativeStack::capture(&CaptureFilter {
                    max_frames,
                    ..CaptureFilter::DEFAULT
                });
                assert!(stack.frames.len() <= max_frames);
            }
        }

        #[test]
        fn test_captured_text_parses_back() {
            let text = super::super::capture_stack("state", 10);
            let frames = crate::trace::parse_stack(&text);
            assert!(text.starts_with("Issue: state"));
            assert_eq!(frames.len(), text.lines().count() - 1);
            assert!(frames.len() <= 10);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_uses_first_line() {
        assert_eq!(header("boom"), "Issue: boom");
        assert_eq!(header("first\nsecond"), "Issue: first");
    }
}
