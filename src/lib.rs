#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Normalize arbitrary failure values into structured, inspectable issues.
//!
//! ## Overview
//!
//! Code that fails does not always fail with a proper error type. A failure
//! may be a native error, a bag of fields describing what went wrong, a bare
//! message, or some other value entirely. This crate turns any of those into
//! an [`Issue`]: a uniform record holding
//!
//! - a canonical text **state** describing the primary failure,
//! - the normalized **states** of any context values supplied with it,
//! - the **traces** parsed from the stack the issue was built at,
//! - the **timestamp** of construction.
//!
//! ## Quick Example
//!
//! ```
//! use moth::{Record, issue};
//!
//! let request = Record::new()
//!     .with("method", "PUT")
//!     .with("path", "/objects/17");
//!
//! let issue = issue!(std::io::Error::other("disk full"), request, "retry 2 of 3");
//!
//! assert_eq!(issue.state(), "disk full");
//! assert_eq!(issue.states(), ["method:PUT,path:/objects/17", "retry 2 of 3"]);
//! assert!(issue.stack().starts_with("Issue: disk full"));
//! ```
//!
//! ## Failure Values
//!
//! Every input is a [`Failure`], one of four shapes, each with a conversion to
//! text that cannot fail:
//!
//! - **Errors** use their `Display` message. A primary error also becomes the
//!   issue's [`source`](std::error::Error::source).
//! - **Records** are shared, insertion-ordered maps (see [`Record`]). A primary
//!   record is rendered at full depth (`{ id: 7, tags: [ 'a' ] }`), falling
//!   back to JSON and then to a flat `key:value` join when the record contains
//!   itself. Context records use the flat join. Both choices are set through
//!   [`RecordStyle`] in the [`IssueConfig`].
//! - **Text** is used verbatim.
//! - **Other values** use their default conversion: numbers print like
//!   numbers, lists join their items with commas.
//!
//! ## Stack Traces
//!
//! Unless stack text is supplied with [`IssueBuilder::stack`], the native call
//! stack is captured when the issue is built (see [`capture`]), limited to
//! [`IssueConfig::trace_limit`] frames. The [`trace`] module parses the text
//! into [`Frame`]s:
//!
//! ```
//! use moth::Issue;
//!
//! let issue = Issue::builder("timeout")
//!     .stack("Error: timeout\n    at poll (worker.js:88:13)\n    at worker.js:12:1")
//!     .build();
//!
//! let frame = &issue.traces()[0];
//! assert_eq!(frame.caller.as_deref(), Some("poll"));
//! assert_eq!(frame.file.as_deref(), Some("worker.js"));
//! assert_eq!(frame.line.as_deref(), Some("88"));
//! assert_eq!(frame.index.as_deref(), Some("13"));
//! assert_eq!(issue.traces()[1].caller, None);
//! ```
//!
//! ## Feature Flags
//!
//! - `backtrace` (default) - Capture the native call stack when no stack text
//!   is supplied.
//! - `compat-anyhow1` - Conversions to and from [`anyhow`] 1.x errors.
//!
//! [`anyhow`]: https://docs.rs/anyhow

#[macro_use]
mod macros;

pub mod capture;
pub mod compat;
pub mod config;
pub mod failure;
pub mod normalize;
pub mod prelude;
pub mod timestamp;
pub mod trace;
pub mod value;

mod issue;

pub use self::{
    config::IssueConfig,
    failure::{BoxError, Failure},
    issue::{Issue, IssueBuilder, IssueSnapshot},
    normalize::RecordStyle,
    timestamp::Timestamp,
    trace::Frame,
    value::{Record, Value},
};

/// A [`Result`](core::result::Result) type alias where the error is [`Issue`].
///
/// ```
/// use moth::issue;
///
/// fn parse_port(text: &str) -> moth::Result<u16> {
///     text.parse::<u16>().map_err(|error| issue!(error, text))
/// }
///
/// assert_eq!(parse_port("8080").unwrap(), 8080);
/// assert_eq!(parse_port("http").unwrap_err().states(), ["http"]);
/// ```
pub type Result<T, E = Issue> = core::result::Result<T, E>;

// Not public API. Referenced by macro-generated code.
#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    pub use core::result::Result::Err;

    #[doc(hidden)]
    pub mod kind {
        use std::error::Error;

        use crate::Failure;

        #[doc(hidden)]
        pub struct Wrap<'a, T>(pub &'a T);

        #[doc(hidden)]
        #[derive(Copy, Clone, Debug)]
        pub struct ErrorTag;

        impl ErrorTag {
            #[inline(always)]
            pub fn into_failure<E>(self, error: E) -> Failure
            where
                E: Error + Send + Sync + 'static,
            {
                Failure::error(error)
            }
        }

        #[doc(hidden)]
        #[derive(Copy, Clone, Debug)]
        pub struct IntoTag;

        impl IntoTag {
            #[inline(always)]
            pub fn into_failure<T>(self, value: T) -> Failure
            where
                T: Into<Failure>,
            {
                value.into()
            }
        }

        #[doc(hidden)]
        pub trait ErrorKind {
            #[inline(always)]
            fn failure_kind(&self) -> ErrorTag {
                ErrorTag
            }
        }

        impl<T> ErrorKind for &Wrap<'_, T> where T: Error + Send + Sync + 'static {}

        #[doc(hidden)]
        pub trait IntoKind {
            #[inline(always)]
            fn failure_kind(&self) -> IntoTag {
                IntoTag
            }
        }

        impl<T> IntoKind for Wrap<'_, T> where T: Into<Failure> {}
    }
}
