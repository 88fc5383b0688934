//! Interoperability with other error handling approaches.
//!
//! # Available Integrations
//!
//! - [`boxed_error`] - Convert issues to and from boxed error trait objects
//!   (`Box<dyn Error + Send + Sync>`)
//! - [`anyhow1`] - Integration with the `anyhow` 1.x error handling library
//!   (requires the `compat-anyhow1` feature flag)
//!
//! Each module converts in both directions. Errors coming in become the
//! primary value of a new [`Issue`], so their message becomes the issue's state
//! and the original error stays reachable through
//! [`source`](std::error::Error::source). Issues going out are wrapped as-is,
//! since [`Issue`] already implements [`std::error::Error`].
//!
//! # Example
//!
//! ```
//! use moth::prelude::*;
//!
//! fn legacy_function() -> Result<u32, Box<dyn std::error::Error + Send + Sync>> {
//!     Err("legacy failure".into())
//! }
//!
//! fn new_function() -> Result<u32, Issue> {
//!     let value = legacy_function().into_issue()?;
//!     Ok(value)
//! }
//!
//! assert_eq!(new_function().unwrap_err().state(), "legacy failure");
//! ```

use crate::Issue;

/// A trait for converting external error types into [`Issue`]s.
///
/// Implemented for error values and for `Result`s carrying them. For a
/// `Result`, only the error variant is converted.
pub trait IntoIssue {
    /// The type produced by the conversion.
    ///
    /// For error types, this is [`Issue`]. For `Result` types, this is
    /// `Result<T, Issue>`.
    type Output;

    /// Converts this value into an issue, or a result carrying one.
    fn into_issue(self) -> Self::Output;
}

impl<T> IntoIssue for Result<T, Issue> {
    type Output = Self;

    #[inline(always)]
    fn into_issue(self) -> Self::Output {
        self
    }
}

pub mod boxed_error;

#[cfg(feature = "compat-anyhow1")]
#[cfg_attr(docsrs, doc(cfg(feature = "compat-anyhow1")))]
pub mod anyhow1;
