//! Bidirectional integration with the [`anyhow`] 1.x error handling library.
//!
//! To enable this integration, add the `compat-anyhow1` feature flag to your
//! `Cargo.toml`.
//!
//! # Converting from Anyhow
//!
//! Use the [`IntoIssue`] trait. The issue's state is anyhow's outermost
//! message, and the anyhow error (with its whole context chain) becomes the
//! issue's source:
//!
//! ```
//! use moth::prelude::*;
//!
//! fn anyhow_function() -> anyhow::Result<String> {
//!     anyhow::bail!("something went wrong");
//! }
//!
//! fn issue_function() -> Result<String, Issue> {
//!     let value = anyhow_function().into_issue()?;
//!     Ok(value)
//! }
//!
//! assert_eq!(issue_function().unwrap_err().state(), "something went wrong");
//! ```
//!
//! An [`anyhow::Error`] is also accepted anywhere a [`Failure`] is, for
//! example as a context value of [`issue!`](crate::issue!).
//!
//! # Converting to Anyhow
//!
//! [`Issue`] implements [`std::error::Error`], so the `?` operator converts
//! it into an [`anyhow::Error`] on its own. The [`IntoAnyhow`] trait does the
//! same explicitly:
//!
//! ```
//! use anyhow::Context;
//! use moth::{compat::anyhow1::IntoAnyhow, prelude::*};
//!
//! fn issue_function() -> Result<String, Issue> {
//!     Err(issue!("connection failed"))
//! }
//!
//! fn anyhow_function() -> anyhow::Result<String> {
//!     let value = issue_function()
//!         .into_anyhow()
//!         .context("failed to fetch data")?;
//!     Ok(value)
//! }
//!
//! let error = anyhow_function().unwrap_err();
//! assert_eq!(format!("{error:#}"), "failed to fetch data: connection failed");
//! ```

use super::IntoIssue;
use crate::{Failure, Issue, failure::BoxError};

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Failure::Error(BoxError::from(error))
    }
}

impl IntoIssue for anyhow::Error {
    type Output = Issue;

    #[inline(always)]
    fn into_issue(self) -> Self::Output {
        Issue::new(self)
    }
}

impl<T> IntoIssue for anyhow::Result<T> {
    type Output = Result<T, Issue>;

    #[inline(always)]
    fn into_issue(self) -> Self::Output {
        self.map_err(IntoIssue::into_issue)
    }
}

/// A trait for converting [`Issue`]s into [`anyhow::Error`].
///
/// Implemented for [`Issue`] and `Result<T, Issue>`.
///
/// ```
/// use moth::{compat::anyhow1::IntoAnyhow, prelude::*};
///
/// let error: anyhow::Error = issue!("operation failed").into_anyhow();
/// assert!(error.downcast_ref::<Issue>().is_some());
/// ```
pub trait IntoAnyhow {
    /// The type produced by the conversion.
    ///
    /// - For [`Issue`]: produces [`anyhow::Error`]
    /// - For `Result<T, Issue>`: produces [`anyhow::Result<T>`]
    type Output;

    /// Converts this value into an anyhow type.
    fn into_anyhow(self) -> Self::Output;
}

impl IntoAnyhow for Issue {
    type Output = anyhow::Error;

    #[inline(always)]
    fn into_anyhow(self) -> Self::Output {
        anyhow::Error::new(self)
    }
}

impl<T> IntoAnyhow for Result<T, Issue> {
    type Output = anyhow::Result<T>;

    #[inline(always)]
    fn into_anyhow(self) -> Self::Output {
        self.map_err(IntoAnyhow::into_anyhow)
    }
}
