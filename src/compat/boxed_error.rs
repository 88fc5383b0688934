//! Convert [`Issue`]s to and from boxed error trait objects.
//!
//! # Converting from Boxed Errors
//!
//! Use the [`IntoIssue`] trait:
//!
//! ```
//! use moth::prelude::*;
//! use std::error::Error;
//!
//! let boxed: Box<dyn Error + Send + Sync> = "database offline".into();
//! let issue: Issue = boxed.into_issue();
//! assert_eq!(issue.state(), "database offline");
//! ```
//!
//! # Converting to Boxed Errors
//!
//! Use the [`IntoBoxedError`] trait, or the standard `From` conversion that
//! every error type gets:
//!
//! ```
//! use moth::{compat::boxed_error::IntoBoxedError, prelude::*};
//! use std::error::Error;
//!
//! fn uses_issue() -> Result<(), Issue> {
//!     bail!("permission denied");
//! }
//!
//! fn uses_boxed_error() -> Result<(), Box<dyn Error + Send + Sync>> {
//!     uses_issue().into_boxed_error()?;
//!     Ok(())
//! }
//!
//! assert_eq!(uses_boxed_error().unwrap_err().to_string(), "permission denied");
//! ```

use super::IntoIssue;
use crate::{Issue, failure::BoxError};

impl IntoIssue for BoxError {
    type Output = Issue;

    #[inline(always)]
    fn into_issue(self) -> Self::Output {
        Issue::new(self)
    }
}

impl<T> IntoIssue for Result<T, BoxError> {
    type Output = Result<T, Issue>;

    #[inline(always)]
    fn into_issue(self) -> Self::Output {
        self.map_err(IntoIssue::into_issue)
    }
}

/// A trait for converting [`Issue`]s into boxed error trait objects.
pub trait IntoBoxedError {
    /// The type produced by the conversion.
    ///
    /// - For [`Issue`]: produces `Box<dyn Error + Send + Sync>`
    /// - For `Result<T, Issue>`: produces `Result<T, Box<dyn Error + Send + Sync>>`
    type Output;

    /// Converts this value into a boxed error, or a result carrying one.
    fn into_boxed_error(self) -> Self::Output;
}

impl IntoBoxedError for Issue {
    type Output = BoxError;

    #[inline(always)]
    fn into_boxed_error(self) -> Self::Output {
        Box::new(self)
    }
}

impl<T> IntoBoxedError for Result<T, Issue> {
    type Output = Result<T, BoxError>;

    #[inline(always)]
    fn into_boxed_error(self) -> Self::Output {
        self.map_err(IntoBoxedError::into_boxed_error)
    }
}
