//! Commonly used items for convenient importing.
//!
//! # Usage
//!
//! ```rust
//! use moth::prelude::*;
//!
//! fn divide(a: i32, b: i32) -> Result<i32, Issue> {
//!     if b == 0 {
//!         bail!("cannot divide by zero", a);
//!     }
//!     Ok(a / b)
//! }
//!
//! fn main() {
//!     assert_eq!(divide(10, 2).unwrap(), 5);
//!     assert_eq!(divide(1, 0).unwrap_err().states(), ["1"]);
//! }
//! ```
//!
//! # What's Included
//!
//! - **[`Issue`]** and **[`IssueBuilder`]**: The issue type and its builder
//! - **[`Failure`]**, **[`Record`]** and **[`Value`]**: Input values
//! - **[`IssueConfig`]**: Construction settings
//! - **[`IntoIssue`]**: Conversion of external errors into issues
//! - **[`issue!`]** and **[`bail!`]**: Macros for creating and returning issues

pub use crate::{
    Failure, Issue, IssueBuilder, IssueConfig, Record, Value, bail, compat::IntoIssue, issue,
};
