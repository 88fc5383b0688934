/// Builds an [`Issue`](crate::Issue) from a primary value and optional context
/// values.
///
/// Each argument may be any value implementing [`std::error::Error`] (plus
/// `Send + Sync + 'static`), or any value convertible into a
/// [`Failure`](crate::Failure). Errors are always kept as errors, so the issue's
/// [`source`](std::error::Error::source) is the original error even when the
/// type also converts into a [`Failure`](crate::Failure) another way.
///
/// This is equivalent to
/// `Issue::builder(primary).context(a).context(b).build()`.
///
/// # Examples
///
/// ```
/// use std::error::Error;
///
/// use moth::{Record, issue};
///
/// let issue = issue!("quota exceeded");
/// assert_eq!(issue.state(), "quota exceeded");
///
/// let io_error = std::io::Error::other("connection reset");
/// let issue = issue!(io_error, "while syncing", Record::new().with("peer", 3));
/// assert_eq!(issue.state(), "connection reset");
/// assert_eq!(issue.states(), ["while syncing", "peer:3"]);
/// assert!(issue.source().is_some());
/// ```
#[macro_export]
macro_rules! issue {
    ($primary:expr $(, $context:expr)* $(,)?) => {
        $crate::Issue::builder($crate::__failure!($primary))
            $(.context($crate::__failure!($context)))*
            .build()
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __failure {
    ($value:expr) => {{
        use $crate::__private::kind::*;
        let value = $value;
        let kind = (&&Wrap(&value)).failure_kind();
        kind.into_failure(value)
    }};
}

/// Return early with an issue.
///
/// This macro is similar to the [`bail!`] macro from the [`anyhow`] crate.
/// It builds an issue using the same arguments as the [`issue!`] macro, and
/// then returns early from the function with that issue wrapped in an `Err`.
///
/// This is equivalent to writing `return Err(issue!(...).into());`
///
/// [`bail!`]: https://docs.rs/anyhow/latest/anyhow/macro.bail.html
/// [`anyhow`]: https://docs.rs/anyhow/latest/anyhow/
///
/// # Examples
///
/// ```
/// use moth::{bail, Issue};
///
/// fn reserve(seats: i64) -> Result<(), Issue> {
///     if seats < 0 {
///         bail!("seat count must be non-negative", seats);
///     }
///     Ok(())
/// }
///
/// let issue = reserve(-2).unwrap_err();
/// assert_eq!(issue.states(), ["-2"]);
/// ```
#[macro_export]
macro_rules! bail {
    ($($args:tt)*) => {
        return $crate::__private::Err($crate::issue!($($args)*).into())
    };
}
