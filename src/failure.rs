//! The recognized shapes of a failure value.

use std::{borrow::Cow, error::Error, fmt};

use crate::value::{Record, Value};

/// A boxed, thread-safe error trait object.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A failure value, or a piece of context supplied alongside one.
///
/// Every input to an [`Issue`](crate::Issue) is one of these four shapes, and
/// each shape has its own total conversion to text (see
/// [`normalize`](crate::normalize)).
///
/// Values are usually produced through [`From`] conversions or the
/// [`issue!`](crate::issue!) macro, which picks [`Failure::Error`] for any type
/// implementing [`std::error::Error`]:
///
/// ```
/// use moth::{Failure, Record};
///
/// let text: Failure = "disk full".into();
/// let record: Failure = Record::new().with("path", "/var").into();
/// let number: Failure = 507.into();
/// let error = Failure::error(std::io::Error::other("disk full"));
///
/// assert!(matches!(text, Failure::Text(_)));
/// assert!(matches!(record, Failure::Record(_)));
/// assert!(matches!(number, Failure::Other(_)));
/// assert!(matches!(error, Failure::Error(_)));
/// ```
#[derive(Debug)]
pub enum Failure {
    /// A native error. Its message becomes the issue's state and the error
    /// itself becomes the issue's source.
    Error(BoxError),
    /// A plain record, rendered structurally.
    Record(Record),
    /// Text, used verbatim.
    Text(String),
    /// Any other value, converted with its default text conversion.
    Other(Value),
}

impl Failure {
    /// Wraps a native error.
    pub fn error<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Error(Box::new(error))
    }

    /// Returns a short name for the shape of this value.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::Error(_) => "error",
            Failure::Record(_) => "record",
            Failure::Text(_) => "text",
            Failure::Other(_) => "other",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Error(error) => fmt::Display::fmt(error, f),
            Failure::Record(record) => write!(f, "{}", Value::Record(record.clone())),
            Failure::Text(text) => f.write_str(text),
            Failure::Other(value) => fmt::Display::fmt(value, f),
        }
    }
}

impl From<BoxError> for Failure {
    fn from(error: BoxError) -> Self {
        Failure::Error(error)
    }
}

impl From<Record> for Failure {
    fn from(record: Record) -> Self {
        Failure::Record(record)
    }
}

impl From<String> for Failure {
    fn from(text: String) -> Self {
        Failure::Text(text)
    }
}

impl From<&str> for Failure {
    fn from(text: &str) -> Self {
        Failure::Text(text.to_owned())
    }
}

impl From<&String> for Failure {
    fn from(text: &String) -> Self {
        Failure::Text(text.clone())
    }
}

impl From<Cow<'_, str>> for Failure {
    fn from(text: Cow<'_, str>) -> Self {
        Failure::Text(text.into_owned())
    }
}

/// Routes text and records to their own variants; everything else is
/// [`Failure::Other`].
impl From<Value> for Failure {
    fn from(value: Value) -> Self {
        match value {
            Value::Text(text) => Failure::Text(text),
            Value::Record(record) => Failure::Record(record),
            other => Failure::Other(other),
        }
    }
}

macro_rules! failure_from_value {
    ($($source:ty),*) => {
        $(
            impl From<$source> for Failure {
                fn from(value: $source) -> Self {
                    Failure::Other(Value::from(value))
                }
            }
        )*
    };
}

failure_from_value!(
    bool, char, (), i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64
);

impl<T: Into<Value>> From<Vec<T>> for Failure {
    fn from(values: Vec<T>) -> Self {
        Failure::Other(Value::from(values))
    }
}

impl<T: Into<Value>> From<Option<T>> for Failure {
    fn from(value: Option<T>) -> Self {
        Failure::from(value.map_or(Value::Null, Into::into))
    }
}
