//! Plain values and records.
//!
//! A [`Value`] is the dynamically shaped data that failure payloads and their
//! context are made of: scalars, text, lists, and [`Record`]s. Records are
//! shared handles to an insertion-ordered map, so the same record can appear
//! several times in a structure, including inside itself.
//!
//! ```
//! use moth::{Record, Value};
//!
//! let request = Record::new().with("method", "GET").with("retries", 3);
//! assert_eq!(request.get("retries"), Some(Value::Int(3)));
//!
//! // Records are handles: both names point at the same map.
//! let alias = request.clone();
//! alias.insert("retries", 4);
//! assert_eq!(request.get("retries"), Some(Value::Int(4)));
//! ```

use std::{cell::RefCell, fmt};

use hashbrown::HashSet;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{
    Serialize, Serializer,
    ser::{Error as _, SerializeMap, SerializeSeq},
};
use spin::RwLock;
use triomphe::Arc;

type Fields = IndexMap<String, Value, FxBuildHasher>;

/// A dynamically shaped value.
///
/// The [`Display`](fmt::Display) implementation is the default text
/// conversion used for values that are neither text nor records: numbers print
/// the way a scripting runtime would print them, lists are joined with commas
/// and records print as `[object Object]` without descending into them.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer that does not fit in [`Value::Int`].
    UInt(u64),
    /// A floating point number.
    Float(f64),
    /// A piece of text.
    Text(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A shared record.
    Record(Record),
}

/// A shared, insertion-ordered map from string keys to [`Value`]s.
///
/// Cloning a record clones the handle, not the map. Equality is identity:
/// two records are equal when they are the same map.
///
/// Records that are made to contain themselves keep each other alive and are
/// never freed.
#[derive(Clone)]
pub struct Record(Arc<RwLock<Fields>>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(IndexMap::with_hasher(FxBuildHasher))))
    }

    /// Inserts a field and returns the record, for building records inline.
    #[must_use]
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a field, returning the previous value stored under `key`.
    ///
    /// Replacing an existing key keeps its original position.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.write().insert(key.into(), value.into())
    }

    /// Returns a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Returns the keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.read().keys().cloned().collect()
    }

    /// Returns a copy of the fields in insertion order.
    ///
    /// Nested records in the copy are handles to the same maps. Renderers work
    /// on this copy so that no lock is held while they descend.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Returns `true` if both handles point at the same map.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        &*self.0 as *const RwLock<Fields> as usize
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only the keys: the values may lead back to this record.
        f.debug_struct("Record")
            .field("keys", &self.keys())
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// How many lists and records deep the renderers descend before giving up.
pub(crate) const MAX_DEPTH: usize = 128;

/// The set of records currently being descended into.
///
/// Renderers enter a record before visiting its fields and leave it
/// afterwards; entering a record that is already on the path means the
/// structure is circular.
#[derive(Default)]
pub(crate) struct Ancestors(HashSet<usize, FxBuildHasher>);

impl Ancestors {
    /// Returns `false` if `record` is already being visited.
    pub(crate) fn enter(&mut self, record: &Record) -> bool {
        self.0.insert(record.id())
    }

    pub(crate) fn leave(&mut self, record: &Record) {
        self.0.remove(&record.id());
    }
}

pub(crate) fn write_number(f: &mut impl fmt::Write, number: f64) -> fmt::Result {
    if number.is_nan() {
        f.write_str("NaN")
    } else if number.is_infinite() {
        f.write_str(if number > 0.0 { "Infinity" } else { "-Infinity" })
    } else if number == 0.0 {
        f.write_str("0")
    } else {
        write!(f, "{number}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::UInt(value) => write!(f, "{value}"),
            Value::Float(value) => write_number(f, *value),
            Value::Text(text) => f.write_str(text),
            Value::List(items) => write_list(f, items, 1),
            Value::Record(_) => f.write_str("[object Object]"),
        }
    }
}

// Lists nested deeper than `MAX_DEPTH` print as `...`.
fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value], depth: usize) -> fmt::Result {
    if depth > MAX_DEPTH {
        return f.write_str("...");
    }
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        match item {
            // Absent list entries print as nothing.
            Value::Null => {}
            Value::List(items) => write_list(f, items, depth + 1)?,
            item => write!(f, "{item}")?,
        }
    }
    Ok(())
}

struct Tracked<'a> {
    value: &'a Value,
    ancestors: &'a RefCell<Ancestors>,
    depth: usize,
}

impl Serialize for Tracked<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.depth > MAX_DEPTH && matches!(self.value, Value::List(_) | Value::Record(_)) {
            return Err(S::Error::custom("structure is nested too deeply"));
        }
        match self.value {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Int(value) => serializer.serialize_i64(*value),
            Value::UInt(value) => serializer.serialize_u64(*value),
            Value::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            Value::Float(_) => serializer.serialize_unit(),
            Value::Text(text) => serializer.serialize_str(text),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&Tracked {
                        value: item,
                        ancestors: self.ancestors,
                        depth: self.depth + 1,
                    })?;
                }
                seq.end()
            }
            Value::Record(record) => {
                if !self.ancestors.borrow_mut().enter(record) {
                    return Err(S::Error::custom(
                        "converting circular structure to JSON",
                    ));
                }
                let entries = record.entries();
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in &entries {
                    map.serialize_entry(
                        key,
                        &Tracked {
                            value,
                            ancestors: self.ancestors,
                            depth: self.depth + 1,
                        },
                    )?;
                }
                self.ancestors.borrow_mut().leave(record);
                map.end()
            }
        }
    }
}

/// Serializes as JSON-shaped data. Non-finite floats become `null`.
///
/// Serializing a circular structure fails with a custom serializer error.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let ancestors = RefCell::new(Ancestors::default());
        Tracked {
            value: self,
            ancestors: &ancestors,
            depth: 1,
        }
        .serialize(serializer)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::Record(self.clone()).serialize(serializer)
    }
}

macro_rules! value_from {
    ($variant:ident as $target:ty: $($source:ty),*) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

value_from!(Int as i64: i8, i16, i32, i64, u8, u16, u32);
value_from!(Float as f64: f32, f64);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(value) => Value::Int(value),
            Err(_) => Value::UInt(value),
        }
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::from(value as u64)
    }
}

impl From<isize> for Value {
    fn from(value: isize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}
