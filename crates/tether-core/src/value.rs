#![forbid(unsafe_code)]

//! Dynamically-typed property values.
//!
//! # Identity
//!
//! Change detection throughout tether uses [`Value::identical`], which
//! compares scalars by value and composites (arrays, objects, errors) by
//! reference. Two distinct arrays with the same contents are *not*
//! identical: replacing an array with an equal copy is a change.
//!
//! | Variant  | Compared by |
//! |----------|-------------|
//! | `Null`   | always identical to `Null` |
//! | `Bool`   | value |
//! | `Number` | value (`NaN` never identical) |
//! | `String` | content |
//! | `Array`  | `Rc` pointer |
//! | `Object` | `Rc` pointer |
//! | `Error`  | `Rc` pointer |

use std::fmt;
use std::rc::Rc;

use crate::object::ObjectRef;

/// A property value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent / unset.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Number (always `f64`).
    Number(f64),
    /// Immutable string.
    String(Rc<str>),
    /// Shared immutable array. Compared by reference.
    Array(Rc<[Value]>),
    /// Object handle. Compared by reference.
    Object(ObjectRef),
    /// Error value carrying a message. Compared by reference.
    Error(Rc<str>),
}

impl Value {
    /// Build a string value.
    #[must_use]
    pub fn string(s: impl AsRef<str>) -> Self {
        Self::String(Rc::from(s.as_ref()))
    }

    /// Build an array value from any iterator of values.
    #[must_use]
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    /// Build an error value.
    #[must_use]
    pub fn error(message: impl AsRef<str>) -> Self {
        Self::Error(Rc::from(message.as_ref()))
    }

    /// Reference-aware strict equality.
    #[must_use]
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => same_object(a, b),
            (Self::Error(a), Self::Error(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `true` for `Null`.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `true` for error values.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Loose truthiness: `Null`, `false`, `0`, `NaN` and `""` are falsy,
    /// everything else (including empty arrays) is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Error(_) => true,
        }
    }

    /// Borrow the object handle, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Borrow the array elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the string contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short type name, used in log output.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Error(_) => "error",
        }
    }
}

/// Pointer identity for object handles, ignoring vtable metadata.
#[must_use]
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        f.write_str("0")
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        write!(f, "{n:.0}")
    } else {
        write!(f, "{n}")
    }
}

/// String coercion: numbers drop a trailing `.0`, arrays join with `,`,
/// `Null` inside arrays prints as empty.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write_number(f, *n),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_none() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Error(msg) => f.write_str(msg),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::String(s) => f.debug_tuple("String").field(&&**s).finish(),
            Self::Array(items) => f.debug_tuple("Array").field(&&**items).finish(),
            Self::Object(obj) => write!(f, "Object({:p})", Rc::as_ptr(obj)),
            Self::Error(msg) => f.debug_tuple("Error").field(&&**msg).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Rc::from(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
