#![forbid(unsafe_code)]

//! Stock transforms and the template helpers that install them.
//!
//! Each helper appends one transform to a [`BindingTemplate`]. The pure
//! coercions are exported as free functions so they can be reused inside
//! custom transforms.
//!
//! | Helper | Result |
//! |--------|--------|
//! | [`bool`](BindingTemplate::bool) | truthiness; arrays are true when non-empty |
//! | [`not`](BindingTemplate::not) | negated `bool` |
//! | [`is_null`](BindingTemplate::is_null) | `true` for `Null` |
//! | [`integer`](BindingTemplate::integer) | always a number, `parseInt` for strings |
//! | [`string`](BindingTemplate::string) | always a string, `""` for `Null` |
//! | [`multiple`](BindingTemplate::multiple) | always an array |
//! | [`single`](BindingTemplate::single) | arrays collapse to one element or a placeholder |
//! | [`not_empty`](BindingTemplate::not_empty) | placeholder for `Null`, `""`, `[]` |
//! | [`not_null`](BindingTemplate::not_null) | placeholder for `Null` |
//! | [`equal_to`](BindingTemplate::equal_to) | identity comparison with a constant |
//! | [`and`](BindingTemplate::and) / [`or`](BindingTemplate::or) / [`mix`](BindingTemplate::mix) | aggregate several source paths |
//!
//! Every unary helper except `integer`, `string`, `multiple`, `not_empty`
//! and `not_null` passes error values through untouched.

use tether_core::{PropertyPath, Value};

use super::binding::{Binding, BindingTemplate};
use super::mix::MixRecipe;
use crate::settings;

/// Truthiness with array length: errors pass, arrays are true when
/// non-empty.
#[must_use]
pub fn coerce_bool(value: Value) -> Value {
    match value {
        Value::Error(_) => value,
        Value::Array(items) => Value::Bool(!items.is_empty()),
        other => Value::Bool(other.is_truthy()),
    }
}

/// Negated [`coerce_bool`]. Errors pass.
#[must_use]
pub fn coerce_not(value: Value) -> Value {
    match coerce_bool(value) {
        Value::Bool(b) => Value::Bool(!b),
        other => other,
    }
}

/// `true` for `Null`. Errors pass.
#[must_use]
pub fn coerce_is_null(value: Value) -> Value {
    match value {
        Value::Error(_) => value,
        other => Value::Bool(other.is_none()),
    }
}

/// Always a number. `Null` is 0, strings parse like `parseInt`, booleans
/// are 0 or 1, anything else (and `NaN`) is 0.
#[must_use]
pub fn coerce_integer(value: &Value, radix: u32) -> Value {
    let n = match value {
        Value::Number(n) => *n,
        Value::String(s) => parse_int(s, radix),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    Value::Number(if n.is_nan() { 0.0 } else { n })
}

/// `parseInt` over `input`: skip leading whitespace, take an optional sign,
/// accept a `0x` prefix when `radix` is 16 (or 0), then read the longest run
/// of valid digits. Returns `NaN` when no digit is read or `radix` is out of
/// range.
#[must_use]
pub fn parse_int(input: &str, radix: u32) -> f64 {
    let mut rest = input.trim_start();
    let negative = match rest.as_bytes().first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let mut radix = radix;
    let hex_prefixed = rest.starts_with("0x") || rest.starts_with("0X");
    if radix == 0 {
        radix = if hex_prefixed { 16 } else { 10 };
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if radix == 16 && hex_prefixed {
        rest = &rest[2..];
    }

    let mut result = 0.0_f64;
    let mut digits = 0usize;
    for digit in rest.chars().map_while(|c| c.to_digit(radix)) {
        result = result * f64::from(radix) + f64::from(digit);
        digits += 1;
    }
    if digits == 0 {
        return f64::NAN;
    }
    if negative { -result } else { result }
}

/// Always a string. `Null` is `""`.
#[must_use]
pub fn coerce_string(value: Value) -> Value {
    match value {
        Value::Null => Value::string(""),
        Value::String(_) => value,
        other => Value::string(other.to_string()),
    }
}

/// Always an array. `Null` is `[]`, scalars are wrapped.
#[must_use]
pub fn coerce_multiple(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        Value::Null => Value::array([]),
        other => Value::array([other]),
    }
}

/// Arrays collapse: `[]` is `Null`, `[a]` is `a`, longer arrays become
/// `placeholder`. Everything else passes.
#[must_use]
pub fn coerce_single(value: Value, placeholder: &Value) -> Value {
    match &value {
        Value::Array(items) => match items.len() {
            0 => Value::Null,
            1 => items[0].clone(),
            _ => placeholder.clone(),
        },
        _ => value,
    }
}

/// `placeholder` for `Null`, `""` and `[]`.
#[must_use]
pub fn coerce_not_empty(value: Value, placeholder: &Value) -> Value {
    let empty = match &value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty { placeholder.clone() } else { value }
}

/// `placeholder` for `Null`.
#[must_use]
pub fn coerce_not_null(value: Value, placeholder: &Value) -> Value {
    if value.is_none() {
        placeholder.clone()
    } else {
        value
    }
}

/// Short-circuit AND: the first falsy value, else the last value. `true`
/// for no values.
#[must_use]
pub fn and_values(values: &[Value]) -> Value {
    let mut result = Value::Bool(true);
    for value in values {
        if !result.is_truthy() {
            break;
        }
        result = value.clone();
    }
    result
}

/// Short-circuit OR: the first truthy value, else the last value. `false`
/// for no values.
#[must_use]
pub fn or_values(values: &[Value]) -> Value {
    let mut result = Value::Bool(false);
    for value in values {
        if result.is_truthy() {
            break;
        }
        result = value.clone();
    }
    result
}

impl BindingTemplate {
    /// Coerce to a boolean.
    #[must_use]
    pub fn bool(self) -> Self {
        self.transform(|v: Value, _: &Binding| coerce_bool(v))
    }

    /// Set the from path, then [`bool`](Self::bool).
    #[must_use]
    pub fn bool_from(self, path: impl Into<PropertyPath>) -> Self {
        self.from(path).bool()
    }

    /// Coerce to the negated boolean.
    #[must_use]
    pub fn not(self) -> Self {
        self.transform(|v: Value, _: &Binding| coerce_not(v))
    }

    /// Set the from path, then [`not`](Self::not).
    #[must_use]
    pub fn not_from(self, path: impl Into<PropertyPath>) -> Self {
        self.from(path).not()
    }

    /// `true` when the value is `Null`.
    #[must_use]
    pub fn is_null(self) -> Self {
        self.transform(|v: Value, _: &Binding| coerce_is_null(v))
    }

    /// Set the from path, then [`is_null`](Self::is_null).
    #[must_use]
    pub fn is_null_from(self, path: impl Into<PropertyPath>) -> Self {
        self.from(path).is_null()
    }

    /// Coerce to an integer, parsing strings in base 10.
    #[must_use]
    pub fn integer(self) -> Self {
        self.integer_radix(10)
    }

    /// Coerce to an integer, parsing strings in `radix`.
    #[must_use]
    pub fn integer_radix(self, radix: u32) -> Self {
        self.transform(move |v: Value, _: &Binding| coerce_integer(&v, radix))
    }

    /// Coerce to a string.
    #[must_use]
    pub fn string(self) -> Self {
        self.transform(|v: Value, _: &Binding| coerce_string(v))
    }

    /// Coerce to an array.
    #[must_use]
    pub fn multiple(self) -> Self {
        self.transform(|v: Value, _: &Binding| coerce_multiple(v))
    }

    /// Collapse arrays, using the current `multiple_placeholder` setting.
    #[must_use]
    pub fn single(self) -> Self {
        let placeholder = settings::current().multiple_value();
        self.single_with(placeholder)
    }

    /// Collapse arrays, using `placeholder` for more than one element.
    #[must_use]
    pub fn single_with(self, placeholder: Value) -> Self {
        self.transform(move |v: Value, _: &Binding| coerce_single(v, &placeholder))
    }

    /// Replace empty values, using the current `empty_placeholder` setting.
    #[must_use]
    pub fn not_empty(self) -> Self {
        let placeholder = settings::current().empty_value();
        self.not_empty_with(placeholder)
    }

    /// Replace `Null`, `""` and `[]` with `placeholder`.
    #[must_use]
    pub fn not_empty_with(self, placeholder: Value) -> Self {
        self.transform(move |v: Value, _: &Binding| coerce_not_empty(v, &placeholder))
    }

    /// Replace `Null`, using the current `empty_placeholder` setting.
    #[must_use]
    pub fn not_null(self) -> Self {
        let placeholder = settings::current().empty_value();
        self.not_null_with(placeholder)
    }

    /// Replace `Null` with `placeholder`.
    #[must_use]
    pub fn not_null_with(self, placeholder: Value) -> Self {
        self.transform(move |v: Value, _: &Binding| coerce_not_null(v, &placeholder))
    }

    /// `true` when the value is identical to `expected`.
    #[must_use]
    pub fn equal_to(self, expected: Value) -> Self {
        self.transform(move |v: Value, _: &Binding| Value::Bool(v.identical(&expected)))
    }

    /// One-way logical AND over several source paths.
    #[must_use]
    pub fn and<S: Into<String>>(self, paths: impl IntoIterator<Item = S>) -> Self {
        self.mix(paths, and_values)
    }

    /// One-way logical OR over several source paths.
    #[must_use]
    pub fn or<S: Into<String>>(self, paths: impl IntoIterator<Item = S>) -> Self {
        self.mix(paths, or_values)
    }

    /// One-way aggregation of several source paths through `aggregate`.
    #[must_use]
    pub fn mix<S: Into<String>>(
        self,
        paths: impl IntoIterator<Item = S>,
        aggregate: impl Fn(&[Value]) -> Value + 'static,
    ) -> Self {
        let recipe = MixRecipe::new(paths, aggregate);
        if recipe.len() < 2 {
            tracing::warn!(
                paths = recipe.len(),
                "Developer Warning: invalid mix binding, it should have at least two source paths"
            );
        }
        self.with_mix(recipe)
    }
}
