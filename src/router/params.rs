//! Typed route parameters.
//!
//! Every value a route hands to its handler is a [`ParamValue`]. Values captured
//! from the path start out as raw strings and are converted according to the
//! [`ParamType`] declared for them at registration:
//!
//! | Type     | Accepted input                                       |
//! |----------|------------------------------------------------------|
//! | `string` | anything                                             |
//! | `int`    | ASCII digits only                                    |
//! | `float`  | a numeric literal (`3`, `-2.5`, `.5`, `1e3`)         |
//! | `bool`   | `1/0/true/false/yes/no/on/off`, any letter case      |

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::RouterError;

// Sign, mantissa with at most one dot, optional exponent. Rejects `inf`/`NaN`,
// which `f64::from_str` would otherwise accept.
static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
        .unwrap_or_else(|e| {
            tracing::error!("Failed to compile numeric regex: {}", e);
            Regex::new(r"[^\s\S]").unwrap()
        })
});

/// The declared type of a route parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamType {
    Int,
    #[default]
    String,
    Float,
    Bool,
}

impl ParamType {
    /// Look up a type by the name used in route files.
    ///
    /// Returns `None` for names outside the supported set; callers turn that into
    /// [`RouterError::UnsupportedParameterType`].
    ///
    /// # Examples
    ///
    /// ```
    /// use watamelo::router::ParamType;
    ///
    /// assert_eq!(ParamType::from_name("int"), Some(ParamType::Int));
    /// assert_eq!(ParamType::from_name("Boolean"), Some(ParamType::Bool));
    /// assert_eq!(ParamType::from_name("array"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "int" | "integer" => Some(Self::Int),
            "string" | "str" => Some(Self::String),
            "float" | "double" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Bool),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }

    /// Convert the raw path segment `raw` captured for parameter `name`.
    ///
    /// # Errors
    ///
    /// [`RouterError::InvalidParameterValue`] when `raw` is not a valid literal of
    /// this type. `String` never fails.
    pub fn coerce(self, name: &str, raw: &str) -> Result<ParamValue, RouterError> {
        let value = match self {
            Self::String => Some(ParamValue::Str(raw.to_owned())),
            Self::Int => {
                if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
                    raw.parse().ok().map(ParamValue::Int)
                } else {
                    None
                }
            }
            Self::Float => {
                if NUMERIC.is_match(raw) {
                    raw.parse().ok().map(ParamValue::Float)
                } else {
                    None
                }
            }
            Self::Bool => parse_bool(raw).map(ParamValue::Bool),
        };

        value.ok_or_else(|| RouterError::InvalidParameterValue {
            name: name.to_owned(),
            value: raw.to_owned(),
            expected: self,
        })
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// A typed parameter value passed to a handler.
///
/// Deserializes from plain JSON scalars, which is how route files declare
/// optional defaults and additional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl ParamValue {
    /// The type this value carries.
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Int(_) => ParamType::Int,
            Self::Float(_) => ParamType::Float,
            Self::Bool(_) => ParamType::Bool,
            Self::Str(_) => ParamType::String,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Floats also accept integer values.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Ordered name → value arguments produced by a successful match.
///
/// Order is: required parameters in pattern order, then optional parameters in
/// declaration order, then additional parameters. Handlers that consume arguments
/// positionally rely on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, ParamValue)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: ParamValue) {
        self.entries.push((name.into(), value));
    }

    /// Returns the value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_int)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_float)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    /// Parameter names in argument order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Values in argument order, for positional invocation.
    pub fn values(&self) -> impl Iterator<Item = &ParamValue> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(result: Result<ParamValue, RouterError>) -> bool {
        matches!(result, Err(RouterError::InvalidParameterValue { .. }))
    }

    // ── ParamType::coerce ─────────────────────────────────────────────────────

    #[test]
    fn string_accepts_anything() {
        assert_eq!(
            ParamType::String.coerce("x", "héllo world").unwrap(),
            ParamValue::Str("héllo world".into())
        );
    }

    #[test]
    fn int_accepts_digits() {
        assert_eq!(ParamType::Int.coerce("x", "42").unwrap(), ParamValue::Int(42));
        assert_eq!(ParamType::Int.coerce("x", "007").unwrap(), ParamValue::Int(7));
    }

    #[test]
    fn int_rejects_non_digits() {
        assert!(invalid(ParamType::Int.coerce("x", "notanumber")));
        assert!(invalid(ParamType::Int.coerce("x", "-1")));
        assert!(invalid(ParamType::Int.coerce("x", "4.2")));
        assert!(invalid(ParamType::Int.coerce("x", "")));
    }

    #[test]
    fn int_rejects_overflow() {
        assert!(invalid(ParamType::Int.coerce("x", "99999999999999999999")));
    }

    #[test]
    fn float_accepts_numeric_literals() {
        assert_eq!(ParamType::Float.coerce("f", "2.5").unwrap(), ParamValue::Float(2.5));
        assert_eq!(ParamType::Float.coerce("f", "-3").unwrap(), ParamValue::Float(-3.0));
        assert_eq!(ParamType::Float.coerce("f", ".5").unwrap(), ParamValue::Float(0.5));
        assert_eq!(ParamType::Float.coerce("f", "1e3").unwrap(), ParamValue::Float(1000.0));
    }

    #[test]
    fn float_rejects_non_numeric() {
        assert!(invalid(ParamType::Float.coerce("f", "abc")));
        assert!(invalid(ParamType::Float.coerce("f", "inf")));
        assert!(invalid(ParamType::Float.coerce("f", "NaN")));
        assert!(invalid(ParamType::Float.coerce("f", "1.2.3")));
    }

    #[test]
    fn bool_accepts_literal_set_any_case() {
        for raw in ["1", "true", "YES", "On"] {
            assert_eq!(ParamType::Bool.coerce("b", raw).unwrap(), ParamValue::Bool(true));
        }
        for raw in ["0", "False", "no", "OFF"] {
            assert_eq!(ParamType::Bool.coerce("b", raw).unwrap(), ParamValue::Bool(false));
        }
    }

    #[test]
    fn bool_rejects_unknown_token() {
        assert!(invalid(ParamType::Bool.coerce("b", "maybe")));
    }

    #[test]
    fn coerce_error_names_parameter() {
        match ParamType::Int.coerce("id", "abc") {
            Err(RouterError::InvalidParameterValue {
                name,
                value,
                expected,
            }) => {
                assert_eq!(name, "id");
                assert_eq!(value, "abc");
                assert_eq!(expected, ParamType::Int);
            }
            other => panic!("expected InvalidParameterValue, got {other:?}"),
        }
    }

    // ── ParamValue ────────────────────────────────────────────────────────────

    #[test]
    fn value_deserializes_from_json_scalars() {
        let values: Vec<ParamValue> = serde_json::from_str(r#"[1, 1.5, true, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Int(1),
                ParamValue::Float(1.5),
                ParamValue::Bool(true),
                ParamValue::Str("x".into()),
            ]
        );
    }

    // ── Arguments ─────────────────────────────────────────────────────────────

    #[test]
    fn arguments_preserve_insertion_order() {
        let mut args = Arguments::new();
        args.push("id", ParamValue::Int(7));
        args.push("slug", ParamValue::Str("hello".into()));
        assert_eq!(args.names().collect::<Vec<_>>(), vec!["id", "slug"]);
        assert_eq!(args.int("id"), Some(7));
        assert_eq!(args.str("slug"), Some("hello"));
        assert_eq!(args.int("slug"), None);
        assert_eq!(args.float("id"), Some(7.0));
        assert!(args.get("missing").is_none());
    }
}
