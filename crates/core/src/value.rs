use std::fmt;

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::Serialize;

/// Largest magnitude at which every integer is exactly representable as f64 (2^53).
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// A single scalar cell.
///
/// Spreadsheets and the relational store disagree about types (an id column
/// read from xlsx arrives as `Float(3.0)`, the same id read back from SQLite
/// may be `Int(3)` or `Text("3")`). Values are kept verbatim; matching goes
/// through [`Value::key`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Normalized identity used for key matching across snapshots.
    ///
    /// Stable across a SQLite round trip: booleans come back as integers and
    /// dates as ISO text, so both normalize to the same key either way.
    pub fn key(&self) -> Key {
        match self {
            Value::Null => Key::Null,
            Value::Bool(b) => Key::Int(i64::from(*b)),
            Value::Int(n) => Key::Int(*n),
            Value::Float(f) => float_key(*f),
            Value::Date(d) => Key::Date(*d),
            Value::Text(s) => text_key(s),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Calendar date of this value. Text is accepted as `YYYY-MM-DD`
    /// optionally followed by a time part (`2024-03-01 00:00:00`,
    /// `2024-03-01T12:30:00`).
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(s) => {
                let s = s.trim();
                let head = s.get(..10).unwrap_or(s);
                NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
            }
            _ => None,
        }
    }
}

fn float_key(f: f64) -> Key {
    if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT {
        Key::Int(f as i64)
    } else {
        Key::Float(OrderedFloat(f))
    }
}

fn text_key(s: &str) -> Key {
    let t = s.trim();
    if is_canonical_int(t) {
        if let Ok(n) = t.parse::<i64>() {
            return Key::Int(n);
        }
    }
    if let Some(d) = iso_date(t) {
        return Key::Date(d);
    }
    Key::Text(t.to_string())
}

/// Exactly `YYYY-MM-DD`, the form dates are written in.
fn iso_date(t: &str) -> Option<NaiveDate> {
    if t.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .ok()
        .filter(|d| d.format("%Y-%m-%d").to_string() == t)
}

/// `"42"`, `"-7"`, `"0"` are canonical; `"007"`, `"+1"`, `"-0"`, `"1e3"` are not.
fn is_canonical_int(t: &str) -> bool {
    let digits = t.strip_prefix('-').unwrap_or(t);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits == "0" {
        return t == "0";
    }
    !digits.starts_with('0')
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// Hashable, totally ordered identity of a [`Value`].
///
/// Variant order defines cross-type ordering: `Null < Int < Float < Date < Text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Key {
    Null,
    Int(i64),
    Float(OrderedFloat<f64>),
    Date(NaiveDate),
    Text(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Null => f.write_str("NULL"),
            Key::Int(n) => write!(f, "{n}"),
            Key::Float(n) => write!(f, "{}", n.0),
            Key::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Key::Text(s) => f.write_str(s),
        }
    }
}
