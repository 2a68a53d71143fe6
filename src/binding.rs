//! Parameter binding: tag parsing, value coercion, timestamp normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::types::{Bindings, SqlValue};

/// Coercion applied to a tagged binding before it reaches the driver.
///
/// A closed set; tags arriving as text go through [`BindingType::from_tag`],
/// where unknown tags fall back to `Str` and integer tags become `Raw`
/// driver type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// Bind as a `YYYY-MM-DD` date string
    Date,
    /// Bind as a `YYYY-MM-DD HH:MM:SS.ffffff` timestamp string
    Time,
    /// Bind as boolean
    Bool,
    /// Bind as NULL regardless of the supplied value
    Null,
    /// Coerce to integer
    Int,
    /// Coerce to string
    Str,
    /// Bind as a binary large object
    Lob,
    /// Wrap the value in `%…%` and bind as string
    Like,
    /// Pass the value through with a driver-native type code
    Raw(i32),
}

impl BindingType {
    /// Parse a textual tag into its coercion.
    pub fn from_tag(tag: &str) -> BindingType {
        if let Ok(code) = tag.trim().parse::<i32>() {
            return BindingType::Raw(code);
        }
        match tag.to_ascii_lowercase().as_str() {
            "date" => BindingType::Date,
            "time" => BindingType::Time,
            "bool" | "boolean" => BindingType::Bool,
            "null" => BindingType::Null,
            "int" | "integer" | "number" | "limit" | "offset" => BindingType::Int,
            "str" | "string" | "text" | "float" | "varchar" | "varchar2" => BindingType::Str,
            "lob" | "large" | "object" | "blob" => BindingType::Lob,
            "like" => BindingType::Like,
            _ => BindingType::Str,
        }
    }
}

/// Apply every binding's coercion, producing driver-ready named parameters.
pub fn resolve_bindings(bindings: &Bindings) -> Vec<(String, SqlValue)> {
    bindings
        .iter()
        .map(|(name, binding)| {
            let value = match binding.tag {
                Some(tag) => coerce(&binding.value, tag),
                None => binding.value.clone(),
            };
            (name.to_string(), value)
        })
        .collect()
}

/// Coerce one value per its tag.
pub fn coerce(value: &SqlValue, tag: BindingType) -> SqlValue {
    match tag {
        BindingType::Date => {
            SqlValue::Text(resolve_instant(value).format("%Y-%m-%d").to_string())
        }
        BindingType::Time => SqlValue::Text(
            resolve_instant(value)
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string(),
        ),
        BindingType::Bool => SqlValue::Bool(truthy(value)),
        BindingType::Null => SqlValue::Null,
        BindingType::Int => SqlValue::Int(to_int(value)),
        BindingType::Str => SqlValue::Text(to_text(value)),
        BindingType::Lob => SqlValue::Blob(to_bytes(value)),
        BindingType::Like => SqlValue::Text(format!("%{}%", to_text(value))),
        BindingType::Raw(_) => value.clone(),
    }
}

/// Resolve a raw value to a point in time.
///
/// Integers are epoch seconds; numeric strings equal to their own integer
/// cast are epoch seconds too; other strings get a free-form parse. Anything
/// else, or a failed parse, resolves to the current wall clock.
pub fn resolve_instant(value: &SqlValue) -> NaiveDateTime {
    match value {
        SqlValue::Int(secs) => epoch(*secs),
        SqlValue::Float(secs) => DateTime::from_timestamp(
            secs.trunc() as i64,
            (secs.fract().abs() * 1_000_000_000.0) as u32,
        )
        .map(|dt| dt.naive_utc())
        .unwrap_or_else(now_micros),
        SqlValue::Timestamp(dt) => *dt,
        SqlValue::Text(s) => {
            let trimmed = s.trim();
            if let Ok(secs) = trimmed.parse::<i64>() {
                epoch(secs)
            } else {
                parse_datetime_text(trimmed).unwrap_or_else(now_micros)
            }
        }
        _ => now_micros(),
    }
}

fn epoch(secs: i64) -> NaiveDateTime {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_else(now_micros)
}

/// Current wall clock, truncated to microsecond precision.
fn now_micros() -> NaiveDateTime {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), now.timestamp_subsec_micros() * 1000)
        .map(|dt| dt.naive_utc())
        .unwrap_or_else(|| now.naive_utc())
}

fn parse_datetime_text(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn truthy(value: &SqlValue) -> bool {
    match value {
        SqlValue::Int(i) => *i != 0,
        SqlValue::Float(f) => *f != 0.0,
        SqlValue::Text(s) => !(s.is_empty() || s == "0"),
        SqlValue::Bool(b) => *b,
        SqlValue::Timestamp(_) => true,
        SqlValue::Null => false,
        SqlValue::JSON(j) => !j.is_null(),
        SqlValue::Blob(b) => !b.is_empty(),
    }
}

fn to_int(value: &SqlValue) -> i64 {
    match value {
        SqlValue::Int(i) => *i,
        SqlValue::Float(f) => f.trunc() as i64,
        SqlValue::Text(s) => leading_int(s),
        SqlValue::Bool(b) => i64::from(*b),
        SqlValue::Timestamp(dt) => dt.and_utc().timestamp(),
        SqlValue::JSON(j) => j.as_i64().unwrap_or(0),
        SqlValue::Null | SqlValue::Blob(_) => 0,
    }
}

/// Integer value of a string's leading digits (optionally signed); 0 when
/// the string has none.
fn leading_int(s: &str) -> i64 {
    let trimmed = s.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

fn to_text(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(s) => s.clone(),
        SqlValue::Int(i) => i.to_string(),
        SqlValue::Float(f) => f.to_string(),
        SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        SqlValue::Timestamp(dt) => dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        SqlValue::Null => String::new(),
        SqlValue::JSON(j) => j.to_string(),
        SqlValue::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

fn to_bytes(value: &SqlValue) -> Vec<u8> {
    match value {
        SqlValue::Blob(b) => b.clone(),
        SqlValue::Text(s) => s.clone().into_bytes(),
        other => to_text(other).into_bytes(),
    }
}
