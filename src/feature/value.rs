use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::FeatureError;
use crate::Result;

/// Native type of a feature value as reported by discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    List,
}

/// Protocol-neutral value carried by attributes, operation results and
/// notification payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<FeatureValue>),
}

/// Rendering requested by an adapter for `get_attribute`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueFormat {
    /// Plain human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Text => "text",
            ValueType::Bytes => "bytes",
            ValueType::List => "list",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FeatureValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            FeatureValue::Null => ValueType::Null,
            FeatureValue::Bool(_) => ValueType::Bool,
            FeatureValue::Int(_) => ValueType::Int,
            FeatureValue::Float(_) => ValueType::Float,
            FeatureValue::Text(_) => ValueType::Text,
            FeatureValue::Bytes(_) => ValueType::Bytes,
            FeatureValue::List(_) => ValueType::List,
        }
    }

    /// Parses user input into a value of the attribute's native type.
    ///
    /// `Bytes` accepts hex with optional `:` separators, `List` accepts a JSON array.
    pub fn parse(
        input: &str,
        expected: ValueType,
    ) -> Result<FeatureValue> {
        let conversion = || FeatureError::Conversion {
            value: input.to_string(),
            expected: expected.to_string(),
        };
        let trimmed = input.trim();

        let value = match expected {
            ValueType::Null => FeatureValue::Null,
            ValueType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => FeatureValue::Bool(true),
                "false" | "0" | "no" | "off" => FeatureValue::Bool(false),
                _ => return Err(conversion().into()),
            },
            ValueType::Int => FeatureValue::Int(trimmed.parse().map_err(|_| conversion())?),
            ValueType::Float => FeatureValue::Float(trimmed.parse().map_err(|_| conversion())?),
            ValueType::Text => FeatureValue::Text(input.to_string()),
            ValueType::Bytes => FeatureValue::Bytes(parse_hex(trimmed).ok_or_else(conversion)?),
            ValueType::List => {
                let items: Vec<serde_json::Value> = serde_json::from_str(trimmed).map_err(|_| conversion())?;
                FeatureValue::List(items.into_iter().map(FeatureValue::from).collect())
            }
        };
        Ok(value)
    }

    /// Converts between native types where the conversion is lossless
    pub fn coerce(
        self,
        expected: ValueType,
    ) -> Result<FeatureValue> {
        if self.value_type() == expected {
            return Ok(self);
        }
        match (self, expected) {
            (FeatureValue::Int(v), ValueType::Float) => Ok(FeatureValue::Float(v as f64)),
            (FeatureValue::Bool(v), ValueType::Int) => Ok(FeatureValue::Int(v as i64)),
            (FeatureValue::Text(s), t) => FeatureValue::parse(&s, t),
            (v, ValueType::Text) => Ok(FeatureValue::Text(v.to_string())),
            (v, t) => Err(FeatureError::Conversion {
                value: v.to_string(),
                expected: t.to_string(),
            }
            .into()),
        }
    }

    pub fn render(
        &self,
        format: ValueFormat,
    ) -> Result<String> {
        match format {
            ValueFormat::Text => Ok(self.to_string()),
            ValueFormat::Json => serde_json::to_string(self).map_err(|e| {
                FeatureError::Conversion {
                    value: self.to_string(),
                    expected: format!("json ({e})"),
                }
                .into()
            }),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FeatureValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            FeatureValue::Null => f.write_str("null"),
            FeatureValue::Bool(v) => write!(f, "{v}"),
            FeatureValue::Int(v) => write!(f, "{v}"),
            FeatureValue::Float(v) => write!(f, "{v}"),
            FeatureValue::Text(v) => f.write_str(v),
            FeatureValue::Bytes(v) => {
                let hex: Vec<String> = v.iter().map(|b| format!("{b:02x}")).collect();
                f.write_str(&hex.join(":"))
            }
            FeatureValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<serde_json::Value> for FeatureValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FeatureValue::Null,
            serde_json::Value::Bool(b) => FeatureValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FeatureValue::Int(i),
                None => FeatureValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FeatureValue::Text(s),
            serde_json::Value::Array(items) => FeatureValue::List(items.into_iter().map(FeatureValue::from).collect()),
            other => FeatureValue::Text(other.to_string()),
        }
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Int(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Text(v)
    }
}

impl From<bool> for FeatureValue {
    fn from(v: bool) -> Self {
        FeatureValue::Bool(v)
    }
}

fn parse_hex(input: &str) -> Option<Vec<u8>> {
    let digits: String = input.chars().filter(|c| *c != ':' && !c.is_whitespace()).collect();
    if !digits.is_ascii() || digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}
