use std::fmt;

/// A single field value. Nexus records have no schema: any key may hold any
/// of these at any time, and an operation may change a key's type outright.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn as_str(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::String(v) => v.clone(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

/// Narrows a bare numeric literal (as matched by the `NUMBER` token) to
/// `Int` when it has no fractional part, `Float` otherwise.
pub fn narrow_number_literal(raw: &str) -> Value {
    if raw.contains('.') {
        Value::Float(raw.parse().unwrap_or(0.0))
    } else {
        match raw.parse::<i64>() {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Float(raw.parse().unwrap_or(0.0)),
        }
    }
}
