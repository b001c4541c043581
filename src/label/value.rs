use crate::label::LabelFormat;

use std::fmt;

/// A label value of one of the declared kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Category(String),
}

impl Value {
    /// Rebuild a typed value from its persisted cell text.
    ///
    /// Returns None when the cell does not hold a value of `format`, e.g. a
    /// cell edited by hand outside this tool.
    pub fn decode(format: &LabelFormat, cell: &str) -> Option<Value> {
        match format {
            LabelFormat::Text => Some(Value::Text(cell.to_string())),
            LabelFormat::Integer => cell.trim().parse().ok().map(Value::Integer),
            LabelFormat::Real => cell
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Value::Real),
            LabelFormat::Boolean => match cell.trim() {
                "true" => Some(Value::Boolean(true)),
                "false" => Some(Value::Boolean(false)),
                _ => None,
            },
            LabelFormat::Categories(members) => members
                .iter()
                .find(|m| m.as_str() == cell)
                .map(|m| Value::Category(m.clone())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// The persisted cell form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) | Value::Category(s) => f.write_str(s),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
        }
    }
}
