use crate::corpus::PENDING;
use crate::label::{LabelFormat, Value};

/// Result of parsing one raw entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Value(Value),
    /// The empty entry: end the session without committing.
    Exit,
    /// Not a value of the declared format. Re-prompt; never store.
    Invalid,
}

/// Validate and normalize one raw user entry against `format`.
///
/// The empty entry is checked first and always means `Exit`, whatever the
/// format. `raw` is expected without its trailing newline.
pub fn parse(format: &LabelFormat, raw: &str) -> Parsed {
    if raw.is_empty() {
        return Parsed::Exit;
    }

    let value = match format {
        LabelFormat::Text => {
            let text = raw.to_lowercase();
            // Would read back as an unfilled slot.
            if text == PENDING {
                return Parsed::Invalid;
            }
            Some(Value::Text(text))
        }
        LabelFormat::Integer => raw.trim().parse::<i64>().ok().map(Value::Integer),
        LabelFormat::Real => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Value::Real),
        LabelFormat::Boolean => parse_bool(raw).map(Value::Boolean),
        LabelFormat::Categories(members) => {
            let folded = raw.to_lowercase();
            members
                .iter()
                .find(|m| m.to_lowercase() == folded)
                .map(|m| Value::Category(m.clone()))
        }
    };

    value.map(Parsed::Value).unwrap_or(Parsed::Invalid)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}
