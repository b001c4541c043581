//! Label-format grammar.
//!
//! Grammar (as typed by the operator at setup):
//!   str | int | float | bool          primitive kinds
//!   pos/neg/neu                       ordered category set, '/'-separated
//!
//! A category set needs at least two distinct, non-empty members. Members are
//! compared case-folded.

use crate::corpus::PENDING;
use crate::error::{Error, Result};

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelFormat {
    Text,
    Integer,
    Real,
    Boolean,
    /// Declared categories, in declaration order.
    Categories(Vec<String>),
}

impl LabelFormat {
    /// Parse the operator-supplied grammar string.
    pub fn from_grammar(grammar: &str) -> Result<Self> {
        let format = match grammar {
            "str" => LabelFormat::Text,
            "int" => LabelFormat::Integer,
            "float" => LabelFormat::Real,
            "bool" => LabelFormat::Boolean,
            _ => LabelFormat::Categories(parse_categories(grammar)?),
        };
        Ok(format)
    }

    /// True for kinds whose values can be averaged.
    pub fn is_numeric(&self) -> bool {
        matches!(self, LabelFormat::Integer | LabelFormat::Real)
    }
}

fn parse_categories(grammar: &str) -> Result<Vec<String>> {
    let members: Vec<String> = grammar.split('/').map(str::to_string).collect();
    if members.len() < 2 {
        return Err(Error::usage(format!(
            "label format '{}' is neither str, int, float, bool nor a '/'-separated category list",
            grammar
        )));
    }

    let mut seen: Vec<String> = Vec::with_capacity(members.len());
    for member in &members {
        let folded = member.to_lowercase();
        if member.trim().is_empty() {
            return Err(Error::usage(format!(
                "label format '{}' contains an empty category",
                grammar
            )));
        }
        if folded == PENDING {
            return Err(Error::usage(format!(
                "'{}' is reserved and cannot be a category",
                PENDING
            )));
        }
        if seen.contains(&folded) {
            return Err(Error::usage(format!(
                "label format '{}' declares category '{}' twice",
                grammar, member
            )));
        }
        seen.push(folded);
    }
    Ok(members)
}

impl fmt::Display for LabelFormat {
    /// Renders the grammar form, so a format round-trips through config.json.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelFormat::Text => f.write_str("str"),
            LabelFormat::Integer => f.write_str("int"),
            LabelFormat::Real => f.write_str("float"),
            LabelFormat::Boolean => f.write_str("bool"),
            LabelFormat::Categories(members) => f.write_str(&members.join("/")),
        }
    }
}
