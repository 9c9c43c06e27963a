//! Column rules for uploaded patient sheets.
//!
//! Header names are matched after trimming and ignoring case. Every column
//! that is not reserved is a candidate service name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Declarative description of a patient sheet's layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColumnRules {
    /// Columns that never name a service
    pub reserved_columns: Vec<String>,
    /// Columns every sheet must carry
    pub mandatory_columns: Vec<String>,
    /// Cell values (trimmed, lowercased) that select a service
    pub truthy_values: Vec<String>,
    pub row_id_column: String,
    pub name_column: String,
    pub age_column: String,
    pub gender_column: String,
    pub phone_column: String,
}

impl Default for ColumnRules {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            reserved_columns: owned(&["patient_id", "patient_name", "age", "gender", "phone"]),
            mandatory_columns: owned(&["patient_name", "age", "gender", "phone"]),
            truthy_values: owned(&["yes", "1", "true", "done"]),
            row_id_column: "patient_id".into(),
            name_column: "patient_name".into(),
            age_column: "age".into(),
            gender_column: "gender".into(),
            phone_column: "phone".into(),
        }
    }
}

fn same_column(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

impl ColumnRules {
    /// Check the rules are self-consistent.
    pub fn validate(&self) -> Result<(), String> {
        if self.truthy_values.iter().all(|v| v.trim().is_empty()) {
            return Err("truthy_values must contain at least one value".into());
        }
        let named = [
            &self.row_id_column,
            &self.name_column,
            &self.age_column,
            &self.gender_column,
            &self.phone_column,
        ];
        for column in self.mandatory_columns.iter().chain(named) {
            if !self.is_reserved(column) {
                return Err(format!("column {:?} must be listed in reserved_columns", column));
            }
        }
        Ok(())
    }

    pub fn is_reserved(&self, column: &str) -> bool {
        self.reserved_columns.iter().any(|r| same_column(r, column))
    }

    /// Mandatory columns absent from `columns`, in rule order.
    pub fn missing_mandatory<S: AsRef<str>>(&self, columns: &[S]) -> Vec<String> {
        self.mandatory_columns
            .iter()
            .filter(|m| !columns.iter().any(|c| same_column(c.as_ref(), m)))
            .cloned()
            .collect()
    }

    /// Non-reserved, non-blank columns in header order.
    pub fn candidate_service_columns<'c, S: AsRef<str>>(&self, columns: &'c [S]) -> Vec<&'c str> {
        columns
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| !c.trim().is_empty() && !self.is_reserved(c))
            .collect()
    }

    pub fn is_truthy(&self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        self.truthy_values
            .iter()
            .any(|t| t.trim().eq_ignore_ascii_case(&value))
    }

    /// Candidate columns whose cell in `row` is truthy, in header order, trimmed.
    pub fn selected_services<S: AsRef<str>>(
        &self,
        columns: &[S],
        row: &HashMap<String, String>,
    ) -> Vec<String> {
        self.candidate_service_columns(columns)
            .into_iter()
            .filter(|column| {
                row.get(*column)
                    .map(|value| self.is_truthy(value))
                    .unwrap_or(false)
            })
            .map(|column| column.trim().to_string())
            .collect()
    }

    /// Cell for a reserved column, found by header name regardless of case.
    pub fn cell<'r>(&self, row: &'r HashMap<String, String>, column: &str) -> Option<&'r str> {
        row.get(column)
            .or_else(|| {
                row.iter()
                    .find(|(k, _)| same_column(k, column))
                    .map(|(_, v)| v)
            })
            .map(|v| v.as_str())
    }
}

/// Parse an age cell. Empty is 0; integral decimals such as "34.0" are accepted.
pub fn parse_age(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    if let Ok(age) = raw.parse::<u32>() {
        return Ok(age);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => {
            Ok(value as u32)
        }
        _ => Err(format!("invalid age {:?}", raw)),
    }
}
