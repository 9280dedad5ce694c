//! Tabular dataset types
//!
//! A `Dataset` is the working table passed between plan steps: named columns
//! and rows of mixed-type cells.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A single cell of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Infer a typed cell from raw text.
    ///
    /// Blank text becomes `Null`, integral text becomes `Integer`, other
    /// numeric text becomes `Float`, everything else stays `Text`.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }
        CellValue::Text(trimmed.to_string())
    }

    /// Numeric view of the cell.
    ///
    /// Text cells are accepted when they hold a number decorated with a
    /// currency sign or thousands separators (e.g. `$2,799,439,100`).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Text(s) => parse_decorated_number(s),
            CellValue::Null | CellValue::Bool(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Name of the cell's type, as shown in schema descriptions
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "bool",
            CellValue::Integer(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::Text(_) => "text",
        }
    }

    /// Convert to a plain JSON value. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Integer(i) => serde_json::Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "null"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

fn parse_decorated_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Errors raised while building a dataset
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Row has {found} cells but the dataset has {expected} columns")]
    RowWidth { expected: usize, found: usize },
}

/// Named columns plus rows of cells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetParts")]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// Unchecked wire form; deserialization goes through `Dataset::from_rows`
#[derive(Deserialize)]
struct DatasetParts {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<CellValue>>,
}

impl TryFrom<DatasetParts> for Dataset {
    type Error = DatasetError;

    fn try_from(parts: DatasetParts) -> Result<Self, Self::Error> {
        Dataset::from_rows(parts.columns, parts.rows)
    }
}

impl Dataset {
    /// Create an empty dataset. Duplicate or blank column names are made unique.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: unique_column_names(columns),
            rows: Vec::new(),
        }
    }

    /// Create a dataset from columns and rows, checking every row's width
    pub fn from_rows(
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Result<Self, DatasetError> {
        let mut dataset = Self::new(columns);
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    /// Append a row
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<(), DatasetError> {
        if row.len() != self.columns.len() {
            return Err(DatasetError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of cells (rows x columns)
    pub fn cell_count(&self) -> usize {
        self.rows.len() * self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over the values of a named column
    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = &'a CellValue> + 'a> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    /// Serialize as `{"columns": [...], "rows": [[...], ...]}` with plain JSON cells
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| serde_json::Value::Array(row.iter().map(CellValue::to_json).collect()))
            .collect();
        serde_json::json!({
            "columns": self.columns,
            "rows": rows,
        })
    }
}

fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.trim().is_empty() {
                format!("Column {}", i + 1)
            } else {
                name.trim().to_string()
            };
            let mut candidate = base.clone();
            let mut suffix = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            candidate
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_checks_invariants() {
        let ds: Dataset =
            serde_json::from_str(r#"{"columns": ["a", "a"], "rows": [[1, "x"]]}"#).unwrap();
        assert_eq!(ds.columns(), ["a", "a_2"]);
        assert_eq!(ds.rows()[0][1], CellValue::Text("x".to_string()));

        let err = serde_json::from_str::<Dataset>(r#"{"columns": ["a", "a"], "rows": [[1]]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("1 cells"));
    }

    #[test]
    fn test_infer_cell_types() {
        assert_eq!(CellValue::infer("2018"), CellValue::Integer(2018));
        assert_eq!(CellValue::infer(" 3.5 "), CellValue::Float(3.5));
        assert_eq!(CellValue::infer(""), CellValue::Null);
        assert_eq!(
            CellValue::infer("Avatar"),
            CellValue::Text("Avatar".to_string())
        );
        assert_eq!(
            CellValue::infer("NaN"),
            CellValue::Text("NaN".to_string())
        );
    }

    #[test]
    fn test_decorated_numbers() {
        let gross = CellValue::Text("$2,923,706,026".to_string());
        assert_eq!(gross.as_f64(), Some(2_923_706_026.0));
        assert_eq!(CellValue::Text("n/a".to_string()).as_f64(), None);
        assert_eq!(CellValue::Null.as_f64(), None);
    }

    #[test]
    fn test_duplicate_columns_are_renamed() {
        let ds = Dataset::new(vec![
            "Year".to_string(),
            "Year".to_string(),
            " ".to_string(),
        ]);
        assert_eq!(ds.columns(), &["Year", "Year_2", "Column 3"]);
    }

    #[test]
    fn test_row_width_is_checked() {
        let mut ds = Dataset::new(vec!["a".to_string(), "b".to_string()]);
        assert!(ds.push_row(vec![CellValue::Integer(1)]).is_err());
        assert!(ds
            .push_row(vec![CellValue::Integer(1), CellValue::Null])
            .is_ok());
        assert_eq!(ds.num_rows(), 1);
        assert_eq!(ds.cell_count(), 2);
    }

    #[test]
    fn test_column_values() {
        let ds = Dataset::from_rows(
            vec!["Year".to_string()],
            vec![
                vec![CellValue::Integer(2018)],
                vec![CellValue::Integer(2021)],
            ],
        )
        .unwrap();
        let years: Vec<_> = ds.column_values("Year").unwrap().collect();
        assert_eq!(years.len(), 2);
        assert!(ds.column_values("Missing").is_none());
    }

    #[test]
    fn test_non_finite_float_serializes_as_null() {
        assert_eq!(CellValue::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }
}
