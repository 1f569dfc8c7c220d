use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// A single driver-native cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDateTime> for Scalar {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("row {row} has {actual} values, expected {expected}")]
pub struct RowShapeError {
    pub row: usize,
    pub expected: usize,
    pub actual: usize,
}

/// Column names plus row-major cells of one executed statement.
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Result<Self, RowShapeError> {
        let expected = columns.len();
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(RowShapeError {
                row,
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Convenience for single-column listings such as `show tables`.
    pub fn single_column(column: impl Into<String>, values: impl IntoIterator<Item = Scalar>) -> Self {
        Self {
            columns: vec![column.into()],
            rows: values.into_iter().map(|v| vec![v]).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First cell of every row, skipping rows whose first cell is not text.
    pub fn first_column_text(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| match row.first() {
                Some(Scalar::Text(s)) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let err = ResultSet::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![Scalar::Integer(1), Scalar::Integer(2)],
                vec![Scalar::Integer(3)],
            ],
        )
        .expect_err("ragged");
        assert_eq!(
            err,
            RowShapeError {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn unwraps_single_column_listing() {
        let rs = ResultSet::single_column("Tables_in_db1", ["t1".into(), "t2".into()]);
        assert_eq!(rs.first_column_text(), vec!["t1", "t2"]);
    }
}
