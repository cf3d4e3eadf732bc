use rusqlite::types::Value;

use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Null => Value::Null,
    }
}

/// Owned `SQLite` parameters, ready to move onto the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<Value>);

impl Params {
    #[must_use]
    pub fn convert(params: &[RowValues]) -> Self {
        Params(params.iter().map(row_value_to_sqlite_value).collect())
    }

    /// Build a borrowed params slice suitable for rusqlite execution.
    #[must_use]
    pub fn as_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.0.iter().map(|v| v as &dyn rusqlite::ToSql).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_each_variant() {
        let params = Params::convert(&[
            RowValues::Int(3),
            RowValues::Float(1.5),
            RowValues::Text("x".into()),
            RowValues::Null,
        ]);
        assert_eq!(
            params.0,
            vec![
                Value::Integer(3),
                Value::Real(1.5),
                Value::Text("x".into()),
                Value::Null
            ]
        );
        assert_eq!(params.as_refs().len(), 4);
    }
}
