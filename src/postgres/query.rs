use std::error::Error;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::Statement;
use tokio_postgres::types::{FromSql, Type};

use crate::error::SqlBridgeError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// A `numeric` value decoded to its exact decimal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgNumeric(pub String);

impl PgNumeric {
    /// The value as a float when it is finite; `NaN` and infinities stay text.
    #[must_use]
    pub fn into_row_value(self) -> RowValues {
        match self.0.parse::<f64>() {
            Ok(value) if value.is_finite() => RowValues::Float(value),
            _ => RowValues::Text(self.0),
        }
    }
}

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let word = |idx: usize| -> Result<u16, Box<dyn Error + Sync + Send>> {
            raw.get(idx * 2..idx * 2 + 2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .ok_or_else(|| "truncated numeric value".into())
        };
        let ndigits = usize::from(word(0)?);
        let weight = i32::from(i16::from_be_bytes(word(1)?.to_be_bytes()));
        let sign = word(2)?;
        let dscale = usize::from(word(3)?);
        let digits = (0..ndigits)
            .map(|i| word(4 + i))
            .collect::<Result<Vec<u16>, _>>()?;

        let negative = match sign {
            NUMERIC_POS => false,
            NUMERIC_NEG => true,
            NUMERIC_NAN => return Ok(PgNumeric("NaN".into())),
            NUMERIC_PINF => return Ok(PgNumeric("Infinity".into())),
            NUMERIC_NINF => return Ok(PgNumeric("-Infinity".into())),
            other => return Err(format!("invalid numeric sign {other:#x}").into()),
        };

        let digit_at = |group: i32| -> u16 {
            usize::try_from(group)
                .ok()
                .and_then(|idx| digits.get(idx).copied())
                .unwrap_or(0)
        };

        let mut text = String::new();
        if negative {
            text.push('-');
        }
        if weight < 0 {
            text.push('0');
        } else {
            for group in 0..=weight {
                if group == 0 {
                    write!(text, "{}", digit_at(group))?;
                } else {
                    write!(text, "{:04}", digit_at(group))?;
                }
            }
        }
        if dscale > 0 {
            let mut fraction = String::with_capacity(dscale + 4);
            let mut group = weight + 1;
            while fraction.len() < dscale {
                write!(fraction, "{:04}", digit_at(group))?;
                group += 1;
            }
            fraction.truncate(dscale);
            text.push('.');
            text.push_str(&fraction);
        }
        Ok(PgNumeric(text))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// Booleans become 0/1, temporal and JSON values become text, `numeric` becomes a float.
///
/// # Errors
/// Returns `SqlBridgeError` if the column cannot be retrieved.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, SqlBridgeError> {
    let type_info = row.columns()[idx].type_();

    let value = match type_info.name() {
        "int2" => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        "int8" => row.try_get::<_, Option<i64>>(idx)?.map(RowValues::Int),
        "oid" => row
            .try_get::<_, Option<u32>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| RowValues::Float(f64::from(v))),
        "float8" => row.try_get::<_, Option<f64>>(idx)?.map(RowValues::Float),
        "numeric" => row
            .try_get::<_, Option<PgNumeric>>(idx)?
            .map(PgNumeric::into_row_value),
        "bool" => row
            .try_get::<_, Option<bool>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        "timestamp" => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|v| RowValues::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string())),
        "timestamptz" => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| RowValues::Text(v.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string())),
        "date" => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| RowValues::Text(v.format("%Y-%m-%d").to_string())),
        "json" | "jsonb" => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(|v| RowValues::Text(v.to_string())),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map(|v| RowValues::Text(String::from_utf8_lossy(&v).into_owned())),
        // text, varchar, bpchar, name and anything else that decodes as a string
        other => row
            .try_get::<_, Option<String>>(idx)
            .map_err(|e| {
                SqlBridgeError::ExecutionError(format!(
                    "unsupported postgres column type {other}: {e}"
                ))
            })?
            .map(RowValues::Text),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Build a result set using statement metadata for column names, so empty results still carry
/// their columns.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set(
    stmt: &Statement,
    rows: &[tokio_postgres::Row],
) -> Result<ResultSet, SqlBridgeError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
