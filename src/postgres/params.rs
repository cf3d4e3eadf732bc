use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::types::RowValues;

type BoxError = Box<dyn Error + Sync + Send>;

/// Container for Postgres parameters with lifetime tracking
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Convert from a slice of `RowValues` to Postgres parameters
    #[must_use]
    pub fn convert(params: &'a [RowValues]) -> Params<'a> {
        let references: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Params { references }
    }

    /// Get a reference to the underlying parameter array
    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

/// Values are converted to whatever the server inferred for the placeholder, so `Int` binds
/// into `int4` columns and numeric text binds into integer columns.
impl ToSql for RowValues {
    fn to_sql(&self, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxError> {
        match self {
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::Int(i) => int_to_sql(*i, ty, out),
            RowValues::Float(f) => float_to_sql(*f, ty, out),
            RowValues::Text(s) => text_to_sql(s, ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::UNKNOWN
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
        )
    }

    to_sql_checked!();
}

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn int_to_sql(value: i64, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::BOOL => (value != 0).to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::Value::from(value).to_sql(ty, out),
        _ if is_text(ty) => value.to_string().to_sql(ty, out),
        _ => Err(format!("cannot bind integer {value} to {ty}").into()),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_sql(value: f64, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => value.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 if value.fract() == 0.0 && value.is_finite() => {
            int_to_sql(value as i64, ty, out)
        }
        Type::JSON | Type::JSONB => serde_json::Value::from(value).to_sql(ty, out),
        _ if is_text(ty) => value.to_string().to_sql(ty, out),
        _ => Err(format!("cannot bind float {value} to {ty}").into()),
    }
}

fn text_to_sql(value: &str, ty: &Type, out: &mut bytes::BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 => int_to_sql(value.trim().parse()?, ty, out),
        Type::FLOAT4 | Type::FLOAT8 => float_to_sql(value.trim().parse()?, ty, out),
        Type::BOOL => parse_bool(value)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()))
            .to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(value)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_timestamptz(value)?.to_sql(ty, out),
        Type::DATE => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")?.to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}

fn parse_bool(value: &str) -> Result<bool, BoxError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Ok(true),
        "0" | "f" | "false" | "n" | "no" | "off" => Ok(false),
        other => Err(format!("cannot bind {other:?} as boolean").into()),
    }
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, BoxError> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(Into::into)
}

fn parse_timestamptz(value: &str) -> Result<DateTime<Utc>, BoxError> {
    match DateTime::parse_from_rfc3339(value.trim()) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => Ok(parse_timestamp(value)?.and_utc()),
    }
}
