use serde_json::Value as JsonValue;

use super::{ColumnSpec, KeyRole, TableSchema};
use crate::error::SqlBridgeError;
use crate::types::RowValues;

pub(super) fn validate_token(token: &str) -> Result<(), SqlBridgeError> {
    let (kind, length) = match token.split_once('|') {
        Some((kind, length)) => (kind, Some(length)),
        None => (token, None),
    };
    if kind.trim().is_empty() {
        return Err(SqlBridgeError::InvalidFieldSpec(format!(
            "empty column kind in {token:?}"
        )));
    }
    if !kind
        .trim()
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b' ')
    {
        return Err(SqlBridgeError::InvalidFieldSpec(format!(
            "invalid column kind {kind:?}"
        )));
    }
    if let Some(length) = length {
        let length = length.trim();
        if length.is_empty() || !length.bytes().all(|b| b.is_ascii_digit() || b == b',') {
            return Err(SqlBridgeError::InvalidFieldSpec(format!(
                "invalid length {length:?} in {token:?}"
            )));
        }
    }
    Ok(())
}

pub(super) fn parse_column(value: &JsonValue) -> Result<ColumnSpec, SqlBridgeError> {
    match value {
        JsonValue::String(token) => token.parse(),
        JsonValue::Array(items) => parse_array(items),
        other => Err(SqlBridgeError::InvalidFieldSpec(format!(
            "expected a string or an array, got {other}"
        ))),
    }
}

// [kind] | [kind, default] | [kind, default, flag]
fn parse_array(items: &[JsonValue]) -> Result<ColumnSpec, SqlBridgeError> {
    let (kind, rest) = match items.split_first() {
        Some((JsonValue::String(kind), rest)) if rest.len() <= 2 => (kind, rest),
        Some((JsonValue::String(_), _)) => {
            return Err(SqlBridgeError::InvalidFieldSpec(format!(
                "field spec takes at most 3 elements, got {}",
                items.len()
            )));
        }
        _ => {
            return Err(SqlBridgeError::InvalidFieldSpec(
                "field spec array must start with a kind string".into(),
            ));
        }
    };

    let mut spec: ColumnSpec = kind.parse()?;
    if let Some(default) = rest.first() {
        spec = match default {
            JsonValue::Array(_) | JsonValue::Object(_) => {
                return Err(SqlBridgeError::InvalidFieldSpec(format!(
                    "default must be a scalar, got {default}"
                )));
            }
            scalar => spec.with_default(RowValues::from_json(scalar)),
        };
    }
    if let Some(flag) = rest.get(1) {
        let role = match flag {
            JsonValue::Null => KeyRole::None,
            JsonValue::Number(n) => n.as_i64().map_or_else(
                || {
                    Err(SqlBridgeError::InvalidFieldSpec(format!(
                        "key role flag must be an integer, got {n}"
                    )))
                },
                KeyRole::from_flag,
            )?,
            other => {
                return Err(SqlBridgeError::InvalidFieldSpec(format!(
                    "key role flag must be an integer, got {other}"
                )));
            }
        };
        if role.is_primary() {
            spec = spec.with_key(role);
        }
    }
    Ok(spec)
}

pub(super) fn parse_table(value: &JsonValue) -> Result<TableSchema, SqlBridgeError> {
    let JsonValue::Object(map) = value else {
        return Err(SqlBridgeError::InvalidFieldSpec(format!(
            "expected an object of field specs, got {value}"
        )));
    };
    let mut schema = TableSchema::new();
    for (name, spec) in map {
        let spec = parse_column(spec).map_err(|err| match err {
            SqlBridgeError::InvalidFieldSpec(msg) => {
                SqlBridgeError::InvalidFieldSpec(format!("column {name}: {msg}"))
            }
            other => other,
        })?;
        schema.push(name.as_str(), spec);
    }
    Ok(schema)
}
