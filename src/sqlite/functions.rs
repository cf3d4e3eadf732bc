//! MySQL-flavoured scalar functions, so queries written for a server backend keep working on
//! an embedded database.

use chrono::Utc;
use rusqlite::Connection;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Value, ValueRef};

pub(super) fn register(conn: &Connection) -> rusqlite::Result<()> {
    let deterministic = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("UNIX_TIMESTAMP", 0, FunctionFlags::SQLITE_UTF8, |_ctx| {
        Ok(Utc::now().timestamp())
    })?;
    conn.create_scalar_function("LOCATE", 2, deterministic, |ctx| {
        Ok(match (arg_text(ctx, 0), arg_text(ctx, 1)) {
            (Some(needle), Some(haystack)) => Some(locate(&needle, &haystack)),
            _ => None,
        })
    })?;
    conn.create_scalar_function("IF", 3, deterministic, |ctx| {
        let pick = if truthy(ctx.get_raw(0)) { 1 } else { 2 };
        Ok(owned(ctx.get_raw(pick)))
    })?;
    conn.create_scalar_function("CONCAT", -1, deterministic, |ctx| {
        let mut out = String::new();
        for idx in 0..ctx.len() {
            match arg_text(ctx, idx) {
                Some(part) => out.push_str(&part),
                None => return Ok(None),
            }
        }
        Ok(Some(out))
    })?;
    Ok(())
}

/// 1-based character position of `needle` in `haystack`, 0 when absent.
fn locate(needle: &str, haystack: &str) -> i64 {
    haystack.find(needle).map_or(0, |byte_idx| {
        i64::try_from(haystack[..byte_idx].chars().count()).map_or(0, |chars| chars + 1)
    })
}

fn owned(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

fn arg_text(ctx: &Context<'_>, idx: usize) -> Option<String> {
    match ctx.get_raw(idx) {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn truthy(value: ValueRef<'_>) -> bool {
    match value {
        ValueRef::Null => false,
        ValueRef::Integer(i) => i != 0,
        ValueRef::Real(f) => f != 0.0,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes)
            .trim()
            .parse::<f64>()
            .is_ok_and(|n| n != 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        register(&conn).unwrap();
        conn
    }

    #[test]
    fn locate_is_one_based_and_char_aware() {
        let conn = conn();
        let pos: i64 = conn
            .query_row("SELECT LOCATE('b', 'abc')", [], |r| r.get(0))
            .unwrap();
        assert_eq!(pos, 2);
        let pos: i64 = conn
            .query_row("SELECT LOCATE('z', 'abc')", [], |r| r.get(0))
            .unwrap();
        assert_eq!(pos, 0);
        assert_eq!(locate("t", "été"), 2);
        let pos: Option<i64> = conn
            .query_row("SELECT LOCATE(NULL, 'abc')", [], |r| r.get(0))
            .unwrap();
        assert_eq!(pos, None);
    }

    #[test]
    fn if_picks_branch() {
        let conn = conn();
        let v: String = conn
            .query_row("SELECT IF(1 > 0, 'yes', 'no')", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, "yes");
        let v: i64 = conn
            .query_row("SELECT IF(NULL, 1, 2)", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, 2);
    }

    #[test]
    fn concat_is_variadic_and_null_propagating() {
        let conn = conn();
        let v: String = conn
            .query_row("SELECT CONCAT('a', 1, 'b', 2.5)", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, "a1b2.5");
        let v: Option<String> = conn
            .query_row("SELECT CONCAT('a', NULL)", [], |r| r.get(0))
            .unwrap();
        assert_eq!(v, None);
    }

    #[test]
    fn unix_timestamp_is_current() {
        let conn = conn();
        let now: i64 = conn
            .query_row("SELECT UNIX_TIMESTAMP()", [], |r| r.get(0))
            .unwrap();
        assert!((now - Utc::now().timestamp()).abs() < 5);
    }
}
