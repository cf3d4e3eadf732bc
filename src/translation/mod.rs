use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{
    closes_dollar_quote, ends_block_comment, open_dollar_quote, starts_block_comment,
    starts_line_comment,
};
use scanner::{State, scan_digits, scan_identifier};

use crate::error::SqlBridgeError;
use crate::types::{Params, RowValues};

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?` and `?1`.
    Sqlite,
}

/// SQL text with placeholders in backend syntax and parameters in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement<'a> {
    pub sql: Cow<'a, str>,
    pub params: Vec<RowValues>,
}

/// Rewrite placeholders into `target` syntax and order parameters for positional binding.
///
/// Positional parameters use `?` (numbered `?N` / `$N` are also accepted); named parameters use
/// `:name` and are numbered by first appearance, so a name used twice binds once. Quoted strings,
/// quoted identifiers, comments and dollar-quoted blocks are skipped by a lightweight state
/// machine. Parameter values go through [`RowValues::into_bind_value`].
///
/// ```rust
/// use sql_bridge::prelude::*;
/// use sql_bridge::translation::{PlaceholderStyle, bind_placeholders};
///
/// let params = Params::Named(vec![("id".into(), RowValues::Int(7))]);
/// let bound = bind_placeholders(
///     "SELECT * FROM t WHERE id = :id OR parent = :id",
///     params,
///     PlaceholderStyle::Postgres,
/// )?;
/// assert_eq!(bound.sql, "SELECT * FROM t WHERE id = $1 OR parent = $1");
/// assert_eq!(bound.params, vec![RowValues::Int(7)]);
/// # Ok::<(), SqlBridgeError>(())
/// ```
///
/// # Errors
/// Returns `SqlBridgeError::ParameterError` when a named placeholder has no value or when bare
/// `?` placeholders are mixed with named parameters.
pub fn bind_placeholders(
    sql: &str,
    params: Params,
    target: PlaceholderStyle,
) -> Result<BoundStatement<'_>, SqlBridgeError> {
    match params {
        Params::Positional(values) => Ok(BoundStatement {
            sql: rewrite(sql, target, None)?,
            params: values.into_iter().map(RowValues::into_bind_value).collect(),
        }),
        Params::Named(pairs) => {
            let mut named = NamedSlots::new(pairs);
            let sql = rewrite(sql, target, Some(&mut named))?;
            Ok(BoundStatement {
                sql,
                params: named.into_ordered()?,
            })
        }
    }
}

/// Translate placeholders between Postgres-style `$N` and SQLite-style `?N`/`?`.
///
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    rewrite(sql, target, None).unwrap_or(Cow::Borrowed(sql))
}

struct NamedSlots {
    supplied: Vec<(String, RowValues)>,
    order: Vec<String>,
}

impl NamedSlots {
    fn new(pairs: Vec<(String, RowValues)>) -> Self {
        let supplied = pairs
            .into_iter()
            .map(|(name, value)| (name.trim_start_matches(':').to_string(), value))
            .collect();
        Self {
            supplied,
            order: Vec::new(),
        }
    }

    /// 1-based slot for `name`, assigning a new one on first use.
    fn slot(&mut self, name: &str) -> usize {
        if let Some(pos) = self.order.iter().position(|n| n == name) {
            pos + 1
        } else {
            self.order.push(name.to_string());
            self.order.len()
        }
    }

    fn into_ordered(mut self) -> Result<Vec<RowValues>, SqlBridgeError> {
        let mut ordered = Vec::with_capacity(self.order.len());
        for name in &self.order {
            let idx = self
                .supplied
                .iter()
                .position(|(supplied, _)| supplied == name)
                .ok_or_else(|| {
                    SqlBridgeError::ParameterError(format!("no value bound for :{name}"))
                })?;
            let (_, value) = self.supplied.swap_remove(idx);
            ordered.push(value.into_bind_value());
        }
        Ok(ordered)
    }
}

fn rewrite<'a>(
    sql: &'a str,
    target: PlaceholderStyle,
    mut named: Option<&mut NamedSlots>,
) -> Result<Cow<'a, str>, SqlBridgeError> {
    let mut out: Option<String> = None;
    // Bytes of `sql` before this index are already in `out`.
    let mut copied = 0;
    let mut state = State::Normal;
    let mut bare_count = 0usize;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::Backticked,
                _ if starts_line_comment(bytes, idx) => state = State::LineComment,
                _ if starts_block_comment(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, advance)) = open_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    } else if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1) {
                        if matches!(target, PlaceholderStyle::Sqlite) {
                            splice(sql, &mut out, &mut copied, idx, digits_end, &format!("?{digits}"));
                        }
                        idx = digits_end - 1;
                    }
                }
                b'?' => {
                    if let Some((digits_end, digits)) = scan_digits(bytes, idx + 1) {
                        if matches!(target, PlaceholderStyle::Postgres) {
                            splice(sql, &mut out, &mut copied, idx, digits_end, &format!("${digits}"));
                        }
                        idx = digits_end - 1;
                    } else {
                        if named.is_some() {
                            return Err(SqlBridgeError::ParameterError(
                                "positional `?` placeholder used with named parameters".into(),
                            ));
                        }
                        bare_count += 1;
                        if matches!(target, PlaceholderStyle::Postgres) {
                            splice(sql, &mut out, &mut copied, idx, idx + 1, &format!("${bare_count}"));
                        }
                    }
                }
                b':' if bytes.get(idx + 1) == Some(&b':') => {
                    // `::type` cast
                    idx += 1;
                }
                b':' => {
                    if let Some(slots) = named.as_deref_mut()
                        && let Some((name_end, name)) = scan_identifier(bytes, idx + 1)
                    {
                        let slot = slots.slot(name);
                        let text = match target {
                            PlaceholderStyle::Postgres => format!("${slot}"),
                            PlaceholderStyle::Sqlite => format!("?{slot}"),
                        };
                        splice(sql, &mut out, &mut copied, idx, name_end, &text);
                        idx = name_end - 1;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Backticked => {
                if b == b'`' {
                    if bytes.get(idx + 1) == Some(&b'`') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if starts_block_comment(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if ends_block_comment(bytes, idx) {
                    idx += 1;
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && closes_dollar_quote(bytes, idx, tag) {
                    let tag_len = tag.len();
                    state = State::Normal;
                    idx += tag_len + 1;
                }
            }
        }

        idx += 1;
    }

    Ok(match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    })
}

/// Copy `sql[copied..start]` then `text` into `out`; the source up to `end` is consumed.
fn splice(sql: &str, out: &mut Option<String>, copied: &mut usize, start: usize, end: usize, text: &str) {
    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
    buf.push_str(&sql[*copied..start]);
    buf.push_str(text);
    *copied = end;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positional(values: Vec<RowValues>) -> Params {
        Params::Positional(values)
    }

    #[test]
    fn translates_sqlite_to_postgres() {
        let sql = "select * from t where a = ?1 and b = ?2";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(res, "select * from t where a = $1 and b = $2");
    }

    #[test]
    fn translates_postgres_to_sqlite() {
        let sql = "insert into t values($1, $2)";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite);
        assert_eq!(res, "insert into t values(?1, ?2)");
    }

    #[test]
    fn numbers_bare_question_marks_for_postgres() {
        let bound = bind_placeholders(
            "INSERT INTO \"t\" (\"a\",\"b\") VALUES (?,?),(?,?)",
            positional(vec![1.into(), "x".into(), 2.into(), "y".into()]),
            PlaceholderStyle::Postgres,
        )
        .unwrap();
        assert_eq!(bound.sql, "INSERT INTO \"t\" (\"a\",\"b\") VALUES ($1,$2),($3,$4)");
        assert_eq!(bound.params.len(), 4);
    }

    #[test]
    fn sqlite_keeps_bare_question_marks() {
        let sql = "UPDATE t SET a = ? WHERE b = ?";
        let bound =
            bind_placeholders(sql, positional(vec![1.into(), 2.into()]), PlaceholderStyle::Sqlite)
                .unwrap();
        assert!(matches!(bound.sql, Cow::Borrowed(_)));
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?1', $1 -- $2\n/* ?3 */ from t where a = $1";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite);
        assert_eq!(res, "select '?1', ?1 -- $2\n/* ?3 */ from t where a = ?1");
    }

    #[test]
    fn skips_quoted_identifiers() {
        let sql = "select \"what?\", `odd?` from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(res, "select \"what?\", `odd?` from t where a = $1");
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$foo$ select $1 from t $foo$ where a = $1";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite);
        assert_eq!(res, "$foo$ select $1 from t $foo$ where a = ?1");
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let sql = "select 'météo ?' , ? from t";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(res, "select 'météo ?' , $1 from t");
    }

    #[test]
    fn named_parameters_bind_in_first_use_order() {
        let params = Params::Named(vec![
            (":to".into(), RowValues::Int(20)),
            ("from".into(), RowValues::Text("10".into())),
        ]);
        let bound = bind_placeholders(
            "SELECT * FROM s WHERE time >= :from AND time < :to AND x::text <> ':to'",
            params,
            PlaceholderStyle::Sqlite,
        )
        .unwrap();
        assert_eq!(
            bound.sql,
            "SELECT * FROM s WHERE time >= ?1 AND time < ?2 AND x::text <> ':to'"
        );
        assert_eq!(bound.params, vec![RowValues::Int(10), RowValues::Int(20)]);
    }

    #[test]
    fn missing_named_parameter_is_an_error() {
        let err = bind_placeholders(
            "SELECT :a, :b",
            Params::Named(vec![("a".into(), RowValues::Null)]),
            PlaceholderStyle::Postgres,
        )
        .unwrap_err();
        assert!(matches!(err, SqlBridgeError::ParameterError(msg) if msg.contains(":b")));
    }

    #[test]
    fn mixing_bare_and_named_is_rejected() {
        let err = bind_placeholders(
            "SELECT ? , :a",
            Params::Named(vec![("a".into(), RowValues::Null)]),
            PlaceholderStyle::Sqlite,
        )
        .unwrap_err();
        assert!(matches!(err, SqlBridgeError::ParameterError(_)));
    }

    #[test]
    fn positional_values_are_inferred() {
        let bound = bind_placeholders(
            "SELECT ?, ?, ?",
            positional(vec!["12".into(), "12a".into(), RowValues::Null]),
            PlaceholderStyle::Sqlite,
        )
        .unwrap();
        assert_eq!(
            bound.params,
            vec![RowValues::Int(12), RowValues::Text("12a".into()), RowValues::Null]
        );
    }
}
