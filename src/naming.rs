use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static TABLE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("table token pattern is valid")
});

/// Resolve a logical table name to its physical name.
///
/// Names that are already quoted (`"` or a backtick) or schema-qualified (contain `.`) are
/// returned unchanged. Surrounding `{}` braces are stripped, and the prefix is prepended
/// exactly as a `{table}` token in SQL text would be, even when the name already starts
/// with it.
#[must_use]
pub fn physical_table_name(prefix: &str, name: &str) -> String {
    let name = name.trim();
    if name.starts_with('"') || name.starts_with('`') || name.contains('.') {
        return name.to_string();
    }
    let bare = name.trim_start_matches('{').trim_end_matches('}');
    format!("{prefix}{bare}")
}

/// Whether a resolved name is already quoted or qualified and must be used verbatim.
pub(crate) fn is_verbatim(name: &str) -> bool {
    name.starts_with('"') || name.starts_with('`') || name.contains('.')
}

/// Replace `{table}` tokens with `prefix` + `table`.
///
/// A token only counts when neither neighbour is alphanumeric, so JSON-ish text such as
/// `x{a}` or `{a}1` is left alone. Returns the input unchanged when there is nothing to do.
///
/// ```rust
/// use sql_bridge::naming::rewrite_table_tokens;
///
/// assert_eq!(
///     rewrite_table_tokens("SELECT * FROM {status} WHERE x = 1", "solar_"),
///     "SELECT * FROM solar_status WHERE x = 1"
/// );
/// ```
#[must_use]
pub fn rewrite_table_tokens<'a>(sql: &'a str, prefix: &str) -> Cow<'a, str> {
    if !sql.contains('{') {
        return Cow::Borrowed(sql);
    }
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    for caps in TABLE_TOKEN.captures_iter(sql) {
        let Some(whole) = caps.get(0) else { continue };
        let before_ok = whole.start() == 0 || !bytes[whole.start() - 1].is_ascii_alphanumeric();
        let after_ok = bytes
            .get(whole.end())
            .is_none_or(|b| !b.is_ascii_alphanumeric());
        if !(before_ok && after_ok) {
            continue;
        }
        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + prefix.len() * 2));
        buf.push_str(&sql[copied..whole.start()]);
        buf.push_str(prefix);
        buf.push_str(&caps[1]);
        copied = whole.end();
    }
    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}
