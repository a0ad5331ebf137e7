use std::collections::HashMap;
use url::form_urlencoded;

/// Query keys interpreted by us and stripped before the DSN reaches sqlx.
const PRAGMA_KEYS: &[&str] = &["wal", "synchronous", "busy_timeout", "journal_mode"];

fn split_query(dsn: &str) -> (&str, Option<&str>) {
    match dsn.split_once('?') {
        Some((base, q)) => (base, Some(q)),
        None => (dsn, None),
    }
}

/// Split PRAGMA parameters out of a SQLite DSN.
///
/// Returns the DSN with those keys removed (other query parameters are kept
/// in order) and the extracted pairs keyed by lowercase name.
pub(crate) fn extract_sqlite_pragmas(dsn: &str) -> (String, HashMap<String, String>) {
    let (base, query) = split_query(dsn);
    let Some(query) = query else {
        return (dsn.to_string(), HashMap::new());
    };

    let mut pragmas = HashMap::new();
    let mut kept = form_urlencoded::Serializer::new(String::new());
    let mut kept_any = false;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let lower = key.to_ascii_lowercase();
        if PRAGMA_KEYS.contains(&lower.as_str()) {
            pragmas.insert(lower, value.into_owned());
        } else {
            kept.append_pair(&key, &value);
            kept_any = true;
        }
    }

    let clean = if kept_any {
        format!("{base}?{}", kept.finish())
    } else {
        base.to_string()
    };
    (clean, pragmas)
}

/// `true` for `sqlite::memory:`, `sqlite://:memory:` and any DSN with `mode=memory`.
pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    let (base, query) = split_query(dsn);
    let base = base.to_ascii_lowercase();
    if matches!(
        base.as_str(),
        "sqlite::memory:" | "sqlite://:memory:" | "sqlite://memory:" | "sqlite:memory:"
    ) {
        return true;
    }

    query.is_some_and(|q| {
        form_urlencoded::parse(q.as_bytes())
            .any(|(k, v)| k.eq_ignore_ascii_case("mode") && v.eq_ignore_ascii_case("memory"))
    })
}
