use std::io;
use std::path::PathBuf;

/// File path a SQLite DSN points at, read the same way sqlx does:
/// the `sqlite://` or `sqlite:` prefix is dropped and the query is ignored.
pub(crate) fn sqlite_file_path(dsn: &str) -> Option<PathBuf> {
    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))?;
    let path = rest.split_once('?').map_or(rest, |(p, _)| p);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Create the parent directory of a file-backed SQLite database.
pub(crate) fn prepare_sqlite_path(dsn: &str) -> io::Result<()> {
    if let Some(parent) = sqlite_file_path(dsn).as_deref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
