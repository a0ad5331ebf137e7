//! Whitelisted SQLite PRAGMAs accepted from the DSN query string.

use std::collections::HashMap;
use std::time::Duration;

use sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous};

use crate::DbError;

fn journal_mode(s: &str) -> Option<SqliteJournalMode> {
    match s.to_ascii_uppercase().as_str() {
        "DELETE" => Some(SqliteJournalMode::Delete),
        "WAL" => Some(SqliteJournalMode::Wal),
        "MEMORY" => Some(SqliteJournalMode::Memory),
        "TRUNCATE" => Some(SqliteJournalMode::Truncate),
        "PERSIST" => Some(SqliteJournalMode::Persist),
        "OFF" => Some(SqliteJournalMode::Off),
        _ => None,
    }
}

fn synchronous(s: &str) -> Option<SqliteSynchronous> {
    match s.to_ascii_uppercase().as_str() {
        "OFF" => Some(SqliteSynchronous::Off),
        "NORMAL" => Some(SqliteSynchronous::Normal),
        "FULL" => Some(SqliteSynchronous::Full),
        "EXTRA" => Some(SqliteSynchronous::Extra),
        _ => None,
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Pragmas {
    pub journal_mode: Option<SqliteJournalMode>,
    pub synchronous: Option<SqliteSynchronous>,
    pub busy_timeout: Option<Duration>,
}

impl Pragmas {
    /// Parse extracted pairs. An unrecognised value is an error rather than
    /// being passed through to SQLite.
    pub(crate) fn from_pairs(pairs: &HashMap<String, String>) -> Result<Self, DbError> {
        let bad = |key: &str, value: &str| DbError::SqlitePragma(format!("invalid {key} '{value}'"));
        let mut p = Pragmas::default();

        if let Some(v) = pairs.get("journal_mode") {
            p.journal_mode = Some(journal_mode(v).ok_or_else(|| bad("journal_mode", v))?);
        } else if let Some(v) = pairs.get("wal") {
            // legacy toggle: wal=true|false
            p.journal_mode = match v.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(SqliteJournalMode::Wal),
                "false" | "0" => Some(SqliteJournalMode::Delete),
                _ => return Err(bad("wal", v)),
            };
        }

        if let Some(v) = pairs.get("synchronous") {
            p.synchronous = Some(synchronous(v).ok_or_else(|| bad("synchronous", v))?);
        }

        if let Some(v) = pairs.get("busy_timeout") {
            let ms: u64 = v.parse().map_err(|_| bad("busy_timeout", v))?;
            p.busy_timeout = Some(Duration::from_millis(ms));
        }

        Ok(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(kv: &[(&str, &str)]) -> HashMap<String, String> {
        kv.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn typed_values_are_parsed() {
        let p = Pragmas::from_pairs(&pairs(&[
            ("journal_mode", "wal"),
            ("synchronous", "full"),
            ("busy_timeout", "250"),
        ]))
        .unwrap();
        assert!(matches!(p.journal_mode, Some(SqliteJournalMode::Wal)));
        assert!(matches!(p.synchronous, Some(SqliteSynchronous::Full)));
        assert_eq!(p.busy_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn journal_mode_wins_over_wal_toggle() {
        let p = Pragmas::from_pairs(&pairs(&[("journal_mode", "TRUNCATE"), ("wal", "true")])).unwrap();
        assert!(matches!(p.journal_mode, Some(SqliteJournalMode::Truncate)));

        let p = Pragmas::from_pairs(&pairs(&[("wal", "0")])).unwrap();
        assert!(matches!(p.journal_mode, Some(SqliteJournalMode::Delete)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Pragmas::from_pairs(&pairs(&[("journal_mode", "sideways")])).is_err());
        assert!(Pragmas::from_pairs(&pairs(&[("synchronous", "maybe")])).is_err());
        assert!(Pragmas::from_pairs(&pairs(&[("busy_timeout", "-5")])).is_err());
        assert!(Pragmas::from_pairs(&pairs(&[("wal", "yes please")])).is_err());
    }
}
