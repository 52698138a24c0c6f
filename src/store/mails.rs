//! MailStore: persisting classified mails to SQLite.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::db::Database;
use crate::error::DatabaseError;

/// Snippet stored while summarization is disabled.
pub const SNIPPET_PLACEHOLDER: &str = "disabled for now";

/// A fully-formed mail ready to persist. Importance is already resolved.
#[derive(Debug, Clone)]
pub struct NewMail {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub snippet: Option<String>,
    pub important: bool,
}

/// A persisted mail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailRecord {
    pub id: i64,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub snippet: Option<String>,
    #[serde(rename = "time")]
    pub created_at: DateTime<Utc>,
    pub important: bool,
}

/// Mail persistence over a [`Database`].
#[derive(Debug, Clone)]
pub struct MailStore {
    db: Database,
}

impl MailStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create the mail table if absent.
    pub fn init_schema(&self) -> Result<(), DatabaseError> {
        self.db.init_schema()
    }

    /// Persist a mail in one statement. Returns the assigned id.
    pub fn insert(&self, mail: &NewMail) -> Result<i64, DatabaseError> {
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO mails (sender, subject, body, snippet, important)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                mail.sender,
                mail.subject,
                mail.body,
                mail.snippet,
                mail.important,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, important = mail.important, "Mail inserted into DB");
        Ok(id)
    }

    /// All mails in primary-key order.
    pub fn list_all(&self) -> Result<Vec<MailRecord>, DatabaseError> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, sender, subject, body, snippet, created_at, important
             FROM mails ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], row_to_mail)?;
        let mails = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(mails)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// SQLite `CURRENT_TIMESTAMP` is UTC in `YYYY-MM-DD HH:MM:SS`.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn row_to_mail(row: &rusqlite::Row<'_>) -> Result<MailRecord, rusqlite::Error> {
    let created_str: Option<String> = row.get(5)?;

    Ok(MailRecord {
        id: row.get(0)?,
        sender: row.get(1)?,
        subject: row.get(2)?,
        body: row.get(3)?,
        snippet: row.get(4)?,
        created_at: created_str
            .as_deref()
            .map(parse_timestamp)
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
        important: row.get(6)?,
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, MailStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = MailStore::new(Database::new(tmp.path().join("mails.db")));
        store.init_schema().unwrap();
        (tmp, store)
    }

    fn mail(subject: &str, important: bool) -> NewMail {
        NewMail {
            sender: "alice@example.com".into(),
            subject: subject.into(),
            body: "Can we meet Tuesday?".into(),
            snippet: Some(SNIPPET_PLACEHOLDER.into()),
            important,
        }
    }

    #[test]
    fn insert_then_list_round_trips() {
        let (_tmp, store) = test_store();
        let id = store.insert(&mail("Sync", true)).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        let loaded = &all[0];
        assert_eq!(loaded.id, id);
        assert_eq!(loaded.sender, "alice@example.com");
        assert_eq!(loaded.subject, "Sync");
        assert_eq!(loaded.body, "Can we meet Tuesday?");
        assert_eq!(loaded.snippet.as_deref(), Some(SNIPPET_PLACEHOLDER));
        assert!(loaded.important);
        assert!(loaded.created_at > DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn important_flag_is_lossless() {
        let (_tmp, store) = test_store();
        store.insert(&mail("yes", true)).unwrap();
        store.insert(&mail("no", false)).unwrap();

        let all = store.list_all().unwrap();
        assert!(all[0].important);
        assert!(!all[1].important);
    }

    #[test]
    fn ids_are_assigned_in_insertion_order() {
        let (_tmp, store) = test_store();
        let a = store.insert(&mail("first", false)).unwrap();
        let b = store.insert(&mail("second", false)).unwrap();
        let c = store.insert(&mail("third", true)).unwrap();
        assert!(a < b && b < c);

        let subjects: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|m| m.subject)
            .collect();
        assert_eq!(subjects, vec!["first", "second", "third"]);
    }

    #[test]
    fn missing_snippet_stays_none() {
        let (_tmp, store) = test_store();
        let mut m = mail("no snippet", false);
        m.snippet = None;
        store.insert(&m).unwrap();
        assert!(store.list_all().unwrap()[0].snippet.is_none());
    }

    #[test]
    fn init_schema_twice_keeps_data() {
        let (_tmp, store) = test_store();
        store.insert(&mail("keep me", true)).unwrap();
        store.init_schema().unwrap();
        store.init_schema().unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subject, "keep me");
    }

    #[test]
    fn list_without_schema_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = MailStore::new(Database::new(tmp.path().join("empty.db")));
        assert!(matches!(store.list_all(), Err(DatabaseError::Query(_))));
    }

    #[test]
    fn insert_into_unreachable_path_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = MailStore::new(Database::new(tmp.path()));
        assert!(store.insert(&mail("x", true)).is_err());
    }

    #[test]
    fn parses_sqlite_timestamp() {
        let ts = parse_timestamp("2025-03-01 09:30:00");
        assert_eq!(ts.to_rfc3339(), "2025-03-01T09:30:00+00:00");
    }

    #[test]
    fn unparseable_timestamp_falls_back() {
        assert_eq!(parse_timestamp("garbage"), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn record_serializes_created_at_as_time() {
        let record = MailRecord {
            id: 1,
            sender: "a".into(),
            subject: "b".into(),
            body: "c".into(),
            snippet: None,
            created_at: parse_timestamp("2025-03-01 09:30:00"),
            important: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("time").is_some());
        assert!(json.get("created_at").is_none());
        assert_eq!(json["important"], false);
    }
}
