use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{ThemeKey, UsageRecord};

// ── Key/value state ──

fn get_value(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM client_state WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn set_value(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO client_state (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

// ── Usage ──

pub fn get_usage_record(conn: &Connection, feature: &str) -> anyhow::Result<Option<UsageRecord>> {
    let Some(raw) = get_value(conn, &format!("usage:{feature}"))? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            // A corrupt record counts as no usage rather than locking the user out.
            tracing::warn!(error = %e, feature, "discarding unreadable usage record");
            Ok(None)
        }
    }
}

pub fn save_usage_record(
    conn: &Connection,
    feature: &str,
    record: &UsageRecord,
) -> anyhow::Result<()> {
    let raw = serde_json::to_string(record)?;
    set_value(conn, &format!("usage:{feature}"), &raw)
}

// ── Theme ──

pub fn get_theme_preference(conn: &Connection) -> anyhow::Result<Option<ThemeKey>> {
    Ok(get_value(conn, "theme")?.and_then(|v| ThemeKey::parse(&v)))
}

pub fn set_theme_preference(conn: &Connection, theme: ThemeKey) -> anyhow::Result<()> {
    set_value(conn, "theme", theme.as_str())
}

// ── Consent ──

pub fn get_consent(conn: &Connection, name: &str) -> anyhow::Result<bool> {
    Ok(get_value(conn, &format!("consent:{name}"))?.as_deref() == Some("granted"))
}

pub fn set_consent(conn: &Connection, name: &str, granted: bool) -> anyhow::Result<()> {
    let value = if granted { "granted" } else { "denied" };
    set_value(conn, &format!("consent:{name}"), value)
}

// ── Interaction log ──

pub fn record_chat_event(conn: &Connection, intent: &str) -> anyhow::Result<i64> {
    conn.execute("INSERT INTO chat_events (intent) VALUES (?1)", params![intent])?;
    Ok(conn.last_insert_rowid())
}

pub fn count_chat_events(conn: &Connection) -> anyhow::Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM chat_events", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    #[test]
    fn test_usage_record_upsert() {
        let conn = setup_db();
        assert!(get_usage_record(&conn, "chatbot").unwrap().is_none());

        let record = UsageRecord {
            day: "2025-06-16".to_string(),
            count: 3,
        };
        save_usage_record(&conn, "chatbot", &record).unwrap();
        save_usage_record(
            &conn,
            "chatbot",
            &UsageRecord {
                count: 4,
                ..record
            },
        )
        .unwrap();

        let stored = get_usage_record(&conn, "chatbot").unwrap().unwrap();
        assert_eq!(stored.day, "2025-06-16");
        assert_eq!(stored.count, 4);
    }

    #[test]
    fn test_corrupt_usage_record_reads_as_none() {
        let conn = setup_db();
        set_value(&conn, "usage:chatbot", "not json").unwrap();
        assert!(get_usage_record(&conn, "chatbot").unwrap().is_none());
    }

    #[test]
    fn test_theme_and_consent() {
        let conn = setup_db();
        assert_eq!(get_theme_preference(&conn).unwrap(), None);
        set_theme_preference(&conn, ThemeKey::Dark).unwrap();
        assert_eq!(get_theme_preference(&conn).unwrap(), Some(ThemeKey::Dark));

        assert!(!get_consent(&conn, "analytics").unwrap());
        set_consent(&conn, "analytics", true).unwrap();
        assert!(get_consent(&conn, "analytics").unwrap());
        set_consent(&conn, "analytics", false).unwrap();
        assert!(!get_consent(&conn, "analytics").unwrap());
    }

    #[test]
    fn test_chat_events() {
        let conn = setup_db();
        record_chat_event(&conn, "profile_question").unwrap();
        record_chat_event(&conn, "fallback").unwrap();
        assert_eq!(count_chat_events(&conn).unwrap(), 2);
    }
}
