use crate::models::{MessageRow, ParticipantRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{Map, Value};

impl Database {
    // -- Participants --

    /// Insert a participant. Returns `false` when the name is already taken;
    /// the unique index decides, so concurrent registrations cannot both win.
    pub fn create_participant(&self, name: &str, last_status: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO participants (name, last_status) VALUES (?1, ?2)",
                rusqlite::params![name, last_status],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn list_participants(&self) -> Result<Vec<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT name, last_status FROM participants ORDER BY seq")?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(ParticipantRow {
                        name: row.get(0)?,
                        last_status: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_participant(&self, name: &str) -> Result<Option<ParticipantRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT name, last_status FROM participants WHERE name = ?1",
                    [name],
                    |row| {
                        Ok(ParticipantRow {
                            name: row.get(0)?,
                            last_status: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Refresh `last_status`. The new value is always past the old one, even
    /// within the same millisecond. Returns `false` for an unknown name.
    pub fn touch_participant(&self, name: &str, now: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE participants SET last_status = MAX(?2, last_status + 1) WHERE name = ?1",
                rusqlite::params![name, now],
            )?;
            Ok(updated == 1)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, id: &str, document: &Value) -> Result<()> {
        let document = serde_json::to_string(document)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, document) VALUES (?1, ?2)",
                (id, &document),
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let document = query_document(conn, id)?;
            Ok(document.map(|document| MessageRow { id: id.to_string(), document }))
        })
    }

    /// The most recent `limit` messages, oldest first. `None` returns all of them.
    pub fn get_messages(&self, limit: Option<usize>) -> Result<Vec<MessageRow>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, document FROM (
                     SELECT seq, id, document FROM messages ORDER BY seq DESC LIMIT ?1
                 )
                 ORDER BY seq ASC",
            )?;

            let raw = stmt
                .query_map([limit], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            raw.into_iter()
                .map(|(id, document)| -> Result<MessageRow> {
                    Ok(MessageRow {
                        id,
                        document: serde_json::from_str(&document)?,
                    })
                })
                .collect()
        })
    }

    /// Returns `false` when no message has that id.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(deleted == 1)
        })
    }

    /// Overwrite the top-level fields of a stored document with `patch`,
    /// keeping fields the patch does not mention. Returns `false` when no
    /// message has that id.
    pub fn merge_message(&self, id: &str, patch: &Map<String, Value>) -> Result<bool> {
        self.with_conn(|conn| {
            let Some(mut document) = query_document(conn, id)? else {
                return Ok(false);
            };

            for (field, value) in patch {
                document.insert(field.clone(), value.clone());
            }

            conn.execute(
                "UPDATE messages SET document = ?2 WHERE id = ?1",
                (id, serde_json::to_string(&document)?),
            )?;
            Ok(true)
        })
    }
}

fn query_document(conn: &Connection, id: &str) -> Result<Option<Map<String, Value>>> {
    let raw: Option<String> = conn
        .query_row("SELECT document FROM messages WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;

    Ok(raw.map(|doc| serde_json::from_str(&doc)).transpose()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(n: usize) -> Value {
        json!({
            "from": "Alice",
            "to": "Todos",
            "text": format!("message {n}"),
            "type": "message",
            "time": "12:00:00",
        })
    }

    fn texts(rows: &[MessageRow]) -> Vec<String> {
        rows.iter()
            .map(|r| r.document["text"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn participant_names_are_unique() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_participant("Alice", 1).unwrap());
        assert!(!db.create_participant("Alice", 2).unwrap());
        assert!(db.create_participant("Bob", 3).unwrap());

        let names: Vec<_> = db
            .list_participants()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert_eq!(db.get_participant("Alice").unwrap().unwrap().last_status, 1);
    }

    #[test]
    fn touch_always_moves_forward() {
        let db = Database::open_in_memory().unwrap();
        db.create_participant("Alice", 1_000).unwrap();

        assert!(db.touch_participant("Alice", 5_000).unwrap());
        assert_eq!(db.get_participant("Alice").unwrap().unwrap().last_status, 5_000);

        // same millisecond, or a clock step backwards
        assert!(db.touch_participant("Alice", 5_000).unwrap());
        assert!(db.touch_participant("Alice", 10).unwrap());
        assert_eq!(db.get_participant("Alice").unwrap().unwrap().last_status, 5_002);

        assert!(!db.touch_participant("Nobody", 5_000).unwrap());
    }

    #[test]
    fn trailing_slice_keeps_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        for n in 1..=5 {
            db.insert_message(&format!("m{n}"), &message(n)).unwrap();
        }

        assert_eq!(texts(&db.get_messages(Some(2)).unwrap()), vec!["message 4", "message 5"]);
        assert_eq!(db.get_messages(Some(50)).unwrap().len(), 5);
        assert_eq!(db.get_messages(None).unwrap().len(), 5);
        assert_eq!(db.get_messages(Some(usize::MAX)).unwrap().len(), 5);
    }

    #[test]
    fn merge_overwrites_and_extends() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message("m1", &message(1)).unwrap();

        let patch = json!({ "text": "edited", "mood": "happy" });
        assert!(db.merge_message("m1", patch.as_object().unwrap()).unwrap());

        let row = db.get_message("m1").unwrap().unwrap();
        assert_eq!(row.document["text"], "edited");
        assert_eq!(row.document["mood"], "happy");
        assert_eq!(row.author(), Some("Alice"));

        assert!(!db.merge_message("missing", patch.as_object().unwrap()).unwrap());
    }

    #[test]
    fn delete_reports_missing() {
        let db = Database::open_in_memory().unwrap();
        db.insert_message("m1", &message(1)).unwrap();

        assert!(db.delete_message("m1").unwrap());
        assert!(!db.delete_message("m1").unwrap());
        assert!(db.get_message("m1").unwrap().is_none());
    }
}
