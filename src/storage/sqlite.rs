use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use std::path::Path;
use std::time::Duration;

use super::collections::{MessageCollection, ParticipantCollection};
use crate::common::{Message, MessageKind, Participant, Result};

/// How long a writer waits for the other connection's lock on a shared file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens `path`, or a private in-memory database when `path` is `None`.
fn open_connection(path: Option<&Path>) -> SqlResult<Connection> {
    match path {
        Some(path) => {
            let conn = Connection::open(path)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(conn)
        }
        None => Connection::open_in_memory(),
    }
}

/// SQLite backed `participants` collection
pub struct SqliteParticipants {
    conn: Connection,
}

impl SqliteParticipants {
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        Self::open(Some(path.as_ref()))
    }

    pub fn in_memory() -> SqlResult<Self> {
        Self::open(None)
    }

    fn open(path: Option<&Path>) -> SqlResult<Self> {
        let participants = Self {
            conn: open_connection(path)?,
        };
        participants.init_schema()?;
        Ok(participants)
    }

    fn init_schema(&self) -> SqlResult<()> {
        let conn = &self.conn;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS participants (
                name TEXT PRIMARY KEY,
                last_status INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_participants_last_status ON participants(last_status)",
            [],
        )?;

        Ok(())
    }
}

impl ParticipantCollection for SqliteParticipants {
    fn find_one(&self, name: &str) -> Result<Option<Participant>> {
        let conn = &self.conn;
        let participant = conn
            .query_row(
                "SELECT name, last_status FROM participants WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Participant {
                        name: row.get(0)?,
                        last_heartbeat: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(participant)
    }

    fn insert_one(&mut self, participant: &Participant) -> Result<()> {
        let conn = &self.conn;
        conn.execute(
            "INSERT INTO participants (name, last_status) VALUES (?1, ?2)",
            params![participant.name, participant.last_heartbeat],
        )?;
        Ok(())
    }

    fn update_one(&mut self, name: &str, last_heartbeat: i64) -> Result<bool> {
        let conn = &self.conn;
        let changed = conn.execute(
            "UPDATE participants SET last_status = ?1 WHERE name = ?2",
            params![last_heartbeat, name],
        )?;
        Ok(changed > 0)
    }

    fn delete_many(&mut self, names: &[String], cutoff: i64) -> Result<Vec<String>> {
        let tx = self.conn.transaction()?;
        let mut removed = Vec::with_capacity(names.len());
        {
            let mut stmt =
                tx.prepare("DELETE FROM participants WHERE name = ?1 AND last_status <= ?2")?;
            for name in names {
                if stmt.execute(params![name, cutoff])? > 0 {
                    removed.push(name.clone());
                }
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn find_all(&self) -> Result<Vec<Participant>> {
        let conn = &self.conn;
        let mut stmt = conn.prepare("SELECT name, last_status FROM participants ORDER BY name")?;

        let participants = stmt
            .query_map([], |row| {
                Ok(Participant {
                    name: row.get(0)?,
                    last_heartbeat: row.get(1)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(participants)
    }
}

/// SQLite backed `messages` collection
pub struct SqliteMessages {
    conn: Connection,
}

impl SqliteMessages {
    pub fn with_path<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        Self::open(Some(path.as_ref()))
    }

    pub fn in_memory() -> SqlResult<Self> {
        Self::open(None)
    }

    fn open(path: Option<&Path>) -> SqlResult<Self> {
        let messages = Self {
            conn: open_connection(path)?,
        };
        messages.init_schema()?;
        Ok(messages)
    }

    fn init_schema(&self) -> SqlResult<()> {
        let conn = &self.conn;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender TEXT NOT NULL,
                recipient TEXT NOT NULL,
                text TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('message', 'private_message', 'status')),
                time TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

fn insert_message(conn: &rusqlite::Connection, message: &Message) -> SqlResult<()> {
    conn.execute(
        "INSERT INTO messages (sender, recipient, text, kind, time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            message.from,
            message.to,
            message.text,
            message.kind.as_str(),
            message.time
        ],
    )?;
    Ok(())
}

impl MessageCollection for SqliteMessages {
    fn insert_one(&mut self, message: &Message) -> Result<()> {
        insert_message(&self.conn, message)?;
        Ok(())
    }

    fn insert_many(&mut self, messages: &[Message]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for message in messages {
            insert_message(&tx, message)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn find_all(&self) -> Result<Vec<Message>> {
        let conn = &self.conn;
        let mut stmt = conn.prepare(
            "SELECT sender, recipient, text, kind, time
             FROM messages
             ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        rows.into_iter()
            .map(|(from, to, text, kind, time)| -> Result<Message> {
                Ok(Message {
                    from,
                    to,
                    text,
                    kind: kind.parse::<MessageKind>()?,
                    time,
                })
            })
            .collect()
    }
}
