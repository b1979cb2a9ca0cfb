//! Persistence seams used by the registry and the message store.
//!
//! Both traits are synchronous. Callers drive them through
//! [`BlockingCollection`](super::blocking::BlockingCollection).

use crate::common::{Message, Participant, Result};

/// The `participants` collection, keyed by name.
pub trait ParticipantCollection: Send {
    fn find_one(&self, name: &str) -> Result<Option<Participant>>;

    fn insert_one(&mut self, participant: &Participant) -> Result<()>;

    /// Sets `last_heartbeat` for `name`. Returns false when no row matched.
    fn update_one(&mut self, name: &str, last_heartbeat: i64) -> Result<bool>;

    /// Removes every named participant whose heartbeat is at or before `cutoff`.
    /// Returns the names that were actually removed.
    fn delete_many(&mut self, names: &[String], cutoff: i64) -> Result<Vec<String>>;

    fn find_all(&self) -> Result<Vec<Participant>>;
}

/// The append-only `messages` collection.
pub trait MessageCollection: Send {
    fn insert_one(&mut self, message: &Message) -> Result<()>;

    fn insert_many(&mut self, messages: &[Message]) -> Result<()>;

    /// All messages in insertion order.
    fn find_all(&self) -> Result<Vec<Message>>;
}
