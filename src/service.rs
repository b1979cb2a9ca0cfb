use std::path::Path;
use std::sync::Arc;

use crate::common::{
    ChatError, Clock, Message, MessageDraft, MessageKind, Participant, Result, types::JOIN_TEXT,
};
use crate::messages::MessageStore;
use crate::presence::PresenceRegistry;
use crate::storage::{self, MessageCollection, ParticipantCollection};

/// Owns the presence registry and the message store. Built once at startup and
/// shared behind an `Arc` by the HTTP handlers and the janitor.
pub struct ChatService {
    registry: PresenceRegistry,
    store: MessageStore,
    clock: Arc<dyn Clock>,
}

impl ChatService {
    pub fn new(
        participants: impl ParticipantCollection + 'static,
        messages: impl MessageCollection + 'static,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry: PresenceRegistry::new(participants, clock.clone()),
            store: MessageStore::new(messages, clock.clone()),
            clock,
        }
    }

    /// Opens SQLite storage at `path`, or in memory when `path` is `None`.
    pub fn open(path: Option<&Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let (participants, messages) = storage::open_collections(path)?;
        Ok(Self::new(participants, messages, clock))
    }

    /// Registers `name` and announces the join to the room.
    ///
    /// If the join notice cannot be stored the registration is undone, so a
    /// participant never exists without its join notice.
    pub async fn register(&self, name: &str) -> Result<Participant> {
        let participant = self.registry.register(name).await?;

        if let Err(err) = self.store.append(MessageDraft::status(name, JOIN_TEXT)).await {
            log::error!("Failed to record join of {name}: {err}; rolling back registration");
            if let Err(rollback) = self.registry.remove(name).await {
                log::error!("Rollback of {name} failed: {rollback}");
            }
            return Err(err);
        }

        log::info!("Participant {name} joined");
        Ok(participant)
    }

    pub async fn participants(&self) -> Result<Vec<Participant>> {
        self.registry.list().await
    }

    pub async fn heartbeat(&self, name: &str) -> Result<Participant> {
        self.registry.heartbeat(name).await
    }

    /// Posts a user message. Users may only send `message` or `private_message`;
    /// the sender has to be registered.
    pub async fn post_message(&self, from: &str, to: &str, text: &str, kind: &str) -> Result<Message> {
        match kind.parse::<MessageKind>() {
            Ok(MessageKind::Message | MessageKind::PrivateMessage) => {}
            Ok(MessageKind::Status) => {
                return Err(ChatError::InvalidArgument(
                    "status messages cannot be posted".into(),
                ));
            }
            Err(err) => return Err(err),
        }
        for (field, value) in [("user", from), ("to", to), ("text", text)] {
            if value.trim().is_empty() {
                return Err(ChatError::InvalidArgument(format!("`{field}` is required")));
            }
        }

        if !self.registry.contains(from).await? {
            return Err(ChatError::Conflict(format!("sender `{from}` is not a participant")));
        }

        self.store.append(MessageDraft::new(from, to, text, kind)).await
    }

    pub async fn messages(&self, requester: Option<&str>, limit: Option<usize>) -> Result<Vec<Message>> {
        self.store.query(requester, limit).await
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
