use std::sync::Arc;
use std::time::Duration;

use crate::common::{ChatError, Clock, Participant, Result};
use crate::storage::{BlockingCollection, ParticipantCollection};

/// Live participants and their last heartbeat.
///
/// Every read-modify-write (register, heartbeat, sweep) runs as one closure under
/// the collection lock, so a heartbeat is either applied before a sweep looks at
/// the entry or after the entry is gone. It can never be lost in between.
pub struct PresenceRegistry {
    participants: BlockingCollection<dyn ParticipantCollection>,
    clock: Arc<dyn Clock>,
}

fn not_registered(name: &str) -> ChatError {
    ChatError::NotFound(format!("participant `{name}` is not registered"))
}

impl PresenceRegistry {
    pub fn new(participants: impl ParticipantCollection + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            participants: BlockingCollection::new(Box::new(participants)),
            clock,
        }
    }

    pub async fn register(&self, name: &str) -> Result<Participant> {
        if name.trim().is_empty() {
            return Err(ChatError::InvalidArgument("name is required".into()));
        }

        let name = name.to_string();
        let clock = Arc::clone(&self.clock);
        let participant = self
            .participants
            .run(move |participants| {
                if participants.find_one(&name)?.is_some() {
                    return Err(ChatError::Conflict(format!("participant `{name}` already exists")));
                }
                let participant = Participant {
                    name,
                    last_heartbeat: clock.now_millis(),
                };
                participants.insert_one(&participant)?;
                Ok(participant)
            })
            .await?;

        log::debug!("Registered participant {}", participant.name);
        Ok(participant)
    }

    pub async fn heartbeat(&self, name: &str) -> Result<Participant> {
        let name = name.to_string();
        let clock = Arc::clone(&self.clock);
        self.participants
            .run(move |participants| {
                let Some(existing) = participants.find_one(&name)? else {
                    return Err(not_registered(&name));
                };

                let last_heartbeat = existing.last_heartbeat.max(clock.now_millis());
                if !participants.update_one(&name, last_heartbeat)? {
                    return Err(not_registered(&name));
                }
                Ok(Participant {
                    name,
                    last_heartbeat,
                })
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<Participant>> {
        self.participants.run(|participants| participants.find_all()).await
    }

    pub async fn contains(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.participants
            .run(move |participants| Ok(participants.find_one(&name)?.is_some()))
            .await
    }

    /// Drops `name` unconditionally. Returns whether an entry existed.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let names = vec![name.to_string()];
        let removed = self
            .participants
            .run(move |participants| participants.delete_many(&names, i64::MAX))
            .await?;
        Ok(!removed.is_empty())
    }

    /// Removes and returns every participant whose last heartbeat is at least
    /// `threshold` older than `now`. Only entries that were actually deleted are
    /// returned.
    pub async fn sweep_evict(&self, now: i64, threshold: Duration) -> Result<Vec<Participant>> {
        let threshold_ms = i64::try_from(threshold.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(threshold_ms);

        self.participants
            .run(move |participants| {
                let stale: Vec<Participant> = participants
                    .find_all()?
                    .into_iter()
                    .filter(|p| p.last_heartbeat <= cutoff)
                    .collect();
                if stale.is_empty() {
                    return Ok(stale);
                }

                let names: Vec<String> = stale.iter().map(|p| p.name.clone()).collect();
                let removed = participants.delete_many(&names, cutoff)?;
                if removed.len() != stale.len() {
                    log::warn!(
                        "Sweep found {} stale participants but removed {}",
                        stale.len(),
                        removed.len()
                    );
                }
                Ok(stale
                    .into_iter()
                    .filter(|p| removed.contains(&p.name))
                    .collect())
            })
            .await
    }
}
