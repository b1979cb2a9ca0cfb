use std::sync::Arc;

use super::visibility::is_visible;
use crate::common::{ChatError, Clock, Message, MessageDraft, MessageKind, Result, format_clock_time};
use crate::storage::{BlockingCollection, MessageCollection};

/// Interprets a raw `limit` query value.
///
/// Only a positive integer limits the result. Anything else (absent, zero,
/// negative, fractional, garbage) means "no limit".
pub fn parse_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|limit| *limit > 0)
}

/// Append-only message log with a visibility-filtered read.
pub struct MessageStore {
    messages: BlockingCollection<dyn MessageCollection>,
    clock: Arc<dyn Clock>,
}

impl MessageStore {
    pub fn new(messages: impl MessageCollection + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            messages: BlockingCollection::new(Box::new(messages)),
            clock,
        }
    }

    pub async fn append(&self, draft: MessageDraft) -> Result<Message> {
        let message = self.validate(draft)?;
        self.messages
            .run(move |messages| {
                messages.insert_one(&message)?;
                Ok(message)
            })
            .await
    }

    /// Appends each draft independently; a rejected or failed draft does not stop
    /// the rest. Outcomes are returned in draft order.
    pub async fn append_many(&self, drafts: Vec<MessageDraft>) -> Vec<Result<Message>> {
        let mut outcomes: Vec<Result<Message>> =
            drafts.into_iter().map(|draft| self.validate(draft)).collect();
        let valid: Vec<Message> = outcomes
            .iter()
            .filter_map(|outcome| outcome.as_ref().ok().cloned())
            .collect();
        if valid.is_empty() {
            return outcomes;
        }
        let count = outcomes.len();

        let stored = self
            .messages
            .run(move |messages| {
                if let Err(err) = messages.insert_many(&valid) {
                    log::warn!(
                        "Batch insert of {} messages failed ({err}); retrying one by one",
                        valid.len()
                    );
                    for outcome in outcomes.iter_mut() {
                        if let Ok(message) = outcome {
                            if let Err(err) = messages.insert_one(message) {
                                *outcome = Err(err);
                            }
                        }
                    }
                }
                Ok(outcomes)
            })
            .await;

        match stored {
            Ok(outcomes) => outcomes,
            // The storage task itself died; nothing is known to be stored.
            Err(err) => (0..count)
                .map(|_| Err(ChatError::Unavailable(err.to_string())))
                .collect(),
        }
    }

    /// Messages visible to `requester`, oldest first, trimmed to the most recent
    /// `limit` entries when a limit is given.
    pub async fn query(&self, requester: Option<&str>, limit: Option<usize>) -> Result<Vec<Message>> {
        let all = self.messages.run(|messages| messages.find_all()).await?;
        let mut visible: Vec<Message> = all
            .into_iter()
            .filter(|message| is_visible(message, requester))
            .collect();

        if let Some(limit) = limit {
            let skip = visible.len().saturating_sub(limit);
            visible = visible.split_off(skip);
        }
        Ok(visible)
    }

    fn validate(&self, draft: MessageDraft) -> Result<Message> {
        for (field, value) in [("from", &draft.from), ("to", &draft.to), ("text", &draft.text)] {
            if value.trim().is_empty() {
                return Err(ChatError::InvalidArgument(format!("`{field}` is required")));
            }
        }
        let kind: MessageKind = draft.kind.parse()?;
        let time = match draft.time {
            Some(time) if !time.is_empty() => time,
            _ => format_clock_time(self.clock.now_millis()),
        };

        Ok(Message {
            from: draft.from,
            to: draft.to,
            text: draft.text,
            kind,
            time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BROADCAST, ManualClock};
    use crate::storage::SqliteMessages;

    fn store() -> MessageStore {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        MessageStore::new(SqliteMessages::in_memory().unwrap(), clock)
    }

    /// Fails every batch insert and any single insert of `reject_text`.
    struct BrokenMessages {
        inner: SqliteMessages,
        reject_text: &'static str,
    }

    impl MessageCollection for BrokenMessages {
        fn insert_one(&mut self, message: &Message) -> Result<()> {
            if message.text == self.reject_text {
                return Err(ChatError::Unavailable("disk full".into()));
            }
            self.inner.insert_one(message)
        }

        fn insert_many(&mut self, _messages: &[Message]) -> Result<()> {
            Err(ChatError::Unavailable("disk full".into()))
        }

        fn find_all(&self) -> Result<Vec<Message>> {
            self.inner.find_all()
        }
    }

    #[test]
    fn limit_parsing() {
        assert_eq!(parse_limit(Some("2")), Some(2));
        assert_eq!(parse_limit(Some(" 7 ")), Some(7));
        assert_eq!(parse_limit(None), None);
        assert_eq!(parse_limit(Some("")), None);
        assert_eq!(parse_limit(Some("abc")), None);
        assert_eq!(parse_limit(Some("0")), None);
        assert_eq!(parse_limit(Some("-3")), None);
        assert_eq!(parse_limit(Some("2.5")), None);
    }

    #[tokio::test]
    async fn append_rejects_unknown_type_and_missing_fields() {
        let store = store();

        let err = store
            .append(MessageDraft::new("ana", BROADCAST, "hi", "shout"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));

        let err = store
            .append(MessageDraft::new("ana", BROADCAST, "", "message"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidArgument(_)));

        assert!(store.query(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_assigns_time_only_when_absent() {
        let store = store();
        let stamped = store
            .append(MessageDraft::new("ana", BROADCAST, "hi", "message"))
            .await
            .unwrap();
        assert_eq!(stamped.time, format_clock_time(1_700_000_000_000));

        let preset = store
            .append(MessageDraft::new("ana", BROADCAST, "hi", "message").with_time("01:02:03"))
            .await
            .unwrap();
        assert_eq!(preset.time, "01:02:03");
    }

    #[tokio::test]
    async fn query_filters_by_visibility() {
        let store = store();
        store.append(MessageDraft::new("X", "Y", "public", "message")).await.unwrap();
        store.append(MessageDraft::new("A", "B", "a to b", "private_message")).await.unwrap();
        store.append(MessageDraft::new("C", "D", "c to d", "private_message")).await.unwrap();

        let texts: Vec<_> = store
            .query(Some("B"), None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["public", "a to b"]);
    }

    #[tokio::test]
    async fn query_without_limit_returns_everything_visible() {
        let store = store();
        for i in 0..5 {
            store
                .append(MessageDraft::new("ana", BROADCAST, format!("m{i}"), "message"))
                .await
                .unwrap();
        }

        for raw in [None, Some("abc"), Some("0"), Some("-1")] {
            let all = store.query(Some("bia"), parse_limit(raw)).await.unwrap();
            assert_eq!(all.len(), 5, "limit {raw:?}");
        }
    }

    #[tokio::test]
    async fn query_with_limit_keeps_most_recent_in_order() {
        let store = store();
        for i in 0..5 {
            store
                .append(MessageDraft::new("ana", BROADCAST, format!("m{i}"), "message"))
                .await
                .unwrap();
        }
        store.append(MessageDraft::new("C", "D", "hidden", "private_message")).await.unwrap();

        let texts: Vec<_> = store
            .query(Some("bia"), Some(2))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["m3", "m4"]);

        let more_than_available = store.query(Some("bia"), Some(50)).await.unwrap();
        assert_eq!(more_than_available.len(), 5);
    }

    #[tokio::test]
    async fn append_many_keeps_going_past_failures() {
        let clock = Arc::new(ManualClock::new(0));
        let store = MessageStore::new(
            BrokenMessages {
                inner: SqliteMessages::in_memory().unwrap(),
                reject_text: "boom",
            },
            clock,
        );

        let outcomes = store
            .append_many(vec![
                MessageDraft::status("ana", "bye"),
                MessageDraft::status("bia", "boom"),
                MessageDraft::new("caio", BROADCAST, "x", "bogus"),
                MessageDraft::status("dani", "bye"),
            ])
            .await;

        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(ChatError::Unavailable(_))));
        assert!(matches!(outcomes[2], Err(ChatError::InvalidArgument(_))));
        assert!(outcomes[3].is_ok());

        let stored: Vec<_> = store
            .query(None, None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.from)
            .collect();
        assert_eq!(stored, vec!["ana", "dani"]);
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_stored() {
        let store = Arc::new(store());
        let tasks = (0..20).map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .append(MessageDraft::new(format!("p{i}"), BROADCAST, "hi", "message"))
                    .await
            })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }
        assert_eq!(store.query(None, None).await.unwrap().len(), 20);
    }
}
