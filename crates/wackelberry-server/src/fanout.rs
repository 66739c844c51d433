//! Best-effort delivery of notices to every admin.

use std::sync::Arc;

use wackelberry_core::{ChannelError, ChatId, MessagingChannel, UserId};

use crate::{
    storage::{StorageError, UserStorage},
    user_store::UserStore,
};

/// Outcome of one fanout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Recipients that accepted the message, in id order
    pub delivered: Vec<UserId>,
    /// Recipients whose delivery failed, with the channel's error
    pub failed: Vec<(UserId, ChannelError)>,
}

impl FanoutReport {
    /// Number of recipients attempted.
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// Returns true if every attempted delivery succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends one text to every admin in the user document.
///
/// A failed delivery is logged and recorded in the [`FanoutReport`]; the
/// remaining admins are still attempted.
pub struct NotificationFanout<S: UserStorage, C: MessagingChannel> {
    store: Arc<UserStore<S>>,
    channel: Arc<C>,
}

impl<S: UserStorage, C: MessagingChannel> Clone for NotificationFanout<S, C> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), channel: Arc::clone(&self.channel) }
    }
}

impl<S: UserStorage, C: MessagingChannel> NotificationFanout<S, C> {
    /// Create a fanout over `store`'s admins.
    pub fn new(store: Arc<UserStore<S>>, channel: Arc<C>) -> Self {
        Self { store, channel }
    }

    /// Send `text` to every admin.
    ///
    /// Fails only if the admin list cannot be read.
    pub async fn notify_admins(&self, text: &str) -> Result<FanoutReport, StorageError> {
        let admins: Vec<UserId> = self.store.snapshot().await?.admins().map(|r| r.id).collect();
        Ok(self.notify(admins, text).await)
    }

    /// Send `text` to each of `recipients`.
    pub async fn notify(
        &self,
        recipients: impl IntoIterator<Item = UserId>,
        text: &str,
    ) -> FanoutReport {
        let mut report = FanoutReport::default();

        for recipient in recipients {
            match self.channel.send_text(ChatId::from(recipient), text).await {
                Ok(()) => report.delivered.push(recipient),
                Err(err) => {
                    tracing::warn!(recipient = %recipient, error = %err, "notice not delivered");
                    report.failed.push((recipient, err));
                },
            }
        }

        tracing::debug!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "fanout complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use wackelberry_core::UserRecord;
    use wackelberry_harness::RecordingChannel;

    use super::*;
    use crate::storage::MemoryStorage;

    fn admin(id: i64) -> UserRecord {
        UserRecord { admin: true, pending: false, ..UserRecord::pending(UserId::new(id), "Admin") }
    }

    #[tokio::test]
    async fn notifies_only_admins() {
        let storage = MemoryStorage::with_records([
            admin(1),
            UserRecord::pending(UserId::new(2), "Two"),
            admin(3),
        ]);
        let channel = Arc::new(RecordingChannel::new());
        let fanout = NotificationFanout::new(Arc::new(UserStore::new(storage)), channel.clone());

        let report = fanout.notify_admins("hello").await.unwrap();

        assert_eq!(report.delivered, vec![UserId::new(1), UserId::new(3)]);
        assert!(report.is_complete());
        assert_eq!(channel.texts_to(ChatId(2)), Vec::<String>::new());
    }

    #[tokio::test]
    async fn failed_recipient_does_not_stop_others() {
        let storage = MemoryStorage::with_records([admin(1), admin(2), admin(3)]);
        let channel = Arc::new(RecordingChannel::new());
        let gone = ChannelError::Fatal("bot was blocked by the user".to_string());
        channel.fail_sends_to(ChatId(2), gone.clone());
        let fanout = NotificationFanout::new(Arc::new(UserStore::new(storage)), channel.clone());

        let report = fanout.notify_admins("hello").await.unwrap();

        assert_eq!(report.delivered, vec![UserId::new(1), UserId::new(3)]);
        assert_eq!(report.failed, vec![(UserId::new(2), gone)]);
        assert_eq!(report.attempted(), 3);
        assert_eq!(channel.texts_to(ChatId(3)), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn no_admins_is_an_empty_report() {
        let channel = Arc::new(RecordingChannel::new());
        let store = Arc::new(UserStore::new(MemoryStorage::new()));
        let fanout = NotificationFanout::new(store, channel.clone());

        let report = fanout.notify_admins("hello").await.unwrap();

        assert_eq!(report.attempted(), 0);
        assert!(channel.calls().is_empty());
    }
}
