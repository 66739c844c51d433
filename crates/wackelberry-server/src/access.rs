//! Access control over the persisted user document.
//!
//! [`AccessController`] runs the core access rules under the store lock and
//! performs the notifications that follow a state change. Notifications are
//! best-effort: their outcome is reported alongside the result, never as an
//! error of the command itself.

use std::sync::Arc;

use wackelberry_core::{
    Caller, ChannelError, ChatId, MessagingChannel, RegisterOutcome, UserId, UserRecord,
    UserStatus, access,
};

use crate::{
    error::CommandError,
    fanout::{FanoutReport, NotificationFanout},
    reply::Notice,
    storage::UserStorage,
    user_store::UserStore,
};

/// Outcome of a single best-effort message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The channel accepted the message.
    Delivered,
    /// The channel rejected the message.
    Failed(ChannelError),
}

impl Delivery {
    fn from_result(result: Result<(), ChannelError>) -> Self {
        match result {
            Ok(()) => Self::Delivered,
            Err(err) => Self::Failed(err),
        }
    }
}

/// Result of [`AccessController::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Caller's status after the call
    pub status: UserStatus,
    /// A pending record was created by this call
    pub created: bool,
    /// Admin notification, when a record was created and admins could be read
    pub fanout: Option<FanoutReport>,
}

/// Result of a successful [`AccessController::approve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    /// Approved record as persisted
    pub record: UserRecord,
    /// Admin notification, if admins could be read
    pub fanout: Option<FanoutReport>,
    /// Welcome message to the approved user
    pub direct_notice: Delivery,
}

/// Register, approve, and authorize users against the [`UserStore`].
pub struct AccessController<S: UserStorage, C: MessagingChannel> {
    store: Arc<UserStore<S>>,
    channel: Arc<C>,
    fanout: NotificationFanout<S, C>,
}

impl<S: UserStorage, C: MessagingChannel> AccessController<S, C> {
    /// Create a controller over `store`, notifying through `channel`.
    pub fn new(store: Arc<UserStore<S>>, channel: Arc<C>) -> Self {
        let fanout = NotificationFanout::new(Arc::clone(&store), Arc::clone(&channel));
        Self { store, channel, fanout }
    }

    /// Shared user store.
    pub fn store(&self) -> &Arc<UserStore<S>> {
        &self.store
    }

    /// Derived status of `id`.
    pub async fn status(&self, id: UserId) -> Result<UserStatus, CommandError> {
        Ok(self.store.status(id).await?)
    }

    /// Register `caller` and, if a record was created, tell every admin.
    pub async fn register(&self, caller: &Caller) -> Result<Registration, CommandError> {
        let outcome = self
            .store
            .modify(|directory| Ok::<_, CommandError>(access::register(directory, caller)))
            .await?;

        match outcome {
            RegisterOutcome::AlreadyRegistered(status) => {
                tracing::debug!(user_id = %caller.id, %status, "registration not needed");
                Ok(Registration { status, created: false, fanout: None })
            },
            RegisterOutcome::Created(record) => {
                tracing::info!(user_id = %record.id, name = %record.name, "registration requested");
                let notice = Notice::RegistrationRequested { name: record.name, id: record.id };
                let fanout = self.notify_admins(&notice).await;
                Ok(Registration { status: UserStatus::Pending, created: true, fanout })
            },
        }
    }

    /// Approve the user named by `target` on behalf of `caller`.
    ///
    /// On success every admin and the approved user are notified.
    pub async fn approve(&self, caller: UserId, target: &str) -> Result<Approval, CommandError> {
        let record = self
            .store
            .modify(|directory| {
                access::approve(directory, caller, target).map_err(CommandError::from)
            })
            .await?;

        tracing::info!(user_id = %record.id, approved_by = %caller, "user approved");

        let notice = Notice::Approved { name: record.name.clone(), id: record.id };
        let fanout = self.notify_admins(&notice).await;

        let welcome = Notice::Welcome.to_string();
        let direct_notice =
            Delivery::from_result(self.channel.send_text(ChatId::from(record.id), &welcome).await);
        if let Delivery::Failed(err) = &direct_notice {
            tracing::warn!(user_id = %record.id, error = %err, "welcome not delivered");
        }

        Ok(Approval { record, fanout, direct_notice })
    }

    /// Check that `caller` may start a live share.
    pub async fn authorize_live_share(&self, caller: UserId) -> Result<UserStatus, CommandError> {
        let directory = self.store.snapshot().await?;
        Ok(access::authorize_live_share(&directory, caller)?)
    }

    async fn notify_admins(&self, notice: &Notice) -> Option<FanoutReport> {
        match self.fanout.notify_admins(&notice.to_string()).await {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!(error = %err, "could not read admins for notification");
                None
            },
        }
    }
}
