//! Command surface of the bot.
//!
//! [`Command::parse`] turns message text into a command and [`Bot::handle`]
//! runs it. `handle` never fails: every error becomes a [`Reply`] to the
//! caller.

use std::sync::Arc;

use wackelberry_core::{
    BroadcastConfig, Caller, ChatId, Environment, MessagingChannel, PositionSource, UserId,
    UserStatus,
};

use crate::{
    access::AccessController,
    live::LiveShareManager,
    reply::Reply,
    storage::UserStorage,
    user_store::UserStore,
};

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/register`
    Register,
    /// `/approve <user_id>`; `target` is `None` when the argument is missing
    Approve {
        /// Raw argument naming the user to approve
        target: Option<String>,
    },
    /// `/live`
    Live,
    /// `/stop`
    Stop,
    /// `/status`
    Status,
    /// Any other slash command, by name
    Unknown(String),
}

impl Command {
    /// Parse message text. Returns `None` if the text is not a command.
    ///
    /// A `@botname` suffix on the command name is ignored. Arguments beyond
    /// the ones a command takes are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let name = words.next()?.strip_prefix('/')?;
        let name = name.split_once('@').map_or(name, |(name, _)| name);

        let command = match name.to_ascii_lowercase().as_str() {
            "register" => Self::Register,
            "approve" => Self::Approve { target: words.next().map(str::to_string) },
            "live" => Self::Live,
            "stop" => Self::Stop,
            "status" => Self::Status,
            _ => Self::Unknown(format!("/{name}")),
        };
        Some(command)
    }

    /// Command name as typed by users.
    pub fn name(&self) -> &str {
        match self {
            Self::Register => "/register",
            Self::Approve { .. } => "/approve",
            Self::Live => "/live",
            Self::Stop => "/stop",
            Self::Status => "/status",
            Self::Unknown(name) => name,
        }
    }
}

/// The bot: access control plus live sharing behind one entry point.
pub struct Bot<S, C, P, E>
where
    S: UserStorage,
    C: MessagingChannel,
    P: PositionSource,
    E: Environment,
{
    access: AccessController<S, C>,
    live: LiveShareManager<C, P, E>,
}

impl<S, C, P, E> Bot<S, C, P, E>
where
    S: UserStorage,
    C: MessagingChannel,
    P: PositionSource,
    E: Environment,
{
    /// Assemble a bot from its parts.
    pub fn new(access: AccessController<S, C>, live: LiveShareManager<C, P, E>) -> Self {
        Self { access, live }
    }

    /// Wire a bot over `storage`, publishing through `channel`.
    pub fn build(storage: S, channel: Arc<C>, source: P, env: E, config: BroadcastConfig) -> Self {
        let store = Arc::new(UserStore::new(storage));
        let access = AccessController::new(store, Arc::clone(&channel));
        let live = LiveShareManager::new(channel, Arc::new(source), env, config);
        Self::new(access, live)
    }

    /// Access controller.
    pub fn access(&self) -> &AccessController<S, C> {
        &self.access
    }

    /// Live-share manager.
    pub fn live(&self) -> &LiveShareManager<C, P, E> {
        &self.live
    }

    /// Shared user store.
    pub fn store(&self) -> &Arc<UserStore<S>> {
        self.access.store()
    }

    /// Run `command` for `caller` in `chat` and produce the reply.
    pub async fn handle(&self, caller: &Caller, chat: ChatId, command: Command) -> Reply {
        tracing::info!(
            user_id = %caller.id,
            name = %caller.name,
            chat_id = %chat,
            command = command.name(),
            "command received"
        );

        match command {
            Command::Register => self.register(caller).await,
            Command::Approve { target } => self.approve(caller.id, target.as_deref()).await,
            Command::Live => self.start_live(caller.id, chat).await,
            Command::Stop => self.stop_live(chat),
            Command::Status => match self.access.status(caller.id).await {
                Ok(status) => Reply::Status(status),
                Err(err) => Reply::from(err),
            },
            Command::Unknown(name) => Reply::UnknownCommand(name),
        }
    }

    async fn register(&self, caller: &Caller) -> Reply {
        match self.access.register(caller).await {
            Ok(registration) if registration.created => Reply::RegistrationSent,
            Ok(registration) => Reply::for_existing_registration(registration.status),
            Err(err) => Reply::from(err),
        }
    }

    async fn approve(&self, caller: UserId, target: Option<&str>) -> Reply {
        let Some(target) = target else {
            return match self.access.status(caller).await {
                Ok(UserStatus::Admin) => Reply::ApproveUsage,
                Ok(_) => Reply::NotAllowedToApprove,
                Err(err) => Reply::from(err),
            };
        };

        match self.access.approve(caller, target).await {
            Ok(approval) => Reply::Approved { name: approval.record.name, id: approval.record.id },
            Err(err) => Reply::from(err),
        }
    }

    async fn start_live(&self, caller: UserId, chat: ChatId) -> Reply {
        if let Err(err) = self.access.authorize_live_share(caller).await {
            return Reply::from(err);
        }

        match self.live.start(chat).await {
            Ok(_handle) => Reply::LiveStarted { duration: self.live.config().total_duration },
            Err(err) => Reply::from(err),
        }
    }

    fn stop_live(&self, chat: ChatId) -> Reply {
        match self.live.cancel(chat) {
            Ok(()) => Reply::LiveStopped,
            Err(err) => Reply::from(err),
        }
    }
}
