//! The conversation workflow: command routing, wallet intake, XP reporting
//! and the two-step admin broadcast.
//!
//! All mutable state (registry + armed admins) sits behind one async mutex
//! that is held for the whole of an event, so events are processed strictly
//! one at a time even when the transport dispatches concurrently.

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    domain::{ChatId, UserId},
    messages,
    messaging::{port::MessagingPort, types::IncomingText},
    ports::RewardsPort,
    registry::{ChatState, Registry},
    rewards::XpResult,
    security::AdminList,
    Result,
};

/// Commands the bot understands. Anything else is free text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Xp,
    Broadcast,
}

impl Command {
    /// Parse `/cmd`, `/cmd@botname` and `/cmd args`. Unknown commands are `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.trim().split_whitespace().next()?;
        let name = first.strip_prefix('/')?.split('@').next().unwrap_or("");
        match name.to_lowercase().as_str() {
            "start" => Some(Command::Start),
            "xp" => Some(Command::Xp),
            "broadcast" => Some(Command::Broadcast),
            _ => None,
        }
    }
}

struct BotState {
    registry: Registry,
    /// Admins waiting to send a broadcast payload, per chat they armed in.
    armed: HashSet<(ChatId, UserId)>,
}

pub struct XpBot {
    state: Mutex<BotState>,
    messenger: Arc<dyn MessagingPort>,
    rewards: Arc<dyn RewardsPort>,
    admins: AdminList,
    announce_channel: Option<ChatId>,
}

impl XpBot {
    pub fn new(
        registry: Registry,
        messenger: Arc<dyn MessagingPort>,
        rewards: Arc<dyn RewardsPort>,
        admins: AdminList,
    ) -> Self {
        Self {
            state: Mutex::new(BotState {
                registry,
                armed: HashSet::new(),
            }),
            messenger,
            rewards,
            admins,
            announce_channel: None,
        }
    }

    /// Also post every broadcast payload to this channel.
    pub fn with_announce_channel(mut self, channel: Option<ChatId>) -> Self {
        self.announce_channel = channel;
        self
    }

    /// Handle one inbound text message to completion.
    ///
    /// Registry persistence failures are returned after the user has been told
    /// to retry; everything else is answered in chat and yields `Ok`.
    pub async fn handle(&self, msg: &IncomingText) -> Result<()> {
        let mut st = self.state.lock().await;
        let command = Command::parse(&msg.text);

        // Recognised commands keep their meaning; anything else from the admin
        // who armed this chat is the payload, and arming lasts for exactly one
        // message. Other members of the same chat fall through to free text.
        if command.is_none() {
            if let Some(sender) = msg.sender {
                if st.armed.remove(&(msg.chat_id(), sender)) {
                    self.run_broadcast(&st, msg).await;
                    return Ok(());
                }
            }
        }

        match command {
            Some(Command::Start) => self.on_start(&mut st, msg).await,
            Some(Command::Xp) => self.on_xp(&st, msg).await,
            Some(Command::Broadcast) => {
                self.on_broadcast(&mut st, msg).await;
                Ok(())
            }
            None => self.on_free_text(&mut st, msg).await,
        }
    }

    /// Whether `admin` armed a broadcast in this chat and has not sent it yet.
    pub async fn is_armed(&self, chat_id: ChatId, admin: UserId) -> bool {
        self.state.lock().await.armed.contains(&(chat_id, admin))
    }

    pub async fn state_of(&self, chat_id: ChatId) -> ChatState {
        self.state.lock().await.registry.state(chat_id)
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    async fn on_start(&self, st: &mut BotState, msg: &IncomingText) -> Result<()> {
        let chat_id = msg.chat_id();
        info!(%chat_id, "/start");

        if st.registry.get(chat_id).is_some() {
            self.reply(msg, messages::WELCOME_BACK).await;
            return Ok(());
        }

        if let Err(e) = st.registry.ensure(chat_id) {
            return self.storage_failure(msg, e).await;
        }
        info!(%chat_id, users = st.registry.len(), "new user added");

        self.reply(msg, messages::WELCOME).await;
        self.reply(msg, messages::ASK_WALLET).await;
        Ok(())
    }

    async fn on_xp(&self, st: &BotState, msg: &IncomingText) -> Result<()> {
        let chat_id = msg.chat_id();
        info!(%chat_id, "/xp");

        let ChatState::Registered { wallet } = st.registry.state(chat_id) else {
            self.reply(msg, messages::WALLET_NOT_FOUND).await;
            return Ok(());
        };

        let text = match self.rewards.get_xp(&wallet).await {
            XpResult::Found(record) => messages::xp_report(&wallet, &record, Utc::now()),
            XpResult::NotFound => messages::NO_POINTS.to_string(),
            XpResult::QueryError(e) => {
                warn!(%chat_id, %wallet, error = %e, "xp lookup failed");
                messages::XP_FETCH_ERROR.to_string()
            }
        };
        self.reply(msg, &text).await;
        Ok(())
    }

    async fn on_broadcast(&self, st: &mut BotState, msg: &IncomingText) {
        let chat_id = msg.chat_id();
        let Some(admin) = msg.sender.filter(|id| self.admins.is_admin(Some(*id))) else {
            warn!(%chat_id, sender = ?msg.sender, "unauthorized /broadcast");
            self.reply(msg, messages::NOT_AUTHORIZED).await;
            return;
        };

        st.armed.insert((chat_id, admin));
        info!(%chat_id, %admin, "broadcast armed");
        self.reply(msg, messages::BROADCAST_PROMPT).await;
    }

    /// The armed flag has already been cleared by the caller.
    async fn run_broadcast(&self, st: &BotState, msg: &IncomingText) {
        let payload = msg.text.as_str();
        if payload.is_empty() {
            self.reply(msg, messages::BROADCAST_PROMPT).await;
            return;
        }

        let recipients = st.registry.chat_ids();
        info!(recipients = recipients.len(), "broadcasting");

        let mut delivered = 0usize;
        let mut failed = 0usize;
        for chat_id in recipients {
            match self.messenger.send_text(chat_id, payload).await {
                Ok(_) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    warn!(%chat_id, error = %e, "failed to deliver broadcast");
                }
            }
        }

        if let Some(channel) = self.announce_channel {
            if let Err(e) = self.messenger.send_text(channel, payload).await {
                warn!(chat_id = %channel, error = %e, "failed to post broadcast to channel");
            }
        }

        info!(delivered, failed, "broadcast finished");
        self.reply(msg, &messages::broadcast_sent(delivered, failed))
            .await;
    }

    async fn on_free_text(&self, st: &mut BotState, msg: &IncomingText) -> Result<()> {
        let chat_id = msg.chat_id();
        if msg.text.starts_with('/') {
            debug!(%chat_id, text = %msg.text, "ignoring unknown command");
            return Ok(());
        }

        match st.registry.state(chat_id) {
            ChatState::Unregistered => self.reply(msg, messages::START_FIRST).await,
            ChatState::Registered { .. } => self.reply(msg, messages::WALLET_ALREADY_SET).await,
            ChatState::AwaitingWallet => match st.registry.set_wallet(chat_id, &msg.text) {
                Ok(_) => {
                    info!(%chat_id, wallet = %msg.text, "wallet address saved");
                    self.reply(msg, messages::WALLET_SAVED).await;
                }
                Err(e) => return self.storage_failure(msg, e).await,
            },
        }
        Ok(())
    }

    async fn storage_failure(&self, msg: &IncomingText, e: crate::Error) -> Result<()> {
        error!(chat_id = %msg.chat_id(), error = %e, "registry persistence failed");
        self.reply(msg, messages::STORAGE_ERROR).await;
        Err(e)
    }

    async fn reply(&self, msg: &IncomingText, text: &str) {
        if let Err(e) = self.messenger.reply_text(msg.message, text).await {
            warn!(chat_id = %msg.chat_id(), error = %e, "failed to send reply");
        }
    }
}
