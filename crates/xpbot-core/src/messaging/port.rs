use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Outbound half of the messaging transport.
///
/// `send_text` starts a new message in a chat; `reply_text` answers a specific
/// incoming message (threaded under it where the platform supports that).
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef>;
}
