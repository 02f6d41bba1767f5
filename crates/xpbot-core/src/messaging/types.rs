use crate::domain::{ChatId, MessageRef, UserId};

/// A plain-text message delivered by the transport.
///
/// Non-text updates (photos, stickers, ...) never reach the core.
#[derive(Clone, Debug)]
pub struct IncomingText {
    pub message: MessageRef,
    pub sender: Option<UserId>,
    pub text: String,
}

impl IncomingText {
    pub fn chat_id(&self) -> ChatId {
        self.message.chat_id
    }
}
