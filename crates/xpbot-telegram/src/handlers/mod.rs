//! Telegram update handlers.
//!
//! The adapter only translates a teloxide `Message` into the core's
//! `IncomingText`; routing and replies happen in `xpbot_core::bot`.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::{debug, error};

use xpbot_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    messaging::types::IncomingText,
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(incoming) = to_incoming(&msg) else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    if let Err(e) = state.bot.handle(&incoming).await {
        error!(
            chat_id = incoming.chat_id().0,
            error = %e,
            "failed to handle message"
        );
    }
    Ok(())
}

fn to_incoming(msg: &Message) -> Option<IncomingText> {
    let text = msg.text()?;

    Some(IncomingText {
        message: MessageRef {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
        },
        sender: msg.from().map(|u| UserId(u.id.0 as i64)),
        text: text.to_string(),
    })
}
