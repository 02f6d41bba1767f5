use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef},
    messaging::port::MessagingPort,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* Telegram API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls per chat (Telegram 1 msg/sec style limits).
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(35), // ~28/sec, under the 30/sec bulk limit
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

/// Reserve the slot at or after `next`, push `next` one interval on, and
/// return how long the caller has to wait for its slot.
fn reserve_slot(next: &mut Instant, now: Instant, interval: Duration) -> Duration {
    let start = (*next).max(now);
    *next = start + interval;
    start - now
}

#[derive(Debug)]
struct Slots {
    global: Instant,
    /// Next free slot per chat. Chats whose slot is already in the past are
    /// dropped, so this only holds chats messaged within the last interval.
    per_chat: HashMap<ChatId, Instant>,
}

/// MessagingPort decorator that spaces outbound calls.
///
/// A broadcast fans out one send per registered chat; without spacing a few
/// hundred users is enough to hit Telegram 429s.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    slots: Mutex<Slots>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            slots: Mutex::new(Slots {
                global: Instant::now(),
                per_chat: HashMap::new(),
            }),
        }
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        let wait = {
            let mut guard = self.slots.lock().await;
            let slots = &mut *guard;
            let now = Instant::now();
            slots.per_chat.retain(|_, next| *next > now);

            let global = reserve_slot(&mut slots.global, now, self.cfg.global_min_interval);
            let chat_next = slots.per_chat.entry(chat_id).or_insert(now);
            let chat = reserve_slot(chat_next, now, self.cfg.per_chat_min_interval);
            global.max(chat)
        };

        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_text(chat_id, text).await
    }

    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef> {
        self.throttle_chat(to.chat_id).await;
        self.inner.reply_text(to, text).await
    }
}
