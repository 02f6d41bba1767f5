use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};
use tracing::{info, warn};

use xpbot_core::{
    bot::XpBot,
    config::Config,
    messaging::{
        port::MessagingPort,
        throttled::{ThrottleConfig, ThrottledMessenger},
    },
    ports::RewardsPort,
    registry::Registry,
    security::AdminList,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<XpBot>,
}

/// Telegram client with an explicit request timeout.
pub fn build_bot(cfg: &Config) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(cfg.telegram_timeout)
        .build()?;
    Ok(Bot::with_client(cfg.telegram_bot_token.clone(), client))
}

fn menu_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Register with the bot"),
        BotCommand::new("xp", "Show your XP points"),
    ]
}

pub async fn run_polling(
    cfg: Arc<Config>,
    registry: Registry,
    rewards: Arc<dyn RewardsPort>,
) -> anyhow::Result<()> {
    let bot = build_bot(&cfg)?;

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => info!(username = %me.username(), "xpbot started"),
        Err(e) => warn!(error = %e, "getMe failed; continuing"),
    }
    let admins = AdminList::new(cfg.admin_user_ids.iter().copied());
    if admins.is_empty() {
        warn!("ADMIN_USER_IDS is empty; /broadcast is disabled");
    }
    info!(
        users = registry.len(),
        admins = admins.len(),
        registry = %cfg.registry_file.display(),
        "configuration"
    );

    // Long polling does not work while a webhook is set.
    if let Err(e) = bot.delete_webhook().await {
        warn!(error = %e, "failed to delete webhook");
    }
    if let Err(e) = bot.set_my_commands(menu_commands()).await {
        warn!(error = %e, "failed to register command menu");
    }

    // Broadcasts fan out to every user; the throttling decorator keeps that
    // under Telegram's flood limits. 429 RetryAfter is still retried once in
    // the Telegram adapter.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let xp_bot = XpBot::new(registry, messenger, rewards, admins)
        .with_announce_channel(cfg.announce_channel);

    let state = Arc::new(AppState {
        bot: Arc::new(xp_bot),
    });

    let handler = Update::filter_message().endpoint(handlers::handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            tracing::debug!(update_id = ?upd.id, "unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram dispatcher"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("xpbot stopped");
    Ok(())
}
