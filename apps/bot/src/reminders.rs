use std::sync::Arc;

use chrono::TimeDelta;
use studio_core::messages;
use teloxide::{prelude::*, types::ParseMode};
use tokio::time::{interval, Duration};

use crate::BotState;

/// Hourly: remind every customer with a confirmed booking tomorrow, once.
pub async fn run(bot: Bot, state: Arc<BotState>) {
    // Initial delay: let the dispatcher come up first
    tokio::time::sleep(Duration::from_secs(10)).await;

    let mut ticker = interval(Duration::from_secs(3600));

    loop {
        ticker.tick().await;

        let tomorrow = state.clock.today() + TimeDelta::days(1);
        let bookings = match state.store.due_reminders(tomorrow).await {
            Ok(bookings) => bookings,
            Err(e) => {
                tracing::error!("Reminder query failed: {}", e);
                continue;
            }
        };

        for booking in bookings {
            let text = messages::reminder(
                &booking,
                state.engine.catalog(),
                &state.config.business_name,
                &state.config.business_address,
            );

            let sent = bot
                .send_message(ChatId(booking.customer_id), text)
                .parse_mode(ParseMode::Html)
                .await;

            match sent {
                Ok(_) => {
                    if let Err(e) = state.store.mark_reminded(booking.id).await {
                        tracing::error!("Could not mark booking #{} reminded: {}", booking.id, e);
                    } else {
                        tracing::info!("📬 Reminder sent for booking #{}", booking.id);
                    }
                }
                // customer may have blocked the bot; retried next tick
                Err(e) => tracing::warn!("Reminder for booking #{} not delivered: {}", booking.id, e),
            }
        }
    }
}
