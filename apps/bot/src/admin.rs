use std::sync::Arc;

use chrono::TimeDelta;
use studio_core::messages;
use teloxide::{prelude::*, types::ParseMode};

use crate::{keyboards, BookingDialogue, BotState, HandlerResult};

/// Telegram rejects messages longer than this.
const MAX_MESSAGE_LEN: usize = 4096;

pub async fn show_panel(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    bot.send_message(chat_id, "⚙️ <b>Admin Panel</b>\n\nChoose an option:")
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::admin_panel())
        .await?;
    Ok(())
}

/// Bookings `offset_days` from today (0 = today, 1 = tomorrow).
pub async fn show_day(bot: &Bot, chat_id: ChatId, offset_days: i64, state: &BotState) -> HandlerResult {
    let day = state.clock.today() + TimeDelta::days(offset_days);
    let label = if offset_days == 0 { "Today" } else { "Tomorrow" };
    let bookings = state.store.bookings_on(day).await?;

    bot.send_message(
        chat_id,
        messages::day_schedule(label, &bookings, state.engine.catalog()),
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboards::back_to_admin())
    .await?;
    Ok(())
}

pub async fn ask_forward_target(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    bot.send_message(
        chat_id,
        "📤 <b>Forward All Bookings</b>\n\n\
         Please enter the <b>Telegram User ID</b> you want to forward bookings to.\n\n\
         Example: 123456789\n\n\
         (Get User ID from @userinfobot)\n\n\
         Or click Cancel to go back.",
    )
    .parse_mode(ParseMode::Html)
    .reply_markup(keyboards::cancel_forward())
    .await?;
    Ok(())
}

pub async fn receive_forward_target(
    bot: Bot,
    dialogue: BookingDialogue,
    msg: Message,
    state: Arc<BotState>,
) -> HandlerResult {
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);
    if !state.is_admin(user_id) {
        dialogue.exit().await?;
        return Ok(());
    }

    let Some(target) = msg.text().and_then(|t| t.trim().parse::<i64>().ok()) else {
        bot.send_message(
            msg.chat.id,
            "❌ Invalid User ID. Please enter numbers only.\n\nUse /start to go back.",
        )
        .await?;
        return Ok(());
    };
    dialogue.exit().await?;

    let bookings = state.store.upcoming(state.clock.today()).await?;
    if bookings.is_empty() {
        bot.send_message(msg.chat.id, "📭 No upcoming bookings to forward.")
            .await?;
        return Ok(());
    }

    let text = messages::forward_schedule(&bookings, state.engine.catalog());
    for chunk in split_message(&text, MAX_MESSAGE_LEN) {
        if let Err(e) = bot
            .send_message(ChatId(target), chunk)
            .parse_mode(ParseMode::Html)
            .await
        {
            tracing::error!("Forward to {} failed: {}", target, e);
            bot.send_message(
                msg.chat.id,
                "❌ Failed to forward. Make sure the User ID is correct and has started this bot.\n\n\
                 Use /start to try again.",
            )
            .await?;
            return Ok(());
        }
    }

    tracing::info!(target_id = target, count = bookings.len(), "Forwarded upcoming bookings");
    bot.send_message(msg.chat.id, messages::forward_done(bookings.len(), target))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Split on blank lines so no chunk exceeds `limit` bytes. Entries never
/// straddle two messages; a single oversized entry is sent on its own.
fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for block in text.split_inclusive("\n\n") {
        if !current.is_empty() && current.len() + block.len() > limit {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(block);
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_message("a\n\nb", 100), vec!["a\n\nb".to_string()]);
    }

    #[test]
    fn test_split_on_blank_lines() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        let chunks = split_message(text, 12);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb\n\n".to_string(), "cccc".to_string()]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_every_chunk_within_limit() {
        let text = "entry line\n\n".repeat(1000);
        for chunk in split_message(&text, MAX_MESSAGE_LEN) {
            assert!(chunk.len() <= MAX_MESSAGE_LEN);
        }
    }
}
