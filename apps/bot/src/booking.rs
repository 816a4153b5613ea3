use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use studio_core::messages;
use studio_core::{NewBooking, StoreError};
use teloxide::{prelude::*, types::ParseMode};

use crate::{keyboards, BookingDialogue, BotState, HandlerResult, State};

const EXPIRED: &str = "⌛ This menu has expired. Use /start to begin again.";

// ── Text steps ──

pub async fn receive_name(bot: Bot, dialogue: BookingDialogue, msg: Message) -> HandlerResult {
    let name = msg.text().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        bot.send_message(msg.chat.id, messages::ask_name())
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, messages::ask_phone(name))
        .parse_mode(ParseMode::Html)
        .await?;
    dialogue
        .update(State::ReceivePhone {
            name: name.to_string(),
        })
        .await?;
    Ok(())
}

pub async fn receive_phone(
    bot: Bot,
    dialogue: BookingDialogue,
    name: String,
    msg: Message,
    state: Arc<BotState>,
) -> HandlerResult {
    let phone = msg.text().map(str::trim).unwrap_or_default();
    if phone.is_empty() {
        bot.send_message(msg.chat.id, messages::ask_phone(&name))
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, messages::ask_service())
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::services(state.engine.catalog()))
        .await?;
    dialogue
        .update(State::ReceiveService {
            name,
            phone: phone.to_string(),
        })
        .await?;
    Ok(())
}

// ── Button steps ──

pub async fn choose_service(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: BookingDialogue,
    key: String,
    state: &BotState,
) -> HandlerResult {
    let State::ReceiveService { name, phone } = dialogue.get_or_default().await? else {
        bot.send_message(chat_id, EXPIRED).await?;
        return Ok(());
    };
    let Some(service) = state.engine.catalog().get(&key) else {
        tracing::warn!(service = %key, "service button for unknown key");
        bot.send_message(chat_id, EXPIRED).await?;
        return Ok(());
    };

    let days = state
        .engine
        .calendar()
        .bookable_days(state.clock.today(), state.config.horizon_days);

    bot.send_message(chat_id, messages::ask_date(service))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::dates(&days))
        .await?;
    dialogue
        .update(State::ReceiveDate {
            name,
            phone,
            service: key,
        })
        .await?;
    Ok(())
}

pub async fn choose_date(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: BookingDialogue,
    day: NaiveDate,
    state: &BotState,
) -> HandlerResult {
    let State::ReceiveDate {
        name,
        phone,
        service,
    } = dialogue.get_or_default().await?
    else {
        bot.send_message(chat_id, EXPIRED).await?;
        return Ok(());
    };

    // Date buttons from an earlier day can still be pressed
    let bookable = state
        .engine
        .calendar()
        .bookable_days(state.clock.today(), state.config.horizon_days);
    if !bookable.contains(&day) {
        bot.send_message(chat_id, EXPIRED).await?;
        dialogue.exit().await?;
        return Ok(());
    }

    let slots = free_slots(state, &service, day).await?;
    if slots.is_empty() {
        bot.send_message(chat_id, messages::no_slots()).await?;
        dialogue.exit().await?;
        return Ok(());
    }

    bot.send_message(chat_id, messages::ask_time(day))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::times(&slots))
        .await?;
    dialogue
        .update(State::ReceiveTime {
            name,
            phone,
            service,
            day,
        })
        .await?;
    Ok(())
}

pub async fn choose_time(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    dialogue: BookingDialogue,
    start: NaiveTime,
    state: &BotState,
) -> HandlerResult {
    let State::ReceiveTime {
        name,
        phone,
        service,
        day,
    } = dialogue.get_or_default().await?
    else {
        bot.send_message(chat_id, EXPIRED).await?;
        return Ok(());
    };

    let request = NewBooking {
        customer_id: user_id,
        customer_name: name,
        customer_phone: phone,
        service_key: service.clone(),
        day,
        start_time: start,
    };
    let now = state.clock.now();

    let id = match state.store.insert_booking(&request, &state.engine, now).await {
        Ok(id) => id,
        Err(StoreError::SlotTaken) => {
            return reoffer(bot, chat_id, dialogue, state, &service, day, messages::slot_taken(day)).await;
        }
        Err(StoreError::Rejected(reason)) => {
            tracing::warn!(%reason, %day, "booking rejected at confirmation");
            let text = format!("⚠️ Sorry, {reason}.\n\n{}", messages::ask_time(day));
            return reoffer(bot, chat_id, dialogue, state, &service, day, text).await;
        }
        Err(e) => return Err(e.into()),
    };

    dialogue.exit().await?;
    let booking = request.into_booking(id, now);
    let catalog = state.engine.catalog();

    bot.send_message(
        chat_id,
        messages::confirmation(
            &booking,
            catalog,
            &state.config.business_name,
            &state.config.business_address,
        ),
    )
    .parse_mode(ParseMode::Html)
    .await?;

    let notice = bot
        .send_message(ChatId(state.config.admin_tg_id), messages::admin_new_booking(&booking, catalog))
        .parse_mode(ParseMode::Html)
        .await;
    if let Err(e) = notice {
        tracing::error!("Failed to notify admin about booking #{}: {}", booking.id, e);
    }

    Ok(())
}

/// Show the day's remaining slots again after a failed confirmation.
async fn reoffer(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: BookingDialogue,
    state: &BotState,
    service: &str,
    day: NaiveDate,
    text: String,
) -> HandlerResult {
    let slots = free_slots(state, service, day).await?;
    if slots.is_empty() {
        bot.send_message(chat_id, messages::no_slots()).await?;
        dialogue.exit().await?;
        return Ok(());
    }

    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::times(&slots))
        .await?;
    Ok(())
}

async fn free_slots(state: &BotState, service: &str, day: NaiveDate) -> Result<Vec<NaiveTime>, StoreError> {
    let existing = state.store.fetch_confirmed_bookings(day).await?;
    let duration = state.engine.catalog().service_duration(service);
    Ok(state
        .engine
        .list_free_slots(day, duration, &existing, state.clock.now()))
}

// ── My bookings ──

pub async fn send_my_bookings(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    state: &BotState,
) -> HandlerResult {
    let bookings = state
        .store
        .upcoming_for_customer(user_id, state.clock.today())
        .await?;

    bot.send_message(chat_id, messages::my_bookings(&bookings, state.engine.catalog()))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::back())
        .await?;
    Ok(())
}
