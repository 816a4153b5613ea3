mod admin;
mod booking;
mod keyboards;
mod reminders;

use std::sync::Arc;

use studio_core::{AvailabilityEngine, BookingStore, Clock, StudioConfig, SystemClock};
use teloxide::{
    dispatching::{dialogue, dialogue::InMemStorage, UpdateHandler},
    prelude::*,
    types::ParseMode,
    utils::command::BotCommands,
};

use crate::keyboards::Action;

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
pub type BookingDialogue = Dialogue<State, InMemStorage<State>>;

/// Per-chat conversation state. Everything collected so far rides along.
#[derive(Clone, Debug, Default)]
pub enum State {
    #[default]
    Idle,
    ReceiveName,
    ReceivePhone {
        name: String,
    },
    ReceiveService {
        name: String,
        phone: String,
    },
    ReceiveDate {
        name: String,
        phone: String,
        service: String,
    },
    ReceiveTime {
        name: String,
        phone: String,
        service: String,
        day: chrono::NaiveDate,
    },
    AwaitForwardTarget,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "Open the main menu")]
    Start,
    #[command(description = "Abort the current booking")]
    Cancel,
    #[command(description = "Show my upcoming bookings")]
    MyBookings,
    #[command(description = "Help")]
    Help,
}

pub struct BotState {
    pub store: BookingStore,
    pub engine: AvailabilityEngine,
    pub config: StudioConfig,
    pub clock: Arc<dyn Clock>,
}

impl BotState {
    pub fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.config.admin_tg_id
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse()?),
        )
        .init();

    let config = StudioConfig::from_env()?;
    let store = BookingStore::connect(&config.database_url, 3).await?;
    let bot = Bot::new(&config.bot_token);

    tracing::info!("💈 {} bot starting...", config.business_name);

    let state = Arc::new(BotState {
        store,
        engine: config.engine(),
        config,
        clock: Arc::new(SystemClock),
    });

    tokio::spawn(reminders::run(bot.clone(), Arc::clone(&state)));

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![InMemStorage::<State>::new(), state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>().endpoint(handle_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(case![State::ReceiveName].endpoint(booking::receive_name))
        .branch(case![State::ReceivePhone { name }].endpoint(booking::receive_phone))
        .branch(case![State::AwaitForwardTarget].endpoint(admin::receive_forward_target));

    let callback_handler = Update::filter_callback_query().endpoint(handle_callback);

    dialogue::enter::<Update, InMemStorage<State>, State, _>()
        .branch(message_handler)
        .branch(callback_handler)
}

// ── Command handlers ──

async fn handle_command(
    bot: Bot,
    dialogue: BookingDialogue,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> HandlerResult {
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);

    match cmd {
        Command::Start => {
            dialogue.exit().await?;
            bot.send_message(msg.chat.id, studio_core::messages::welcome(&state.config.business_name))
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::main_menu(state.is_admin(user_id)))
                .await?;
        }

        Command::Cancel => {
            dialogue.exit().await?;
            bot.send_message(msg.chat.id, studio_core::messages::cancelled())
                .await?;
        }

        Command::MyBookings => {
            booking::send_my_bookings(&bot, msg.chat.id, user_id, &state).await?;
        }

        Command::Help => {
            let mut text = format!(
                "💈 <b>{}</b>\n\n{}",
                studio_core::messages::escape_html(&state.config.business_name),
                Command::descriptions()
            );
            if state.is_admin(user_id) {
                text.push_str("\n\n⚙️ The admin panel is in the /start menu.");
            }
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }

    Ok(())
}

// ── Callback query handler (inline button clicks) ──

async fn handle_callback(
    bot: Bot,
    dialogue: BookingDialogue,
    q: CallbackQuery,
    state: Arc<BotState>,
) -> HandlerResult {
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };
    let user_id = q.from.id.0 as i64;

    let Some(action) = q.data.as_deref().and_then(Action::parse) else {
        tracing::warn!(data = ?q.data, "unrecognised callback data");
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };

    let is_admin_action = matches!(
        action,
        Action::Admin | Action::AdminToday | Action::AdminTomorrow | Action::AdminForward
    );
    if is_admin_action && !state.is_admin(user_id) {
        bot.answer_callback_query(&q.id)
            .text("Unauthorized")
            .show_alert(true)
            .await?;
        return Ok(());
    }

    bot.answer_callback_query(&q.id).await?;

    match action {
        Action::Book => {
            dialogue.update(State::ReceiveName).await?;
            bot.send_message(chat_id, studio_core::messages::ask_name())
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Action::MyBookings => booking::send_my_bookings(&bot, chat_id, user_id, &state).await?,
        Action::Back => {
            dialogue.exit().await?;
            bot.send_message(chat_id, studio_core::messages::welcome_back())
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::main_menu(state.is_admin(user_id)))
                .await?;
        }
        Action::Admin => {
            dialogue.exit().await?;
            admin::show_panel(&bot, chat_id).await?;
        }
        Action::AdminToday => admin::show_day(&bot, chat_id, 0, &state).await?,
        Action::AdminTomorrow => admin::show_day(&bot, chat_id, 1, &state).await?,
        Action::AdminForward => {
            dialogue.update(State::AwaitForwardTarget).await?;
            admin::ask_forward_target(&bot, chat_id).await?;
        }
        Action::Service(key) => booking::choose_service(&bot, chat_id, dialogue, key, &state).await?,
        Action::Date(day) => booking::choose_date(&bot, chat_id, dialogue, day, &state).await?,
        Action::Time(start) => {
            booking::choose_time(&bot, chat_id, user_id, dialogue, start, &state).await?
        }
    }

    Ok(())
}
