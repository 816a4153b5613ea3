//! Tracing layer that forwards ERROR events to the admin's Telegram chat.
//!
//! At most one message per [`MIN_INTERVAL`]; an identical message is not
//! repeated within [`DEDUP_WINDOW`]. Sends are spawned onto the Tokio runtime
//! and silently skipped when no runtime is running.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use studio_core::messages::escape_html;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const MIN_INTERVAL: Duration = Duration::from_secs(10);
const DEDUP_WINDOW: Duration = Duration::from_secs(60);

// ── Throttle ──

/// Send decision state, kept apart from I/O so it can be driven with fake instants.
struct Throttle {
    last_sent: Option<Instant>,
    /// (message hash, sent_at)
    recent: Vec<(u64, Instant)>,
}

impl Throttle {
    fn new() -> Self {
        Self {
            last_sent: None,
            recent: Vec::new(),
        }
    }

    /// Records the send when it returns true.
    fn allow(&mut self, hash: u64, now: Instant) -> bool {
        self.recent
            .retain(|(_, at)| now.saturating_duration_since(*at) < DEDUP_WINDOW);

        let too_soon = self
            .last_sent
            .is_some_and(|last| now.saturating_duration_since(last) < MIN_INTERVAL);
        let duplicate = self.recent.iter().any(|(h, _)| *h == hash);
        if too_soon || duplicate {
            return false;
        }

        self.last_sent = Some(now);
        self.recent.push((hash, now));
        true
    }
}

// ── Layer ──

pub struct TelegramLayer {
    bot_token: String,
    chat_id: i64,
    /// Shown in the alert title so several deployments can share one admin chat.
    source: String,
    http: reqwest::Client,
    throttle: Mutex<Throttle>,
}

impl TelegramLayer {
    pub fn new(bot_token: String, chat_id: i64, source: impl Into<String>) -> Self {
        Self {
            bot_token,
            chat_id,
            source: source.into(),
            http: reqwest::Client::new(),
            throttle: Mutex::new(Throttle::new()),
        }
    }

    fn render(&self, message: &str, location: &str) -> String {
        let at = chrono::Utc::now().format("%H:%M:%S UTC");
        format!(
            "🚨 <b>{} server error</b>\n\
             ━━━━━━━━━━━━━━━\n\
             <code>{}</code>\n\
             ━━━━━━━━━━━━━━━\n\
             📍 {}\n\
             🕐 {at}",
            escape_html(&self.source),
            escape_html(message),
            escape_html(location),
        )
    }
}

impl<S: Subscriber> Layer<S> for TelegramLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.message();

        let hash = {
            let mut h = DefaultHasher::new();
            message.hash(&mut h);
            h.finish()
        };
        let allowed = match self.throttle.lock() {
            Ok(mut throttle) => throttle.allow(hash, Instant::now()),
            Err(_) => false,
        };
        if !allowed {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let meta = event.metadata();
        let location = format!(
            "{} ({}:{})",
            meta.target(),
            meta.file().unwrap_or("?"),
            meta.line().map_or_else(|| "?".to_string(), |l| l.to_string()),
        );
        let text = self.render(&message, &location);
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let client = self.http.clone();
        let chat_id = self.chat_id;

        runtime.spawn(async move {
            let _ = client
                .post(&url)
                .json(&serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "HTML"
                }))
                .send()
                .await;
        });
    }
}

// ── Field visitor ──

/// The event's `message` plus any structured fields as `k=v`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl MessageVisitor {
    fn message(&self) -> String {
        let extras = self
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        match (self.message.is_empty(), extras.is_empty()) {
            (_, true) => self.message.clone(),
            (true, false) => extras,
            (false, false) => format!("{} ({extras})", self.message),
        }
    }

    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, value.to_string());
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_allowed() {
        assert!(Throttle::new().allow(1, Instant::now()));
    }

    #[test]
    fn test_second_message_too_soon() {
        let mut t = Throttle::new();
        let start = Instant::now();
        assert!(t.allow(1, start));
        assert!(!t.allow(2, start + Duration::from_secs(3)));
        assert!(t.allow(2, start + MIN_INTERVAL));
    }

    #[test]
    fn test_duplicate_suppressed_until_window_passes() {
        let mut t = Throttle::new();
        let start = Instant::now();
        assert!(t.allow(7, start));
        assert!(!t.allow(7, start + MIN_INTERVAL));
        assert!(t.allow(7, start + DEDUP_WINDOW));
    }

    #[test]
    fn test_rejected_message_not_recorded() {
        let mut t = Throttle::new();
        let start = Instant::now();
        assert!(t.allow(1, start));
        assert!(!t.allow(2, start + Duration::from_secs(1)));
        // 2 was never sent, so it is not a duplicate later
        assert!(t.allow(2, start + MIN_INTERVAL));
    }

    #[test]
    fn test_render_escapes_html() {
        let layer = TelegramLayer::new("t".into(), 1, "Anthony Studio");
        let text = layer.render("bad <input> & more", "api (x.rs:1)");
        assert!(text.contains("Anthony Studio server error"));
        assert!(text.contains("bad &lt;input&gt; &amp; more"));
    }

    #[test]
    fn test_visitor_message_with_fields() {
        let v = MessageVisitor {
            message: "insert failed".into(),
            fields: vec![("booking_id".into(), "42".into())],
        };
        assert_eq!(v.message(), "insert failed (booking_id=42)");
    }

    #[test]
    fn test_visitor_fields_only() {
        let v = MessageVisitor {
            message: String::new(),
            fields: vec![("error".into(), "timeout".into())],
        };
        assert_eq!(v.message(), "error=timeout");
    }
}
