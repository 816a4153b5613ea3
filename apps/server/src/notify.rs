/// Fire-and-forget delivery of admin notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, chat_id: i64, text: String);
}

/// Sends through the Bot API `sendMessage` with HTML parse mode.
pub struct TelegramNotifier {
    bot_token: String,
    http: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            http: reqwest::Client::new(),
        }
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, chat_id: i64, text: String) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let client = self.http.clone();

        tokio::spawn(async move {
            let sent = client
                .post(&url)
                .json(&serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "HTML"
                }))
                .send()
                .await
                .and_then(|r| r.error_for_status());

            if let Err(e) = sent {
                // warn, not error: an error here would loop back through TelegramLayer
                tracing::warn!("Failed to notify admin: {}", redacted(e));
            }
        });
    }
}

/// The request URL carries the bot token; keep it out of the logs.
fn redacted(e: reqwest::Error) -> String {
    e.without_url().to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_error_hides_token() {
        let e = reqwest::Client::new()
            .post("ftp://api.telegram.org/bot123:SECRET/sendMessage")
            .send()
            .await
            .unwrap_err();
        assert!(!redacted(e).contains("SECRET"));
    }
}
