//! Telegram Mini App `initData` validation.
//! See: https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::{api_error, ApiError, TelegramUser};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of initData before it's considered expired (24 hours).
const MAX_AUTH_AGE_SECS: i64 = 86400;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("Authorization header must be `tma <initData>`")]
    BadScheme,
    #[error("initData has no hash or auth_date")]
    Incomplete,
    #[error("initData signature mismatch")]
    BadSignature,
    #[error("initData expired")]
    Expired,
    #[error("initData has no valid user")]
    NoUser,
}

/// Check the HMAC signature and freshness of `init_data`, returning its user.
pub fn validate_init_data(
    init_data: &str,
    bot_token: &str,
    now_unix: i64,
) -> Result<TelegramUser, AuthError> {
    let params: BTreeMap<String, String> = url::form_urlencoded::parse(init_data.as_bytes())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let hash = params.get("hash").ok_or(AuthError::Incomplete)?;
    let auth_date: i64 = params
        .get("auth_date")
        .and_then(|v| v.parse().ok())
        .ok_or(AuthError::Incomplete)?;

    let expected = hex::decode(hash).map_err(|_| AuthError::BadSignature)?;
    let mac = signature(&params, bot_token).ok_or(AuthError::BadSignature)?;
    if mac.verify_slice(&expected).is_err() {
        tracing::warn!("initData hash mismatch");
        return Err(AuthError::BadSignature);
    }

    if now_unix - auth_date > MAX_AUTH_AGE_SECS {
        tracing::warn!(auth_date, age = now_unix - auth_date, "initData expired");
        return Err(AuthError::Expired);
    }

    let user_json = params.get("user").ok_or(AuthError::NoUser)?;
    serde_json::from_str::<TelegramUser>(user_json).map_err(|_| AuthError::NoUser)
}

/// HMAC over the sorted `key=value` lines (hash excluded), keyed by
/// HMAC-SHA256("WebAppData", bot_token).
fn signature(params: &BTreeMap<String, String>, bot_token: &str) -> Option<HmacSha256> {
    let data_check_string = params
        .iter()
        .filter(|(k, _)| k.as_str() != "hash")
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut secret = HmacSha256::new_from_slice(b"WebAppData").ok()?;
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret_key).ok()?;
    mac.update(data_check_string.as_bytes());
    Some(mac)
}

/// Pull the user out of an `Authorization: tma <initData>` header value.
pub fn user_from_header(
    auth_header: Option<&str>,
    bot_token: &str,
    now_unix: i64,
) -> Result<TelegramUser, AuthError> {
    let init_data = auth_header
        .ok_or(AuthError::MissingHeader)?
        .strip_prefix("tma ")
        .ok_or(AuthError::BadScheme)?;
    validate_init_data(init_data, bot_token, now_unix)
}

// ── Extractors ──

/// Any Telegram user with valid initData.
pub struct AuthUser(pub TelegramUser);

/// The studio admin. 403 for everyone else.
pub struct AdminUser(pub TelegramUser);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        user_from_header(header, &state.config.bot_token, state.clock.unix_now())
            .map(AuthUser)
            .map_err(|e| api_error(StatusCode::UNAUTHORIZED, e.to_string()))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.id != state.config.admin_tg_id {
            tracing::warn!(user_id = user.id, "non-admin on admin route");
            return Err(api_error(StatusCode::FORBIDDEN, "admin only"));
        }
        Ok(AdminUser(user))
    }
}

// ── Tests ──

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const TOKEN: &str = "123456:TEST-TOKEN";
    pub const NOW: i64 = 1_772_000_000;

    /// Build a correctly signed initData string.
    pub fn sign(user_json: &str, auth_date: i64, token: &str) -> String {
        let mut params = BTreeMap::new();
        params.insert("auth_date".to_string(), auth_date.to_string());
        params.insert("query_id".to_string(), "AAF".to_string());
        params.insert("user".to_string(), user_json.to_string());
        let hash = hex::encode(signature(&params, token).unwrap().finalize().into_bytes());

        let mut out = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &params {
            out.append_pair(k, v);
        }
        out.append_pair("hash", &hash);
        out.finish()
    }

    pub fn user_json(id: i64) -> String {
        format!(r#"{{"id":{id},"first_name":"Ann","username":"ann"}}"#)
    }

    #[test]
    fn test_valid_init_data() {
        let data = sign(&user_json(77), NOW - 60, TOKEN);
        let user = validate_init_data(&data, TOKEN, NOW).unwrap();
        assert_eq!(user.id, 77);
        assert_eq!(user.username.as_deref(), Some("ann"));
    }

    #[test]
    fn test_wrong_token() {
        let data = sign(&user_json(77), NOW, "other:token");
        assert_eq!(validate_init_data(&data, TOKEN, NOW).unwrap_err(), AuthError::BadSignature);
    }

    #[test]
    fn test_tampered_user() {
        let data = sign(&user_json(77), NOW, TOKEN).replace("77", "78");
        assert_eq!(validate_init_data(&data, TOKEN, NOW).unwrap_err(), AuthError::BadSignature);
    }

    #[test]
    fn test_expired() {
        let data = sign(&user_json(77), NOW - MAX_AUTH_AGE_SECS - 1, TOKEN);
        assert_eq!(validate_init_data(&data, TOKEN, NOW).unwrap_err(), AuthError::Expired);
    }

    #[test]
    fn test_missing_hash() {
        assert_eq!(
            validate_init_data("auth_date=1&user=%7B%7D", TOKEN, NOW).unwrap_err(),
            AuthError::Incomplete
        );
    }

    #[test]
    fn test_header_scheme() {
        let data = sign(&user_json(5), NOW, TOKEN);
        assert!(user_from_header(Some(&format!("tma {data}")), TOKEN, NOW).is_ok());
        assert_eq!(
            user_from_header(Some(&format!("Bearer {data}")), TOKEN, NOW).unwrap_err(),
            AuthError::BadScheme
        );
        assert_eq!(user_from_header(None, TOKEN, NOW).unwrap_err(), AuthError::MissingHeader);
    }
}
