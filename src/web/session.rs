use crate::db;
use crate::domain::models::{User, UserRole};
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: String,
    pub role: UserRole,
    pub tenant_id: String,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
    #[error("bad role")]
    Role,
}

/// `user|role|tenant|exp|nonce`, base64 encoded and HMAC signed.
pub fn sign_session(
    user_id: &str,
    role: UserRole,
    tenant_id: &str,
    ttl_secs: i64,
    key: &[u8],
) -> Result<String, SessionError> {
    if user_id.contains('|') || tenant_id.contains('|') {
        return Err(SessionError::Invalid);
    }
    let exp = Utc::now() + Duration::seconds(ttl_secs);
    let mut nonce = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut nonce);
    let payload = format!(
        "{}|{}|{}|{}|{}",
        user_id,
        role.as_str(),
        tenant_id,
        exp.timestamp(),
        general_purpose::STANDARD_NO_PAD.encode(nonce)
    );

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        general_purpose::STANDARD.encode(payload.as_bytes()),
        general_purpose::STANDARD.encode(sig)
    ))
}

pub fn verify_session(token: &str, key: &[u8]) -> Result<SessionClaims, SessionError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(SessionError::Invalid)?;
    let payload_bytes = general_purpose::STANDARD
        .decode(payload_b64)
        .map_err(|_| SessionError::Invalid)?;
    let sig_bytes = general_purpose::STANDARD
        .decode(sig_b64)
        .map_err(|_| SessionError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload_bytes);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| SessionError::Signature)?;

    let payload = String::from_utf8(payload_bytes).map_err(|_| SessionError::Invalid)?;
    let pieces: Vec<&str> = payload.split('|').collect();
    let [user_id, role, tenant_id, exp, _nonce] = pieces.as_slice() else {
        return Err(SessionError::Invalid);
    };
    let role = UserRole::try_from(*role).map_err(|_| SessionError::Role)?;
    let exp: i64 = exp.parse().map_err(|_| SessionError::Invalid)?;
    if Utc::now().timestamp() > exp {
        return Err(SessionError::Expired);
    }
    Ok(SessionClaims {
        user_id: user_id.to_string(),
        role,
        tenant_id: tenant_id.to_string(),
        exp,
    })
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(val) = auth.to_str() {
            if let Some(bearer) = val.strip_prefix("Bearer ") {
                return Some(bearer.trim().to_string());
            }
        }
    }
    if let Some(cookie) = headers.get(axum::http::header::COOKIE) {
        if let Ok(val) = cookie.to_str() {
            for pair in val.split(';') {
                let trimmed = pair.trim();
                if let Some(rest) = trimmed.strip_prefix("session=") {
                    if !rest.is_empty() {
                        return Some(rest.to_string());
                    }
                }
            }
        }
    }
    None
}

/// The signed-in user, loaded fresh from the store.
///
/// Tokens from another tenant, for a deleted user, or carrying a role the
/// user no longer has are rejected.
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared_state = SharedState::from_ref(state);

        let token = extract_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let claims = verify_session(&token, &shared_state.env.session_key).map_err(|e| {
            tracing::warn!("Session verification failed: {}", e);
            AppError::Unauthorized
        })?;
        if claims.tenant_id != shared_state.config().current_tenant().id {
            tracing::warn!("Session issued for tenant {}", claims.tenant_id);
            return Err(AppError::Unauthorized);
        }

        let user = db::fetch::<User>(shared_state.store(), &claims.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if user.role != claims.role {
            return Err(AppError::Unauthorized);
        }

        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn tokens_verify_with_the_signing_key_only() {
        let token = sign_session("manager", UserRole::Evaluator, "construction-demo", 60, KEY).unwrap();
        let claims = verify_session(&token, KEY).unwrap();
        assert_eq!(claims.user_id, "manager");
        assert_eq!(claims.role, UserRole::Evaluator);
        assert_eq!(claims.tenant_id, "construction-demo");

        assert!(matches!(
            verify_session(&token, b"another-key-another-key"),
            Err(SessionError::Signature)
        ));
        assert!(matches!(verify_session("garbage", KEY), Err(SessionError::Invalid)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = sign_session("admin", UserRole::Admin, "construction-demo", -5, KEY).unwrap();
        assert!(matches!(verify_session(&token, KEY), Err(SessionError::Expired)));
    }

    #[test]
    fn tokens_differ_per_issue() {
        let a = sign_session("admin", UserRole::Admin, "t", 60, KEY).unwrap();
        let b = sign_session("admin", UserRole::Admin, "t", 60, KEY).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn token_comes_from_bearer_or_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=abc"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));

        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
