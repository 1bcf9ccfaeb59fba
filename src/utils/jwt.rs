// src/utils/jwt.rs

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::TokenSettings, error::ApiError, models::user::PublicUser, state::AppState};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Claims carried by both access and refresh tokens.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject - the user id.
    pub sub: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs a token for the given identity with the given secret and lifetime.
pub fn sign_jwt(
    id: i64,
    email: &str,
    username: &str,
    full_name: &str,
    settings: &TokenSettings,
) -> Result<String, ApiError> {
    let now = Utc::now().timestamp().max(0) as usize;
    let exp = usize::try_from(settings.expiry_seconds)
        .ok()
        .and_then(|expiry| now.checked_add(expiry))
        .ok_or_else(|| {
            tracing::error!("Token expiry of {}s is out of range", settings.expiry_seconds);
            ApiError::internal("Internal Server Error")
        })?;

    let claims = Claims {
        sub: id.to_string(),
        email: email.to_owned(),
        username: username.to_owned(),
        full_name: full_name.to_owned(),
        iat: now,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!("Token signing failed: {}", e);
        ApiError::internal("Internal Server Error")
    })
}

/// Verifies and decodes a token string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::unauthorized("Invalid access token"))?;

    Ok(token_data.claims)
}

/// Pulls the access token out of the `accessToken` cookie or the
/// `Authorization: Bearer <token>` header.
fn extract_token(req: &Request) -> Option<String> {
    let from_cookie = CookieJar::from_headers(req.headers())
        .get(ACCESS_TOKEN_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string());

    from_cookie.or_else(|| {
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
    })
}

/// Axum middleware: authentication.
///
/// Validates the access token, loads the user it names and injects the
/// sanitized `PublicUser` into the request extensions.
pub async fn verify_jwt_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&req)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = verify_jwt(&token, &state.config.access_token.secret)?;
    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| ApiError::unauthorized("Invalid access token"))?;

    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid access token"))?;

    req.extensions_mut().insert(PublicUser::from(user));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(secret: &str, expiry_seconds: u64) -> TokenSettings {
        TokenSettings {
            secret: secret.to_string(),
            expiry_seconds,
        }
    }

    #[test]
    fn signed_token_round_trips_claims() {
        let token = sign_jwt(
            42,
            "ada@example.com",
            "ada",
            "Ada Lovelace",
            &settings("s3cret", 600),
        )
        .unwrap();
        let claims = verify_jwt(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.full_name, "Ada Lovelace");
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[test]
    fn out_of_range_expiry_is_an_internal_error() {
        let err = sign_jwt(1, "a@b.c", "a", "A", &settings("s", u64::MAX)).unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_jwt(1, "a@b.c", "a", "A", &settings("one", 600)).unwrap();
        let err = verify_jwt(&token, "two").unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn reads_cookie_before_header() {
        let req = axum::http::Request::builder()
            .header(header::COOKIE, "theme=dark; accessToken=from-cookie")
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req).as_deref(), Some("from-cookie"));

        let req = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req).as_deref(), Some("from-header"));
    }

    #[test]
    fn quoted_cookie_value_is_unwrapped() {
        let req = axum::http::Request::builder()
            .header(header::COOKIE, "accessToken=\"abc.def.ghi\"")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req).as_deref(), Some("abc.def.ghi"));
    }
}
