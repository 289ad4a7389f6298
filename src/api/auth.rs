//! Bearer-token authentication for handlers

use super::error::ApiError;
use super::server::AppState;
use crate::access::Actor;
use crate::error::LyceumError;
use crate::types::User;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// The user behind a valid session token
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub token: String,
}

impl Authenticated {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.user)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| {
                LyceumError::Unauthenticated("missing Authorization: Bearer token".to_string())
            })?
            .to_string();
        let user = state.lms.authenticate(&token).await?;
        Ok(Self { user, token })
    }
}
