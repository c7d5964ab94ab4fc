use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    domain::roles::{Role, UserStatus},
    dto::auth::Claims,
    entity::users::Entity as Users,
    error::AppError,
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    /// Admin acting as this user, when the token came from impersonation.
    pub impersonator: Option<Uuid>,
}

impl AuthUser {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            role,
            impersonator: None,
        }
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Admin operations are never available through an impersonated session.
pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)?;
    if user.impersonator.is_some() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;
    Ok(token)
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = decode_claims(token, &state.config.jwt_secret)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
        let impersonator = match claims.imp.as_deref() {
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map_err(|_| AppError::Unauthorized("Invalid impersonator in token".into()))?,
            ),
            None => None,
        };

        let user = Users::find_by_id(user_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".into()))?;

        if user.token_version != claims.ver {
            return Err(AppError::Unauthorized("Session has been revoked".into()));
        }
        if user.status.parse::<UserStatus>()? == UserStatus::Suspended {
            return Err(AppError::Forbidden);
        }

        Ok(AuthUser {
            user_id,
            role: user.role.parse()?,
            impersonator,
        })
    }
}
