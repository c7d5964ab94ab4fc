use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::roles::{Role, UserStatus},
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest, SessionInfo},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    Ok(email)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Sign a token for `user`. `impersonator` marks tokens an admin obtained for someone else.
pub fn issue_token(
    secret: &str,
    user: &UserModel,
    impersonator: Option<Uuid>,
    ttl: Duration,
) -> AppResult<(String, DateTime<Utc>)> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        ver: user.token_version,
        imp: impersonator.map(|id| id.to_string()),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok((token, expiration))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        email,
        password,
        role,
        display_name,
    } = payload;
    let email = normalize_email(&email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let role = role.unwrap_or(Role::Customer);
    if !role.self_assignable() {
        return Err(AppError::BadRequest("Role cannot be self-assigned".into()));
    }

    let exists = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Email is already taken".to_string()));
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(hash_password(&password)?),
        role: Set(role.as_str().to_string()),
        display_name: Set(display_name.filter(|n| !n.trim().is_empty())),
        status: Set(UserStatus::Active.as_str().to_string()),
        email_verified: Set(false),
        email_verified_at: Set(None),
        token_version: Set(0),
        last_login_at: Set(None),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(user_id = %user.id, role = %role, "user registered");
    audit::record(
        state,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id, "role": role }),
    )
    .await;

    Ok(ApiResponse::success("User created", User::from(user), None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let user = Users::find()
        .filter(UserCol::Email.eq(email.trim().to_lowercase()))
        .one(&state.orm)
        .await?
        .ok_or_else(invalid)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid());
    }

    if user.status.parse::<UserStatus>()? == UserStatus::Suspended {
        tracing::info!(user_id = %user.id, "login refused for suspended user");
        return Err(AppError::Forbidden);
    }

    let (token, _) = issue_token(
        &state.config.jwt_secret,
        &user,
        None,
        Duration::hours(state.config.jwt_ttl_hours),
    )?;

    let mut active: UserActive = user.into();
    active.last_login_at = Set(Some(Utc::now().into()));
    let user = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
            user: user.into(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn current_session(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SessionInfo>> {
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::ok(
        "Session",
        SessionInfo {
            user: model.into(),
            impersonated_by: user.impersonator,
        },
    ))
}

/// Invalidates every outstanding token of `user_id`.
pub async fn revoke_tokens(state: &AppState, user_id: Uuid) -> AppResult<()> {
    Users::update_many()
        .col_expr(UserCol::TokenVersion, Expr::col(UserCol::TokenVersion).add(1))
        .col_expr(UserCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(UserCol::Id.eq(user_id))
        .exec(&state.orm)
        .await?;
    Ok(())
}

pub async fn logout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<serde_json::Value>> {
    revoke_tokens(state, user.user_id).await?;
    audit::record(
        state,
        Some(user.user_id),
        "user_logout",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;
    Ok(ApiResponse::ok("Logged out", serde_json::json!({})))
}
