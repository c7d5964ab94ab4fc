use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{AuditLog, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Suspend,
    Reinstate,
    VerifyEmail,
    ForceLogout,
}

impl UserAction {
    pub fn audit_action(&self) -> &'static str {
        match self {
            UserAction::Suspend => "admin.suspend_user",
            UserAction::Reinstate => "admin.reinstate_user",
            UserAction::VerifyEmail => "admin.verify_email",
            UserAction::ForceLogout => "admin.force_logout",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserActionRequest {
    pub action: UserAction,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserActionResult {
    pub action: UserAction,
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImpersonateRequest {
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImpersonationResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogList {
    pub items: Vec<AuditLog>,
}
