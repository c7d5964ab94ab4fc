use chrono::{DateTime, Utc};

use crate::error::AppError;

text_enum! {
    EventStatus {
        Draft => "draft",
        Published => "published",
        Cancelled => "cancelled",
    }
}

text_enum! {
    ApplicationStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

pub fn validate_event(
    title: &str,
    description: &str,
    venue: &str,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    max_vendors: Option<i32>,
) -> Result<(), AppError> {
    let title_len = title.trim().chars().count();
    if title_len == 0 || title_len > 200 {
        return Err(AppError::BadRequest("title must be between 1 and 200 characters".into()));
    }
    let description_len = description.trim().chars().count();
    if description_len == 0 || description_len > 2000 {
        return Err(AppError::BadRequest(
            "description must be between 1 and 2000 characters".into(),
        ));
    }
    if venue.trim().is_empty() {
        return Err(AppError::BadRequest("venue is required".into()));
    }
    if end_at <= start_at {
        return Err(AppError::BadRequest("end_at must be after start_at".into()));
    }
    if max_vendors.is_some_and(|m| m <= 0) {
        return Err(AppError::BadRequest("max_vendors must be positive".into()));
    }
    Ok(())
}
