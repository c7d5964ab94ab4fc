use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::events::ApplicationStatus,
    models::{Event, EventApplication},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub venue: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub max_vendors: Option<i32>,
    pub categories: Option<Vec<String>>,
    pub rules: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub max_vendors: Option<i32>,
    pub categories: Option<Vec<String>>,
    pub rules: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyToEventRequest {
    pub business_name: String,
    pub category: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewApplicationRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventList {
    pub items: Vec<Event>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApplicationList {
    pub items: Vec<EventApplication>,
}
