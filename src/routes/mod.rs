use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod doc;
pub mod events;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod sales_windows;
pub mod vendor;
pub mod vendor_orders;
pub mod vendors;
pub mod webhooks;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/vendors", vendors::router())
        .nest("/vendor", vendor::router())
        .nest("/orders", orders::route())
        .nest("/events", events::router())
        .nest("/admin", admin::router())
        .nest("/webhooks", webhooks::router())
}
