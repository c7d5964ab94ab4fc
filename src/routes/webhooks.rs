use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    dto::orders::WebhookAck, error::AppResult, services::payment_service, state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// The body is taken raw; the signature covers the exact bytes Stripe sent.
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    request_body(content = String, content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")
    ),
    responses(
        (status = 200, description = "Event received", body = WebhookAck),
        (status = 400, description = "Bad signature or payload")
    ),
    tag = "Webhooks"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let ack = payment_service::handle_stripe_webhook(&state, &headers, &body).await?;
    Ok(Json(ack))
}
