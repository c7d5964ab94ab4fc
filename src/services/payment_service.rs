use axum::http::HeaderMap;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait, sea_query::LockType};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        checkout::PaymentStatus,
        signature::{self, DEFAULT_TOLERANCE_SECS},
    },
    dto::orders::WebhookAck,
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders},
        vendor_profiles::{ActiveModel as VendorActive, Entity as VendorProfiles},
    },
    error::{AppError, AppResult},
    services::order_service::mark_paid,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: Value,
}

fn metadata_uuid(object: &Value, key: &str) -> Option<Uuid> {
    object
        .get("metadata")
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Verifies and applies a Stripe event delivered to the webhook endpoint.
pub async fn handle_stripe_webhook(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> AppResult<WebhookAck> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("STRIPE_WEBHOOK_SECRET is not set")))?;
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".into()))?;

    signature::verify(header, body, secret, Utc::now().timestamp(), DEFAULT_TOLERANCE_SECS)
        .map_err(|err| {
            tracing::warn!(error = %err, "rejected stripe webhook");
            AppError::BadRequest(format!("Invalid signature: {err}"))
        })?;

    let event: StripeEvent = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest("Malformed event payload".into()))?;
    let object = &event.data.object;

    let handled = match event.kind.as_str() {
        "payment_intent.succeeded" => {
            let reference = string_field(object, "id");
            settle_order(state, metadata_uuid(object, "order_id"), reference).await?
        }
        "checkout.session.completed" => {
            let reference =
                string_field(object, "payment_intent").or_else(|| string_field(object, "id"));
            settle_order(state, metadata_uuid(object, "order_id"), reference).await?
        }
        "payment_intent.payment_failed" => {
            fail_order(state, metadata_uuid(object, "order_id")).await?
        }
        "account.updated" => {
            link_account(state, metadata_uuid(object, "vendor_id"), string_field(object, "id"))
                .await?
        }
        other => {
            tracing::info!(event_id = %event.id, kind = other, "stripe event ignored");
            false
        }
    };

    tracing::info!(event_id = %event.id, kind = %event.kind, handled, "stripe webhook processed");
    Ok(WebhookAck {
        received: true,
        handled,
    })
}

async fn settle_order(
    state: &AppState,
    order_id: Option<Uuid>,
    reference: Option<String>,
) -> AppResult<bool> {
    let Some(order_id) = order_id else {
        tracing::warn!("payment event without order_id metadata");
        return Ok(false);
    };
    let txn = state.orm.begin().await?;
    let Some(order) = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        tracing::warn!(%order_id, "payment event for unknown order");
        return Ok(false);
    };
    let order = match mark_paid(&txn, order, reference).await {
        Ok((order, true)) => order,
        Ok((order, false)) => {
            tracing::info!(order_id = %order.id, "payment already recorded");
            return Ok(false);
        }
        Err(AppError::Conflict(reason)) => {
            tracing::warn!(%order_id, %reason, "payment for order that cannot be paid");
            return Ok(false);
        }
        Err(err) => return Err(err),
    };
    txn.commit().await?;

    audit::record(
        state,
        None,
        "order_paid_webhook",
        "orders",
        serde_json::json!({ "order_id": order.id, "reference": order.payment_reference }),
    )
    .await;
    Ok(true)
}

async fn fail_order(state: &AppState, order_id: Option<Uuid>) -> AppResult<bool> {
    let Some(order_id) = order_id else {
        return Ok(false);
    };
    let Some(order) = Orders::find_by_id(order_id).one(&state.orm).await? else {
        return Ok(false);
    };
    if order.payment_status.parse::<PaymentStatus>()? == PaymentStatus::Paid {
        return Ok(false);
    }
    let mut active: OrderActive = order.into();
    active.payment_status = Set(PaymentStatus::Failed.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    tracing::info!(%order_id, "payment failed");
    Ok(true)
}

async fn link_account(
    state: &AppState,
    vendor_id: Option<Uuid>,
    account_id: Option<String>,
) -> AppResult<bool> {
    let (Some(vendor_id), Some(account_id)) = (vendor_id, account_id) else {
        return Ok(false);
    };
    let Some(vendor) = VendorProfiles::find_by_id(vendor_id).one(&state.orm).await? else {
        return Ok(false);
    };
    let mut active: VendorActive = vendor.into();
    active.stripe_account_id = Set(Some(account_id));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        state,
        None,
        "vendor_payments_connected",
        "vendor_profiles",
        serde_json::json!({ "vendor_id": vendor_id }),
    )
    .await;
    Ok(true)
}
