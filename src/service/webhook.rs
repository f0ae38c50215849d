// service/webhook.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    db::{paymentdb::PaymentExt, DBClient},
    models::paymentmodel::PaymentType,
    service::error::ServiceError,
};

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub payment_type: PaymentType,
    pub user_id: Uuid,
    pub task_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookAction {
    CheckoutCompleted(CompletedCheckout),
    SubscriptionRenewed { subscription_id: String },
    SubscriptionCancelled { subscription_id: String },
    Ignore,
}

/// Paid subscription periods run for one calendar month.
pub fn one_month_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(1))
        .unwrap_or(now + Duration::days(30))
}

pub fn featured_until(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}

fn str_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw)
        .map_err(|_| ServiceError::Validation(format!("Invalid {} in webhook metadata", field)))
}

/// Decides what a verified event means for the marketplace without touching
/// the database.
pub fn plan_webhook_action(event: &StripeEvent) -> Result<WebhookAction, ServiceError> {
    let object = &event.data.object;

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let metadata = object.get("metadata").cloned().unwrap_or(Value::Null);

            let kind = metadata
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| ServiceError::Validation("Missing payment type in metadata".to_string()))?;
            let payment_type = PaymentType::from_metadata(kind)
                .ok_or_else(|| ServiceError::Validation(format!("Unknown payment type: {}", kind)))?;

            let user_id = metadata
                .get("userId")
                .and_then(Value::as_str)
                .ok_or_else(|| ServiceError::Validation("Missing userId in metadata".to_string()))
                .and_then(|raw| parse_uuid(raw, "userId"))?;

            let task_id = match metadata.get("taskId").and_then(Value::as_str) {
                Some(raw) => Some(parse_uuid(raw, "taskId")?),
                None => None,
            };
            if payment_type.requires_task() && task_id.is_none() {
                return Err(ServiceError::Validation(format!(
                    "Missing taskId for {} payment",
                    payment_type.to_str()
                )));
            }

            let session_id = str_field(object, "id")
                .ok_or_else(|| ServiceError::Validation("Missing checkout session id".to_string()))?;

            Ok(WebhookAction::CheckoutCompleted(CompletedCheckout {
                session_id,
                payment_type,
                user_id,
                task_id,
                amount_cents: object.get("amount_total").and_then(Value::as_i64).unwrap_or(0),
                currency: str_field(object, "currency").unwrap_or_else(|| "eur".to_string()),
                payment_intent_id: str_field(object, "payment_intent"),
                customer_id: str_field(object, "customer"),
                subscription_id: str_field(object, "subscription"),
            }))
        }
        "invoice.paid" | "invoice.payment_succeeded" => match str_field(object, "subscription") {
            Some(subscription_id) => Ok(WebhookAction::SubscriptionRenewed { subscription_id }),
            None => Ok(WebhookAction::Ignore),
        },
        "customer.subscription.deleted" => {
            let subscription_id = str_field(object, "id")
                .ok_or_else(|| ServiceError::Validation("Missing subscription id".to_string()))?;
            Ok(WebhookAction::SubscriptionCancelled { subscription_id })
        }
        _ => Ok(WebhookAction::Ignore),
    }
}

#[derive(Debug)]
pub struct WebhookService {
    db_client: Arc<DBClient>,
    featured_task_days: i64,
}

impl WebhookService {
    pub fn new(db_client: Arc<DBClient>, featured_task_days: i64) -> Self {
        Self {
            db_client,
            featured_task_days,
        }
    }

    pub async fn handle(&self, event: &StripeEvent) -> Result<(), ServiceError> {
        let now = Utc::now();

        match plan_webhook_action(event)? {
            WebhookAction::CheckoutCompleted(checkout) => {
                let recorded = self
                    .db_client
                    .record_completed_checkout(
                        &checkout,
                        one_month_from(now),
                        featured_until(now, self.featured_task_days),
                    )
                    .await?;

                if recorded {
                    tracing::info!(
                        "Recorded {} payment {} for user {}",
                        checkout.payment_type.to_str(),
                        checkout.session_id,
                        checkout.user_id
                    );
                } else {
                    tracing::info!(
                        "Checkout session {} already processed, skipping (event {})",
                        checkout.session_id,
                        event.id
                    );
                }
            }
            WebhookAction::SubscriptionRenewed { subscription_id } => {
                let updated = self
                    .db_client
                    .extend_subscription(&subscription_id, one_month_from(now))
                    .await?;
                if updated == 0 {
                    tracing::info!("No profile holds subscription {}", subscription_id);
                }
            }
            WebhookAction::SubscriptionCancelled { subscription_id } => {
                self.db_client.deactivate_subscription(&subscription_id).await?;
                tracing::info!("Subscription {} cancelled", subscription_id);
            }
            WebhookAction::Ignore => {
                tracing::info!("Unhandled Stripe webhook event: {}", event.event_type);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, object: Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_test",
            "type": event_type,
            "data": { "object": object }
        }))
        .expect("event")
    }

    #[test]
    fn worker_subscription_checkout_activates_subscriber() {
        let user_id = Uuid::new_v4();
        let action = plan_webhook_action(&event(
            "checkout.session.completed",
            json!({
                "id": "cs_test_1",
                "amount_total": 999,
                "currency": "eur",
                "customer": "cus_1",
                "subscription": "sub_1",
                "metadata": { "type": "worker_subscription", "userId": user_id.to_string() }
            }),
        ))
        .expect("action");

        match action {
            WebhookAction::CheckoutCompleted(checkout) => {
                assert_eq!(checkout.payment_type, PaymentType::WorkerSubscription);
                assert_eq!(checkout.user_id, user_id);
                assert_eq!(checkout.task_id, None);
                assert_eq!(checkout.amount_cents, 999);
                assert_eq!(checkout.subscription_id.as_deref(), Some("sub_1"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn task_payment_without_task_is_rejected() {
        let err = plan_webhook_action(&event(
            "checkout.session.completed",
            json!({
                "id": "cs_test_2",
                "metadata": { "type": "featured_task", "userId": Uuid::new_v4().to_string() }
            }),
        ))
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn unknown_metadata_type_is_rejected() {
        let err = plan_webhook_action(&event(
            "checkout.session.completed",
            json!({
                "id": "cs_test_3",
                "metadata": { "type": "tip", "userId": Uuid::new_v4().to_string() }
            }),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("tip"));
    }

    #[test]
    fn subscription_lifecycle_events() {
        assert_eq!(
            plan_webhook_action(&event("invoice.paid", json!({ "subscription": "sub_9" }))).unwrap(),
            WebhookAction::SubscriptionRenewed {
                subscription_id: "sub_9".to_string()
            }
        );
        assert_eq!(
            plan_webhook_action(&event("customer.subscription.deleted", json!({ "id": "sub_9" })))
                .unwrap(),
            WebhookAction::SubscriptionCancelled {
                subscription_id: "sub_9".to_string()
            }
        );
        assert_eq!(
            plan_webhook_action(&event("invoice.paid", json!({}))).unwrap(),
            WebhookAction::Ignore
        );
    }

    #[test]
    fn other_events_are_acknowledged() {
        assert_eq!(
            plan_webhook_action(&event("payment_intent.created", json!({}))).unwrap(),
            WebhookAction::Ignore
        );
    }

    #[test]
    fn subscription_period_is_about_one_month() {
        let now = Utc::now();
        let expires = one_month_from(now);
        let days = (expires - now).num_days();
        assert!((28..=31).contains(&days), "got {} days", days);
    }

    #[test]
    fn month_end_is_clamped() {
        let jan_31 = DateTime::parse_from_rfc3339("2025-01-31T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let expires = one_month_from(jan_31);
        assert_eq!(expires.to_rfc3339(), "2025-02-28T12:00:00+00:00");
    }
}
