// service/payment_provider.rs
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{config::Config, models::paymentmodel::PaymentType, service::error::ServiceError};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Signed timestamps older than this are refused to limit replays.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub payment_type: PaymentType,
    pub user_id: Uuid,
    pub user_email: String,
    pub task_id: Option<Uuid>,
    pub task_title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaymentProviderService {
    secret_key: String,
    webhook_secret: String,
    subscription_price_id: String,
    currency: String,
    task_posting_fee_cents: i64,
    featured_task_fee_cents: i64,
    site_url: String,
    http: reqwest::Client,
}

impl PaymentProviderService {
    pub fn new(config: &Config) -> Self {
        Self {
            secret_key: config.stripe_secret_key.clone(),
            webhook_secret: config.stripe_webhook_secret.clone(),
            subscription_price_id: config.stripe_subscription_price_id.clone(),
            currency: config.payment_currency.clone(),
            task_posting_fee_cents: config.task_posting_fee_cents,
            featured_task_fee_cents: config.featured_task_fee_cents,
            site_url: config.site_url.clone(),
            http: reqwest::Client::new(),
        }
    }

    pub fn amount_for(&self, payment_type: PaymentType) -> Option<i64> {
        match payment_type {
            PaymentType::TaskPosting => Some(self.task_posting_fee_cents),
            PaymentType::FeaturedTask => Some(self.featured_task_fee_cents),
            PaymentType::WorkerSubscription => None,
        }
    }

    /// Form fields for a Checkout Session. One-off fees use an inline price;
    /// the worker subscription uses the configured recurring price.
    pub fn checkout_params(&self, request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = vec![
            (
                "success_url".into(),
                format!(
                    "{}/payment/success?session_id={{CHECKOUT_SESSION_ID}}",
                    self.site_url
                ),
            ),
            ("cancel_url".into(), format!("{}/payment/cancelled", self.site_url)),
            ("client_reference_id".into(), request.user_id.to_string()),
            ("customer_email".into(), request.user_email.clone()),
            ("metadata[type]".into(), request.payment_type.to_str().to_string()),
            ("metadata[userId]".into(), request.user_id.to_string()),
            ("line_items[0][quantity]".into(), "1".into()),
        ];

        if let Some(task_id) = request.task_id {
            params.push(("metadata[taskId]".into(), task_id.to_string()));
        }

        match self.amount_for(request.payment_type) {
            Some(amount) => {
                let name = match &request.task_title {
                    Some(title) => format!("{}: {}", request.payment_type.product_name(), title),
                    None => request.payment_type.product_name().to_string(),
                };
                params.extend([
                    ("mode".into(), "payment".into()),
                    ("line_items[0][price_data][currency]".into(), self.currency.clone()),
                    ("line_items[0][price_data][unit_amount]".into(), amount.to_string()),
                    ("line_items[0][price_data][product_data][name]".into(), name),
                ]);
            }
            None => {
                params.extend([
                    ("mode".into(), "subscription".into()),
                    ("line_items[0][price]".into(), self.subscription_price_id.clone()),
                    (
                        "subscription_data[metadata][userId]".into(),
                        request.user_id.to_string(),
                    ),
                ]);
            }
        }

        params
    }

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ServiceError> {
        let body = serde_urlencoded::to_string(self.checkout_params(request))
            .map_err(|e| ServiceError::PaymentProvider(e.to_string()))?;

        let response = self
            .http
            .post(format!("{}/checkout/sessions", STRIPE_API_BASE))
            .bearer_auth(&self.secret_key)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| ServiceError::PaymentProvider(format!("Network error: {}", e)))?;

        let status = response.status();
        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::PaymentProvider(e.to_string()))?;

        if !status.is_success() {
            let message = response_body["error"]["message"]
                .as_str()
                .unwrap_or("Checkout session creation failed");
            tracing::error!("Stripe checkout error ({}): {}", status.as_u16(), message);
            return Err(ServiceError::PaymentProvider(message.to_string()));
        }

        serde_json::from_value(response_body)
            .map_err(|e| ServiceError::PaymentProvider(e.to_string()))
    }

    pub fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> Result<(), ServiceError> {
        verify_stripe_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            chrono::Utc::now().timestamp(),
        )
    }
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// `HMAC-SHA256(secret, "<t>.<payload>")`.
pub fn verify_stripe_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), ServiceError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| ServiceError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(ServiceError::InvalidSignature("missing v1 signature".to_string()));
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(ServiceError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let expected = sign_payload(payload, timestamp, secret)?;

    let matched = signatures
        .iter()
        .any(|candidate| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));

    if matched {
        Ok(())
    } else {
        Err(ServiceError::InvalidSignature("signature mismatch".to_string()))
    }
}

pub fn sign_payload(payload: &[u8], timestamp: i64, secret: &str) -> Result<String, ServiceError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ServiceError::Other(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    const SECRET: &str = "whsec_test";

    fn header_for(payload: &[u8], timestamp: i64) -> String {
        format!("t={},v1={}", timestamp, sign_payload(payload, timestamp, SECRET).unwrap())
    }

    #[test]
    fn valid_signature_passes() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = header_for(payload, now - 10);
        assert!(verify_stripe_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn any_v1_entry_may_match() {
        let payload = b"{}";
        let now = 1_700_000_000;
        let good = sign_payload(payload, now, SECRET).unwrap();
        let header = format!("t={},v1=deadbeef,v0=ignored,v1={}", now, good);
        assert!(verify_stripe_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let now = 1_700_000_000;
        let header = header_for(b"{\"amount\":100}", now);
        let err = verify_stripe_signature(b"{\"amount\":1}", &header, SECRET, now).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidSignature(_)));
    }

    #[test]
    fn wrong_secret_fails() {
        let now = 1_700_000_000;
        let header = header_for(b"{}", now);
        assert!(verify_stripe_signature(b"{}", &header, "whsec_other", now).is_err());
    }

    #[test]
    fn stale_timestamp_fails() {
        let now = 1_700_000_000;
        let header = header_for(b"{}", now - SIGNATURE_TOLERANCE_SECS - 1);
        assert!(verify_stripe_signature(b"{}", &header, SECRET, now).is_err());
    }

    #[test]
    fn malformed_header_fails() {
        assert!(verify_stripe_signature(b"{}", "garbage", SECRET, 0).is_err());
        assert!(verify_stripe_signature(b"{}", "t=1", SECRET, 1).is_err());
        assert!(verify_stripe_signature(b"{}", "v1=abc", SECRET, 1).is_err());
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn featured_checkout_uses_inline_price_and_task_metadata() {
        let provider = PaymentProviderService::new(&test_config());
        let task_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let params = provider.checkout_params(&CheckoutRequest {
            payment_type: PaymentType::FeaturedTask,
            user_id,
            user_email: "poster@example.com".to_string(),
            task_id: Some(task_id),
            task_title: Some("Paint fence".to_string()),
        });

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("1000"));
        assert_eq!(param(&params, "metadata[type]"), Some("featured_task"));
        assert_eq!(param(&params, "metadata[taskId]"), Some(task_id.to_string().as_str()));
        assert_eq!(param(&params, "metadata[userId]"), Some(user_id.to_string().as_str()));
        assert_eq!(
            param(&params, "line_items[0][price_data][product_data][name]"),
            Some("Featured task boost: Paint fence")
        );
    }

    #[test]
    fn subscription_checkout_uses_configured_price() {
        let provider = PaymentProviderService::new(&test_config());
        let params = provider.checkout_params(&CheckoutRequest {
            payment_type: PaymentType::WorkerSubscription,
            user_id: Uuid::new_v4(),
            user_email: "worker@example.com".to_string(),
            task_id: None,
            task_title: None,
        });

        assert_eq!(param(&params, "mode"), Some("subscription"));
        assert_eq!(param(&params, "line_items[0][price]"), Some("price_test"));
        assert_eq!(param(&params, "metadata[taskId]"), None);
        assert!(param(&params, "success_url")
            .unwrap()
            .ends_with("session_id={CHECKOUT_SESSION_ID}"));
    }

    #[test]
    fn checkout_params_encode_as_stripe_form() {
        let provider = PaymentProviderService::new(&test_config());
        let params = provider.checkout_params(&CheckoutRequest {
            payment_type: PaymentType::TaskPosting,
            user_id: Uuid::nil(),
            user_email: "a+b@example.com".to_string(),
            task_id: None,
            task_title: None,
        });
        let encoded = serde_urlencoded::to_string(params).unwrap();
        assert!(encoded.contains("customer_email=a%2Bb%40example.com"));
        assert!(encoded.contains("metadata%5Btype%5D=task_posting"));
    }
}
