use serde_json::json;
use tokio::time::{sleep, Duration};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;

/// Fills `{{key}}` placeholders. Values are escaped as HTML text.
pub fn render_template(template: &str, placeholders: &[(String, String)]) -> String {
    let mut html = template.to_string();
    for (key, value) in placeholders {
        html = html.replace(key, &ammonia::clean_text(value));
    }
    html
}

pub async fn send_email(
    to_email: &str,
    subject: &str,
    template: &str,
    placeholders: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if to_email.is_empty() {
        return Err("Email recipient cannot be empty".into());
    }
    if !to_email.contains('@') {
        return Err(format!("Invalid email address: {}", to_email).into());
    }

    let html_body = render_template(template, placeholders);

    let Some(api_key) = std::env::var("RESEND_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
    else {
        tracing::info!("RESEND_API_KEY not set; would send '{}' to {}", subject, to_email);
        return Ok(());
    };

    send_with_retries(&api_key, to_email, subject, &html_body).await
}

async fn send_with_retries(
    api_key: &str,
    to_email: &str,
    subject: &str,
    html_body: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut last_error = None;

    for attempt in 1..=MAX_RETRIES {
        match send_via_resend(api_key, to_email, subject, html_body).await {
            Ok(email_id) => {
                tracing::info!("Email sent to {} (id: {})", to_email, email_id);
                return Ok(());
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < MAX_RETRIES {
                    let delay = RETRY_DELAY_MS * 2_u64.pow(attempt - 1);
                    tracing::warn!(
                        "Email send attempt {} failed for {}. Retrying in {}ms...",
                        attempt,
                        to_email,
                        delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    let error_msg = last_error
        .map(|e| format!("Failed after {} retries: {}", MAX_RETRIES, e))
        .unwrap_or_else(|| "Unknown email sending error".to_string());

    tracing::error!("Email failed for {}: {}", to_email, error_msg);
    Err(error_msg.into())
}

async fn send_via_resend(
    api_key: &str,
    to_email: &str,
    subject: &str,
    html_body: &str,
) -> Result<String, String> {
    let from_email = std::env::var("FROM_EMAIL")
        .unwrap_or_else(|_| "Taskify <noreply@taskify.hr>".to_string());

    let response = reqwest::Client::new()
        .post("https://api.resend.com/emails")
        .bearer_auth(api_key)
        .json(&json!({
            "from": from_email,
            "to": to_email,
            "subject": subject,
            "html": html_body,
        }))
        .send()
        .await
        .map_err(|e| format!("Network error: {}", e))?;

    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .unwrap_or_else(|_| json!({}));

    if status.is_success() {
        Ok(body["id"].as_str().unwrap_or("unknown").to_string())
    } else {
        Err(format!(
            "Resend returned {}: {}",
            status.as_u16(),
            body["message"].as_str().unwrap_or("no message")
        ))
    }
}
