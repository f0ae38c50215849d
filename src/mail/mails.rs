use super::sendmail::send_email;

const TASK_APPROVED_TEMPLATE: &str = include_str!("templates/Task-approved.html");
const TASK_REJECTED_TEMPLATE: &str = include_str!("templates/Task-rejected.html");
const WORKER_DECISION_TEMPLATE: &str = include_str!("templates/Worker-decision.html");
const NEW_MESSAGE_TEMPLATE: &str = include_str!("templates/New-message.html");

type MailResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub async fn send_task_approved_email(
    to_email: &str,
    full_name: &str,
    task_title: &str,
    task_link: &str,
) -> MailResult {
    let placeholders = vec![
        ("{{full_name}}".to_string(), full_name.to_string()),
        ("{{task_title}}".to_string(), task_title.to_string()),
        ("{{task_link}}".to_string(), task_link.to_string()),
    ];

    send_email(to_email, "Your task is live", TASK_APPROVED_TEMPLATE, &placeholders).await
}

pub async fn send_task_rejected_email(
    to_email: &str,
    full_name: &str,
    task_title: &str,
    reason: Option<&str>,
) -> MailResult {
    let placeholders = vec![
        ("{{full_name}}".to_string(), full_name.to_string()),
        ("{{task_title}}".to_string(), task_title.to_string()),
        (
            "{{reason}}".to_string(),
            reason.unwrap_or("No reason was given.").to_string(),
        ),
    ];

    send_email(to_email, "Your task was not approved", TASK_REJECTED_TEMPLATE, &placeholders).await
}

pub async fn send_worker_decision_email(
    to_email: &str,
    full_name: &str,
    decision: &str,
) -> MailResult {
    let subject = format!("Your worker account is {}", decision);
    let placeholders = vec![
        ("{{full_name}}".to_string(), full_name.to_string()),
        ("{{decision}}".to_string(), decision.to_string()),
    ];

    send_email(to_email, &subject, WORKER_DECISION_TEMPLATE, &placeholders).await
}

pub async fn send_new_message_email(
    to_email: &str,
    sender_name: &str,
    task_title: &str,
    task_link: &str,
) -> MailResult {
    let placeholders = vec![
        ("{{sender_name}}".to_string(), sender_name.to_string()),
        ("{{task_title}}".to_string(), task_title.to_string()),
        ("{{task_link}}".to_string(), task_link.to_string()),
    ];

    send_email(to_email, "New message on Taskify", NEW_MESSAGE_TEMPLATE, &placeholders).await
}
