//! Email notifications for guest codes and request decisions

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use serde::Serialize;
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// Event a recipient is told about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    Otp,
    Approved,
    Rejected,
    Returned,
}

/// Template values for a notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub recipient_name: String,
    pub request_id: Option<String>,
    pub equipment_name: Option<String>,
    pub code: Option<String>,
    pub remarks: Option<String>,
}

/// Outbound notification hook. Delivery is best-effort: callers log
/// failures and never roll back on them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        event: NotificationEvent,
        recipient: &str,
        payload: NotificationPayload,
    ) -> AppResult<()>;
}

/// Render subject and body for an event
pub fn render(event: NotificationEvent, payload: &NotificationPayload) -> (String, String) {
    let reference = payload.request_id.as_deref().unwrap_or("-");
    let equipment = payload.equipment_name.as_deref().unwrap_or("the requested equipment");
    let remarks = payload
        .remarks
        .as_deref()
        .map(|r| format!("\nNotes from the administrator: {}\n", r))
        .unwrap_or_default();

    match event {
        NotificationEvent::Otp => (
            "Your Equiplend verification code".to_string(),
            format!(
                r#"
Hello {name},

Your verification code is: {code}

This code will expire in 5 minutes. Requesting a new code invalidates this one.

If you didn't request this code, please ignore this email.
"#,
                name = payload.recipient_name,
                code = payload.code.as_deref().unwrap_or_default()
            ),
        ),
        NotificationEvent::Approved => (
            format!("Borrowing request {} approved", reference),
            format!(
                "\nHello {},\n\nYour request for {} has been approved.\n{}",
                payload.recipient_name, equipment, remarks
            ),
        ),
        NotificationEvent::Rejected => (
            format!("Borrowing request {} declined", reference),
            format!(
                "\nHello {},\n\nYour request for {} has been declined.\n{}",
                payload.recipient_name, equipment, remarks
            ),
        ),
        NotificationEvent::Returned => (
            format!("Borrowing request {} returned", reference),
            format!(
                "\nHello {},\n\nThe return of {} has been recorded. Thank you.\n{}",
                payload.recipient_name, equipment, remarks
            ),
        ),
    }
}

/// HTML alternative of a plain-text body. Names and remarks come from
/// guests and admins, so markup characters are escaped.
pub fn html_body(body: &str) -> String {
    let escaped = body
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        r#"<html><body><pre>{}</pre></body></html>"#,
        escaped.replace('\n', "<br>")
    )
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> AppResult<Message> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Equiplend");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Validation(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body(body)),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn build_mailer(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) = (
            &self.config.smtp_username,
            &self.config.smtp_password,
        ) {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl Notifier for EmailService {
    /// Builds the message, then hands the SMTP exchange to the blocking pool
    /// without waiting for it.
    async fn notify(
        &self,
        event: NotificationEvent,
        recipient: &str,
        payload: NotificationPayload,
    ) -> AppResult<()> {
        let (subject, body) = render(event, &payload);
        let email = self.build_message(recipient, &subject, &body)?;
        let mailer = self.build_mailer()?;
        let recipient = recipient.to_string();

        tokio::task::spawn_blocking(move || {
            if let Err(e) = mailer.send(&email) {
                tracing::warn!(?event, %recipient, "Failed to send email: {}", e);
            }
        });

        Ok(())
    }
}

/// Notifier used when SMTP is disabled: records events in the log only
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        event: NotificationEvent,
        recipient: &str,
        payload: NotificationPayload,
    ) -> AppResult<()> {
        // never log the code itself
        tracing::info!(
            ?event,
            %recipient,
            request_id = payload.request_id.as_deref().unwrap_or("-"),
            "Notification (email disabled)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_body_contains_code() {
        let payload = NotificationPayload {
            recipient_name: "Ada Lovelace".into(),
            code: Some("123456".into()),
            ..Default::default()
        };
        let (subject, body) = render(NotificationEvent::Otp, &payload);
        assert!(subject.contains("verification code"));
        assert!(body.contains("123456"));
        assert!(body.contains("Ada Lovelace"));
    }

    #[test]
    fn decision_body_includes_remarks() {
        let payload = NotificationPayload {
            recipient_name: "Ada".into(),
            request_id: Some("GBR-20240301-ABCDEF".into()),
            equipment_name: Some("Tripod".into()),
            remarks: Some("Out of season".into()),
            ..Default::default()
        };
        let (subject, body) = render(NotificationEvent::Rejected, &payload);
        assert!(subject.contains("GBR-20240301-ABCDEF"));
        assert!(body.contains("Tripod"));
        assert!(body.contains("Out of season"));
    }

    #[test]
    fn html_alternative_escapes_markup() {
        let payload = NotificationPayload {
            recipient_name: "<script>alert(1)</script> & co".into(),
            remarks: Some("<b>late</b>".into()),
            ..Default::default()
        };
        let (_, body) = render(NotificationEvent::Approved, &payload);
        let html = html_body(&body);
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; co"));
        assert!(html.contains("&lt;b&gt;late&lt;/b&gt;"));
        assert!(html.starts_with("<html><body><pre><br>Hello "));
    }
}
