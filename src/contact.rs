//! Contact form relay: validates a submission and emails it to the agency,
//! then sends the submitter a confirmation.

use crate::config::{Config, EmailCredentials, TransportConfig};
use crate::error::AppError;
use crate::i18n::{translate, translate_code, Locale};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{info, warn};

/// Body of `POST /api/contact`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub business: Option<String>,
    pub message: Option<String>,
    /// Either `"seo, ads"` or `["seo", "ads"]`
    #[serde(default, deserialize_with = "string_or_list")]
    pub services: Vec<String>,
    /// Requested recipient; only honoured when allow-listed
    pub to: Option<String>,
    /// Locale for the confirmation email
    pub locale: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<StringOrList> = Option::deserialize(deserializer)?;
    let items = match raw {
        None => Vec::new(),
        Some(StringOrList::One(s)) => s.split(',').map(str::to_string).collect(),
        Some(StringOrList::Many(v)) => v,
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSubmission {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub business: Option<String>,
    pub message: String,
    pub services: Vec<String>,
    pub locale: Locale,
}

static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();

/// Loose shape check; a mismatch is logged, never rejected.
pub fn looks_like_email(email: &str) -> bool {
    let regex = EMAIL_REGEX.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
    regex.is_match(email)
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ContactSubmission {
    pub fn validate(&self) -> Result<ValidSubmission, AppError> {
        let name = trimmed(&self.name);
        let email = trimmed(&self.email);
        let message = trimmed(&self.message);

        let missing: Vec<&str> = [("name", &name), ("email", &email), ("message", &message)]
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(field, _)| *field)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let (Some(name), Some(email), Some(message)) = (name, email, message) else {
            return Err(AppError::Validation("Missing required fields".to_string()));
        };

        if !looks_like_email(&email) {
            warn!("Contact email does not look like an address: {}", email);
        }

        Ok(ValidSubmission {
            name,
            email,
            phone: trimmed(&self.phone),
            business: trimmed(&self.business),
            message,
            services: self.services.clone(),
            locale: self
                .locale
                .as_deref()
                .map(Locale::from_code_or_default)
                .unwrap_or_default(),
        })
    }
}

/// One outbound message. The sender address belongs to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    Sent,
    /// Transport unconfigured: the submission was logged, nothing was sent.
    Simulated,
}

impl ContactOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ContactOutcome::Sent => "Email sent successfully",
            ContactOutcome::Simulated => "Email sent successfully (dev mode)",
        }
    }
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Check the provider accepts our credentials before sending anything.
    async fn verify(&self) -> Result<()>;

    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

// ==================== HTTP Email Transport ====================

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Email provider reached over a JSON HTTP API with bearer auth.
pub struct HttpEmailTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailTransport {
    pub fn new(credentials: &EmailCredentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_url: credentials.api_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
            from: credentials.from.clone(),
        }
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    async fn verify(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/domains", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to reach email provider")?;

        if !response.status().is_success() {
            anyhow::bail!("Email provider rejected credentials ({})", response.status());
        }
        Ok(())
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [email.to.as_str()],
            reply_to: email.reply_to.as_deref(),
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to email provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Email provider error ({}): {}", status, body);
        }
        Ok(())
    }
}

// ==================== Relay ====================

pub enum RelayTransport {
    Live(Arc<dyn EmailTransport>),
    DryRun,
}

pub struct ContactRelay {
    transport: RelayTransport,
    recipient: String,
    allowed_recipients: Vec<String>,
}

impl ContactRelay {
    pub fn new(transport: RelayTransport, recipient: &str, allowed_recipients: Vec<String>) -> Self {
        Self {
            transport,
            recipient: recipient.to_string(),
            allowed_recipients: allowed_recipients
                .into_iter()
                .map(|r| r.to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let transport = match &config.transport {
            TransportConfig::Configured(credentials) => {
                info!("Email transport: {}", credentials.api_url);
                RelayTransport::Live(Arc::new(HttpEmailTransport::new(credentials)))
            }
            TransportConfig::Unconfigured => {
                warn!("EMAIL_API_KEY not set, contact submissions will only be logged");
                RelayTransport::DryRun
            }
        };
        Self::new(
            transport,
            &config.contact_recipient,
            config.allowed_recipients.clone(),
        )
    }

    /// The requested recipient if allow-listed, otherwise the default.
    pub fn resolve_recipient(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim).filter(|r| !r.is_empty()) {
            Some(to) if self.allowed_recipients.contains(&to.to_lowercase()) => to.to_string(),
            Some(to) => {
                warn!("Ignoring non-allow-listed contact recipient: {}", to);
                self.recipient.clone()
            }
            None => self.recipient.clone(),
        }
    }

    pub async fn submit(&self, submission: ContactSubmission) -> Result<ContactOutcome, AppError> {
        let valid = submission.validate()?;
        let recipient = self.resolve_recipient(submission.to.as_deref());

        let transport = match &self.transport {
            RelayTransport::Live(transport) => transport,
            RelayTransport::DryRun => {
                info!(
                    name = %valid.name,
                    email = %valid.email,
                    phone = ?valid.phone,
                    business = ?valid.business,
                    services = ?valid.services,
                    recipient = %recipient,
                    "Contact submission (dev mode, not sent): {}",
                    valid.message
                );
                return Ok(ContactOutcome::Simulated);
            }
        };

        transport
            .verify()
            .await
            .map_err(|e| AppError::Transport(format!("transport verification failed: {:#}", e)))?;

        transport
            .send(&notification_email(&valid, &recipient))
            .await
            .map_err(|e| AppError::Transport(format!("notification send failed: {:#}", e)))?;
        info!("Contact notification for {} sent to {}", valid.email, recipient);

        if let Err(e) = transport.send(&confirmation_email(&valid)).await {
            warn!("Confirmation email to {} failed: {:#}", valid.email, e);
        }

        Ok(ContactOutcome::Sent)
    }
}

// ==================== Message Building ====================

pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

/// Message to the agency. Always in the default locale; replies go
/// straight to the submitter.
pub fn notification_email(submission: &ValidSubmission, recipient: &str) -> OutgoingEmail {
    let strings = translate(Locale::default_locale());
    let subject = strings.t_with("email.notification.subject", &[("name", &submission.name)]);

    let services = submission.services.join(", ");
    let fields: Vec<(&str, &str)> = vec![
        ("Name", submission.name.as_str()),
        ("Email", submission.email.as_str()),
        ("Phone", submission.phone.as_deref().unwrap_or("-")),
        ("Business", submission.business.as_deref().unwrap_or("-")),
        ("Services", if services.is_empty() { "-" } else { services.as_str() }),
        ("Language", submission.locale.code()),
    ];

    let rows: String = fields
        .iter()
        .map(|(label, value)| {
            format!(
                "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
                label,
                escape_html(value)
            )
        })
        .collect();
    let html = format!(
        "<h2>{}</h2><table>{}</table><h3>Message</h3><p>{}</p>",
        escape_html(&subject),
        rows,
        escape_html(&submission.message).replace('\n', "<br>")
    );

    let text_fields: String = fields
        .iter()
        .map(|(label, value)| format!("{}: {}\n", label, value))
        .collect();
    let text = format!("{}\n\n{}\n{}", subject, text_fields, submission.message);

    OutgoingEmail {
        to: recipient.to_string(),
        reply_to: Some(submission.email.clone()),
        subject,
        html,
        text,
    }
}

/// Acknowledgement to the submitter, in their locale.
pub fn confirmation_email(submission: &ValidSubmission) -> OutgoingEmail {
    let strings = translate_code(submission.locale.code());
    let greeting = strings.t_with("email.confirmation.greeting", &[("name", &submission.name)]);
    let body = strings.t("email.confirmation.body");
    let signoff = strings.t("email.confirmation.signoff");

    OutgoingEmail {
        to: submission.email.clone(),
        reply_to: None,
        subject: strings.t("email.confirmation.subject"),
        html: format!(
            "<p>{}</p><p>{}</p><blockquote>{}</blockquote><p>{}</p>",
            escape_html(&greeting),
            escape_html(&body),
            escape_html(&submission.message).replace('\n', "<br>"),
            escape_html(&signoff)
        ),
        text: format!(
            "{}\n\n{}\n\n> {}\n\n{}",
            greeting, body, submission.message, signoff
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn submission(name: &str, email: &str, message: &str) -> ContactSubmission {
        ContactSubmission {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Records sent emails; can fail verify, the first send, or the second.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<OutgoingEmail>>,
        verify_calls: Mutex<usize>,
        fail_verify: bool,
        fail_send_number: Option<usize>,
    }

    #[async_trait]
    impl EmailTransport for RecordingTransport {
        async fn verify(&self) -> Result<()> {
            *self.verify_calls.lock().unwrap() += 1;
            if self.fail_verify {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }

        async fn send(&self, email: &OutgoingEmail) -> Result<()> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_send_number == Some(sent.len() + 1) {
                anyhow::bail!("mailbox unavailable");
            }
            sent.push(email.clone());
            Ok(())
        }
    }

    fn live_relay(transport: Arc<RecordingTransport>) -> ContactRelay {
        ContactRelay::new(
            RelayTransport::Live(transport),
            "hello@agency.test",
            vec!["sales@agency.test".to_string()],
        )
    }

    // ==================== Validation ====================

    #[test]
    fn test_validate_ok() {
        let valid = submission("Kim", "kim@x.com", "hello").validate().unwrap();
        assert_eq!(valid.name, "Kim");
        assert_eq!(valid.locale, Locale::EN);
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let err = ContactSubmission::default().validate().unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert_eq!(msg, "Missing required fields: name, email, message")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_whitespace_counts_as_missing() {
        let err = submission("Kim", "kim@x.com", "   ").validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.ends_with("message")));
    }

    #[test]
    fn test_validate_accepts_unusual_email() {
        let valid = submission("Kim", "kim", "hello").validate().unwrap();
        assert_eq!(valid.email, "kim");
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("kim@x.com"));
        assert!(!looks_like_email("kim"));
        assert!(!looks_like_email("kim@x"));
    }

    #[test]
    fn test_validate_unknown_locale_defaults() {
        let mut s = submission("Kim", "kim@x.com", "hi");
        s.locale = Some("ko".to_string());
        assert_eq!(s.validate().unwrap().locale, Locale::KO);
        s.locale = Some("xx".to_string());
        assert_eq!(s.validate().unwrap().locale, Locale::EN);
    }

    #[test]
    fn test_services_accepts_string_or_list() {
        let a: ContactSubmission =
            serde_json::from_str(r#"{"services": "seo, ads ,"}"#).unwrap();
        assert_eq!(a.services, vec!["seo", "ads"]);

        let b: ContactSubmission =
            serde_json::from_str(r#"{"services": ["website", " "]}"#).unwrap();
        assert_eq!(b.services, vec!["website"]);

        let c: ContactSubmission = serde_json::from_str(r#"{"services": null}"#).unwrap();
        assert!(c.services.is_empty());
    }

    // ==================== Relay ====================

    #[tokio::test]
    async fn test_dry_run_simulates_success() {
        let relay = ContactRelay::new(RelayTransport::DryRun, "hello@agency.test", vec![]);
        let outcome = relay
            .submit(submission("Kim", "kim@x.com", "hello"))
            .await
            .unwrap();

        assert_eq!(outcome, ContactOutcome::Simulated);
        assert_eq!(outcome.message(), "Email sent successfully (dev mode)");
    }

    #[tokio::test]
    async fn test_dry_run_accepts_any_non_empty_email() {
        let relay = ContactRelay::new(RelayTransport::DryRun, "hello@agency.test", vec![]);
        let outcome = relay.submit(submission("Kim", "kim", "hello")).await.unwrap();
        assert_eq!(outcome, ContactOutcome::Simulated);
    }

    #[tokio::test]
    async fn test_live_sends_notification_and_confirmation() {
        let transport = Arc::new(RecordingTransport::default());
        let relay = live_relay(Arc::clone(&transport));

        let outcome = relay
            .submit(submission("Kim", "kim@x.com", "hello"))
            .await
            .unwrap();
        assert_eq!(outcome, ContactOutcome::Sent);
        assert_eq!(outcome.message(), "Email sent successfully");

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "hello@agency.test");
        assert_eq!(sent[0].reply_to.as_deref(), Some("kim@x.com"));
        assert_eq!(sent[1].to, "kim@x.com");
        assert_eq!(sent[1].reply_to, None);
    }

    #[tokio::test]
    async fn test_validation_failure_sends_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let relay = live_relay(Arc::clone(&transport));

        for bad in [
            submission("", "kim@x.com", "hello"),
            submission("Kim", "", "hello"),
            submission("Kim", "kim@x.com", ""),
        ] {
            let result = relay.submit(bad).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        assert_eq!(*transport.verify_calls.lock().unwrap(), 0);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_failure_is_transport_error() {
        let transport = Arc::new(RecordingTransport {
            fail_verify: true,
            ..Default::default()
        });
        let relay = live_relay(Arc::clone(&transport));

        let err = relay
            .submit(submission("Kim", "kim@x.com", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
        assert_eq!(err.status_code(), 500);
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_is_transport_error() {
        let transport = Arc::new(RecordingTransport {
            fail_send_number: Some(1),
            ..Default::default()
        });
        let relay = live_relay(transport);

        let err = relay
            .submit(submission("Kim", "kim@x.com", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[tokio::test]
    async fn test_confirmation_failure_does_not_fail_submission() {
        let transport = Arc::new(RecordingTransport {
            fail_send_number: Some(2),
            ..Default::default()
        });
        let relay = live_relay(Arc::clone(&transport));

        let outcome = relay
            .submit(submission("Kim", "kim@x.com", "hello"))
            .await
            .unwrap();
        assert_eq!(outcome, ContactOutcome::Sent);
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_to_matches_submitter_for_many_inputs() {
        for (name, email) in [
            ("Kim", "kim@x.com"),
            ("이서연", "seoyeon.lee@example.co.kr"),
            ("O'Brien", "ob+site@mail.example.org"),
        ] {
            let transport = Arc::new(RecordingTransport::default());
            let relay = live_relay(Arc::clone(&transport));
            relay.submit(submission(name, email, "hi")).await.unwrap();
            assert_eq!(
                transport.sent.lock().unwrap()[0].reply_to.as_deref(),
                Some(email)
            );
        }
    }

    // ==================== Recipient Resolution ====================

    #[test]
    fn test_resolve_recipient() {
        let relay = ContactRelay::new(
            RelayTransport::DryRun,
            "hello@agency.test",
            vec!["Sales@Agency.test".to_string()],
        );
        assert_eq!(relay.resolve_recipient(None), "hello@agency.test");
        assert_eq!(relay.resolve_recipient(Some("sales@agency.test")), "sales@agency.test");
        assert_eq!(relay.resolve_recipient(Some("attacker@evil.test")), "hello@agency.test");
        assert_eq!(relay.resolve_recipient(Some("  ")), "hello@agency.test");
    }

    // ==================== Message Building ====================

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn test_notification_escapes_user_input() {
        let valid = submission("<b>Kim</b>", "kim@x.com", "hi <img src=x>")
            .validate()
            .unwrap();
        let email = notification_email(&valid, "hello@agency.test");

        assert!(!email.html.contains("<img"));
        assert!(email.html.contains("&lt;img src=x&gt;"));
        assert!(email.subject.contains("<b>Kim</b>")); // subject is plain text
        assert!(email.text.contains("hi <img src=x>"));
    }

    #[test]
    fn test_confirmation_is_localized() {
        let mut s = submission("민수", "ms@x.com", "문의드립니다");
        s.locale = Some("ko".to_string());
        let email = confirmation_email(&s.validate().unwrap());

        assert_eq!(email.subject, "문의가 접수되었습니다");
        assert!(email.text.starts_with("민수님, 안녕하세요."));
    }

    // ==================== HTTP Transport ====================

    fn credentials(api_url: &str) -> EmailCredentials {
        EmailCredentials {
            api_url: api_url.to_string(),
            api_key: "re_test".to_string(),
            from: "noreply@agency.test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_http_transport_verify_and_send() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/domains"))
            .and(header("authorization", "Bearer re_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(body_partial_json(serde_json::json!({
                "from": "noreply@agency.test",
                "to": ["hello@agency.test"],
                "reply_to": "kim@x.com"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpEmailTransport::new(&credentials(&mock_server.uri()));
        transport.verify().await.unwrap();

        let valid = submission("Kim", "kim@x.com", "hello").validate().unwrap();
        transport
            .send(&notification_email(&valid, "hello@agency.test"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_http_transport_verify_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/domains"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let transport = HttpEmailTransport::new(&credentials(&mock_server.uri()));
        let err = transport.verify().await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_http_transport_send_error_includes_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .mount(&mock_server)
            .await;

        let transport = HttpEmailTransport::new(&credentials(&mock_server.uri()));
        let valid = submission("Kim", "kim@x.com", "hello").validate().unwrap();
        let err = transport.send(&confirmation_email(&valid)).await.unwrap_err();
        assert!(err.to_string().contains("invalid from"));
    }
}
