use anyhow::{Context, Result};

/// Credentials for the outbound email provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailCredentials {
    /// Provider API base URL (e.g. "https://api.resend.com")
    pub api_url: String,
    pub api_key: String,
    /// Sender address used for both notification and confirmation emails
    pub from: String,
}

/// Whether real email sending is available.
///
/// Resolved once at startup. `Unconfigured` makes the contact relay log the
/// submission and report a simulated success instead of sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Configured(EmailCredentials),
    Unconfigured,
}

impl TransportConfig {
    pub fn is_configured(&self) -> bool {
        matches!(self, TransportConfig::Configured(_))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Site
    pub base_url: String,
    pub port: u16,

    // Event tracking
    pub events_file: String,
    pub max_events: usize,
    pub analytics_api_key: Option<String>,

    // Contact relay
    pub transport: TransportConfig,
    pub contact_recipient: String,
    pub allowed_recipients: Vec<String>,

    // Event sinks
    pub ga_measurement_id: Option<String>,
    pub ga_api_secret: Option<String>,
    pub ga_collect_url: String,
    pub event_forward_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url = normalize_base_url(
            &std::env::var("BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        );
        let host = site_host(&base_url).context("BASE_URL is not a valid absolute URL")?;

        let transport = match non_empty_var("EMAIL_API_KEY") {
            Some(api_key) => TransportConfig::Configured(EmailCredentials {
                api_url: std::env::var("EMAIL_API_URL")
                    .unwrap_or_else(|_| "https://api.resend.com".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                api_key,
                from: non_empty_var("EMAIL_FROM").unwrap_or_else(|| format!("noreply@{}", host)),
            }),
            None => TransportConfig::Unconfigured,
        };

        Ok(Self {
            base_url,
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            events_file: std::env::var("EVENTS_FILE")
                .unwrap_or_else(|_| "data/events.json".to_string()),
            max_events: std::env::var("MAX_EVENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_MAX_EVENTS),
            analytics_api_key: non_empty_var("ANALYTICS_API_KEY"),

            transport,
            contact_recipient: non_empty_var("CONTACT_RECIPIENT")
                .unwrap_or_else(|| format!("hello@{}", host)),
            allowed_recipients: std::env::var("CONTACT_ALLOWED_RECIPIENTS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),

            ga_measurement_id: non_empty_var("GA_MEASUREMENT_ID"),
            ga_api_secret: non_empty_var("GA_API_SECRET"),
            ga_collect_url: std::env::var("GA_COLLECT_URL")
                .unwrap_or_else(|_| "https://www.google-analytics.com/mp/collect".to_string()),
            event_forward_url: non_empty_var("EVENT_FORWARD_URL"),
        })
    }

    /// Configuration with no external services: unconfigured transport,
    /// no sinks, no analytics key.
    pub fn for_tests(base_url: &str) -> Self {
        let base_url = normalize_base_url(base_url);
        Self {
            base_url,
            port: 0,
            events_file: "data/events.json".to_string(),
            max_events: DEFAULT_MAX_EVENTS,
            analytics_api_key: None,
            transport: TransportConfig::Unconfigured,
            contact_recipient: "hello@example.com".to_string(),
            allowed_recipients: Vec::new(),
            ga_measurement_id: None,
            ga_api_secret: None,
            ga_collect_url: "https://www.google-analytics.com/mp/collect".to_string(),
            event_forward_url: None,
        }
    }
}

pub const DEFAULT_BASE_URL: &str = "https://example-agency.com";
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn site_host(base_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(base_url).ok()?;
    url.host_str().map(|h| h.trim_start_matches("www.").to_string())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
