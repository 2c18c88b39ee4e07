//! Usage tracking: records typed UI events and reports aggregated counts.
//!
//! - `store`: the `EventStore` interface with file and in-memory adapters
//! - `sink`: best-effort echoes to analytics tags or custom endpoints

mod sink;
mod store;

pub use sink::{build_sinks, AnalyticsTagSink, CompositeSink, EndpointSink, EventSink, NoopSink};
pub use store::{EventStore, JsonFileStore, MemoryStore};

use crate::config::Config;
use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;
pub const RECENT_EVENTS_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ServiceClick,
    PageView,
    FormSubmit,
    ContactAttempt,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ServiceClick => "service_click",
            EventType::PageView => "page_view",
            EventType::FormSubmit => "form_submit",
            EventType::ContactAttempt => "contact_attempt",
        }
    }

    pub fn parse(value: &str) -> Option<EventType> {
        match value {
            "service_click" => Some(EventType::ServiceClick),
            "page_view" => Some(EventType::PageView),
            "form_submit" => Some(EventType::FormSubmit),
            "contact_attempt" => Some(EventType::ContactAttempt),
            _ => None,
        }
    }
}

/// A persisted UI interaction. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// Body of `POST /api/track`. Anything else the client sends is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackRequest {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub service: Option<String>,
    pub page: Option<String>,
}

/// Request-derived context (from headers, never from the body).
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStats {
    pub total_events: usize,
    pub service_clicks: BTreeMap<String, usize>,
    pub page_views: BTreeMap<String, usize>,
    pub form_submissions: usize,
    /// Event count per UTC day (`YYYY-MM-DD`)
    pub daily_events: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingReport {
    pub period: String,
    pub stats: TrackingStats,
    pub recent_events: Vec<TrackingEvent>,
}

/// Parse the `days` query value. Anything but a non-negative integer
/// falls back to the default window; integers too large for `u32`
/// saturate.
pub fn parse_days(raw: Option<&str>) -> u32 {
    match raw.map(str::trim) {
        Some(v) if !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) => {
            v.parse::<u32>().unwrap_or(u32::MAX)
        }
        _ => DEFAULT_LOOKBACK_DAYS,
    }
}

/// Start of the lookback window.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Aggregate the events that fall inside the `days` window ending at `now`.
pub fn summarize(events: &[TrackingEvent], now: DateTime<Utc>, days: u32) -> TrackingReport {
    let since = window_start(now, days);
    let window: Vec<&TrackingEvent> = events.iter().filter(|e| e.timestamp >= since).collect();

    let mut stats = TrackingStats {
        total_events: window.len(),
        service_clicks: BTreeMap::new(),
        page_views: BTreeMap::new(),
        form_submissions: 0,
        daily_events: BTreeMap::new(),
    };

    for event in &window {
        match event.event_type {
            EventType::ServiceClick => {
                let service = event.service.clone().unwrap_or_else(|| "unknown".to_string());
                *stats.service_clicks.entry(service).or_default() += 1;
            }
            EventType::PageView => {
                let page = event.page.clone().unwrap_or_else(|| "unknown".to_string());
                *stats.page_views.entry(page).or_default() += 1;
            }
            EventType::FormSubmit => stats.form_submissions += 1,
            EventType::ContactAttempt => {}
        }

        let day = event.timestamp.format("%Y-%m-%d").to_string();
        *stats.daily_events.entry(day).or_default() += 1;
    }

    // Newest first; ties keep reverse append order.
    let mut recent: Vec<TrackingEvent> = window.iter().rev().map(|e| (*e).clone()).collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(RECENT_EVENTS_LIMIT);

    TrackingReport {
        period: format!("{} days", days),
        stats,
        recent_events: recent,
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Records events into an `EventStore` and echoes them to an `EventSink`.
#[derive(Clone)]
pub struct EventTracker {
    store: Arc<dyn EventStore>,
    sink: Arc<dyn EventSink>,
}

impl EventTracker {
    pub fn new(store: Arc<dyn EventStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// File-backed store plus the sinks enabled in configuration.
    pub fn from_config(config: &Config) -> Self {
        info!(
            "Event log: {} (cap {} events)",
            config.events_file, config.max_events
        );
        Self::new(
            Arc::new(JsonFileStore::new(&config.events_file, config.max_events)),
            Arc::new(build_sinks(config)),
        )
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Validate and persist one event, then echo it to the sinks in the
    /// background. Only a storage failure is reported to the caller.
    pub async fn record(
        &self,
        request: TrackRequest,
        context: RequestContext,
    ) -> Result<TrackingEvent, AppError> {
        let raw_type = request
            .event_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Validation("Missing event type".to_string()))?;

        let event_type = EventType::parse(raw_type)
            .ok_or_else(|| AppError::Validation(format!("Unknown event type: {}", raw_type)))?;

        let event = TrackingEvent {
            timestamp: Utc::now(),
            event_type,
            service: clean(request.service),
            page: clean(request.page),
            user_agent: clean(context.user_agent),
            referrer: clean(context.referrer),
        };

        self.store.append(event.clone()).await?;
        debug!("Recorded {} event", event.event_type.as_str());

        let sink = Arc::clone(&self.sink);
        let echoed = event.clone();
        tokio::spawn(async move {
            // CompositeSink logs its own failures; this covers bare sinks.
            if let Err(e) = sink.emit(&echoed).await {
                tracing::warn!("Event echo failed: {:#}", e);
            }
        });

        Ok(event)
    }

    /// Aggregated counts for the last `days` days (raw query value).
    pub async fn query(&self, days: Option<&str>) -> Result<TrackingReport, AppError> {
        let days = parse_days(days);
        let now = Utc::now();
        let events = self.store.query_window(window_start(now, days)).await?;
        Ok(summarize(&events, now, days))
    }
}
