//! Outbound echoes of tracked events (analytics tag, custom endpoint).
//!
//! Sinks are secondary: a failing sink is logged and never affects the
//! result of recording an event.

use super::TrackingEvent;
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[async_trait]
pub trait EventSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn emit(&self, event: &TrackingEvent) -> Result<()>;
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

// ==================== No-op ====================

pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn emit(&self, _event: &TrackingEvent) -> Result<()> {
        Ok(())
    }
}

// ==================== Analytics Tag ====================

/// Sends events to a GA4-style measurement-protocol endpoint.
pub struct AnalyticsTagSink {
    client: reqwest::Client,
    collect_url: String,
    measurement_id: String,
    api_secret: String,
}

#[derive(Debug, Serialize)]
struct MeasurementPayload<'a> {
    client_id: &'a str,
    events: Vec<MeasurementEvent>,
}

#[derive(Debug, Serialize)]
struct MeasurementEvent {
    name: &'static str,
    params: serde_json::Value,
}

impl AnalyticsTagSink {
    pub fn new(collect_url: &str, measurement_id: &str, api_secret: &str) -> Self {
        Self {
            client: http_client(),
            collect_url: collect_url.to_string(),
            measurement_id: measurement_id.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    fn payload(event: &TrackingEvent) -> MeasurementPayload<'static> {
        let mut params = serde_json::Map::new();
        if let Some(service) = &event.service {
            params.insert("service".to_string(), json!(service));
        }
        if let Some(page) = &event.page {
            params.insert("page_path".to_string(), json!(page));
        }
        params.insert(
            "event_timestamp".to_string(),
            json!(event.timestamp.to_rfc3339()),
        );

        MeasurementPayload {
            client_id: "agency-site.server",
            events: vec![MeasurementEvent {
                name: event.event_type.as_str(),
                params: serde_json::Value::Object(params),
            }],
        }
    }
}

#[async_trait]
impl EventSink for AnalyticsTagSink {
    fn name(&self) -> &'static str {
        "analytics-tag"
    }

    async fn emit(&self, event: &TrackingEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.collect_url)
            .query(&[
                ("measurement_id", self.measurement_id.as_str()),
                ("api_secret", self.api_secret.as_str()),
            ])
            .json(&Self::payload(event))
            .send()
            .await
            .context("Failed to send event to analytics")?;

        if !response.status().is_success() {
            anyhow::bail!("Analytics endpoint returned {}", response.status());
        }
        Ok(())
    }
}

// ==================== Custom Endpoint ====================

/// POSTs the event JSON to an arbitrary URL.
pub struct EndpointSink {
    client: reqwest::Client,
    url: String,
}

impl EndpointSink {
    pub fn new(url: &str) -> Self {
        Self {
            client: http_client(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl EventSink for EndpointSink {
    fn name(&self) -> &'static str {
        "endpoint"
    }

    async fn emit(&self, event: &TrackingEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .context(format!("Failed to forward event to {}", self.url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Event endpoint error ({}): {}", status, body);
        }
        Ok(())
    }
}

// ==================== Composite ====================

/// Fans an event out to every configured sink concurrently.
#[derive(Default)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }
}

#[async_trait]
impl EventSink for CompositeSink {
    fn name(&self) -> &'static str {
        "composite"
    }

    async fn emit(&self, event: &TrackingEvent) -> Result<()> {
        let results = join_all(self.sinks.iter().map(|sink| sink.emit(event))).await;

        for (sink, result) in self.sinks.iter().zip(results) {
            match result {
                Ok(()) => debug!("Event echoed to {}", sink.name()),
                Err(e) => warn!("Event sink {} failed: {:#}", sink.name(), e),
            }
        }
        Ok(())
    }
}

/// Compose the sinks enabled by configuration.
pub fn build_sinks(config: &Config) -> CompositeSink {
    let mut sinks: Vec<Arc<dyn EventSink>> = Vec::new();

    match (&config.ga_measurement_id, &config.ga_api_secret) {
        (Some(id), Some(secret)) => {
            sinks.push(Arc::new(AnalyticsTagSink::new(
                &config.ga_collect_url,
                id,
                secret,
            )));
        }
        (Some(_), None) => {
            warn!("GA_MEASUREMENT_ID set without GA_API_SECRET, analytics echo disabled")
        }
        _ => {}
    }

    if let Some(url) = &config.event_forward_url {
        sinks.push(Arc::new(EndpointSink::new(url)));
    }

    let composite = CompositeSink::new(sinks);
    if composite.is_empty() {
        info!("No event sinks configured");
    } else {
        info!("Event sinks: {}", composite.names().join(", "));
    }
    composite
}
