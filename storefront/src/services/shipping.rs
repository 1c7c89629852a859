// storefront/src/services/shipping.rs

use crate::errors::{AppError, Result};
use crate::services::http::check_response;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
  LabelCreated,
  InTransit,
  OutForDelivery,
  Delivered,
  Exception,
  Unknown,
}

impl ShipmentStatus {
  /// Carriers spell their codes differently ("IN_TRANSIT", "in-transit", "En tránsito").
  pub fn from_carrier(raw: &str) -> Self {
    let code: String = raw
      .trim()
      .to_lowercase()
      .chars()
      .map(|c| if c.is_alphanumeric() { c } else { '_' })
      .collect();
    match code.as_str() {
      "label_created" | "created" | "pre_transit" | "admitido" => ShipmentStatus::LabelCreated,
      "in_transit" | "en_transito" | "en_tránsito" | "transit" => ShipmentStatus::InTransit,
      "out_for_delivery" | "en_reparto" => ShipmentStatus::OutForDelivery,
      "delivered" | "entregado" => ShipmentStatus::Delivered,
      "exception" | "failed_attempt" | "returned" | "novedad" | "devuelto" => ShipmentStatus::Exception,
      _ => ShipmentStatus::Unknown,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarrierEvent {
  pub status: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub location: Option<String>,
  pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarrierTracking {
  #[serde(default)]
  pub events: Vec<CarrierEvent>,
  #[serde(default)]
  pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingEvent {
  pub status: ShipmentStatus,
  pub raw_status: String,
  pub description: Option<String>,
  pub location: Option<String>,
  pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingInfo {
  pub carrier: String,
  pub tracking_number: String,
  pub status: ShipmentStatus,
  pub estimated_delivery: Option<DateTime<Utc>>,
  /// Newest first.
  pub events: Vec<TrackingEvent>,
}

/// Orders events newest first; the current status is the newest event's.
pub fn normalize(carrier: &str, tracking_number: &str, raw: CarrierTracking) -> TrackingInfo {
  let mut events: Vec<TrackingEvent> = raw
    .events
    .into_iter()
    .map(|e| TrackingEvent {
      status: ShipmentStatus::from_carrier(&e.status),
      raw_status: e.status,
      description: e.description.filter(|d| !d.trim().is_empty()),
      location: e.location.filter(|l| !l.trim().is_empty()),
      occurred_at: e.occurred_at,
    })
    .collect();
  events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

  TrackingInfo {
    carrier: carrier.to_string(),
    tracking_number: tracking_number.to_string(),
    status: events.first().map_or(ShipmentStatus::Unknown, |e| e.status),
    estimated_delivery: raw.estimated_delivery,
    events,
  }
}

/// `{base}/tracking/{carrier}/{number}` with both values encoded as single path segments.
pub fn tracking_url(base_url: &str, carrier: &str, tracking_number: &str) -> Result<String> {
  let segment = |value: &str| -> Result<String> {
    let value = value.trim();
    if value.is_empty() || value.chars().all(|c| c == '.') {
      return Err(AppError::Validation(format!("'{}' is not a valid tracking path segment.", value)));
    }
    Ok(urlencoding::encode(value).into_owned())
  };
  Ok(format!(
    "{}/tracking/{}/{}",
    base_url.trim_end_matches('/'),
    segment(carrier)?,
    segment(tracking_number)?
  ))
}

#[async_trait]
pub trait ShipmentTracker: Send + Sync {
  async fn track(&self, carrier: &str, tracking_number: &str) -> Result<TrackingInfo>;
}

/// Talks to a carrier aggregation API: `GET {base}/tracking/{carrier}/{number}`.
pub struct HttpShipmentTracker {
  client: reqwest::Client,
  base_url: String,
  api_key: Option<String>,
}

impl HttpShipmentTracker {
  pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
    Ok(Self {
      client,
      base_url: base_url.into(),
      api_key,
    })
  }
}

#[async_trait]
impl ShipmentTracker for HttpShipmentTracker {
  #[instrument(name = "shipping::track", skip(self), err(Display))]
  async fn track(&self, carrier: &str, tracking_number: &str) -> Result<TrackingInfo> {
    let mut request = self
      .client
      .get(tracking_url(&self.base_url, carrier, tracking_number)?);
    if let Some(key) = &self.api_key {
      request = request.bearer_auth(key);
    }
    let resp = check_response(request.send().await?, "carrier").await?;
    let raw: CarrierTracking = resp.json().await?;
    Ok(normalize(carrier, tracking_number, raw))
  }
}
