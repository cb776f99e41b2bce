use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::ActiveSession;

const SECS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl LocationSnapshot {
    pub fn new(latitude: f64, longitude: f64, address: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            address: address.into(),
        }
    }
}

/// A finished parking interval. Built once when the session ends and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default)]
    pub location: Option<LocationSnapshot>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub hourly_rate: Option<f64>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
}

impl ParkingSession {
    /// An end earlier than the start (wall clock moved backwards) collapses to
    /// a zero-length session.
    pub fn new(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        let ended_at = ended_at.max(started_at);
        let duration_ms = (ended_at - started_at).num_milliseconds().max(0) as u64;

        Self {
            id: Uuid::new_v4(),
            started_at,
            ended_at,
            duration_ms,
            location: None,
            photo: None,
            hourly_rate: None,
            floor: None,
            section: None,
        }
    }

    pub fn from_active(active: &ActiveSession, ended_at: DateTime<Utc>) -> Self {
        Self {
            location: active.location.clone(),
            photo: active.details.photo.clone(),
            hourly_rate: active.details.hourly_rate,
            floor: active.details.floor.clone(),
            section: active.details.section.clone(),
            ..Self::new(active.started_at, ended_at)
        }
    }

    pub fn with_location(mut self, location: LocationSnapshot) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_hourly_rate(mut self, rate: f64) -> Self {
        self.hourly_rate = Some(rate);
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::milliseconds(self.duration_ms as i64)
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_ms as f64 / 1000.0 / SECS_PER_HOUR
    }

    pub fn total_cost(&self) -> Option<f64> {
        self.hourly_rate.map(|rate| rate * self.duration_hours())
    }

    pub fn formatted_cost(&self) -> Option<String> {
        self.total_cost().map(|cost| format!("${cost:.2}"))
    }

    pub fn formatted_duration(&self) -> String {
        let total_secs = self.duration_ms / 1000;
        let hours = total_secs / 3600;
        let minutes = total_secs / 60 % 60;
        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    }

    pub fn truncated_address(&self) -> String {
        match &self.location {
            Some(location) => location
                .address
                .split(',')
                .next()
                .map(|part| part.trim().to_string())
                .unwrap_or_else(|| location.address.clone()),
            None => "Unknown Location".to_string(),
        }
    }

    pub fn parking_spot_info(&self) -> Option<String> {
        let parts: Vec<&str> = [self.floor.as_deref(), self.section.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" • "))
        }
    }
}
