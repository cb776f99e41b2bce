use std::cmp;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::LocationSnapshot;

const LOW_THRESHOLD_MS: i64 = 10 * 60 * 1000;
const CRITICAL_THRESHOLD_MS: i64 = 5 * 60 * 1000;

/// Externally observed state of the parking timer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ParkingState {
    #[default]
    Idle,
    #[serde(rename_all = "camelCase")]
    Active {
        started_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        location: Option<LocationSnapshot>,
    },
}

/// Two `Active` states compare by their time window only; a late location
/// fix must not register as a state change.
impl PartialEq for ParkingState {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ParkingState::Idle, ParkingState::Idle) => true,
            (
                ParkingState::Active {
                    started_at: a_start,
                    ends_at: a_end,
                    ..
                },
                ParkingState::Active {
                    started_at: b_start,
                    ends_at: b_end,
                    ..
                },
            ) => a_start == b_start && a_end == b_end,
            _ => false,
        }
    }
}

impl ParkingState {
    pub fn is_active(&self) -> bool {
        matches!(self, ParkingState::Active { .. })
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ParkingState::Active { ends_at, .. } => Some(*ends_at),
            ParkingState::Idle => None,
        }
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        match self {
            ParkingState::Idle => 0,
            ParkingState::Active { ends_at, .. } => {
                cmp::max((*ends_at - now).num_milliseconds(), 0)
            }
        }
    }

    /// Fraction of the window already used, 0.0 when idle or the window is empty.
    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        let ParkingState::Active {
            started_at,
            ends_at,
            ..
        } = self
        else {
            return 0.0;
        };

        let total_ms = (*ends_at - *started_at).num_milliseconds();
        if total_ms <= 0 {
            return 0.0;
        }
        let remaining = self.remaining_ms(now) as f64;
        (1.0 - remaining / total_ms as f64).clamp(0.0, 1.0)
    }

    pub fn time_status(&self, now: DateTime<Utc>) -> TimeStatus {
        TimeStatus::from_remaining_ms(self.remaining_ms(now))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimeStatus {
    Plenty,
    Low,
    Critical,
}

impl TimeStatus {
    pub fn from_remaining_ms(remaining_ms: i64) -> Self {
        if remaining_ms > LOW_THRESHOLD_MS {
            TimeStatus::Plenty
        } else if remaining_ms > CRITICAL_THRESHOLD_MS {
            TimeStatus::Low
        } else {
            TimeStatus::Critical
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDetails {
    pub hourly_rate: Option<f64>,
    pub floor: Option<String>,
    pub section: Option<String>,
    pub photo: Option<String>,
}

impl ActiveDetails {
    pub fn validate(&self) -> Result<()> {
        if let Some(rate) = self.hourly_rate {
            if !rate.is_finite() || rate < 0.0 {
                return Err(anyhow!("hourly rate must be a non-negative number, got {rate}"));
            }
        }
        Ok(())
    }
}

/// The single in-progress session. Its end time moves forward with "add time"
/// and may already be in the past when recovered after a long suspension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<LocationSnapshot>,
    #[serde(default)]
    pub details: ActiveDetails,
}

impl ActiveSession {
    pub fn new(
        started_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        location: Option<LocationSnapshot>,
    ) -> Self {
        Self {
            started_at,
            ends_at,
            location,
            details: ActiveDetails::default(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }

    pub fn to_state(&self) -> ParkingState {
        ParkingState::Active {
            started_at: self.started_at,
            ends_at: self.ends_at,
            location: self.location.clone(),
        }
    }
}
