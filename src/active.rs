//! Durable copy of the running session.
//!
//! Each field has its own key so a missing or corrupt value only loses that
//! field. The end time is the anchor: without a readable end time there is no
//! session to recover.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::warn;

use crate::db::{
    helpers::{format_datetime, parse_datetime, parse_f64},
    keys, KvStore,
};
use crate::models::{ActiveDetails, ActiveSession, LocationSnapshot};

#[derive(Clone)]
pub struct ActiveSessionStore {
    kv: Arc<dyn KvStore>,
}

impl ActiveSessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Reads the stored session. A missing start time falls back to `now`.
    pub fn load(&self, now: DateTime<Utc>) -> Option<ActiveSession> {
        let ends_at = self.read_datetime(keys::ACTIVE_END_TIME)?;
        let started_at = self
            .read_datetime(keys::ACTIVE_START_TIME)
            .unwrap_or(now);

        let location = match (
            self.read_f64(keys::ACTIVE_LATITUDE),
            self.read_f64(keys::ACTIVE_LONGITUDE),
            self.read_string(keys::ACTIVE_ADDRESS),
        ) {
            (Some(latitude), Some(longitude), Some(address)) => Some(LocationSnapshot {
                latitude,
                longitude,
                address,
            }),
            _ => None,
        };

        let details = ActiveDetails {
            hourly_rate: self
                .read_f64(keys::ACTIVE_HOURLY_RATE)
                .filter(|rate| *rate >= 0.0),
            floor: self.read_string(keys::ACTIVE_FLOOR),
            section: self.read_string(keys::ACTIVE_SECTION),
            photo: self.read_string(keys::ACTIVE_PHOTO),
        };

        Some(ActiveSession {
            started_at,
            ends_at,
            location,
            details,
        })
    }

    pub fn save(&self, session: &ActiveSession) -> Result<()> {
        self.kv
            .set(keys::ACTIVE_START_TIME, &format_datetime(session.started_at))
            .context("failed to persist active start time")?;
        self.save_end_time(session.ends_at)?;

        match &session.location {
            Some(location) => {
                self.kv
                    .set(keys::ACTIVE_LATITUDE, &location.latitude.to_string())?;
                self.kv
                    .set(keys::ACTIVE_LONGITUDE, &location.longitude.to_string())?;
                self.kv.set(keys::ACTIVE_ADDRESS, &location.address)?;
            }
            None => {
                self.kv.remove_many(&[
                    keys::ACTIVE_LATITUDE,
                    keys::ACTIVE_LONGITUDE,
                    keys::ACTIVE_ADDRESS,
                ])?;
            }
        }

        self.save_details(&session.details)
    }

    pub fn save_end_time(&self, ends_at: DateTime<Utc>) -> Result<()> {
        self.kv
            .set(keys::ACTIVE_END_TIME, &format_datetime(ends_at))
            .context("failed to persist active end time")
    }

    pub fn save_details(&self, details: &ActiveDetails) -> Result<()> {
        let rate = details.hourly_rate.map(|rate| rate.to_string());
        let fields = [
            (keys::ACTIVE_HOURLY_RATE, rate.as_deref()),
            (keys::ACTIVE_FLOOR, details.floor.as_deref()),
            (keys::ACTIVE_SECTION, details.section.as_deref()),
            (keys::ACTIVE_PHOTO, details.photo.as_deref()),
        ];

        for (key, value) in fields {
            let result = match value {
                Some(value) => self.kv.set(key, value),
                None => self.kv.remove(key),
            };
            result.with_context(|| format!("failed to persist {key}"))?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.kv
            .remove_many(&keys::ACTIVE_ALL)
            .context("failed to clear active session")
    }

    fn read_string(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!("Failed to read {key}: {err:#}");
                None
            }
        }
    }

    fn read_datetime(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.read_string(key)?;
        match parse_datetime(&raw, key) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring malformed {key}: {err:#}");
                None
            }
        }
    }

    fn read_f64(&self, key: &str) -> Option<f64> {
        let raw = self.read_string(key)?;
        match parse_f64(&raw, key) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring malformed {key}: {err:#}");
                None
            }
        }
    }
}
