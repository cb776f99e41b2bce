//! Seams to the host platform.
//!
//! The core never talks to location services, the notification center, the
//! lock-screen activity or the purchase receipts directly. The host passes
//! implementations of these traits into [`crate::ParkSafeCore`].

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

use crate::models::LocationSnapshot;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut guard = match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

pub trait LocationProvider: Send + Sync {
    /// Latest known fix with its reverse-geocoded address, if any.
    fn current_location(&self) -> Option<LocationSnapshot>;
    fn start_tracking(&self);
    fn stop_tracking(&self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRequest {
    pub id: String,
    pub title: String,
    pub body: String,
    pub fire_at: DateTime<Utc>,
    pub sound_enabled: bool,
    pub sound_id: String,
}

pub trait NotificationCenter: Send + Sync {
    fn request_permission(&self) -> bool;
    fn schedule_alert(&self, alert: &AlertRequest) -> Result<()>;
    fn cancel_alerts(&self, ids: &[String]);
}

/// Lock-screen / ambient countdown. Purely informational.
pub trait LiveActivity: Send + Sync {
    fn publish(&self, remaining_ms: i64, ends_at: DateTime<Utc>);
    fn end(&self);
}

pub trait Entitlements: Send + Sync {
    fn is_entitled(&self) -> bool;
}

/// Entitlement answer fixed at construction, for hosts without a store.
#[derive(Debug, Clone, Copy)]
pub struct StaticEntitlement(pub bool);

impl Entitlements for StaticEntitlement {
    fn is_entitled(&self) -> bool {
        self.0
    }
}
