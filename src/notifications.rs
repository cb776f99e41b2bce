use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::{keys, KvStore};
use crate::platform::{AlertRequest, NotificationCenter};
use crate::settings::AppSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub const LEAD_WARNING_ID: &str = "parkingWarningLead";
pub const EARLY_WARNING_ID: &str = "parkingWarningEarly";
pub const EXPIRED_ID: &str = "parkingExpired";

/// Fixed early warning, armed only when the configured lead time is shorter.
pub const EARLY_WARNING_MINUTES: u32 = 10;

const WARNING_TITLE: &str = "Parking Reminder";
const EXPIRED_TITLE: &str = "Parking Expired";
const EXPIRED_BODY: &str = "Your parking time has expired. Please move your vehicle.";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Authorized,
    Denied,
}

pub fn reminder_id(minutes: u32) -> String {
    format!("parkingReminder{minutes}Min")
}

fn warning(id: String, minutes: u32, ends_at: DateTime<Utc>, settings: &AppSettings) -> AlertRequest {
    AlertRequest {
        id,
        title: WARNING_TITLE.to_string(),
        body: format!("Your parking expires in {minutes} minutes"),
        fire_at: ends_at - Duration::minutes(i64::from(minutes)),
        sound_enabled: settings.sound_enabled,
        sound_id: settings.notification_sound.id().to_string(),
    }
}

/// Alerts for a session ending at `ends_at`, earliest first. Nothing is
/// planned for an instant at or before `now`.
pub fn plan_alerts(
    ends_at: DateTime<Utc>,
    now: DateTime<Utc>,
    settings: &AppSettings,
) -> Vec<AlertRequest> {
    let lead = settings.notification_timing.minutes();
    let mut alerts = vec![warning(LEAD_WARNING_ID.to_string(), lead, ends_at, settings)];

    if lead < EARLY_WARNING_MINUTES {
        alerts.push(warning(
            EARLY_WARNING_ID.to_string(),
            EARLY_WARNING_MINUTES,
            ends_at,
            settings,
        ));
    }

    for &minutes in &settings.additional_reminders {
        let duplicate = minutes == 0
            || minutes == lead
            || (lead < EARLY_WARNING_MINUTES && minutes == EARLY_WARNING_MINUTES);
        if !duplicate {
            alerts.push(warning(reminder_id(minutes), minutes, ends_at, settings));
        }
    }

    alerts.push(AlertRequest {
        id: EXPIRED_ID.to_string(),
        title: EXPIRED_TITLE.to_string(),
        body: EXPIRED_BODY.to_string(),
        fire_at: ends_at,
        sound_enabled: settings.sound_enabled,
        sound_id: settings.notification_sound.id().to_string(),
    });

    alerts.retain(|alert| alert.fire_at > now);
    alerts.sort_by_key(|alert| alert.fire_at);
    alerts
}

/// Arms and withdraws the alert set of the running session. At most one
/// alert per identifier is live at any time.
///
/// The armed identifiers are persisted so a later process can withdraw
/// alerts it did not plan itself.
pub struct NotificationScheduler {
    center: Arc<dyn NotificationCenter>,
    kv: Arc<dyn KvStore>,
    armed: Mutex<Vec<String>>,
    status: Mutex<AuthorizationStatus>,
}

impl NotificationScheduler {
    pub fn new(center: Arc<dyn NotificationCenter>, kv: Arc<dyn KvStore>) -> Self {
        let armed = read_armed(kv.as_ref());
        Self {
            center,
            kv,
            armed: Mutex::new(armed),
            status: Mutex::new(AuthorizationStatus::NotDetermined),
        }
    }

    pub fn request_permission(&self) -> bool {
        let granted = self.center.request_permission();
        *lock(&self.status) = if granted {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        granted
    }

    pub fn authorization_status(&self) -> AuthorizationStatus {
        *lock(&self.status)
    }

    pub fn armed_ids(&self) -> Vec<String> {
        lock(&self.armed).clone()
    }

    /// Replaces whatever is armed with the plan for `ends_at`. Returns how
    /// many alerts were accepted; failures are logged, never returned.
    pub fn arm(&self, ends_at: DateTime<Utc>, now: DateTime<Utc>, settings: &AppSettings) -> usize {
        self.cancel_all();

        if !self.request_permission() {
            log_warn!("Notification permission not granted; parking alerts disabled");
            return 0;
        }

        let mut armed = lock(&self.armed);
        for alert in plan_alerts(ends_at, now, settings) {
            match self.center.schedule_alert(&alert) {
                Ok(()) => {
                    log_debug!("Armed {} for {}", alert.id, alert.fire_at);
                    armed.push(alert.id);
                }
                Err(err) => log_warn!("Failed to schedule {}: {err:#}", alert.id),
            }
        }
        self.persist_armed(&armed);

        log_info!("Armed {} parking alerts ending {}", armed.len(), ends_at);
        armed.len()
    }

    pub fn cancel_all(&self) {
        let mut armed = lock(&self.armed);
        let mut ids: Vec<String> = [LEAD_WARNING_ID, EARLY_WARNING_ID, EXPIRED_ID]
            .into_iter()
            .map(str::to_string)
            .collect();
        for id in armed.drain(..) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        self.center.cancel_alerts(&ids);
        self.persist_armed(&armed);
    }

    fn persist_armed(&self, armed: &[String]) {
        let result = if armed.is_empty() {
            self.kv.remove(keys::ARMED_ALERT_IDS)
        } else {
            match serde_json::to_string(armed) {
                Ok(encoded) => self.kv.set(keys::ARMED_ALERT_IDS, &encoded),
                Err(err) => Err(err.into()),
            }
        };
        if let Err(err) = result {
            log_error!("Failed to persist armed alert ids: {err:#}");
        }
    }
}

fn read_armed(kv: &dyn KvStore) -> Vec<String> {
    match kv.get(keys::ARMED_ALERT_IDS) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            log_warn!("Ignoring malformed armed alert ids: {err}");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(err) => {
            log_warn!("Failed to read armed alert ids: {err:#}");
            Vec::new()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
