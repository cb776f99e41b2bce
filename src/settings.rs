use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::db::{keys, KvStore};

pub const PRESET_DURATIONS_SECS: [u64; 4] = [15 * 60, 30 * 60, 60 * 60, 2 * 60 * 60];
pub const ADD_TIME_OPTIONS_SECS: [u64; 3] = [15 * 60, 30 * 60, 60 * 60];
/// Longest default duration a settings record may carry: one week.
pub const MAX_DEFAULT_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Minutes before expiry at which the main warning fires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u32", into = "u32")]
pub enum NotificationTiming {
    FiveMinutes,
    TenMinutes,
    FifteenMinutes,
    TwentyMinutes,
    ThirtyMinutes,
}

impl NotificationTiming {
    pub const ALL: [NotificationTiming; 5] = [
        NotificationTiming::FiveMinutes,
        NotificationTiming::TenMinutes,
        NotificationTiming::FifteenMinutes,
        NotificationTiming::TwentyMinutes,
        NotificationTiming::ThirtyMinutes,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            NotificationTiming::FiveMinutes => 5,
            NotificationTiming::TenMinutes => 10,
            NotificationTiming::FifteenMinutes => 15,
            NotificationTiming::TwentyMinutes => 20,
            NotificationTiming::ThirtyMinutes => 30,
        }
    }

    pub fn requires_entitlement(self) -> bool {
        self.minutes() > 15
    }

    pub fn is_available(self, entitled: bool) -> bool {
        entitled || !self.requires_entitlement()
    }

    pub fn display_name(self) -> String {
        format!("{} minutes", self.minutes())
    }
}

impl TryFrom<u32> for NotificationTiming {
    type Error = String;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        NotificationTiming::ALL
            .into_iter()
            .find(|timing| timing.minutes() == minutes)
            .ok_or_else(|| format!("unsupported notification lead time: {minutes} minutes"))
    }
}

impl From<NotificationTiming> for u32 {
    fn from(timing: NotificationTiming) -> Self {
        timing.minutes()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSound {
    #[default]
    Default,
    Chime,
    Bell,
    Alert,
    Gentle,
}

impl NotificationSound {
    pub fn id(self) -> &'static str {
        match self {
            NotificationSound::Default => "default",
            NotificationSound::Chime => "chime",
            NotificationSound::Bell => "bell",
            NotificationSound::Alert => "alert",
            NotificationSound::Gentle => "gentle",
        }
    }

    pub fn requires_entitlement(self) -> bool {
        self != NotificationSound::Default
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub notification_timing: NotificationTiming,
    pub sound_enabled: bool,
    pub haptics_enabled: bool,
    #[serde(default)]
    pub notification_sound: NotificationSound,
    pub default_duration_secs: u64,
    /// Extra reminders, in minutes before expiry.
    #[serde(default)]
    pub additional_reminders: Vec<u32>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            notification_timing: NotificationTiming::TenMinutes,
            sound_enabled: true,
            haptics_enabled: true,
            notification_sound: NotificationSound::Default,
            default_duration_secs: 3600,
            additional_reminders: Vec::new(),
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<()> {
        if self.default_duration_secs == 0 {
            bail!("default duration must be greater than zero");
        }
        if self.default_duration_secs > MAX_DEFAULT_DURATION_SECS {
            bail!(
                "default duration of {}s exceeds the {}s limit",
                self.default_duration_secs,
                MAX_DEFAULT_DURATION_SECS
            );
        }
        Ok(())
    }
}

fn normalize_reminders(mut reminders: Vec<u32>) -> Vec<u32> {
    reminders.retain(|minutes| *minutes > 0);
    reminders.sort_unstable_by(|a, b| b.cmp(a));
    reminders.dedup();
    reminders
}

/// Settings record plus an in-memory copy of the last value read or written.
pub struct SettingsStore {
    kv: Arc<dyn KvStore>,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        let data = read_settings(kv.as_ref());
        Self {
            kv,
            data: RwLock::new(data),
        }
    }

    /// Re-reads the stored record. Missing or malformed data yields defaults.
    pub fn load(&self) -> AppSettings {
        let settings = read_settings(self.kv.as_ref());
        *self.write_guard() = settings.clone();
        settings
    }

    pub fn current(&self) -> AppSettings {
        self.read_guard().clone()
    }

    pub fn save(&self, settings: &AppSettings) -> Result<()> {
        settings.validate()?;
        let serialized =
            serde_json::to_string(settings).context("failed to encode app settings")?;
        let mut guard = self.write_guard();
        *guard = settings.clone();
        self.kv
            .set(keys::APP_SETTINGS, &serialized)
            .context("failed to persist app settings")
    }

    pub fn update_notification_timing(
        &self,
        timing: NotificationTiming,
        entitled: bool,
    ) -> Result<AppSettings> {
        if !timing.is_available(entitled) {
            return Err(anyhow!(
                "{} lead time requires an active subscription",
                timing.display_name()
            ));
        }
        self.update(|settings| settings.notification_timing = timing)
    }

    pub fn update_notification_sound(
        &self,
        sound: NotificationSound,
        entitled: bool,
    ) -> Result<AppSettings> {
        if sound.requires_entitlement() && !entitled {
            return Err(anyhow!(
                "notification sound '{}' requires an active subscription",
                sound.id()
            ));
        }
        self.update(|settings| settings.notification_sound = sound)
    }

    pub fn update_additional_reminders(&self, reminders: Vec<u32>) -> Result<AppSettings> {
        let reminders = normalize_reminders(reminders);
        self.update(|settings| settings.additional_reminders = reminders)
    }

    pub fn set_default_duration(&self, secs: u64) -> Result<AppSettings> {
        if secs == 0 {
            bail!("default duration must be greater than zero");
        }
        self.update(|settings| settings.default_duration_secs = secs)
    }

    pub fn toggle_sound(&self) -> Result<AppSettings> {
        self.update(|settings| settings.sound_enabled = !settings.sound_enabled)
    }

    pub fn toggle_haptics(&self) -> Result<AppSettings> {
        self.update(|settings| settings.haptics_enabled = !settings.haptics_enabled)
    }

    fn update(&self, apply: impl FnOnce(&mut AppSettings)) -> Result<AppSettings> {
        let mut next = self.current();
        apply(&mut next);
        self.save(&next)?;
        Ok(next)
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, AppSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, AppSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn read_settings(kv: &dyn KvStore) -> AppSettings {
    let raw = match kv.get(keys::APP_SETTINGS) {
        Ok(Some(raw)) => raw,
        Ok(None) => return AppSettings::default(),
        Err(err) => {
            warn!("Failed to read settings, using defaults: {err:#}");
            return AppSettings::default();
        }
    };

    match serde_json::from_str::<AppSettings>(&raw) {
        Ok(settings) if settings.validate().is_ok() => settings,
        Ok(_) => {
            warn!("Stored settings violate invariants, using defaults");
            AppSettings::default()
        }
        Err(err) => {
            warn!("Stored settings are malformed, using defaults: {err}");
            AppSettings::default()
        }
    }
}
