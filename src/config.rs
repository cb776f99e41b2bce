use std::{path::PathBuf, time::Duration};

const DATA_DIR_ENV: &str = "PARKSAFE_DATA_DIR";
const DEBUG_ENV: &str = "PARKSAFE_DEBUG";
const DB_FILE_NAME: &str = "parksafe.sqlite3";

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
    /// Every Nth tick is logged at info level.
    pub heartbeat_every_ticks: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("parksafe-data"),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: 10,
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var_os(DATA_DIR_ENV)
            .map(PathBuf::from)
            .filter(|dir| !dir.as_os_str().is_empty());
        let debug_mode = std::env::var(DEBUG_ENV)
            .map(|value| is_truthy(&value))
            .unwrap_or(false);

        Self::with_overrides(data_dir, debug_mode)
    }

    fn with_overrides(data_dir: Option<PathBuf>, debug_mode: bool) -> Self {
        let defaults = Self::default();
        Self {
            data_dir: data_dir.unwrap_or(defaults.data_dir),
            heartbeat_every_ticks: if debug_mode { 1 } else { defaults.heartbeat_every_ticks },
            ..defaults
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
