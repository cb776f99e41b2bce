pub mod active;
pub mod config;
pub mod db;
pub mod export;
pub mod history;
pub mod models;
pub mod notifications;
pub mod parking;
pub mod platform;
pub mod settings;
pub mod utils;

use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use uuid::Uuid;

use active::ActiveSessionStore;
use config::CoreConfig;
use db::{Database, KvStore};
use export::ExportFormat;
use history::HistoryStore;
use models::ParkingSession;
use notifications::{AuthorizationStatus, NotificationScheduler};
use parking::{ParkingController, ParkingDeps, ParkingMachine, RecoveryOutcome};
use platform::{Clock, Entitlements, LiveActivity, LocationProvider, NotificationCenter};
use settings::SettingsStore;

pub use utils::logging::init_logging;

/// Platform services supplied by the host shell.
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub location: Arc<dyn LocationProvider>,
    pub notifications: Arc<dyn NotificationCenter>,
    pub live_activity: Option<Arc<dyn LiveActivity>>,
    pub entitlements: Arc<dyn Entitlements>,
}

/// Everything the host talks to, wired together once at startup.
pub struct ParkSafeCore {
    pub settings: Arc<SettingsStore>,
    pub history: HistoryStore,
    pub parking: ParkingController,
    scheduler: Arc<NotificationScheduler>,
    entitlements: Arc<dyn Entitlements>,
    clock: Arc<dyn Clock>,
    recovery: RecoveryOutcome,
}

impl ParkSafeCore {
    /// Opens the SQLite store under `config.data_dir`.
    ///
    /// Store access is synchronous: every transition and the ticker write
    /// through [`Database::execute`] from inside the runtime.
    pub async fn open(config: CoreConfig, collaborators: Collaborators) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let database = Database::new(config.db_path())?;
        Self::with_store(Arc::new(database), config, collaborators).await
    }

    /// Builds the core over any store and reconciles a session left running by
    /// a previous process.
    pub async fn with_store(
        kv: Arc<dyn KvStore>,
        config: CoreConfig,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let settings = Arc::new(SettingsStore::new(kv.clone()));
        let history = HistoryStore::new(kv.clone());
        let scheduler = Arc::new(NotificationScheduler::new(
            collaborators.notifications.clone(),
            kv.clone(),
        ));

        let machine = ParkingMachine::new(ParkingDeps {
            settings: settings.clone(),
            history: history.clone(),
            active: ActiveSessionStore::new(kv),
            scheduler: scheduler.clone(),
            location: collaborators.location.clone(),
            live_activity: collaborators.live_activity.clone(),
        });
        let parking = ParkingController::new(machine, collaborators.clock.clone(), &config);

        let recovery = parking.recover().await?;
        match &recovery {
            RecoveryOutcome::NothingStored => info!("ParkSafe core ready"),
            RecoveryOutcome::Resumed(state) => {
                info!("ParkSafe core ready; resumed session ending {:?}", state.ends_at())
            }
            RecoveryOutcome::Finalized(record) => warn!(
                "ParkSafe core ready; session {} expired while the app was away",
                record.id
            ),
        }

        Ok(Self {
            settings,
            history,
            parking,
            scheduler,
            entitlements: collaborators.entitlements,
            clock: collaborators.clock,
            recovery,
        })
    }

    pub async fn shutdown(&self) {
        self.parking.shutdown().await;
    }

    pub fn recovery(&self) -> &RecoveryOutcome {
        &self.recovery
    }

    pub fn is_entitled(&self) -> bool {
        self.entitlements.is_entitled()
    }

    pub fn notification_status(&self) -> AuthorizationStatus {
        self.scheduler.authorization_status()
    }

    pub fn request_notification_permission(&self) -> bool {
        self.scheduler.request_permission()
    }

    pub fn visible_history(&self) -> Vec<ParkingSession> {
        self.history.visible_sessions(self.is_entitled())
    }

    pub fn delete_session(&self, id: Uuid) -> Result<bool> {
        self.history.delete(id)
    }

    pub fn export_history(&self, format: ExportFormat) -> Result<(String, String)> {
        let sessions = self.history.load_all();
        let body = export::export(&sessions, format)?;
        Ok((export::export_file_name(format, self.clock.now()), body))
    }
}
