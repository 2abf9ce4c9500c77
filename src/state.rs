use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::config::AppConfig;
use crate::db::SharedConnection;
use crate::errors::AppError;
use crate::services::conversation::Assistant;
use crate::services::relay::BrowserRelay;
use crate::services::theme::ThemeBus;
use crate::services::voice::VoiceControl;

pub struct AppState {
    pub db: SharedConnection,
    pub config: AppConfig,
    pub assistant: Mutex<Assistant>,
    // Reachable without the assistant lock.
    pub voice: Arc<VoiceControl>,
    pub relay: Arc<BrowserRelay>,
    pub theme_bus: ThemeBus,
}

impl AppState {
    // Exclusive access to the assistant, or `Busy` while a turn is in flight.
    pub fn assistant(&self) -> Result<MutexGuard<'_, Assistant>, AppError> {
        self.assistant.try_lock().map_err(|_| AppError::Busy)
    }
}
