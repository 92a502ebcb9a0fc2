use std::sync::Arc;

use crate::api::ValidatorApi;
use crate::config::AppConfig;
use crate::database::Database;
use crate::engine::ConversationEngine;

/// Общее состояние обработчиков; внедряется через dptree::deps.
#[derive(Clone)]
pub struct BotState {
    pub db: Database,
    pub api: Arc<dyn ValidatorApi>,
    pub engine: Arc<ConversationEngine>,
    pub config: Arc<AppConfig>,
}

impl BotState {
    pub fn new(
        db: Database,
        api: Arc<dyn ValidatorApi>,
        engine: Arc<ConversationEngine>,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            api,
            engine,
            config: Arc::new(config),
        }
    }
}
