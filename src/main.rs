use std::sync::Arc;

use teloxide::{prelude::*, utils::command::BotCommands};

mod api;
mod bot_state;
mod config;
mod database;
mod engine;
mod handlers;
mod models;
mod render;
mod session;

use crate::api::{ValidationClient, ValidatorApi, DEFAULT_DOC_TYPES};
use crate::bot_state::BotState;
use crate::config::AppConfig;
use crate::database::Database;
use crate::engine::{ConversationEngine, TelegramFileFetcher, TelegramResponder};
use crate::handlers::{command_handler, document_handler, message_handler};
use crate::session::SessionStore;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case", description = "Доступные команды:")]
pub enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "показать помощь")]
    Help,
    #[command(description = "показать типы документов")]
    Types,
    #[command(description = "показать правила для типа документа")]
    Rules(String),
    #[command(description = "проверить .docx документ")]
    CheckDocx(String),
    #[command(description = "проверить пару .tex + .sty")]
    CheckLatex(String),
    #[command(description = "изменить правило (нормоконтролёр)")]
    ChangeRule(String),
    #[command(description = "изменить правило для всех типов (нормоконтролёр)")]
    ChangeRuleForAll(String),
    #[command(description = "получить роль нормоконтролёра")]
    SetReviewer(String),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Загружаем .env и инициализируем логирование
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting document check bot...");

    let config = AppConfig::from_env()?;

    let db = Database::new(&config.database_url).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let bot = Bot::from_env();

    let api: Arc<dyn ValidatorApi> = Arc::new(ValidationClient::new(config.api_url.clone()));

    // Набор типов документов берём у сервиса; если он недоступен на
    // старте, работаем с набором по умолчанию.
    let doc_types = match api.list_document_types().await {
        Ok(types) if !types.is_empty() => types,
        Ok(_) => {
            log::warn!("⚠️ Сервис вернул пустой список типов, берём набор по умолчанию");
            DEFAULT_DOC_TYPES.iter().map(|s| s.to_string()).collect()
        }
        Err(e) => {
            log::warn!("⚠️ Не удалось получить типы документов ({e}), берём набор по умолчанию");
            DEFAULT_DOC_TYPES.iter().map(|s| s.to_string()).collect()
        }
    };
    log::info!("📄 Типы документов: {doc_types:?}");

    let engine = Arc::new(ConversationEngine::new(
        SessionStore::new(),
        api.clone(),
        Arc::new(TelegramFileFetcher::new(bot.clone())),
        Arc::new(TelegramResponder::new(bot.clone())),
        doc_types,
    ));

    let state = BotState::new(db, api, engine, config);

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.document().is_some())
                .endpoint(document_handler),
        )
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
