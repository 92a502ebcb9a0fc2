use std::env;

use anyhow::{Context, Result};

/// Настройки процесса из окружения (.env подхватывается в main).
/// Токен бота сюда не входит: его читает Bot::from_env из TELOXIDE_TOKEN.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Базовый адрес сервиса проверки документов.
    pub api_url: String,
    pub database_url: String,
    /// Код, дающий роль нормоконтролёра через /set_reviewer.
    pub secret_code: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_url: env::var("API_URL").context("API_URL must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            secret_code: env::var("SECRET_CODE").context("SECRET_CODE must be set")?,
        })
    }
}
