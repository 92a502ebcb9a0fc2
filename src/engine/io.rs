//! Швы движка диалога: доставка сообщений и получение содержимого файлов.
//! Конечный автомат общается с Telegram только через эти трейты, поэтому
//! тестируется без сети.

use std::io::Cursor;

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, UserId};
use thiserror::Error;

use crate::models::FileRef;

#[derive(Debug, Error)]
#[error("не удалось получить файл: {0}")]
pub struct FetchError(pub String);

#[derive(Debug, Error)]
#[error("не удалось отправить сообщение: {0}")]
pub struct ReplyError(pub String);

#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, file: &FileRef) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
pub trait ChatResponder: Send + Sync {
    async fn send_text(&self, user: UserId, text: &str) -> Result<(), ReplyError>;
}

/// Скачивает вложение пользователя в память через Bot API.
pub struct TelegramFileFetcher {
    bot: Bot,
}

impl TelegramFileFetcher {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl FileFetcher for TelegramFileFetcher {
    async fn fetch(&self, file: &FileRef) -> Result<Vec<u8>, FetchError> {
        let meta = self
            .bot
            .get_file(file.id.clone())
            .await
            .map_err(|e| FetchError(e.to_string()))?;

        let mut buffer = Cursor::new(Vec::with_capacity(file.size as usize));
        self.bot
            .download_file(&meta.path, &mut buffer)
            .await
            .map_err(|e| FetchError(e.to_string()))?;

        Ok(buffer.into_inner())
    }
}

/// Шлёт ответы в личный чат пользователя (в личке chat_id == user_id).
pub struct TelegramResponder {
    bot: Bot,
}

impl TelegramResponder {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatResponder for TelegramResponder {
    async fn send_text(&self, user: UserId, text: &str) -> Result<(), ReplyError> {
        self.bot
            .send_message(ChatId(user.0 as i64), text)
            .await
            .map_err(|e| ReplyError(e.to_string()))?;
        Ok(())
    }
}
