use std::error::Error;

use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::models::FileRef;

/// Любое вложение уходит в движок диалога: что с ним делать, решает
/// текущее состояние сессии пользователя.
pub async fn document_handler(
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(document) = msg.document() else {
        return Ok(());
    };

    let file = FileRef {
        id: document.file.id.clone(),
        name: document.file_name.clone().unwrap_or_default(),
        size: document.file.size,
    };
    log::debug!("📎 Файл от {}: {} ({} байт)", user.id, file.name, file.size);

    state.engine.handle_document(user.id, file).await?;
    Ok(())
}
