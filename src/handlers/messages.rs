use std::error::Error;

use teloxide::prelude::*;

use crate::bot_state::BotState;

pub async fn message_handler(
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    // Команды уже разобраны в command_handler
    if text.starts_with('/') {
        return Ok(());
    }

    state.engine.handle_text(user.id, text).await?;
    Ok(())
}
