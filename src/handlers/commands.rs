use std::error::Error;

use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::handlers::rules;
use crate::models::DocKind;
use crate::Command;

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cmd {
        Command::Start | Command::Help => handle_start(bot, msg, state).await?,
        Command::Types => rules::handle_types(bot, msg, state).await?,
        Command::Rules(args) => rules::handle_rules(bot, msg, state, args).await?,
        Command::CheckDocx(args) => handle_check(msg, state, DocKind::Docx, args).await?,
        Command::CheckLatex(args) => handle_check(msg, state, DocKind::Latex, args).await?,
        Command::ChangeRule(args) => rules::handle_change_rule(bot, msg, state, args).await?,
        Command::ChangeRuleForAll(args) => {
            rules::handle_change_rule_for_all(bot, msg, state, args).await?
        }
        Command::SetReviewer(args) => rules::handle_set_reviewer(bot, msg, state, args).await?,
    }
    Ok(())
}

async fn handle_start(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let role = state.db.get_role(user.id).await?;
    log::info!("👤 Пользователь {} начал сессию как {}", user.id, role);

    bot.send_message(
        msg.chat.id,
        format!(
            "Привет! Ваша текущая роль: {role}.\n\
            Доступные команды:\n\
            /types — показать типы документов\n\
            /rules <тип_документа> — показать правила\n\
            /check_docx [тип] — проверить .docx документ\n\
            /check_latex [тип] — проверить пару .tex + .sty\n\
            /change_rule <тип> <ключ> <значение> — изменить правило (только нормоконтролёрам)\n\
            /change_rule_for_all <ключ> <значение> — изменить правило для всех типов (только нормоконтролёрам)\n\
            /set_reviewer <секретный_код> — получить роль нормоконтролёра"
        ),
    )
    .await?;

    Ok(())
}

async fn handle_check(
    msg: Message,
    state: BotState,
    kind: DocKind,
    args: String,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    state.engine.start_flow(user.id, kind, &args).await?;
    Ok(())
}
