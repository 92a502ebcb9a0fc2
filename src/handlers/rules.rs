//! Команды вокруг набора правил: просмотр, изменение, выдача роли.

use std::error::Error;

use teloxide::prelude::*;

use crate::bot_state::BotState;
use crate::models::Role;
use crate::render::{split_into_chunks, MAX_MESSAGE_LEN};

pub async fn handle_types(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match state.api.list_document_types().await {
        Ok(types) if !types.is_empty() => {
            let list = types
                .iter()
                .map(|t| format!("- {t}"))
                .collect::<Vec<_>>()
                .join("\n");
            bot.send_message(msg.chat.id, format!("Доступные типы документов:\n{list}"))
                .await?;
        }
        Ok(_) => {
            bot.send_message(msg.chat.id, "Список типов документов пуст.")
                .await?;
        }
        Err(e) => {
            log::error!("❌ Ошибка при получении типов документов: {e}");
            bot.send_message(msg.chat.id, "Ошибка при получении типов документов.")
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_rules(
    bot: Bot,
    msg: Message,
    state: BotState,
    args: String,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(doc_type) = args.split_whitespace().next() else {
        bot.send_message(msg.chat.id, "Использование: /rules <тип_документа>")
            .await?;
        return Ok(());
    };

    match state.api.get_rules(doc_type).await {
        Ok(rules) => {
            let text = format_rules(doc_type, &rules);
            for chunk in split_into_chunks(&text, MAX_MESSAGE_LEN) {
                bot.send_message(msg.chat.id, chunk).await?;
            }
        }
        Err(e) => {
            log::error!("❌ Ошибка при получении правил для {doc_type}: {e}");
            bot.send_message(msg.chat.id, "Ошибка при получении правил.")
                .await?;
        }
    }
    Ok(())
}

fn format_rules(doc_type: &str, rules: &serde_json::Value) -> String {
    let body = match rules.as_object() {
        Some(map) if !map.is_empty() => map
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("{key}: {s}"),
                other => format!("{key}: {other}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => rules.to_string(),
    };
    format!("Правила для {doc_type}:\n{body}")
}

pub async fn handle_change_rule(
    bot: Bot,
    msg: Message,
    state: BotState,
    args: String,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if state.db.get_role(user.id).await? != Role::Reviewer {
        log::warn!("🚫 Пользователь {} попытался изменить правило без прав", user.id);
        bot.send_message(msg.chat.id, "У вас нет прав для изменения правил.")
            .await?;
        return Ok(());
    }

    let parts: Vec<&str> = args.split_whitespace().collect();
    if parts.len() < 3 {
        bot.send_message(
            msg.chat.id,
            "Использование: /change_rule <тип_документа> <ключ> <новое_значение>",
        )
        .await?;
        return Ok(());
    }
    let (doc_type, rule_key) = (parts[0], parts[1]);
    let new_value = parts[2..].join(" ");

    log::info!(
        "📝 Нормоконтролёр {} меняет правило {rule_key} для {doc_type} на {new_value}",
        user.id
    );
    match state.api.update_rule(doc_type, rule_key, &new_value).await {
        Ok(reply) => {
            let text = if reply.message.is_empty() {
                "Правило изменено.".to_string()
            } else {
                reply.message
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Err(e) => {
            log::error!("❌ Ошибка при изменении правила: {e}");
            bot.send_message(msg.chat.id, "Ошибка при изменении правила.")
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_change_rule_for_all(
    bot: Bot,
    msg: Message,
    state: BotState,
    args: String,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if state.db.get_role(user.id).await? != Role::Reviewer {
        log::warn!("🚫 Пользователь {} попытался изменить правило без прав", user.id);
        bot.send_message(msg.chat.id, "У вас нет прав для изменения правил.")
            .await?;
        return Ok(());
    }

    let parts: Vec<&str> = args.split_whitespace().collect();
    if parts.len() < 2 {
        bot.send_message(
            msg.chat.id,
            "Использование: /change_rule_for_all <ключ> <новое_значение>",
        )
        .await?;
        return Ok(());
    }
    let rule_key = parts[0];
    let new_value = parts[1..].join(" ");

    match state.api.update_rule_for_all(rule_key, &new_value).await {
        Ok(reply) => {
            let mut text = if reply.message.is_empty() {
                "Правило изменено.".to_string()
            } else {
                reply.message
            };
            if !reply.errors.is_empty() {
                text.push_str("\n\nОшибки:\n");
                text.push_str(&reply.errors.join("\n"));
            }
            for chunk in split_into_chunks(&text, MAX_MESSAGE_LEN) {
                bot.send_message(msg.chat.id, chunk).await?;
            }
        }
        Err(e) => {
            log::error!("❌ Ошибка при массовом изменении правила: {e}");
            bot.send_message(msg.chat.id, "Ошибка при массовом изменении правила.")
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_set_reviewer(
    bot: Bot,
    msg: Message,
    state: BotState,
    args: String,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let code = args.trim();
    if code.is_empty() || code.split_whitespace().count() != 1 {
        bot.send_message(msg.chat.id, "Использование: /set_reviewer <секретный_код>")
            .await?;
        return Ok(());
    }

    if code == state.config.secret_code {
        state.db.set_role(user.id, Role::Reviewer).await?;
        log::info!("✅ Пользователю {} присвоена роль reviewer", user.id);
        bot.send_message(msg.chat.id, "Вы успешно стали нормоконтролёром!")
            .await?;
    } else {
        log::warn!("❌ Пользователь {} ввёл неверный секретный код", user.id);
        bot.send_message(msg.chat.id, "Неверный секретный код.")
            .await?;
    }
    Ok(())
}
