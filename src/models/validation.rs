use serde::Deserialize;
use serde_json::Value;

/// Структурный результат проверки от внешнего сервиса.
///
/// `found` — произвольное вложенное дерево свидетельств; рендерер обязан
/// переварить любую его форму, поэтому тип остаётся `Value`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationResult {
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub found: Value,
}

fn default_valid() -> bool {
    true
}

/// Ответ сервиса на изменение правила.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleUpdateReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<String>,
}
