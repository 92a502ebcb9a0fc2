use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Сколько секунд бот ждёт следующего шага диалога.
pub const SESSION_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Docx,
    Latex,
}

/// Текущее состояние диалога проверки. Поток и шаг объединены в один
/// плоский enum: сессия не может оказаться сразу в двух потоках.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    DocxAwaitingFile,
    DocxAwaitingType,
    LatexAwaitingTex,
    LatexAwaitingSty,
    LatexAwaitingType,
}

impl FlowState {
    pub fn kind(&self) -> Option<DocKind> {
        match self {
            FlowState::Idle => None,
            FlowState::DocxAwaitingFile | FlowState::DocxAwaitingType => Some(DocKind::Docx),
            FlowState::LatexAwaitingTex
            | FlowState::LatexAwaitingSty
            | FlowState::LatexAwaitingType => Some(DocKind::Latex),
        }
    }

    pub fn is_waiting(&self) -> bool {
        !matches!(self, FlowState::Idle)
    }
}

/// Логический слот файла внутри диалога.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileSlot {
    Document,
    Tex,
    Sty,
}

/// Ссылка на файл в Telegram: содержимое скачивается только перед
/// отправкой на проверку.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub id: String,
    pub name: String,
    pub size: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DialogSession {
    pub state: FlowState,
    pub doc_type: Option<String>,
    pub files: HashMap<FileSlot, FileRef>,
    pub started_at: Option<DateTime<Utc>>,
}

impl DialogSession {
    pub fn reset(&mut self) {
        *self = DialogSession::default();
    }

    /// Новая команда проверки начинает диалог заново: прежние шаги,
    /// тип и файлы отбрасываются.
    pub fn restart(&mut self, state: FlowState, doc_type: Option<String>, now: DateTime<Utc>) {
        self.state = state;
        self.doc_type = doc_type;
        self.files.clear();
        self.started_at = Some(now);
    }

    /// Тип документа фиксируется один раз за диалог.
    pub fn set_doc_type(&mut self, doc_type: String) {
        if self.doc_type.is_none() {
            self.doc_type = Some(doc_type);
        }
    }

    pub fn rearm(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state.is_waiting()
            && self
                .started_at
                .map_or(false, |t| now - t > Duration::seconds(SESSION_TTL_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_type_is_set_once() {
        let mut session = DialogSession::default();
        session.set_doc_type("diploma".to_string());
        session.set_doc_type("course_work".to_string());
        assert_eq!(session.doc_type.as_deref(), Some("diploma"));

        // Повтор того же значения ничего не меняет
        session.set_doc_type("diploma".to_string());
        assert_eq!(session.doc_type.as_deref(), Some("diploma"));
    }

    #[test]
    fn restart_clears_steps_and_files() {
        let mut session = DialogSession::default();
        let now = Utc::now();
        session.restart(FlowState::DocxAwaitingFile, Some("diploma".into()), now);
        session.files.insert(
            FileSlot::Document,
            FileRef {
                id: "f1".to_string(),
                name: "report.docx".to_string(),
                size: 100,
            },
        );

        session.restart(FlowState::LatexAwaitingTex, None, now);
        assert_eq!(session.state, FlowState::LatexAwaitingTex);
        assert!(session.doc_type.is_none());
        assert!(session.files.is_empty());
    }

    #[test]
    fn expiry_is_strictly_greater_than_ttl() {
        let now = Utc::now();
        let mut session = DialogSession::default();
        session.restart(FlowState::DocxAwaitingFile, None, now);

        session.started_at = Some(now - Duration::seconds(SESSION_TTL_SECS));
        assert!(!session.is_expired(now));

        session.started_at = Some(now - Duration::seconds(SESSION_TTL_SECS + 1));
        assert!(session.is_expired(now));
    }

    #[test]
    fn idle_session_never_expires() {
        let now = Utc::now();
        let mut session = DialogSession::default();
        session.started_at = Some(now - Duration::seconds(SESSION_TTL_SECS * 10));
        assert!(!session.is_expired(now));
    }
}
