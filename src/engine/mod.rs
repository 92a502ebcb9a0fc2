//! Конечный автомат диалогов проверки документов.
//!
//! Два потока — .docx и LaTeX — устроены одинаково: команда входа,
//! ожидание файла (или пары файлов), при необходимости ожидание типа
//! документа текстом, затем общий подпроцесс проверки. Просроченная
//! сессия обнаруживается лениво, на следующем событии пользователя.

mod io;

pub use io::{
    ChatResponder, FetchError, FileFetcher, ReplyError, TelegramFileFetcher, TelegramResponder,
};

use std::sync::Arc;

use chrono::Utc;
use teloxide::types::UserId;

use crate::api::ValidatorApi;
use crate::models::{DialogSession, DocKind, FileRef, FileSlot, FlowState, ValidationResult};
use crate::render::{render_validation_result, split_into_chunks, MAX_MESSAGE_LEN};
use crate::session::SessionStore;

/// Лимит Telegram на документ, скачиваемый ботом.
pub const MAX_FILE_SIZE: u32 = 25 * 1024 * 1024;

pub struct ConversationEngine {
    sessions: SessionStore,
    api: Arc<dyn ValidatorApi>,
    files: Arc<dyn FileFetcher>,
    responder: Arc<dyn ChatResponder>,
    doc_types: Vec<String>,
}

/// Нормализация пользовательского ввода типа документа.
pub fn normalize_doc_type(input: &str) -> String {
    input.trim().to_lowercase().replace(' ', "_")
}

impl ConversationEngine {
    pub fn new(
        sessions: SessionStore,
        api: Arc<dyn ValidatorApi>,
        files: Arc<dyn FileFetcher>,
        responder: Arc<dyn ChatResponder>,
        doc_types: Vec<String>,
    ) -> Self {
        Self {
            sessions,
            api,
            files,
            responder,
            doc_types,
        }
    }

    fn is_known_type(&self, doc_type: &str) -> bool {
        self.doc_types.iter().any(|t| t == doc_type)
    }

    fn doc_types_text(&self) -> String {
        let list = self
            .doc_types
            .iter()
            .map(|t| format!("- {t}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!("Доступные типы документов:\n{list}")
    }

    /// Команда входа в поток: /check_docx [тип] или /check_latex [тип].
    pub async fn start_flow(
        &self,
        user: UserId,
        kind: DocKind,
        arg: &str,
    ) -> Result<(), ReplyError> {
        let slot = self.sessions.entry(user).await;
        let mut session = slot.lock().await;

        let arg = arg.trim();
        let doc_type = if arg.is_empty() {
            None
        } else {
            let normalized = normalize_doc_type(arg);
            if !self.is_known_type(&normalized) {
                // Сессия не трогается: пользователь вызывает команду заново
                self.responder
                    .send_text(
                        user,
                        &format!("Неизвестный тип документа «{arg}».\n{}", self.doc_types_text()),
                    )
                    .await?;
                return Ok(());
            }
            Some(normalized)
        };

        let (state, prompt) = match kind {
            DocKind::Docx => (
                FlowState::DocxAwaitingFile,
                "Отправьте файл .docx для проверки.",
            ),
            DocKind::Latex => (
                FlowState::LatexAwaitingTex,
                "Отправьте файл .tex для проверки.",
            ),
        };
        session.restart(state, doc_type, Utc::now());
        log::info!("▶️ Пользователь {user} начал проверку {kind:?}");

        self.responder.send_text(user, prompt).await?;
        Ok(())
    }

    /// Входящее вложение.
    pub async fn handle_document(&self, user: UserId, file: FileRef) -> Result<(), ReplyError> {
        let slot = self.sessions.entry(user).await;
        let mut session = slot.lock().await;
        let now = Utc::now();

        match session.state {
            FlowState::Idle => {
                self.responder
                    .send_text(
                        user,
                        "Чтобы проверить документ, сначала вызовите /check_docx или /check_latex.",
                    )
                    .await?;
            }
            FlowState::DocxAwaitingFile => {
                if session.is_expired(now) {
                    return self.expire(user, &mut session).await;
                }
                if !has_extension(&file.name, ".docx") {
                    self.responder
                        .send_text(user, "Нужен файл с расширением .docx. Отправьте документ ещё раз.")
                        .await?;
                    return Ok(());
                }
                if file.size > MAX_FILE_SIZE {
                    self.responder
                        .send_text(user, "Файл слишком большой: допустимо не более 25 МБ.")
                        .await?;
                    return Ok(());
                }

                session.files.insert(FileSlot::Document, file);
                if session.doc_type.is_some() {
                    self.run_validation(user, &mut session, DocKind::Docx).await?;
                } else {
                    session.state = FlowState::DocxAwaitingType;
                    session.rearm(now);
                    self.responder
                        .send_text(
                            user,
                            &format!("Файл принят. Укажите тип документа.\n{}", self.doc_types_text()),
                        )
                        .await?;
                }
            }
            FlowState::LatexAwaitingTex => {
                if session.is_expired(now) {
                    return self.expire(user, &mut session).await;
                }
                if !has_extension(&file.name, ".tex") {
                    self.responder
                        .send_text(user, "Нужен файл с расширением .tex. Отправьте его первым.")
                        .await?;
                    return Ok(());
                }
                if file.size > MAX_FILE_SIZE {
                    self.responder
                        .send_text(user, "Файл слишком большой: допустимо не более 25 МБ.")
                        .await?;
                    return Ok(());
                }

                session.files.insert(FileSlot::Tex, file);
                session.state = FlowState::LatexAwaitingSty;
                session.rearm(now);
                self.responder
                    .send_text(user, "Файл .tex загружен. Теперь отправьте файл .sty.")
                    .await?;
            }
            FlowState::LatexAwaitingSty => {
                if session.is_expired(now) {
                    return self.expire(user, &mut session).await;
                }
                if !has_extension(&file.name, ".sty") {
                    self.responder
                        .send_text(user, "Нужен файл с расширением .sty. Отправьте его вторым.")
                        .await?;
                    return Ok(());
                }
                if file.size > MAX_FILE_SIZE {
                    self.responder
                        .send_text(user, "Файл слишком большой: допустимо не более 25 МБ.")
                        .await?;
                    return Ok(());
                }

                session.files.insert(FileSlot::Sty, file);
                if session.doc_type.is_some() {
                    self.run_validation(user, &mut session, DocKind::Latex).await?;
                } else {
                    session.state = FlowState::LatexAwaitingType;
                    session.rearm(now);
                    self.responder
                        .send_text(
                            user,
                            &format!("Файлы приняты. Укажите тип документа.\n{}", self.doc_types_text()),
                        )
                        .await?;
                }
            }
            FlowState::DocxAwaitingType | FlowState::LatexAwaitingType => {
                self.responder
                    .send_text(user, "Сейчас я жду название типа документа текстом.")
                    .await?;
            }
        }
        Ok(())
    }

    /// Входящий свободный текст.
    pub async fn handle_text(&self, user: UserId, text: &str) -> Result<(), ReplyError> {
        let slot = self.sessions.entry(user).await;
        let mut session = slot.lock().await;
        let now = Utc::now();

        match session.state {
            FlowState::DocxAwaitingType | FlowState::LatexAwaitingType => {
                if session.is_expired(now) {
                    return self.expire(user, &mut session).await;
                }

                let normalized = normalize_doc_type(text);
                if !self.is_known_type(&normalized) {
                    // Каждый переспрос открывает новое окно ожидания
                    session.rearm(now);
                    self.responder
                        .send_text(
                            user,
                            &format!(
                                "Неизвестный тип документа «{}».\n{}",
                                text.trim(),
                                self.doc_types_text()
                            ),
                        )
                        .await?;
                    return Ok(());
                }

                session.set_doc_type(normalized);
                let kind = session.state.kind().unwrap_or(DocKind::Docx);
                self.run_validation(user, &mut session, kind).await?;
            }
            FlowState::DocxAwaitingFile => {
                self.responder
                    .send_text(user, "Сейчас я жду файл .docx.")
                    .await?;
            }
            FlowState::LatexAwaitingTex => {
                self.responder
                    .send_text(user, "Сейчас я жду файл .tex.")
                    .await?;
            }
            FlowState::LatexAwaitingSty => {
                self.responder
                    .send_text(user, "Сейчас я жду файл .sty.")
                    .await?;
            }
            FlowState::Idle => {
                self.responder
                    .send_text(user, "Я понимаю только команды. Посмотрите /help.")
                    .await?;
            }
        }
        Ok(())
    }

    async fn expire(
        &self,
        user: UserId,
        session: &mut DialogSession,
    ) -> Result<(), ReplyError> {
        log::info!("⌛ Сессия пользователя {user} истекла");
        session.reset();
        self.responder
            .send_text(
                user,
                "Сессия истекла. Начните проверку заново: /check_docx или /check_latex.",
            )
            .await?;
        Ok(())
    }

    /// Общий подпроцесс проверки. Диалог завершается при любом исходе:
    /// повторов на месте нет, после ошибки пользователь начинает заново.
    async fn run_validation(
        &self,
        user: UserId,
        session: &mut DialogSession,
        kind: DocKind,
    ) -> Result<(), ReplyError> {
        let Some(doc_type) = session.doc_type.clone() else {
            log::error!("🚨 Проверка без типа документа у пользователя {user}");
            session.reset();
            self.responder
                .send_text(user, "Внутренняя ошибка диалога. Начните проверку заново.")
                .await?;
            return Ok(());
        };

        let result = match kind {
            DocKind::Docx => self.validate_docx(user, session, &doc_type).await?,
            DocKind::Latex => self.validate_latex(user, session, &doc_type).await?,
        };
        session.reset();

        if let Some(result) = result {
            log::info!(
                "✅ Проверка {kind:?} для {user} завершена: valid={}, ошибок: {}",
                result.valid,
                result.errors.len()
            );
            let rendered = render_validation_result(kind, &result);
            for chunk in split_into_chunks(&rendered, MAX_MESSAGE_LEN) {
                self.responder.send_text(user, &chunk).await?;
            }
        }
        Ok(())
    }

    async fn validate_docx(
        &self,
        user: UserId,
        session: &DialogSession,
        doc_type: &str,
    ) -> Result<Option<ValidationResult>, ReplyError> {
        let Some(file) = session.files.get(&FileSlot::Document).cloned() else {
            log::error!("🚨 Проверка .docx без файла у пользователя {user}");
            self.responder
                .send_text(user, "Внутренняя ошибка диалога. Начните проверку заново.")
                .await?;
            return Ok(None);
        };

        self.responder
            .send_text(user, "⏳ Загружаем и проверяем .docx документ...")
            .await?;

        let bytes = match self.files.fetch(&file).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("❌ Скачивание файла {} не удалось: {e}", file.name);
                self.responder
                    .send_text(user, &format!("⚠️ {e}. Начните проверку заново."))
                    .await?;
                return Ok(None);
            }
        };

        match self
            .api
            .validate_single_document(bytes, file.name.clone(), doc_type)
            .await
        {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                log::error!("❌ Проверка .docx не удалась: {e}");
                self.responder
                    .send_text(user, &format!("⚠️ Не удалось выполнить проверку: {e}"))
                    .await?;
                Ok(None)
            }
        }
    }

    async fn validate_latex(
        &self,
        user: UserId,
        session: &DialogSession,
        doc_type: &str,
    ) -> Result<Option<ValidationResult>, ReplyError> {
        let (Some(tex), Some(sty)) = (
            session.files.get(&FileSlot::Tex).cloned(),
            session.files.get(&FileSlot::Sty).cloned(),
        ) else {
            log::error!("🚨 Проверка LaTeX без пары файлов у пользователя {user}");
            self.responder
                .send_text(user, "Внутренняя ошибка диалога. Начните проверку заново.")
                .await?;
            return Ok(None);
        };

        self.responder
            .send_text(user, "⏳ Загружаем и проверяем LaTeX-документ...")
            .await?;

        let (tex_bytes, sty_bytes) = match (self.files.fetch(&tex).await, self.files.fetch(&sty).await) {
            (Ok(tex_bytes), Ok(sty_bytes)) => (tex_bytes, sty_bytes),
            (Err(e), _) | (_, Err(e)) => {
                log::error!("❌ Скачивание LaTeX-пары не удалось: {e}");
                self.responder
                    .send_text(user, &format!("⚠️ {e}. Начните проверку заново."))
                    .await?;
                return Ok(None);
            }
        };

        match self
            .api
            .validate_latex_pair(tex_bytes, tex.name.clone(), sty_bytes, sty.name.clone(), doc_type)
            .await
        {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                log::error!("❌ Проверка LaTeX не удалась: {e}");
                self.responder
                    .send_text(user, &format!("⚠️ Не удалось выполнить проверку: {e}"))
                    .await?;
                Ok(None)
            }
        }
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    name.to_lowercase().ends_with(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::{RuleUpdateReply, SESSION_TTL_SECS};
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct StubApi {
        single_calls: Mutex<Vec<(String, String)>>,
        latex_calls: Mutex<Vec<(String, String, String)>>,
        fail_transport: AtomicBool,
        errors: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ValidatorApi for StubApi {
        async fn list_document_types(&self) -> Result<Vec<String>, ApiError> {
            Ok(vec!["diploma".into(), "course_work".into()])
        }

        async fn get_rules(&self, _doc_type: &str) -> Result<Value, ApiError> {
            Ok(json!({}))
        }

        async fn update_rule(
            &self,
            _doc_type: &str,
            _rule_key: &str,
            _new_value: &str,
        ) -> Result<RuleUpdateReply, ApiError> {
            Ok(RuleUpdateReply {
                message: "ok".into(),
                errors: vec![],
            })
        }

        async fn update_rule_for_all(
            &self,
            _rule_key: &str,
            _new_value: &str,
        ) -> Result<RuleUpdateReply, ApiError> {
            Ok(RuleUpdateReply {
                message: "ok".into(),
                errors: vec![],
            })
        }

        async fn validate_single_document(
            &self,
            _bytes: Vec<u8>,
            filename: String,
            doc_type: &str,
        ) -> Result<ValidationResult, ApiError> {
            if self.fail_transport.load(Ordering::SeqCst) {
                return Err(ApiError::Transport("connection refused".into()));
            }
            self.single_calls
                .lock()
                .await
                .push((filename, doc_type.to_string()));
            Ok(ValidationResult {
                valid: true,
                errors: self.errors.lock().await.clone(),
                found: json!({}),
            })
        }

        async fn validate_latex_pair(
            &self,
            _tex_bytes: Vec<u8>,
            tex_name: String,
            _sty_bytes: Vec<u8>,
            sty_name: String,
            doc_type: &str,
        ) -> Result<ValidationResult, ApiError> {
            if self.fail_transport.load(Ordering::SeqCst) {
                return Err(ApiError::Transport("connection refused".into()));
            }
            self.latex_calls
                .lock()
                .await
                .push((tex_name, sty_name, doc_type.to_string()));
            Ok(ValidationResult {
                valid: true,
                errors: vec![],
                found: json!({}),
            })
        }
    }

    struct StubFetcher {
        fail: bool,
    }

    #[async_trait]
    impl FileFetcher for StubFetcher {
        async fn fetch(&self, _file: &FileRef) -> Result<Vec<u8>, FetchError> {
            if self.fail {
                Err(FetchError("file expired".into()))
            } else {
                Ok(vec![0x50, 0x4b, 0x03, 0x04])
            }
        }
    }

    #[derive(Default)]
    struct RecordingResponder {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingResponder {
        async fn joined(&self) -> String {
            self.sent.lock().await.join("\n---\n")
        }
    }

    #[async_trait]
    impl ChatResponder for RecordingResponder {
        async fn send_text(&self, _user: UserId, text: &str) -> Result<(), ReplyError> {
            self.sent.lock().await.push(text.to_string());
            Ok(())
        }
    }

    const USER: UserId = UserId(42);

    fn doc(name: &str, size: u32) -> FileRef {
        FileRef {
            id: format!("file-{name}"),
            name: name.to_string(),
            size,
        }
    }

    fn make_engine() -> (Arc<StubApi>, Arc<RecordingResponder>, ConversationEngine) {
        make_engine_with(StubApi::default(), StubFetcher { fail: false })
    }

    fn make_engine_with(
        api: StubApi,
        fetcher: StubFetcher,
    ) -> (Arc<StubApi>, Arc<RecordingResponder>, ConversationEngine) {
        let api = Arc::new(api);
        let responder = Arc::new(RecordingResponder::default());
        let engine = ConversationEngine::new(
            SessionStore::new(),
            api.clone(),
            Arc::new(fetcher),
            responder.clone(),
            vec![
                "diploma".to_string(),
                "course_work".to_string(),
                "practice_report".to_string(),
            ],
        );
        (api, responder, engine)
    }

    async fn state_of(engine: &ConversationEngine, user: UserId) -> FlowState {
        engine.sessions.entry(user).await.lock().await.state
    }

    async fn backdate(engine: &ConversationEngine, user: UserId, secs: i64) {
        let slot = engine.sessions.entry(user).await;
        slot.lock().await.started_at = Some(Utc::now() - Duration::seconds(secs));
    }

    #[tokio::test]
    async fn docx_with_inline_type_validates_on_first_file() {
        let (api, responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Docx, "diploma").await.unwrap();
        engine
            .handle_document(USER, doc("report.docx", 10 * 1024 * 1024))
            .await
            .unwrap();

        let calls = api.single_calls.lock().await;
        assert_eq!(calls.as_slice(), &[("report.docx".to_string(), "diploma".to_string())]);
        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);

        let sent = responder.joined().await;
        assert!(sent.contains("Правильное оформление: Да ✅"));
    }

    #[tokio::test]
    async fn unknown_inline_type_enters_no_flow() {
        let (api, responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Docx, "thesis").await.unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);
        assert!(api.single_calls.lock().await.is_empty());
        let sent = responder.joined().await;
        assert!(sent.contains("Неизвестный тип документа «thesis»"));
        assert!(sent.contains("- diploma"));
    }

    #[tokio::test]
    async fn wrong_extension_keeps_state() {
        let (api, responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Docx, "").await.unwrap();
        engine
            .handle_document(USER, doc("report.txt", 1024))
            .await
            .unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::DocxAwaitingFile);
        assert!(api.single_calls.lock().await.is_empty());
        assert!(responder.joined().await.contains("расширением .docx"));
    }

    #[tokio::test]
    async fn oversized_file_keeps_state() {
        let (api, responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Docx, "diploma").await.unwrap();
        engine
            .handle_document(USER, doc("report.docx", MAX_FILE_SIZE + 1))
            .await
            .unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::DocxAwaitingFile);
        assert!(api.single_calls.lock().await.is_empty());
        assert!(responder.joined().await.contains("не более 25 МБ"));
    }

    #[tokio::test]
    async fn expired_file_wait_resets_without_validation() {
        let (api, responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Docx, "diploma").await.unwrap();
        backdate(&engine, USER, SESSION_TTL_SECS + 1).await;
        engine
            .handle_document(USER, doc("report.docx", 1024))
            .await
            .unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);
        assert!(api.single_calls.lock().await.is_empty());
        assert!(responder.joined().await.contains("Сессия истекла"));
    }

    #[tokio::test]
    async fn expired_type_wait_resets_even_for_valid_answer() {
        let (api, _responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Docx, "").await.unwrap();
        engine
            .handle_document(USER, doc("report.docx", 1024))
            .await
            .unwrap();
        assert_eq!(state_of(&engine, USER).await, FlowState::DocxAwaitingType);

        backdate(&engine, USER, SESSION_TTL_SECS + 1).await;
        engine.handle_text(USER, "diploma").await.unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);
        assert!(api.single_calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn doc_type_asked_afterwards_is_normalized() {
        let (api, _responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Docx, "").await.unwrap();
        engine
            .handle_document(USER, doc("report.docx", 1024))
            .await
            .unwrap();
        engine.handle_text(USER, "Course Work").await.unwrap();

        let calls = api.single_calls.lock().await;
        assert_eq!(
            calls.as_slice(),
            &[("report.docx".to_string(), "course_work".to_string())]
        );
        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);
    }

    #[tokio::test]
    async fn invalid_type_answer_reprompts_and_rearms_the_clock() {
        let (_api, responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Docx, "").await.unwrap();
        engine
            .handle_document(USER, doc("report.docx", 1024))
            .await
            .unwrap();

        backdate(&engine, USER, 100).await;
        engine.handle_text(USER, "thesis").await.unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::DocxAwaitingType);
        assert!(responder.joined().await.contains("Неизвестный тип документа «thesis»"));

        let started_at = engine
            .sessions
            .entry(USER)
            .await
            .lock()
            .await
            .started_at
            .expect("clock must be re-armed");
        assert!(Utc::now() - started_at < Duration::seconds(5));
    }

    #[tokio::test]
    async fn latex_pair_flow_issues_one_combined_call() {
        let (api, _responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Latex, "").await.unwrap();
        engine.handle_document(USER, doc("main.tex", 2048)).await.unwrap();
        assert_eq!(state_of(&engine, USER).await, FlowState::LatexAwaitingSty);

        engine
            .handle_document(USER, doc("settings.sty", 512))
            .await
            .unwrap();
        assert_eq!(state_of(&engine, USER).await, FlowState::LatexAwaitingType);

        engine.handle_text(USER, "diploma").await.unwrap();

        let calls = api.latex_calls.lock().await;
        assert_eq!(
            calls.as_slice(),
            &[(
                "main.tex".to_string(),
                "settings.sty".to_string(),
                "diploma".to_string()
            )]
        );
        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);
    }

    #[tokio::test]
    async fn sty_before_tex_is_rejected() {
        let (api, responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Latex, "diploma").await.unwrap();
        engine
            .handle_document(USER, doc("settings.sty", 512))
            .await
            .unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::LatexAwaitingTex);
        assert!(api.latex_calls.lock().await.is_empty());
        assert!(responder.joined().await.contains("расширением .tex"));
    }

    #[tokio::test]
    async fn latex_with_inline_type_validates_after_sty() {
        let (api, _responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Latex, "diploma").await.unwrap();
        engine.handle_document(USER, doc("main.tex", 2048)).await.unwrap();
        engine
            .handle_document(USER, doc("settings.sty", 512))
            .await
            .unwrap();

        assert_eq!(api.latex_calls.lock().await.len(), 1);
        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);
    }

    #[tokio::test]
    async fn transport_error_is_reported_and_resets_the_flow() {
        let api = StubApi::default();
        api.fail_transport.store(true, Ordering::SeqCst);
        let (_api, responder, engine) = make_engine_with(api, StubFetcher { fail: false });

        engine.start_flow(USER, DocKind::Docx, "diploma").await.unwrap();
        engine
            .handle_document(USER, doc("report.docx", 1024))
            .await
            .unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);
        let sent = responder.joined().await;
        assert!(sent.contains("Не удалось выполнить проверку"));
        assert!(sent.contains("connection refused"));
    }

    #[tokio::test]
    async fn fetch_error_is_reported_and_resets_the_flow() {
        let (_api, responder, engine) =
            make_engine_with(StubApi::default(), StubFetcher { fail: true });

        engine.start_flow(USER, DocKind::Docx, "diploma").await.unwrap();
        engine
            .handle_document(USER, doc("report.docx", 1024))
            .await
            .unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);
        assert!(responder.joined().await.contains("не удалось получить файл"));
    }

    #[tokio::test]
    async fn restarting_a_flow_discards_previous_progress() {
        let (_api, _responder, engine) = make_engine();

        engine.start_flow(USER, DocKind::Latex, "").await.unwrap();
        engine.handle_document(USER, doc("main.tex", 2048)).await.unwrap();
        assert_eq!(state_of(&engine, USER).await, FlowState::LatexAwaitingSty);

        engine.start_flow(USER, DocKind::Docx, "diploma").await.unwrap();

        let slot = engine.sessions.entry(USER).await;
        let session = slot.lock().await;
        assert_eq!(session.state, FlowState::DocxAwaitingFile);
        assert!(session.files.is_empty());
        assert_eq!(session.doc_type.as_deref(), Some("diploma"));
    }

    #[tokio::test]
    async fn stray_events_in_idle_only_hint() {
        let (_api, responder, engine) = make_engine();

        engine
            .handle_document(USER, doc("report.docx", 1024))
            .await
            .unwrap();
        engine.handle_text(USER, "привет").await.unwrap();

        assert_eq!(state_of(&engine, USER).await, FlowState::Idle);
        let sent = responder.joined().await;
        assert!(sent.contains("/check_docx"));
        assert!(sent.contains("/help"));
    }

    #[tokio::test]
    async fn long_result_is_chunked() {
        let api = StubApi::default();
        // Один гигантский текст ошибки растягивает отчёт за предел 4096
        *api.errors.lock().await = vec!["x".repeat(9000)];
        let (_api, responder, engine) = make_engine_with(api, StubFetcher { fail: false });

        engine.start_flow(USER, DocKind::Docx, "diploma").await.unwrap();
        engine
            .handle_document(USER, doc("report.docx", 1024))
            .await
            .unwrap();

        let sent = responder.sent.lock().await;
        // приглашение + прогресс + минимум три куска отчёта
        let chunks: Vec<_> = sent.iter().filter(|m| m.chars().count() == MAX_MESSAGE_LEN).collect();
        assert!(!chunks.is_empty());
        assert!(sent.iter().all(|m| m.chars().count() <= MAX_MESSAGE_LEN));
    }
}
