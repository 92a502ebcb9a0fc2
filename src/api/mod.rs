use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{RuleUpdateReply, ValidationResult};

const RETRIES: u32 = 2;

/// Запасной набор типов, если сервис недоступен на старте.
pub const DEFAULT_DOC_TYPES: [&str; 3] = ["diploma", "course_work", "practice_report"];

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const TEX_MIME: &str = "application/x-tex";
const STY_MIME: &str = "application/x-sty";

/// Любой сбой при обращении к сервису проверки сводится к одному из этих
/// вариантов; наружу он уходит сообщением пользователю, а не паникой.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("сервис проверки недоступен: {0}")]
    Transport(String),
    #[error("сервис проверки вернул статус {0}")]
    Status(u16),
    #[error("не удалось разобрать ответ сервиса: {0}")]
    Decode(String),
    #[error("{0}")]
    Service(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

impl From<reqwest_middleware::Error> for ApiError {
    fn from(err: reqwest_middleware::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait ValidatorApi: Send + Sync {
    async fn list_document_types(&self) -> Result<Vec<String>, ApiError>;

    async fn get_rules(&self, doc_type: &str) -> Result<Value, ApiError>;

    async fn update_rule(
        &self,
        doc_type: &str,
        rule_key: &str,
        new_value: &str,
    ) -> Result<RuleUpdateReply, ApiError>;

    async fn update_rule_for_all(
        &self,
        rule_key: &str,
        new_value: &str,
    ) -> Result<RuleUpdateReply, ApiError>;

    async fn validate_single_document(
        &self,
        bytes: Vec<u8>,
        filename: String,
        doc_type: &str,
    ) -> Result<ValidationResult, ApiError>;

    async fn validate_latex_pair(
        &self,
        tex_bytes: Vec<u8>,
        tex_name: String,
        sty_bytes: Vec<u8>,
        sty_name: String,
        doc_type: &str,
    ) -> Result<ValidationResult, ApiError>;
}

/// Сырой ответ эндпоинтов проверки: сервис может вернуть либо результат,
/// либо маркер ошибки обработки.
#[derive(Debug, Deserialize)]
struct RawValidationReply {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default = "default_valid")]
    valid: bool,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    found: Value,
}

fn default_valid() -> bool {
    true
}

pub struct ValidationClient {
    base_url: String,
    /// GET и form-запросы идут через retry-middleware.
    http: ClientWithMiddleware,
    /// Multipart-тело нельзя повторить, загрузки идут без повторов.
    upload: Client,
}

impl ValidationClient {
    pub fn new(base_url: String) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(RETRIES);
        let http = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            upload: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode_validation(response: reqwest::Response) -> Result<ValidationResult, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let raw: RawValidationReply =
            serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;

        if let Some(error) = raw.error {
            let detail = match raw.details {
                Some(details) => format!("{error}: {details}"),
                None => error,
            };
            return Err(ApiError::Service(detail));
        }

        Ok(ValidationResult {
            valid: raw.valid,
            errors: raw.errors,
            found: raw.found,
        })
    }

    async fn decode_rule_reply(response: reqwest::Response) -> Result<RuleUpdateReply, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        response
            .json::<RuleUpdateReply>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ValidatorApi for ValidationClient {
    async fn list_document_types(&self) -> Result<Vec<String>, ApiError> {
        let response = self
            .http
            .get(self.url("/api/documents/options"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        // Сервис отдаёт либо список имён, либо список объектов {name}.
        let mut types = Vec::new();
        for entry in body.as_array().cloned().unwrap_or_default() {
            match entry {
                Value::String(name) => types.push(name),
                Value::Object(map) => {
                    if let Some(name) = map.get("name").and_then(Value::as_str) {
                        types.push(name.to_string());
                    }
                }
                _ => {}
            }
        }
        log::debug!("Получены типы документов: {types:?}");
        Ok(types)
    }

    async fn get_rules(&self, doc_type: &str) -> Result<Value, ApiError> {
        let response = self
            .http
            .get(self.url(&format!("/api/rules/{doc_type}")))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn update_rule(
        &self,
        doc_type: &str,
        rule_key: &str,
        new_value: &str,
    ) -> Result<RuleUpdateReply, ApiError> {
        let response = self
            .http
            .post(self.url("/api/rules/update"))
            .form(&[
                ("doc_type", doc_type),
                ("rule_key", rule_key),
                ("new_value", new_value),
            ])
            .send()
            .await?;

        log::info!("Изменено правило {rule_key} для {doc_type}");
        Self::decode_rule_reply(response).await
    }

    async fn update_rule_for_all(
        &self,
        rule_key: &str,
        new_value: &str,
    ) -> Result<RuleUpdateReply, ApiError> {
        let response = self
            .http
            .post(self.url("/api/rules/update/all"))
            .query(&[("rule_key", rule_key), ("new_value", new_value)])
            .send()
            .await?;

        Self::decode_rule_reply(response).await
    }

    async fn validate_single_document(
        &self,
        bytes: Vec<u8>,
        filename: String,
        doc_type: &str,
    ) -> Result<ValidationResult, ApiError> {
        let part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str(DOCX_MIME)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let form = Form::new()
            .text("doc_type", doc_type.to_string())
            .part("file", part);

        let response = self
            .upload
            .post(self.url("/api/documents/validate/single_file"))
            .multipart(form)
            .send()
            .await?;

        Self::decode_validation(response).await
    }

    async fn validate_latex_pair(
        &self,
        tex_bytes: Vec<u8>,
        tex_name: String,
        sty_bytes: Vec<u8>,
        sty_name: String,
        doc_type: &str,
    ) -> Result<ValidationResult, ApiError> {
        let tex_part = Part::bytes(tex_bytes)
            .file_name(tex_name)
            .mime_str(TEX_MIME)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let sty_part = Part::bytes(sty_bytes)
            .file_name(sty_name)
            .mime_str(STY_MIME)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let form = Form::new()
            .text("doc_type", doc_type.to_string())
            .part("tex_file", tex_part)
            .part("sty_file", sty_part);

        let response = self
            .upload
            .post(self.url("/api/documents/validate/latex"))
            .multipart(form)
            .send()
            .await?;

        Self::decode_validation(response).await
    }
}
