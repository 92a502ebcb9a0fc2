//! Превращение результата проверки в читаемый текст для чата.

mod aspects;

pub use aspects::{Aspect, DOCX_ASPECTS, LATEX_ASPECTS};

use crate::models::{DocKind, ValidationResult};

/// Лимит Telegram на одно сообщение.
pub const MAX_MESSAGE_LEN: usize = 4096;

pub fn render_validation_result(kind: DocKind, result: &ValidationResult) -> String {
    let (title, aspects): (&str, &[Aspect]) = match kind {
        DocKind::Docx => ("Результат проверки .docx-документа", &DOCX_ASPECTS),
        DocKind::Latex => ("Результат проверки LaTeX-документа", &LATEX_ASPECTS),
    };
    let overall = if result.valid { "Да ✅" } else { "Нет ❌" };

    let mut text = format!(
        "📋 {title}\n\n💬 Правильное оформление: {overall}\n\n🔎 Детали проверки:\n"
    );

    for aspect in aspects {
        let status = if aspect.is_failed(&result.errors) {
            "Нет ❌"
        } else {
            "Да ✅"
        };
        match aspect.detail {
            Some(detail) => {
                text.push_str(&format!(
                    "🔹{} — {}\n{}\n\n",
                    aspect.name,
                    status,
                    detail(&result.found)
                ));
            }
            None => text.push_str(&format!("🔹{}: {}\n\n", aspect.name, status)),
        }
    }

    text.push_str("⚠️ Обнаруженные ошибки:\n\n");
    if result.errors.is_empty() {
        text.push_str("Ошибок не найдено😊");
    } else {
        for err in &result.errors {
            text.push_str(&format!("📌 {err}\n\n"));
        }
    }

    text
}

/// Режет текст на куски не длиннее `max_chars` символов. Граница куска —
/// чисто позиционная, середина строки аспекта — допустимое место разреза.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for ch in text.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clean_result() -> ValidationResult {
        ValidationResult {
            valid: true,
            errors: vec![],
            found: json!({}),
        }
    }

    #[test]
    fn clean_result_passes_every_aspect() {
        for kind in [DocKind::Docx, DocKind::Latex] {
            let text = render_validation_result(kind, &clean_result());
            assert!(text.contains("Правильное оформление: Да ✅"));
            assert!(text.contains("Ошибок не найдено😊"));
            assert!(!text.contains("Нет ❌"));
        }
    }

    #[test]
    fn italic_error_fails_only_the_italic_aspect() {
        let result = ValidationResult {
            valid: true,
            errors: vec!["В тексте найден курсив".to_string()],
            found: json!({}),
        };
        let text = render_validation_result(DocKind::Latex, &result);

        assert!(text.contains("🔹Нет курсива: Нет ❌"));
        // Единственный провалившийся аспект
        assert_eq!(text.matches("Нет ❌").count(), 1);
        assert!(text.contains("📌 В тексте найден курсив"));
    }

    #[test]
    fn invalid_flag_only_changes_the_header() {
        let result = ValidationResult {
            valid: false,
            errors: vec![],
            found: json!({}),
        };
        let text = render_validation_result(DocKind::Docx, &result);
        assert!(text.contains("Правильное оформление: Нет ❌"));
        // Аспекты выводятся из ошибок, а не из общего флага
        assert_eq!(text.matches("Нет ❌").count(), 1);
    }

    #[test]
    fn docx_font_error_fails_the_font_aspect() {
        let result = ValidationResult {
            valid: false,
            errors: vec!["Неверный размер шрифта: 12 вместо 14".to_string()],
            found: json!({}),
        };
        let text = render_validation_result(DocKind::Docx, &result);
        assert!(text.contains("🔹Шрифт всего документа соответствует требованиям: Нет ❌"));
    }

    #[test]
    fn malformed_found_renders_placeholders() {
        let result = ValidationResult {
            valid: true,
            errors: vec![],
            found: json!({"pictures": "not-an-object", "structure": 42}),
        };
        let text = render_validation_result(DocKind::Latex, &result);
        assert!(text.contains("- Нумерованные: нет"));
        assert!(text.contains("- Метки объектов: нет"));
    }

    #[test]
    fn found_details_are_listed() {
        let result = ValidationResult {
            valid: true,
            errors: vec![],
            found: json!({
                "structure": {
                    "unnumbered_chapters": ["ВВЕДЕНИЕ", "ЗАКЛЮЧЕНИЕ"],
                    "numbered_chapters": ["1", "2"]
                }
            }),
        };
        let text = render_validation_result(DocKind::Docx, &result);
        assert!(text.contains("- Ненумерованные: ВВЕДЕНИЕ, ЗАКЛЮЧЕНИЕ"));
        assert!(text.contains("- Нумерованные: 1, 2"));
    }

    #[test]
    fn chunks_cover_text_exactly() {
        // Кириллица: деление обязано идти по символам, не по байтам
        let text = "ф".repeat(10_000);
        let chunks = split_into_chunks(&text, MAX_MESSAGE_LEN);

        assert_eq!(chunks.len(), 10_000_usize.div_ceil(MAX_MESSAGE_LEN));
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_MESSAGE_LEN));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_into_chunks("привет", MAX_MESSAGE_LEN);
        assert_eq!(chunks, vec!["привет".to_string()]);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let text = "a".repeat(MAX_MESSAGE_LEN * 2);
        let chunks = split_into_chunks(&text, MAX_MESSAGE_LEN);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(split_into_chunks("", MAX_MESSAGE_LEN).is_empty());
    }
}
