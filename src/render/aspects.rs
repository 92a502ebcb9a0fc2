//! Таблицы аспектов проверки: имя, шаблоны ошибок, извлечение деталей.
//!
//! Статусы аспектов выводятся из текстов ошибок сервиса, поэтому шаблоны —
//! это конфигурация, завязанная на формулировки сервиса. Меняются
//! формулировки — правится только этот файл.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

pub type DetailFn = fn(&Value) -> String;

pub struct Aspect {
    pub name: &'static str,
    patterns: Vec<Regex>,
    pub detail: Option<DetailFn>,
}

impl Aspect {
    fn new(name: &'static str, patterns: &[&str], detail: Option<DetailFn>) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .expect("static aspect pattern")
            })
            .collect();
        Self {
            name,
            patterns,
            detail,
        }
    }

    /// Аспект провален, если хотя бы одна ошибка совпала с любым шаблоном.
    pub fn is_failed(&self, errors: &[String]) -> bool {
        errors
            .iter()
            .any(|err| self.patterns.iter().any(|p| p.is_match(err)))
    }
}

const NONE_PLACEHOLDER: &str = "нет";

/// Спуск по вложенным ключам `found`; любой промах — `None`.
fn dig<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut node = value;
    for key in path {
        node = node.get(key)?;
    }
    Some(node)
}

/// Список строк по пути, "нет" для пустого/отсутствующего/кривого узла.
fn str_list(value: &Value, path: &[&str]) -> String {
    let items: Vec<&str> = dig(value, path)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if items.is_empty() {
        NONE_PLACEHOLDER.to_string()
    } else {
        items.join(", ")
    }
}

/// То же для списков объектов с полем "label".
fn label_list(value: &Value, path: &[&str]) -> String {
    let items: Vec<&str> = dig(value, path)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("label").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();
    if items.is_empty() {
        NONE_PLACEHOLDER.to_string()
    } else {
        items.join(", ")
    }
}

fn count_at(value: &Value, path: &[&str]) -> usize {
    dig(value, path)
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

fn chapters_detail(found: &Value) -> String {
    format!(
        "Главы:\n- Ненумерованные: {}\n- Нумерованные: {}",
        str_list(found, &["structure", "unnumbered_chapters"]),
        str_list(found, &["structure", "numbered_chapters"]),
    )
}

fn docx_pictures_detail(found: &Value) -> String {
    format!(
        "Найденные рисунки:\n- Подписи: {}\n- Ссылки в тексте: {}",
        str_list(found, &["pictures", "caption"]),
        str_list(found, &["pictures", "ref"]),
    )
}

fn docx_tables_detail(found: &Value) -> String {
    format!(
        "Найденные таблицы:\n- Подписи: {}\n- Ссылки в тексте: {}",
        str_list(found, &["tables", "caption"]),
        str_list(found, &["tables", "ref"]),
    )
}

fn docx_appendices_detail(found: &Value) -> String {
    format!(
        "Найденные приложения:\n- Заголовки: {}\n- Ссылки в тексте: {}",
        str_list(found, &["appendices", "title"]),
        str_list(found, &["appendices", "ref"]),
    )
}

fn docx_bibliography_detail(found: &Value) -> String {
    format!(
        "Найденные источники:\n- Элементы списка: {}\n- Ссылки в тексте: {}",
        str_list(found, &["bibliography", "items"]),
        str_list(found, &["bibliography", "cite_keys"]),
    )
}

fn latex_sections_detail(found: &Value) -> String {
    format!(
        "Разделы:\n- 1 глава: нумерованные: {}, ненумерованные: {}\n- 2 глава: нумерованные: {}, ненумерованные: {}",
        str_list(found, &["structure", "numbered_sections", "1 глава"]),
        str_list(found, &["structure", "unnumbered_sections", "1 глава"]),
        str_list(found, &["structure", "numbered_sections", "2 глава"]),
        str_list(found, &["structure", "unnumbered_sections", "2 глава"]),
    )
}

fn latex_lists_detail(found: &Value) -> String {
    format!(
        "Найденные списки:\n- Нумерованные (буквы): {}\n- Нумерованные (цифры): {}\n- Маркированные (дефис): {}",
        count_at(found, &["lists", "enumasbuk"]),
        count_at(found, &["lists", "enumarabic"]),
        count_at(found, &["lists", "enummarker"]),
    )
}

fn latex_pictures_detail(found: &Value) -> String {
    format!(
        "Найденные рисунки:\n- Метки объектов: {}\n- Ссылки в тексте: {}",
        label_list(found, &["pictures", "labels"]),
        label_list(found, &["pictures", "refs"]),
    )
}

fn latex_tables_detail(found: &Value) -> String {
    format!(
        "Найденные таблицы:\n- Метки объектов: {}\n- Ссылки в тексте: {}",
        label_list(found, &["tables", "tables", "labels"]),
        label_list(found, &["tables", "tables", "refs"]),
    )
}

fn latex_appendices_detail(found: &Value) -> String {
    format!(
        "Найденные приложения:\n- Заголовки: {}\n- Ссылки в тексте: {}",
        str_list(found, &["appendices", "titles"]),
        str_list(found, &["appendices", "refs"]),
    )
}

fn latex_bibliography_detail(found: &Value) -> String {
    format!(
        "Найденные источники:\n- Элементы списка: {}\n- Ссылки в тексте: {}",
        str_list(found, &["bibliography", "bibliography_items"]),
        str_list(found, &["bibliography", "cite_keys"]),
    )
}

pub static DOCX_ASPECTS: Lazy<Vec<Aspect>> = Lazy::new(|| {
    vec![
        Aspect::new(
            "Необходимые главы",
            &["Не найдена обязательная глава"],
            Some(chapters_detail),
        ),
        Aspect::new("Необходимые разделы", &["В главе"], None),
        Aspect::new(
            "Цель выделена жирным",
            &["Во введении не найдено ключевое слово или словосочетание: 'цель'"],
            None,
        ),
        Aspect::new(
            "Задачи выделены жирным",
            &["Во введении не найдено ключевое слово или словосочетание: 'задачи'"],
            None,
        ),
        Aspect::new(
            "Актуальность жирным",
            &["Во введении не найдено ключевое слово или словосочетание: 'актуальн'"],
            None,
        ),
        Aspect::new(
            "Объект выделен жирным",
            &["Во введении не найдено ключевое слово или словосочетание: 'объект'"],
            None,
        ),
        Aspect::new(
            "Предмет выделен жирным",
            &["Во введении не найдено ключевое слово или словосочетание: 'предмет'"],
            None,
        ),
        Aspect::new(
            "Новизна выделена жирным",
            &["Во введении не найдено ключевое слово или словосочетание: 'новизн'"],
            None,
        ),
        Aspect::new(
            "Практич. значимость жирным",
            &["Во введении не найдено ключевое слово или словосочетание: 'практическая значимость'"],
            None,
        ),
        Aspect::new(
            "Рисунки и ссылки на них",
            &[
                "Есть подпись к рисунку",
                "Есть ссылка на рисунок",
                "В подписи к рисунку ",
            ],
            Some(docx_pictures_detail),
        ),
        Aspect::new(
            "Таблицы и ссылки на них",
            &[
                "Есть ссылка на таблицу ",
                "Есть подпись к таблице ",
                "Нет ссылки на longtable",
                "Нет longtable",
            ],
            Some(docx_tables_detail),
        ),
        Aspect::new(
            "Приложения и ссылки на них",
            &["Есть ссылка на приложение", "Приложение"],
            Some(docx_appendices_detail),
        ),
        Aspect::new(
            "Источники и ссылки на них",
            &["В тексте есть ссылка на источник", "Источник"],
            Some(docx_bibliography_detail),
        ),
        Aspect::new(
            "Шрифт всего документа соответствует требованиям",
            &["Неверный размер шрифта"],
            None,
        ),
    ]
});

pub static LATEX_ASPECTS: Lazy<Vec<Aspect>> = Lazy::new(|| {
    vec![
        Aspect::new(
            "Необходимые главы",
            &[
                "Отсутствует обязательная глава",
                r"Ошибка: после \\chapter",
                "Ошибка: титульный лист",
                r"Ошибка: отсутствует \\tableofcontents",
            ],
            Some(chapters_detail),
        ),
        Aspect::new(
            "Необходимые разделы",
            &["В главе"],
            Some(latex_sections_detail),
        ),
        Aspect::new(
            "Цель выделена жирным",
            &["Не удалось найти текст введения", "цель"],
            None,
        ),
        Aspect::new(
            "Задачи выделены жирным",
            &["Не удалось найти текст введения", "задачи"],
            None,
        ),
        Aspect::new(
            "Актуальность жирным",
            &["Не удалось найти текст введения", "актуальн"],
            None,
        ),
        Aspect::new(
            "Объект выделен жирным",
            &["Не удалось найти текст введения", "объект"],
            None,
        ),
        Aspect::new(
            "Предмет выделен жирным",
            &["Не удалось найти текст введения", "предмет"],
            None,
        ),
        Aspect::new(
            "Новизна выделена жирным",
            &["Не удалось найти текст введения", "новизн"],
            None,
        ),
        Aspect::new(
            "Практич. значимость жирным",
            &["Не удалось найти текст введения", "практическая значимость"],
            None,
        ),
        Aspect::new("Нет лишнего жирного", &["жирный"], None),
        Aspect::new("Нет курсива", &["курсив"], None),
        Aspect::new("Нет подчеркиваний", &["подчёркивание"], None),
        Aspect::new(
            "Списки оформлены корректно",
            &[
                "Пункт списка",
                "Вводная часть перед списком",
                "во вложенном списке",
                "вложенного списка",
            ],
            Some(latex_lists_detail),
        ),
        Aspect::new(
            "Рисунки и ссылки на них",
            &["Нет ссылки на рисунок", "Нет рисунка"],
            Some(latex_pictures_detail),
        ),
        Aspect::new(
            "Таблицы и ссылки на них",
            &[
                "Нет ссылки на table",
                "Нет table",
                "Нет ссылки на longtable",
                "Нет longtable",
            ],
            Some(latex_tables_detail),
        ),
        Aspect::new(
            "Приложения и ссылки на них",
            &["приложение"],
            Some(latex_appendices_detail),
        ),
        Aspect::new(
            "Источники и ссылки на них",
            &["библиографии"],
            Some(latex_bibliography_detail),
        ),
        Aspect::new(
            "Ссылки находятся до рисунка/таблицы",
            &["находится после"],
            None,
        ),
        Aspect::new(
            "Ссылки на той же/соседней странице от рис./табл.",
            &[
                "Слишком большое расстояние",
                "на той же или следующей странице",
            ],
            None,
        ),
        Aspect::new("Кавычки верные", &["Найдены недопустимые кавычки"], None),
        Aspect::new(
            "Файл settings.sty соответствует требованиям",
            &["Файл settings.sty", "Несовпадение в settings.sty"],
            None,
        ),
    ]
});
