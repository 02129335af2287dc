//! Каталог: категории, товары и FAQ.

use rusqlite::{params, OptionalExtension, Result};
use rust_decimal::Decimal;

use crate::core::config;
use crate::storage::db::{decimal_column, DbConnection};

/// Категория каталога. Двухуровневая иерархия: `parent_id = NULL`
/// для корневых категорий.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Товар каталога.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: i64,
}

/// Вопрос-ответ из раздела FAQ.
#[derive(Debug, Clone)]
pub struct FaqEntry {
    pub id: i64,
    pub question: String,
    pub answer: String,
}

fn map_category(row: &rusqlite::Row<'_>) -> Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
    })
}

fn map_product(row: &rusqlite::Row<'_>) -> Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: decimal_column(row, 3)?,
        category_id: row.get(4)?,
    })
}

/// Возвращает активные корневые категории, отсортированные для показа.
pub fn fetch_root_categories(conn: &DbConnection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, parent_id FROM categories
         WHERE parent_id IS NULL AND is_active = 1
         ORDER BY sort_order, name",
    )?;
    let rows = stmt.query_map([], map_category)?;
    rows.collect()
}

/// Возвращает активные подкатегории указанной категории.
pub fn fetch_subcategories(conn: &DbConnection, parent_id: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, parent_id FROM categories
         WHERE parent_id = ?1 AND is_active = 1
         ORDER BY sort_order, name",
    )?;
    let rows = stmt.query_map(params![parent_id], map_category)?;
    rows.collect()
}

/// Получает категорию по ID (включая неактивные — для хлебных крошек).
pub fn fetch_category(conn: &DbConnection, category_id: i64) -> Result<Option<Category>> {
    conn.query_row(
        "SELECT id, name, parent_id FROM categories WHERE id = ?1",
        params![category_id],
        map_category,
    )
    .optional()
}

/// Возвращает активные товары категории.
pub fn fetch_products(conn: &DbConnection, category_id: i64) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, price, category_id FROM products
         WHERE category_id = ?1 AND is_active = 1
         ORDER BY name",
    )?;
    let rows = stmt.query_map(params![category_id], map_product)?;
    rows.collect()
}

/// Получает активный товар по ID.
pub fn fetch_product(conn: &DbConnection, product_id: i64) -> Result<Option<Product>> {
    conn.query_row(
        "SELECT id, name, description, price, category_id FROM products
         WHERE id = ?1 AND is_active = 1",
        params![product_id],
        map_product,
    )
    .optional()
}

fn map_faq(row: &rusqlite::Row<'_>) -> Result<FaqEntry> {
    Ok(FaqEntry {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
    })
}

/// Возвращает все активные вопросы FAQ, новые первыми.
pub fn fetch_all_faq(conn: &DbConnection) -> Result<Vec<FaqEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, question, answer FROM faq
         WHERE is_active = 1 ORDER BY id DESC",
    )?;
    let rows = stmt.query_map([], map_faq)?;
    rows.collect()
}

/// Получает активную запись FAQ по ID.
pub fn fetch_faq_entry(conn: &DbConnection, faq_id: i64) -> Result<Option<FaqEntry>> {
    conn.query_row(
        "SELECT id, question, answer FROM faq
         WHERE id = ?1 AND is_active = 1",
        params![faq_id],
        map_faq,
    )
    .optional()
}

/// Ищет вопросы по подстроке: вхождение, префикс, суффикс и начало слова.
///
/// Пустой результат заменяется последними добавленными вопросами,
/// чтобы пользователь никогда не остался без подсказки.
pub fn search_faq(conn: &DbConnection, query: &str) -> Result<Vec<FaqEntry>> {
    let escaped = escape_like(query.trim());
    if !escaped.is_empty() {
        let mut stmt = conn.prepare(
            "SELECT id, question, answer FROM faq
             WHERE is_active = 1 AND (
                 question LIKE ?1 ESCAPE '\\'
                 OR question LIKE ?2 ESCAPE '\\'
                 OR question LIKE ?3 ESCAPE '\\'
                 OR question LIKE ?4 ESCAPE '\\'
             )
             ORDER BY id DESC
             LIMIT ?5",
        )?;
        let rows = stmt.query_map(
            params![
                format!("%{escaped}%"),
                format!("{escaped}%"),
                format!("%{escaped}"),
                format!("% {escaped}%"),
                config::faq::SEARCH_LIMIT,
            ],
            map_faq,
        )?;
        let hits: Vec<FaqEntry> = rows.collect::<Result<_>>()?;
        if !hits.is_empty() {
            return Ok(hits);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT id, question, answer FROM faq
         WHERE is_active = 1 ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![config::faq::FALLBACK_LIMIT], map_faq)?;
    rows.collect()
}

/// Экранирует метасимволы LIKE в пользовательском вводе.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("обычный вопрос"), "обычный вопрос");
    }
}
