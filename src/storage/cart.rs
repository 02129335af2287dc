//! Корзина: активные позиции пользователя.
//!
//! Позиции никогда не удаляются физически — снимается флаг `is_active`.
//! Уникальность активной пары (пользователь, товар) обеспечивает
//! частичный индекс, поэтому повторное добавление сливается в одну
//! позицию на уровне SQL.

use rusqlite::{params, Result};
use rust_decimal::Decimal;

use crate::storage::db::{decimal_column, DbConnection};

/// Активная позиция корзины с актуальной ценой товара.
#[derive(Debug, Clone)]
pub struct CartLine {
    /// ID строки корзины (не товара)
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    /// Текущая цена товара; до оформления заказа корзина всегда
    /// показывает живую цену каталога
    pub price: Decimal,
    pub quantity: i64,
}

/// Добавляет товар в корзину. Если активная позиция для этого товара
/// уже есть, количества складываются. Возвращает итоговое количество.
pub fn add_to_cart(
    conn: &DbConnection,
    user_id: i64,
    product_id: i64,
    quantity: i64,
) -> Result<i64> {
    conn.query_row(
        "INSERT INTO cart_lines (user_id, product_id, quantity)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, product_id) WHERE is_active = 1
         DO UPDATE SET quantity = quantity + excluded.quantity
         RETURNING quantity",
        params![user_id, product_id, quantity],
        |row| row.get(0),
    )
}

/// Изменяет количество позиции на `delta` (обычно +1/-1) атомарно.
///
/// Если количество опускается до нуля или ниже, позиция деактивируется.
/// Возвращает новое количество (0 после деактивации) либо `None`, если
/// позиция не принадлежит пользователю или уже неактивна.
pub fn change_quantity(
    conn: &DbConnection,
    user_id: i64,
    line_id: i64,
    delta: i64,
) -> Result<Option<i64>> {
    let updated: Option<i64> = conn
        .query_row(
            "UPDATE cart_lines SET quantity = quantity + ?3
             WHERE id = ?1 AND user_id = ?2 AND is_active = 1
             RETURNING quantity",
            params![line_id, user_id, delta],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    match updated {
        Some(quantity) if quantity <= 0 => {
            // В истории не должно оставаться отрицательных количеств
            conn.execute(
                "UPDATE cart_lines SET is_active = 0, quantity = 0 WHERE id = ?1",
                params![line_id],
            )?;
            Ok(Some(0))
        }
        other => Ok(other),
    }
}

/// Убирает позицию из корзины (мягкое удаление). Возвращает `true`,
/// если позиция существовала, была активна и принадлежала пользователю.
pub fn remove_line(conn: &DbConnection, user_id: i64, line_id: i64) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE cart_lines SET is_active = 0
         WHERE id = ?1 AND user_id = ?2 AND is_active = 1",
        params![line_id, user_id],
    )?;
    Ok(affected > 0)
}

/// Возвращает активную корзину пользователя с живыми ценами каталога,
/// в порядке добавления позиций.
pub fn fetch_active_cart(conn: &DbConnection, user_id: i64) -> Result<Vec<CartLine>> {
    let mut stmt = conn.prepare(
        "SELECT cl.id, cl.product_id, p.name, p.price, cl.quantity
         FROM cart_lines cl
         JOIN products p ON p.id = cl.product_id
         WHERE cl.user_id = ?1 AND cl.is_active = 1
         ORDER BY cl.created_at, cl.id",
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(CartLine {
            id: row.get(0)?,
            product_id: row.get(1)?,
            product_name: row.get(2)?,
            price: decimal_column(row, 3)?,
            quantity: row.get(4)?,
        })
    })?;
    rows.collect()
}
