//! Заказы: оформление корзины и смена статуса.

use rusqlite::types::Type;
use rusqlite::{params, Result};
use rust_decimal::Decimal;

use crate::storage::db::{decimal_column, DbConnection};

/// Статус заказа. Закрытый набор значений: произвольные строки
/// в базу не попадают.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Created,
    Paid,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Paid => "paid",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(OrderStatus::Created),
            "paid" => Some(OrderStatus::Paid),
            _ => None,
        }
    }
}

/// Заказ пользователя.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub delivery_info: String,
    pub status: OrderStatus,
    pub created_at: String,
}

/// Позиция заказа — снимок товара на момент оформления.
///
/// Название и цена копируются по значению: последующие изменения
/// каталога на оформленный заказ не влияют. `product_id` обнуляется
/// при физическом удалении товара (FK `ON DELETE SET NULL`).
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i64,
}

fn status_column(row: &rusqlite::Row<'_>, idx: usize) -> Result<OrderStatus> {
    let raw: String = row.get(idx)?;
    OrderStatus::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("неизвестный статус заказа: {raw}").into(),
        )
    })
}

/// Оформляет заказ из активной корзины пользователя.
///
/// В одной транзакции: снимает снимок позиций корзины (имя и цена — по
/// значению), создаёт заказ со статусом `created` и деактивирует
/// корзину. Пустая корзина — не ошибка: возвращается `None`, заказ не
/// создаётся.
pub fn place_order(
    conn: &mut DbConnection,
    user_id: i64,
    delivery_info: &str,
) -> Result<Option<(Order, Vec<OrderLine>)>> {
    let tx = conn.transaction()?;

    let snapshot: Vec<(i64, String, Decimal, i64)> = {
        let mut stmt = tx.prepare(
            "SELECT cl.product_id, p.name, p.price, cl.quantity
             FROM cart_lines cl
             JOIN products p ON p.id = cl.product_id
             WHERE cl.user_id = ?1 AND cl.is_active = 1
             ORDER BY cl.created_at, cl.id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row.get(0)?, row.get(1)?, decimal_column(row, 2)?, row.get(3)?))
        })?;
        rows.collect::<Result<_>>()?
    };

    if snapshot.is_empty() {
        return Ok(None);
    }

    let order = tx.query_row(
        "INSERT INTO orders (user_id, delivery_info) VALUES (?1, ?2)
         RETURNING id, user_id, delivery_info, status, created_at",
        params![user_id, delivery_info],
        |row| {
            Ok(Order {
                id: row.get(0)?,
                user_id: row.get(1)?,
                delivery_info: row.get(2)?,
                status: status_column(row, 3)?,
                created_at: row.get(4)?,
            })
        },
    )?;

    let mut lines = Vec::with_capacity(snapshot.len());
    for (product_id, name, price, quantity) in snapshot {
        let line_id: i64 = tx.query_row(
            "INSERT INTO order_lines (order_id, product_id, product_name, product_price, quantity)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id",
            params![order.id, product_id, name, price.to_string(), quantity],
            |row| row.get(0),
        )?;
        lines.push(OrderLine {
            id: line_id,
            order_id: order.id,
            product_id: Some(product_id),
            product_name: name,
            product_price: price,
            quantity,
        });
    }

    tx.execute(
        "UPDATE cart_lines SET is_active = 0 WHERE user_id = ?1 AND is_active = 1",
        params![user_id],
    )?;

    tx.commit()?;
    Ok(Some((order, lines)))
}

/// Меняет статус заказа. Сработает только для заказа, принадлежащего
/// `user_id`; чужой или несуществующий заказ — тихий no-op (`false`).
pub fn update_order_status(
    conn: &DbConnection,
    user_id: i64,
    order_id: i64,
    status: OrderStatus,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders SET status = ?3 WHERE id = ?1 AND user_id = ?2",
        params![order_id, user_id, status.as_str()],
    )?;
    Ok(affected > 0)
}

/// Получает заказ по ID без учёта владельца (служебное чтение).
pub fn fetch_order(conn: &DbConnection, order_id: i64) -> Result<Option<Order>> {
    use rusqlite::OptionalExtension;
    conn.query_row(
        "SELECT id, user_id, delivery_info, status, created_at FROM orders WHERE id = ?1",
        params![order_id],
        |row| {
            Ok(Order {
                id: row.get(0)?,
                user_id: row.get(1)?,
                delivery_info: row.get(2)?,
                status: status_column(row, 3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Позиции заказа в порядке вставки.
pub fn fetch_order_lines(conn: &DbConnection, order_id: i64) -> Result<Vec<OrderLine>> {
    let mut stmt = conn.prepare(
        "SELECT id, order_id, product_id, product_name, product_price, quantity
         FROM order_lines WHERE order_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![order_id], |row| {
        Ok(OrderLine {
            id: row.get(0)?,
            order_id: row.get(1)?,
            product_id: row.get(2)?,
            product_name: row.get(3)?,
            product_price: decimal_column(row, 4)?,
            quantity: row.get(5)?,
        })
    })?;
    rows.collect()
}
