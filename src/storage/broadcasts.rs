//! Рассылки: очередь сообщений и журнал получателей.
//!
//! Жизненный цикл: `draft` → `pending` → `sending` → `sent`.
//! Переход `pending` → `sending` выполняется атомарным захватом, так
//! что две копии планировщика не возьмут одну рассылку одновременно.

use rusqlite::{params, OptionalExtension, Result};

use crate::storage::db::DbConnection;

/// Рассылка, захваченная планировщиком.
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub id: i64,
    pub message: String,
}

/// Создаёт рассылку в статусе `pending` (готова к отправке).
pub fn create_broadcast(conn: &DbConnection, message: &str) -> Result<i64> {
    conn.query_row(
        "INSERT INTO broadcasts (message, status) VALUES (?1, 'pending') RETURNING id",
        params![message],
        |row| row.get(0),
    )
}

/// Атомарно захватывает самую старую `pending`-рассылку: переводит её в
/// `sending`, штампует `claimed_at` и возвращает её. `None`, если
/// очередь пуста.
pub fn claim_pending_broadcast(conn: &DbConnection) -> Result<Option<Broadcast>> {
    conn.query_row(
        "UPDATE broadcasts
         SET status = 'sending', claimed_at = CURRENT_TIMESTAMP
         WHERE id = (
             SELECT id FROM broadcasts
             WHERE status = 'pending'
             ORDER BY created_at, id
             LIMIT 1
         )
         RETURNING id, message",
        [],
        |row| {
            Ok(Broadcast {
                id: row.get(0)?,
                message: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Возвращает явный список получателей рассылки. Пустой список значит,
/// что адресаты не заданы и рассылка идёт всем активным пользователям.
pub fn fetch_explicit_recipients(conn: &DbConnection, broadcast_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM broadcast_recipients
         WHERE broadcast_id = ?1 ORDER BY user_id",
    )?;
    let rows = stmt.query_map(params![broadcast_id], |row| row.get(0))?;
    rows.collect()
}

/// Фиксирует получателей рассылки. Повторная запись той же пары
/// игнорируется, так что операция идемпотентна.
pub fn record_recipients(conn: &DbConnection, broadcast_id: i64, user_ids: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO broadcast_recipients (broadcast_id, user_id) VALUES (?1, ?2)",
    )?;
    for user_id in user_ids {
        stmt.execute(params![broadcast_id, user_id])?;
    }
    Ok(())
}

/// Помечает рассылку отправленной и штампует `sent_at`.
pub fn finalize_broadcast(conn: &DbConnection, broadcast_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE broadcasts SET status = 'sent', sent_at = CURRENT_TIMESTAMP WHERE id = ?1",
        params![broadcast_id],
    )?;
    Ok(())
}

/// Возвращает в очередь рассылки, зависшие в `sending` дольше
/// `stale_secs` (процесс упал между захватом и финализацией).
/// Возвращает число сброшенных рассылок.
pub fn reset_stale_sending(conn: &DbConnection, stale_secs: i64) -> Result<usize> {
    conn.execute(
        "UPDATE broadcasts
         SET status = 'pending', claimed_at = NULL
         WHERE status = 'sending'
           AND claimed_at IS NOT NULL
           AND claimed_at <= datetime('now', '-' || ?1 || ' seconds')",
        params![stale_secs],
    )
}

/// Текущий статус рассылки (служебное чтение).
pub fn broadcast_status(conn: &DbConnection, broadcast_id: i64) -> Result<Option<String>> {
    conn.query_row(
        "SELECT status FROM broadcasts WHERE id = ?1",
        params![broadcast_id],
        |row| row.get(0),
    )
    .optional()
}
