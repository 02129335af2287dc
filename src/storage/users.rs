use rusqlite::{params, OptionalExtension, Result};

use crate::storage::db::DbConnection;

/// Структура, представляющая пользователя магазина.
#[derive(Debug, Clone)]
pub struct TelegramUser {
    /// Telegram ID пользователя
    pub user_id: i64,
    /// Имя пользователя (username) в Telegram, если доступно
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    /// Подписан ли пользователь на канал магазина
    pub is_subscribed: bool,
    /// Флаг активности (false = мягкое удаление)
    pub is_active: bool,
}

/// Создаёт или обновляет пользователя по Telegram ID.
///
/// Вызывается на каждое взаимодействие: обновляет имя, статус подписки,
/// реактивирует запись и сдвигает `updated_at`.
pub fn upsert_user(
    conn: &DbConnection,
    user_id: i64,
    username: Option<&str>,
    first_name: &str,
    last_name: Option<&str>,
    is_subscribed: bool,
) -> Result<()> {
    conn.execute(
        "INSERT INTO users (user_id, username, first_name, last_name, is_subscribed, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)
         ON CONFLICT(user_id) DO UPDATE SET
             username = excluded.username,
             first_name = excluded.first_name,
             last_name = excluded.last_name,
             is_subscribed = excluded.is_subscribed,
             is_active = 1,
             updated_at = CURRENT_TIMESTAMP",
        params![user_id, username, first_name, last_name, is_subscribed],
    )?;
    Ok(())
}

/// Получает пользователя по Telegram ID.
pub fn get_user(conn: &DbConnection, user_id: i64) -> Result<Option<TelegramUser>> {
    conn.query_row(
        "SELECT user_id, username, first_name, last_name, is_subscribed, is_active
         FROM users WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(TelegramUser {
                user_id: row.get(0)?,
                username: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                is_subscribed: row.get(4)?,
                is_active: row.get(5)?,
            })
        },
    )
    .optional()
}

/// Возвращает ID всех активных пользователей (аудитория рассылки по умолчанию).
pub fn get_active_user_ids(conn: &DbConnection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT user_id FROM users WHERE is_active = 1 ORDER BY user_id")?;
    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}
