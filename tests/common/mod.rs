//! Общие утилиты интеграционных тестов: временная БД и сидирование.

#![allow(dead_code)]

use std::sync::Arc;

use prilavok::storage::{create_pool, DbConnection, DbPool};
use rusqlite::params;
use tempfile::TempDir;

/// Временная SQLite-база с применёнными миграциями.
pub struct TestDb {
    pub pool: Arc<DbPool>,
    // каталог должен жить, пока жив пул
    _dir: TempDir,
}

pub fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let pool = create_pool(path.to_str().expect("utf-8 path")).expect("create pool");
    TestDb {
        pool: Arc::new(pool),
        _dir: dir,
    }
}

pub fn seed_category(conn: &DbConnection, name: &str, parent_id: Option<i64>) -> i64 {
    conn.query_row(
        "INSERT INTO categories (name, parent_id) VALUES (?1, ?2) RETURNING id",
        params![name, parent_id],
        |row| row.get(0),
    )
    .expect("seed category")
}

pub fn seed_product(conn: &DbConnection, category_id: i64, name: &str, price: &str) -> i64 {
    conn.query_row(
        "INSERT INTO products (name, price, category_id) VALUES (?1, ?2, ?3) RETURNING id",
        params![name, price, category_id],
        |row| row.get(0),
    )
    .expect("seed product")
}

pub fn seed_user(conn: &DbConnection, user_id: i64) {
    prilavok::storage::users::upsert_user(conn, user_id, None, "Тест", None, true).expect("seed user");
}

pub fn set_product_price(conn: &DbConnection, product_id: i64, price: &str) {
    conn.execute(
        "UPDATE products SET price = ?2 WHERE id = ?1",
        params![product_id, price],
    )
    .expect("update price");
}
