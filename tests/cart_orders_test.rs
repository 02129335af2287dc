//! Интеграционные тесты корзины и оформления заказов.

mod common;

use common::{seed_category, seed_product, seed_user, set_product_price, test_db};
use pretty_assertions::assert_eq;
use prilavok::storage::{cart, get_connection, orders, users};
use rust_decimal::Decimal;
use std::str::FromStr;

const USER: i64 = 100;
const STRANGER: i64 = 200;

#[test]
fn add_to_cart_merges_quantities_into_one_line() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    let cat = seed_category(&conn, "Чай", None);
    let product = seed_product(&conn, cat, "Эрл Грей", "199.90");

    assert_eq!(cart::add_to_cart(&conn, USER, product, 2).unwrap(), 2);
    assert_eq!(cart::add_to_cart(&conn, USER, product, 3).unwrap(), 5);

    let lines = cart::fetch_active_cart(&conn, USER).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);
}

#[test]
fn removed_line_does_not_merge_with_new_one() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    let cat = seed_category(&conn, "Чай", None);
    let product = seed_product(&conn, cat, "Эрл Грей", "199.90");

    cart::add_to_cart(&conn, USER, product, 2).unwrap();
    let line = &cart::fetch_active_cart(&conn, USER).unwrap()[0];
    assert!(cart::remove_line(&conn, USER, line.id).unwrap());

    // Частичный индекс не видит неактивную строку: новая позиция с нуля
    assert_eq!(cart::add_to_cart(&conn, USER, product, 1).unwrap(), 1);
}

#[test]
fn decrement_to_zero_deactivates_line() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    let cat = seed_category(&conn, "Чай", None);
    let product = seed_product(&conn, cat, "Эрл Грей", "199.90");

    cart::add_to_cart(&conn, USER, product, 1).unwrap();
    let line_id = cart::fetch_active_cart(&conn, USER).unwrap()[0].id;

    assert_eq!(cart::change_quantity(&conn, USER, line_id, -1).unwrap(), Some(0));
    assert!(cart::fetch_active_cart(&conn, USER).unwrap().is_empty());
}

#[test]
fn quantity_never_goes_negative() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    let cat = seed_category(&conn, "Чай", None);
    let product = seed_product(&conn, cat, "Эрл Грей", "199.90");

    cart::add_to_cart(&conn, USER, product, 1).unwrap();
    let line_id = cart::fetch_active_cart(&conn, USER).unwrap()[0].id;

    assert_eq!(cart::change_quantity(&conn, USER, line_id, -5).unwrap(), Some(0));
    assert!(cart::fetch_active_cart(&conn, USER).unwrap().is_empty());

    // В деактивированной строке тоже ноль, а не отрицательный остаток
    let stored: i64 = conn
        .query_row(
            "SELECT quantity FROM cart_lines WHERE id = ?1",
            [line_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 0);
}

#[test]
fn cart_operations_are_scoped_to_owner() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    let cat = seed_category(&conn, "Чай", None);
    let product = seed_product(&conn, cat, "Эрл Грей", "199.90");

    cart::add_to_cart(&conn, USER, product, 2).unwrap();
    let line_id = cart::fetch_active_cart(&conn, USER).unwrap()[0].id;

    // Чужой пользователь не меняет и не удаляет позицию
    assert_eq!(cart::change_quantity(&conn, STRANGER, line_id, 1).unwrap(), None);
    assert!(!cart::remove_line(&conn, STRANGER, line_id).unwrap());

    let lines = cart::fetch_active_cart(&conn, USER).unwrap();
    assert_eq!(lines[0].quantity, 2);
}

#[test]
fn cart_shows_live_catalog_prices() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    let cat = seed_category(&conn, "Чай", None);
    let product = seed_product(&conn, cat, "Эрл Грей", "199.90");

    cart::add_to_cart(&conn, USER, product, 1).unwrap();
    set_product_price(&conn, product, "250.00");

    let lines = cart::fetch_active_cart(&conn, USER).unwrap();
    assert_eq!(lines[0].price, Decimal::from_str("250.00").unwrap());
}

#[test]
fn empty_cart_places_no_order() {
    let db = test_db();
    let mut conn = get_connection(&db.pool).unwrap();

    assert!(orders::place_order(&mut conn, USER, "Москва").unwrap().is_none());
}

#[test]
fn order_snapshots_cart_and_empties_it() {
    let db = test_db();
    let mut conn = get_connection(&db.pool).unwrap();
    let cat = seed_category(&conn, "Чай", None);
    let a = seed_product(&conn, cat, "A", "10.00");
    let b = seed_product(&conn, cat, "B", "5.50");

    cart::add_to_cart(&conn, USER, a, 2).unwrap();
    cart::add_to_cart(&conn, USER, b, 1).unwrap();

    let (order, lines) = orders::place_order(&mut conn, USER, "Москва, Ленина 1")
        .unwrap()
        .expect("order placed");

    assert_eq!(order.status, orders::OrderStatus::Created);
    assert_eq!(order.delivery_info, "Москва, Ленина 1");
    assert_eq!(lines.len(), 2);

    let total: Decimal = lines
        .iter()
        .map(|l| l.product_price * Decimal::from(l.quantity))
        .sum();
    assert_eq!(total, Decimal::from_str("25.50").unwrap());

    // Корзина опустошена одним заказом
    assert!(cart::fetch_active_cart(&conn, USER).unwrap().is_empty());
}

#[test]
fn order_lines_keep_prices_after_catalog_edits() {
    let db = test_db();
    let mut conn = get_connection(&db.pool).unwrap();
    let cat = seed_category(&conn, "Чай", None);
    let product = seed_product(&conn, cat, "Эрл Грей", "199.90");

    cart::add_to_cart(&conn, USER, product, 2).unwrap();
    let (order, _) = orders::place_order(&mut conn, USER, "СПб").unwrap().unwrap();

    set_product_price(&conn, product, "999.99");

    let lines = orders::fetch_order_lines(&conn, order.id).unwrap();
    assert_eq!(lines[0].product_price, Decimal::from_str("199.90").unwrap());
    assert_eq!(lines[0].product_name, "Эрл Грей");
}

#[test]
fn status_update_is_scoped_to_owner() {
    let db = test_db();
    let mut conn = get_connection(&db.pool).unwrap();
    let cat = seed_category(&conn, "Чай", None);
    let product = seed_product(&conn, cat, "Эрл Грей", "199.90");

    cart::add_to_cart(&conn, USER, product, 1).unwrap();
    let (order, _) = orders::place_order(&mut conn, USER, "Москва").unwrap().unwrap();

    // Чужой пользователь — тихий no-op
    assert!(!orders::update_order_status(&conn, STRANGER, order.id, orders::OrderStatus::Paid).unwrap());
    assert_eq!(
        orders::fetch_order(&conn, order.id).unwrap().unwrap().status,
        orders::OrderStatus::Created
    );

    assert!(orders::update_order_status(&conn, USER, order.id, orders::OrderStatus::Paid).unwrap());
    assert_eq!(
        orders::fetch_order(&conn, order.id).unwrap().unwrap().status,
        orders::OrderStatus::Paid
    );
}

#[test]
fn pool_creation_applies_migrations_and_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.sqlite");
    let path = path.to_str().unwrap();

    let pool = prilavok::storage::create_pool(path).unwrap();
    drop(pool);

    // Повторное открытие той же базы не применяет миграции заново
    let pool = prilavok::storage::create_pool(path).unwrap();
    let conn = get_connection(&pool).unwrap();
    let applied: i64 = conn
        .query_row("SELECT COUNT(*) FROM refinery_schema_history", [], |row| row.get(0))
        .unwrap();
    assert_eq!(applied, 1);
}

#[test]
fn upsert_user_updates_and_reactivates() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();

    users::upsert_user(&conn, USER, Some("old"), "Имя", None, false).unwrap();
    conn.execute("UPDATE users SET is_active = 0 WHERE user_id = ?1", [USER])
        .unwrap();

    users::upsert_user(&conn, USER, Some("new"), "Имя", Some("Фамилия"), true).unwrap();

    let user = users::get_user(&conn, USER).unwrap().unwrap();
    assert_eq!(user.username.as_deref(), Some("new"));
    assert_eq!(user.last_name.as_deref(), Some("Фамилия"));
    assert!(user.is_subscribed);
    assert!(user.is_active);

    seed_user(&conn, STRANGER);
    let ids = users::get_active_user_ids(&conn).unwrap();
    assert_eq!(ids, vec![USER, STRANGER]);
}
