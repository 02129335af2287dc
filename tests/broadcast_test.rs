//! Интеграционные тесты очереди рассылок и планировщика.

mod common;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{seed_user, test_db};
use pretty_assertions::assert_eq;
use prilavok::broadcast::{run_iteration, BroadcastSink, SendOutcome};
use prilavok::storage::{broadcasts, get_connection};

/// Заглушка доставки: записывает отправки, умеет имитировать
/// недоступных получателей и сбой канала.
#[derive(Default)]
struct MockSink {
    delivered: Mutex<Vec<i64>>,
    unreachable: HashSet<i64>,
    fail_for: HashSet<i64>,
}

impl MockSink {
    fn delivered(&self) -> Vec<i64> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl BroadcastSink for MockSink {
    async fn send(&self, user_id: i64, _message: &str) -> Result<SendOutcome, String> {
        if self.fail_for.contains(&user_id) {
            return Err("эмуляция сбоя канала".to_string());
        }
        if self.unreachable.contains(&user_id) {
            return Ok(SendOutcome::Unreachable);
        }
        self.delivered.lock().unwrap().push(user_id);
        Ok(SendOutcome::Delivered)
    }
}

#[test]
fn claim_is_exclusive_and_oldest_first() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();

    let first = broadcasts::create_broadcast(&conn, "первая").unwrap();
    let second = broadcasts::create_broadcast(&conn, "вторая").unwrap();

    // Захватывается самая старая, повторно — следующая, затем пусто
    assert_eq!(broadcasts::claim_pending_broadcast(&conn).unwrap().unwrap().id, first);
    assert_eq!(broadcasts::claim_pending_broadcast(&conn).unwrap().unwrap().id, second);
    assert!(broadcasts::claim_pending_broadcast(&conn).unwrap().is_none());

    assert_eq!(broadcasts::broadcast_status(&conn, first).unwrap().as_deref(), Some("sending"));
}

#[tokio::test]
async fn racing_schedulers_claim_a_broadcast_at_most_once() {
    let db = test_db();
    {
        let conn = get_connection(&db.pool).unwrap();
        broadcasts::create_broadcast(&conn, "одна на двоих").unwrap();
    }

    // Два планировщика на своих соединениях захватывают одновременно
    let pool_a = Arc::clone(&db.pool);
    let pool_b = Arc::clone(&db.pool);
    let a = tokio::task::spawn_blocking(move || {
        let conn = get_connection(&pool_a).unwrap();
        broadcasts::claim_pending_broadcast(&conn).unwrap()
    });
    let b = tokio::task::spawn_blocking(move || {
        let conn = get_connection(&pool_b).unwrap();
        broadcasts::claim_pending_broadcast(&conn).unwrap()
    });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert!(a.is_some() != b.is_some(), "ровно один захват: {a:?} и {b:?}");
}

#[test]
fn record_recipients_is_idempotent() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    let id = broadcasts::create_broadcast(&conn, "текст").unwrap();

    broadcasts::record_recipients(&conn, id, &[1, 2]).unwrap();
    broadcasts::record_recipients(&conn, id, &[2, 3]).unwrap();

    assert_eq!(broadcasts::fetch_explicit_recipients(&conn, id).unwrap(), vec![1, 2, 3]);
}

#[test]
fn stale_sending_returns_to_queue() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    let id = broadcasts::create_broadcast(&conn, "зависшая").unwrap();
    broadcasts::claim_pending_broadcast(&conn).unwrap().unwrap();

    // Свежезахваченная рассылка не сбрасывается
    assert_eq!(broadcasts::reset_stale_sending(&conn, 900).unwrap(), 0);

    conn.execute(
        "UPDATE broadcasts SET claimed_at = datetime('now', '-3600 seconds') WHERE id = ?1",
        [id],
    )
    .unwrap();

    assert_eq!(broadcasts::reset_stale_sending(&conn, 900).unwrap(), 1);
    assert_eq!(broadcasts::broadcast_status(&conn, id).unwrap().as_deref(), Some("pending"));
}

#[tokio::test]
async fn iteration_sends_to_explicit_recipients() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    seed_user(&conn, 1);
    seed_user(&conn, 2);
    seed_user(&conn, 3);

    let id = broadcasts::create_broadcast(&conn, "только двоим").unwrap();
    broadcasts::record_recipients(&conn, id, &[1, 3]).unwrap();
    drop(conn);

    let sink = MockSink::default();
    run_iteration(&db.pool, &sink).await.unwrap();

    assert_eq!(sink.delivered(), vec![1, 3]);
    let conn = get_connection(&db.pool).unwrap();
    assert_eq!(broadcasts::broadcast_status(&conn, id).unwrap().as_deref(), Some("sent"));
}

#[tokio::test]
async fn iteration_without_explicit_recipients_goes_to_all_active() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    seed_user(&conn, 1);
    seed_user(&conn, 2);
    conn.execute("UPDATE users SET is_active = 0 WHERE user_id = 2", [])
        .unwrap();
    seed_user(&conn, 3);

    let id = broadcasts::create_broadcast(&conn, "всем активным").unwrap();
    drop(conn);

    let sink = MockSink::default();
    run_iteration(&db.pool, &sink).await.unwrap();

    assert_eq!(sink.delivered(), vec![1, 3]);

    // Фактические получатели зафиксированы задним числом
    let conn = get_connection(&db.pool).unwrap();
    assert_eq!(broadcasts::fetch_explicit_recipients(&conn, id).unwrap(), vec![1, 3]);
    assert_eq!(broadcasts::broadcast_status(&conn, id).unwrap().as_deref(), Some("sent"));
}

#[tokio::test]
async fn iteration_with_no_recipients_is_finalized_immediately() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    let id = broadcasts::create_broadcast(&conn, "в пустоту").unwrap();
    drop(conn);

    let sink = MockSink::default();
    run_iteration(&db.pool, &sink).await.unwrap();

    assert!(sink.delivered().is_empty());
    let conn = get_connection(&db.pool).unwrap();
    assert_eq!(broadcasts::broadcast_status(&conn, id).unwrap().as_deref(), Some("sent"));
}

#[tokio::test]
async fn unreachable_recipients_are_skipped_not_fatal() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    seed_user(&conn, 1);
    seed_user(&conn, 2);
    seed_user(&conn, 3);
    let id = broadcasts::create_broadcast(&conn, "с блокировками").unwrap();
    drop(conn);

    let sink = MockSink {
        unreachable: HashSet::from([2]),
        ..MockSink::default()
    };
    run_iteration(&db.pool, &sink).await.unwrap();

    assert_eq!(sink.delivered(), vec![1, 3]);
    let conn = get_connection(&db.pool).unwrap();
    assert_eq!(broadcasts::broadcast_status(&conn, id).unwrap().as_deref(), Some("sent"));
    // Заблокировавший бота не попадает в журнал получателей
    assert_eq!(broadcasts::fetch_explicit_recipients(&conn, id).unwrap(), vec![1, 3]);
}

#[tokio::test]
async fn channel_failure_leaves_broadcast_in_sending() {
    let db = test_db();
    let conn = get_connection(&db.pool).unwrap();
    seed_user(&conn, 1);
    seed_user(&conn, 2);
    let id = broadcasts::create_broadcast(&conn, "сбойная").unwrap();
    drop(conn);

    let sink = MockSink {
        fail_for: HashSet::from([2]),
        ..MockSink::default()
    };
    let result = run_iteration(&db.pool, &sink).await;
    assert!(result.is_err());

    // Рассылка осталась в `sending` и вернётся в очередь по таймауту
    let conn = get_connection(&db.pool).unwrap();
    assert_eq!(broadcasts::broadcast_status(&conn, id).unwrap().as_deref(), Some("sending"));
}
