//! Фоновый планировщик рассылок.
//!
//! Раз в `POLL_INTERVAL_SECS` секунд: возвращает в очередь зависшие
//! рассылки, захватывает одну `pending`, резолвит получателей и
//! отправляет сообщение по одному с паузой между отправками.
//! Гарантия — at-least-once: при падении процесса между захватом и
//! финализацией рассылка вернётся в очередь по таймауту `claimed_at`.

use std::sync::Arc;

use tokio::time::interval;

use crate::broadcast::sink::{BroadcastSink, SendOutcome};
use crate::core::config;
use crate::storage::db::DbPool;
use crate::storage::{broadcasts, get_connection, users};

/// Запускает планировщик как фоновую задачу tokio.
pub fn start_scheduler(db_pool: Arc<DbPool>, sink: Arc<dyn BroadcastSink>) {
    tokio::spawn(async move {
        let mut ticker = interval(config::broadcast::poll_interval());

        log::info!(
            "Планировщик рассылок запущен (интервал: {}с, таймаут sending: {}с)",
            *config::broadcast::POLL_INTERVAL_SECS,
            *config::broadcast::STALE_SENDING_SECS,
        );

        loop {
            ticker.tick().await;

            if let Err(e) = run_iteration(&db_pool, sink.as_ref()).await {
                log::error!("Итерация рассылки завершилась ошибкой: {e}");
            }
        }
    });
}

/// Одна итерация планировщика. Вынесена отдельно, чтобы тесты могли
/// гонять её без таймера.
pub async fn run_iteration(db_pool: &DbPool, sink: &dyn BroadcastSink) -> Result<(), String> {
    let conn = get_connection(db_pool).map_err(|e| format!("нет соединения с БД: {e}"))?;

    let reclaimed = broadcasts::reset_stale_sending(&conn, *config::broadcast::STALE_SENDING_SECS)
        .map_err(|e| format!("сброс зависших рассылок: {e}"))?;
    if reclaimed > 0 {
        log::warn!("Возвращено в очередь зависших рассылок: {reclaimed}");
    }

    let Some(broadcast) =
        broadcasts::claim_pending_broadcast(&conn).map_err(|e| format!("захват рассылки: {e}"))?
    else {
        return Ok(());
    };
    log::info!("Рассылка #{} захвачена", broadcast.id);

    let explicit = broadcasts::fetch_explicit_recipients(&conn, broadcast.id)
        .map_err(|e| format!("чтение получателей рассылки #{}: {e}", broadcast.id))?;
    let implicit = explicit.is_empty();
    let recipients = if implicit {
        users::get_active_user_ids(&conn).map_err(|e| format!("чтение аудитории: {e}"))?
    } else {
        explicit
    };

    if recipients.is_empty() {
        broadcasts::finalize_broadcast(&conn, broadcast.id)
            .map_err(|e| format!("финализация рассылки #{}: {e}", broadcast.id))?;
        log::info!("Рассылка #{}: получателей нет, помечена отправленной", broadcast.id);
        return Ok(());
    }

    // Не держим соединение из пула на время отправки
    drop(conn);

    let mut delivered: Vec<i64> = Vec::with_capacity(recipients.len());
    let mut skipped = 0usize;
    for user_id in &recipients {
        match sink.send(*user_id, &broadcast.message).await {
            Ok(SendOutcome::Delivered) => delivered.push(*user_id),
            Ok(SendOutcome::Unreachable) => {
                skipped += 1;
                log::debug!("Рассылка #{}: получатель {user_id} недоступен, пропущен", broadcast.id);
            }
            Err(err) => {
                // Неожиданный сбой канала: рассылка остаётся в `sending`
                // и вернётся в очередь по таймауту
                return Err(format!(
                    "рассылка #{}: отправка пользователю {user_id} не удалась: {err}",
                    broadcast.id
                ));
            }
        }
        tokio::time::sleep(config::broadcast::send_delay()).await;
    }

    let conn = get_connection(db_pool).map_err(|e| format!("нет соединения с БД: {e}"))?;
    if implicit && !delivered.is_empty() {
        broadcasts::record_recipients(&conn, broadcast.id, &delivered)
            .map_err(|e| format!("запись получателей рассылки #{}: {e}", broadcast.id))?;
    }
    broadcasts::finalize_broadcast(&conn, broadcast.id)
        .map_err(|e| format!("финализация рассылки #{}: {e}", broadcast.id))?;

    log::info!(
        "Рассылка #{} завершена: доставлено {}, пропущено {skipped}",
        broadcast.id,
        delivered.len(),
    );
    Ok(())
}
