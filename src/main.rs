use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tokio::time::sleep;

use prilavok::broadcast::{start_scheduler, TelegramSink};
use prilavok::core::{config, init_logger};
use prilavok::storage::create_pool;
use prilavok::telegram::{create_bot, schema, setup_bot_commands, ChatState, HandlerDeps};

/// Точка входа бота-витрины.
#[tokio::main]
async fn main() -> Result<()> {
    // Паника в обработчике не должна ронять процесс молча
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Поймана паника: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Паника в {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    // Переменные окружения из .env, если есть
    let _ = dotenv();

    run_bot().await
}

/// Инициализация и основной цикл диспетчера.
async fn run_bot() -> Result<()> {
    log::info!("Запуск бота...");

    let bot = create_bot()?;
    setup_bot_commands(&bot).await?;

    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH)
            .map_err(|e| anyhow::anyhow!("Не удалось создать пул БД: {e}"))?,
    );

    // Фоновый планировщик рассылок
    start_scheduler(
        Arc::clone(&db_pool),
        Arc::new(TelegramSink::new(bot.clone())),
    );

    let handler = schema(HandlerDeps {
        db_pool: Arc::clone(&db_pool),
    });

    log::info!("Бот готов принимать обновления");

    // Диспетчер перезапускается после паник с экспоненциальной паузой
    let mut retry_count = 0u32;
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        let handle = tokio::spawn(async move {
            use teloxide::update_listeners::Polling;

            let listener = Polling::builder(bot_clone.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(dptree::deps![InMemStorage::<ChatState>::new()])
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("Ошибка листенера обновлений"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Диспетчер завершился штатно");
                break;
            }
            Err(join_err) if join_err.is_panic() => {
                log::error!("Диспетчер упал с паникой: {join_err}");
                retry_count += 1;
                if retry_count > config::retry::MAX_DISPATCHER_RETRIES {
                    log::error!("Исчерпан лимит перезапусков диспетчера, выход");
                    break;
                }
                log::info!(
                    "Перезапуск диспетчера (попытка {retry_count}/{})",
                    config::retry::MAX_DISPATCHER_RETRIES
                );
                sleep(config::retry::backoff(retry_count)).await;
            }
            Err(join_err) => {
                log::warn!("Задача диспетчера отменена: {join_err}");
                break;
            }
        }
    }

    Ok(())
}
