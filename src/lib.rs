//! Прилавок — Telegram-бот витрины магазина.
//!
//! Каталог с двухуровневыми категориями, корзина, оформление заказов со
//! снимком цен и фоновые рассылки поверх SQLite.
//!
//! # Структура модулей
//!
//! - `core`: конфигурация, ошибки, логирование, CSV-экспорт заказов
//! - `storage`: слой хранения (пул соединений, миграции, запросы)
//! - `telegram`: бот, клавиатуры, обработчики, схема диспетчера
//! - `broadcast`: планировщик рассылок и шов доставки

pub mod broadcast;
pub mod core;
pub mod storage;
pub mod telegram;

pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use telegram::{schema, HandlerDeps};
