//! Слой хранения: единственный владелец состояния сущностей.
//!
//! Все запросы — свободные функции над `&DbConnection` из пула.

pub mod broadcasts;
pub mod cart;
pub mod catalog;
pub mod db;
pub mod migrations;
pub mod orders;
pub mod users;

pub use db::{create_pool, get_connection, DbConnection, DbPool};
