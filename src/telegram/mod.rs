//! Telegram-слой: бот, клавиатуры, обработчики и схема диспетчера.

pub mod bot;
pub mod callback;
pub mod handlers;
pub mod keyboards;
pub mod schema;
pub mod subscription;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use callback::CallbackAction;
pub use schema::{schema, ChatState, HandlerDeps, HandlerError, ShopDialogue};
