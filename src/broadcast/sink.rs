//! Шов между планировщиком рассылок и Telegram.
//!
//! Планировщик работает с трейтом и не знает о teloxide: в тестах его
//! подменяет заглушка, в продакшене сообщения уходят через `TelegramSink`.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::{ApiError, RequestError};

/// Исход отправки одному получателю.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Получатель недоступен: заблокировал бота, удалил аккаунт или
    /// чата больше нет. Такие адресаты пропускаются без прерывания.
    Unreachable,
}

/// Канал доставки рассылок.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    /// Отправляет `message` пользователю. `Err` означает неожиданный
    /// сбой канала (не проблему конкретного получателя).
    async fn send(&self, user_id: i64, message: &str) -> Result<SendOutcome, String>;
}

/// Боевая доставка через Telegram Bot API.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl BroadcastSink for TelegramSink {
    async fn send(&self, user_id: i64, message: &str) -> Result<SendOutcome, String> {
        match self.bot.send_message(ChatId(user_id), message).await {
            Ok(_) => Ok(SendOutcome::Delivered),
            Err(err) if is_unreachable(&err) => Ok(SendOutcome::Unreachable),
            Err(err) => Err(err.to_string()),
        }
    }
}

fn is_unreachable(err: &RequestError) -> bool {
    matches!(
        err,
        RequestError::Api(
            ApiError::BotBlocked
                | ApiError::UserDeactivated
                | ApiError::ChatNotFound
                | ApiError::UserNotFound
        )
    )
}
