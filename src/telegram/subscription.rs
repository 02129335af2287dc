//! Проверка подписки на канал магазина.

use teloxide::prelude::*;
use teloxide::types::Recipient;

use crate::core::config;
use crate::core::error::AppResult;

/// Проверяет, подписан ли пользователь на канал из `CHANNEL_ID`.
///
/// Пустой `CHANNEL_ID` отключает проверку. Если бот не в канале или
/// канал указан неверно, доступ не предоставляется.
pub async fn is_subscribed(bot: &Bot, user_id: UserId) -> AppResult<bool> {
    let channel = config::CHANNEL_ID.as_str();
    if channel.is_empty() {
        return Ok(true);
    }

    let recipient = parse_channel(channel);
    let result = bot
        .get_chat_member(recipient, user_id)
        .await
        .map(|member| member.kind.is_present());
    Ok(membership_grants_access(result))
}

fn membership_grants_access(result: Result<bool, teloxide::RequestError>) -> bool {
    match result {
        Ok(present) => present,
        Err(err) => {
            log::warn!("Канал недоступен или бот не видит его, доступ закрыт: {err}");
            false
        }
    }
}

/// `@username` или числовой ID чата (`-100…`).
fn parse_channel(raw: &str) -> Recipient {
    if let Ok(id) = raw.parse::<i64>() {
        Recipient::Id(ChatId(id))
    } else {
        let username = if raw.starts_with('@') {
            raw.to_string()
        } else {
            format!("@{raw}")
        };
        Recipient::ChannelUsername(username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::{ApiError, RequestError};

    #[test]
    fn channel_errors_deny_access() {
        assert!(membership_grants_access(Ok(true)));
        assert!(!membership_grants_access(Ok(false)));
        // Бот не админ канала или канал указан неверно — доступа нет
        assert!(!membership_grants_access(Err(RequestError::Api(ApiError::ChatNotFound))));
    }

    #[test]
    fn parses_channel_identifiers() {
        assert!(matches!(parse_channel("-1001234567890"), Recipient::Id(ChatId(-1001234567890))));
        match parse_channel("shopnews") {
            Recipient::ChannelUsername(name) => assert_eq!(name, "@shopnews"),
            other => panic!("unexpected recipient: {other:?}"),
        }
        match parse_channel("@shopnews") {
            Recipient::ChannelUsername(name) => assert_eq!(name, "@shopnews"),
            other => panic!("unexpected recipient: {other:?}"),
        }
    }
}
