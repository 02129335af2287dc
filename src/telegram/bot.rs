//! Создание экземпляра бота и список команд.

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Команды бота.
#[derive(BotCommands, Clone, Copy, Debug)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "главное меню магазина")]
    Start,
    #[command(description = "каталог товаров")]
    Catalog,
    #[command(description = "моя корзина")]
    Cart,
    #[command(description = "частые вопросы")]
    Faq,
}

/// Создаёт экземпляр бота по токену из конфигурации.
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = config::BOT_TOKEN.as_str();
    if token.is_empty() {
        anyhow::bail!("BOT_TOKEN (или TELOXIDE_TOKEN) не задан");
    }
    Ok(Bot::new(token))
}

/// Регистрирует команды в меню Telegram.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
