//! Схема диспетчера и зависимости обработчиков.

use std::sync::Arc;

use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::storage::DbPool;
use crate::telegram::bot::Command;
use crate::telegram::handlers;

/// Ошибка обработчика для teloxide Dispatcher.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Зависимости, клонируемые в каждый обработчик.
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
}

/// Состояние диалога в чате: чего бот ждёт от пользователя.
#[derive(Clone, Default)]
pub enum ChatState {
    #[default]
    Idle,
    /// Оформление заказа: ждём адрес и контакты
    AwaitingDeliveryInfo,
    /// Поиск по FAQ: ждём текст вопроса
    AwaitingFaqQuery,
}

pub type ShopDialogue = Dialogue<ChatState, InMemStorage<ChatState>>;

/// Дерево обработчиков бота. Одна и та же схема используется в
/// продакшене и может собираться в тестах.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_delivery = deps.clone();
    let deps_faq = deps.clone();
    let deps_menu = deps.clone();
    let deps_callback = deps;

    let message_tree = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, dialogue: ShopDialogue, cmd: Command| {
                let deps = deps_commands.clone();
                async move {
                    log::info!("Команда {:?} из чата {}", cmd, msg.chat.id);
                    if let Err(e) = handlers::handle_command(&bot, &msg, &dialogue, cmd, &deps).await {
                        log::error!("Ошибка обработки команды {:?}: {e}", cmd);
                        handlers::send_generic_error(&bot, msg.chat.id).await;
                    }
                    Ok(())
                }
            },
        ))
        .branch(dptree::case![ChatState::AwaitingDeliveryInfo].endpoint(
            move |bot: Bot, msg: Message, dialogue: ShopDialogue| {
                let deps = deps_delivery.clone();
                async move {
                    if let Err(e) = handlers::receive_delivery_info(&bot, &msg, &dialogue, &deps).await {
                        log::error!("Ошибка оформления заказа в чате {}: {e}", msg.chat.id);
                        handlers::send_generic_error(&bot, msg.chat.id).await;
                    }
                    Ok(())
                }
            },
        ))
        .branch(dptree::case![ChatState::AwaitingFaqQuery].endpoint(
            move |bot: Bot, msg: Message, dialogue: ShopDialogue| {
                let deps = deps_faq.clone();
                async move {
                    if let Err(e) = handlers::receive_faq_query(&bot, &msg, &dialogue, &deps).await {
                        log::error!("Ошибка поиска по FAQ в чате {}: {e}", msg.chat.id);
                        handlers::send_generic_error(&bot, msg.chat.id).await;
                    }
                    Ok(())
                }
            },
        ))
        .branch(dptree::endpoint(
            move |bot: Bot, msg: Message, dialogue: ShopDialogue| {
                let deps = deps_menu.clone();
                async move {
                    if let Err(e) = handlers::handle_menu_text(&bot, &msg, &dialogue, &deps).await {
                        log::error!("Ошибка обработки сообщения в чате {}: {e}", msg.chat.id);
                        handlers::send_generic_error(&bot, msg.chat.id).await;
                    }
                    Ok(())
                }
            },
        ));

    let callback_tree = Update::filter_callback_query().endpoint(
        move |bot: Bot, q: CallbackQuery, dialogue: ShopDialogue| {
            let deps = deps_callback.clone();
            async move {
                if let Err(e) = handlers::handle_callback(&bot, &q, &dialogue, &deps).await {
                    log::error!("Ошибка обработки callback от {}: {e}", q.from.id);
                    let _ = bot
                        .answer_callback_query(q.id.clone())
                        .text("Что-то пошло не так, попробуйте позже.")
                        .await;
                }
                Ok(())
            }
        },
    );

    dialogue::enter::<Update, InMemStorage<ChatState>, ChatState, _>()
        .branch(message_tree)
        .branch(callback_tree)
}
