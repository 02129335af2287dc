//! Обработчики команд, кнопок меню и callback-запросов.

use rust_decimal::Decimal;
use teloxide::prelude::*;
use teloxide::types::MessageId;

use crate::core::config;
use crate::core::export;
use crate::storage::cart::CartLine;
use crate::storage::{cart, catalog, get_connection, orders, users};
use crate::telegram::bot::Command;
use crate::telegram::callback::CallbackAction;
use crate::telegram::keyboards;
use crate::telegram::schema::{ChatState, HandlerDeps, HandlerError, ShopDialogue};
use crate::telegram::subscription;

pub type HandlerResult = Result<(), HandlerError>;

const GREETING: &str = "Добро пожаловать в магазин! Выберите раздел в меню ниже.";
const ASK_DELIVERY: &str = "Введите адрес доставки и контактные данные одним сообщением:";
const ASK_FAQ: &str = "Напишите ваш вопрос, и я поищу ответ. Или откройте весь список:";
const EMPTY_CART: &str = "🛒 Корзина пуста. Загляните в каталог!";
const TRY_LATER: &str = "Что-то пошло не так, попробуйте позже.";

/// Отправляет общее сообщение об ошибке; сама ошибка уже залогирована.
pub async fn send_generic_error(bot: &Bot, chat_id: ChatId) {
    let _ = bot.send_message(chat_id, TRY_LATER).await;
}

pub async fn handle_command(
    bot: &Bot,
    msg: &Message,
    dialogue: &ShopDialogue,
    cmd: Command,
    deps: &HandlerDeps,
) -> HandlerResult {
    // Любая команда сбрасывает начатый диалог
    dialogue.update(ChatState::Idle).await?;
    match cmd {
        Command::Start => handle_start(bot, msg, deps).await,
        Command::Catalog => show_root_catalog(bot, msg.chat.id, None, 0, deps).await,
        Command::Cart => render_cart(bot, msg.chat.id, None, chat_user_id(msg), deps).await,
        Command::Faq => start_faq(bot, msg.chat.id, dialogue).await,
    }
}

/// `/start`: апсерт пользователя, проверка подписки, главное меню.
async fn handle_start(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> HandlerResult {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = i64::try_from(from.id.0).unwrap_or(0);
    let subscribed = subscription::is_subscribed(bot, from.id).await?;

    let conn = get_connection(&deps.db_pool)?;
    users::upsert_user(
        &conn,
        user_id,
        from.username.as_deref(),
        &from.first_name,
        from.last_name.as_deref(),
        subscribed,
    )?;

    if !subscribed {
        bot.send_message(msg.chat.id, "Чтобы пользоваться магазином, подпишитесь на наш канал:")
            .reply_markup(keyboards::subscribe_prompt())
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, GREETING)
        .reply_markup(keyboards::main_menu())
        .await?;
    Ok(())
}

/// Кнопки постоянного меню (текстовые сообщения).
pub async fn handle_menu_text(
    bot: &Bot,
    msg: &Message,
    dialogue: &ShopDialogue,
    deps: &HandlerDeps,
) -> HandlerResult {
    let Some(text) = msg.text() else { return Ok(()) };
    match text {
        keyboards::MENU_CATALOG => show_root_catalog(bot, msg.chat.id, None, 0, deps).await,
        keyboards::MENU_CART => render_cart(bot, msg.chat.id, None, chat_user_id(msg), deps).await,
        keyboards::MENU_FAQ => start_faq(bot, msg.chat.id, dialogue).await,
        _ => Ok(()),
    }
}

fn chat_user_id(msg: &Message) -> i64 {
    msg.from
        .as_ref()
        .and_then(|u| i64::try_from(u.id.0).ok())
        .unwrap_or(0)
}

/// Показывает (или редактирует) список корневых категорий.
async fn show_root_catalog(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    page: usize,
    deps: &HandlerDeps,
) -> HandlerResult {
    let conn = get_connection(&deps.db_pool)?;
    let categories = catalog::fetch_root_categories(&conn)?;
    if categories.is_empty() {
        send_or_edit(bot, chat_id, message_id, "Каталог пока пуст.", None).await?;
        return Ok(());
    }
    let markup = keyboards::root_categories(&categories, page);
    send_or_edit(bot, chat_id, message_id, "🛍 Каталог — выберите категорию:", Some(markup)).await
}

/// Показывает содержимое категории: подкатегории либо сразу товары.
async fn show_category(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    category_id: i64,
    page: usize,
    deps: &HandlerDeps,
) -> HandlerResult {
    let conn = get_connection(&deps.db_pool)?;
    let Some(category) = catalog::fetch_category(&conn, category_id)? else {
        send_or_edit(bot, chat_id, message_id, "Категория больше недоступна.", None).await?;
        return Ok(());
    };

    let subcategories = catalog::fetch_subcategories(&conn, category_id)?;
    if !subcategories.is_empty() {
        let markup = keyboards::subcategories(category_id, &subcategories, page);
        let text = format!("📂 {} — выберите раздел:", category.name);
        return send_or_edit(bot, chat_id, message_id, &text, Some(markup)).await;
    }

    show_products(bot, chat_id, message_id, &category, deps).await
}

/// Показывает товары категории (лист иерархии).
async fn show_category_products(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    category_id: i64,
    deps: &HandlerDeps,
) -> HandlerResult {
    let conn = get_connection(&deps.db_pool)?;
    let Some(category) = catalog::fetch_category(&conn, category_id)? else {
        send_or_edit(bot, chat_id, message_id, "Категория больше недоступна.", None).await?;
        return Ok(());
    };
    show_products(bot, chat_id, message_id, &category, deps).await
}

async fn show_products(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    category: &catalog::Category,
    deps: &HandlerDeps,
) -> HandlerResult {
    let conn = get_connection(&deps.db_pool)?;
    let products = catalog::fetch_products(&conn, category.id)?;
    if products.is_empty() {
        let back = match category.parent_id {
            Some(parent) => CallbackAction::Category { id: parent },
            None => CallbackAction::CategoryPage { page: 0 },
        };
        let markup = keyboards::products(back, &[]);
        return send_or_edit(bot, chat_id, message_id, "В этом разделе пока нет товаров.", Some(markup)).await;
    }

    let back = match category.parent_id {
        Some(parent) => CallbackAction::Category { id: parent },
        None => CallbackAction::CategoryPage { page: 0 },
    };
    let markup = keyboards::products(back, &products);
    let text = format!("🛍 {} — выберите товар:", category.name);
    send_or_edit(bot, chat_id, message_id, &text, Some(markup)).await
}

/// Карточка товара.
async fn show_product_card(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    product_id: i64,
    deps: &HandlerDeps,
) -> HandlerResult {
    let conn = get_connection(&deps.db_pool)?;
    let Some(product) = catalog::fetch_product(&conn, product_id)? else {
        send_or_edit(bot, chat_id, message_id, "Товар больше недоступен.", None).await?;
        return Ok(());
    };
    let mut text = format!("📦 {}\n\nЦена: {} ₽", product.name, product.price);
    if let Some(description) = product.description.as_deref() {
        if !description.is_empty() {
            text.push_str(&format!("\n\n{description}"));
        }
    }
    let markup = keyboards::product_card(&product);
    send_or_edit(bot, chat_id, message_id, &text, Some(markup)).await
}

/// Текст корзины с построчными суммами и итогом.
pub fn format_cart_text(lines: &[CartLine]) -> String {
    let mut total = Decimal::ZERO;
    let mut text = String::from("🛒 Ваша корзина:\n\n");
    for line in lines {
        let subtotal = line.price * Decimal::from(line.quantity);
        total += subtotal;
        text.push_str(&format!(
            "• {} — {} × {} ₽ = {} ₽\n",
            line.product_name, line.quantity, line.price, subtotal
        ));
    }
    text.push_str(&format!("\nИтого: {total} ₽"));
    text
}

/// Отрисовывает корзину пользователя (новым сообщением или правкой).
async fn render_cart(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    user_id: i64,
    deps: &HandlerDeps,
) -> HandlerResult {
    let conn = get_connection(&deps.db_pool)?;
    let lines = cart::fetch_active_cart(&conn, user_id)?;
    if lines.is_empty() {
        send_or_edit(bot, chat_id, message_id, EMPTY_CART, None).await?;
        return Ok(());
    }
    let text = format_cart_text(&lines);
    let markup = keyboards::cart(&lines);
    send_or_edit(bot, chat_id, message_id, &text, Some(markup)).await
}

async fn start_faq(bot: &Bot, chat_id: ChatId, dialogue: &ShopDialogue) -> HandlerResult {
    dialogue.update(ChatState::AwaitingFaqQuery).await?;
    bot.send_message(chat_id, ASK_FAQ)
        .reply_markup(keyboards::faq_list(&[], true))
        .await?;
    Ok(())
}

/// Текст в состоянии поиска по FAQ.
pub async fn receive_faq_query(
    bot: &Bot,
    msg: &Message,
    dialogue: &ShopDialogue,
    deps: &HandlerDeps,
) -> HandlerResult {
    let Some(query) = msg.text() else { return Ok(()) };
    let conn = get_connection(&deps.db_pool)?;
    let hits = catalog::search_faq(&conn, query)?;
    dialogue.update(ChatState::Idle).await?;

    if hits.is_empty() {
        bot.send_message(msg.chat.id, "Пока в FAQ нет ни одного вопроса.")
            .reply_markup(keyboards::main_menu())
            .await?;
        return Ok(());
    }
    bot.send_message(msg.chat.id, "Возможно, вы имели в виду:")
        .reply_markup(keyboards::faq_list(&hits, true))
        .await?;
    Ok(())
}

/// Текст в состоянии ожидания адреса доставки: оформляет заказ.
pub async fn receive_delivery_info(
    bot: &Bot,
    msg: &Message,
    dialogue: &ShopDialogue,
    deps: &HandlerDeps,
) -> HandlerResult {
    let delivery_info = msg.text().map(str::trim).unwrap_or_default();
    if delivery_info.is_empty() {
        bot.send_message(msg.chat.id, ASK_DELIVERY).await?;
        return Ok(());
    }

    let user_id = chat_user_id(msg);
    let mut conn = get_connection(&deps.db_pool)?;
    let placed = orders::place_order(&mut conn, user_id, delivery_info)?;
    dialogue.update(ChatState::Idle).await?;

    let Some((order, lines)) = placed else {
        bot.send_message(msg.chat.id, EMPTY_CART).await?;
        return Ok(());
    };

    log::info!("Заказ #{} оформлен пользователем {user_id}, позиций: {}", order.id, lines.len());
    spawn_order_export(order.clone(), lines.clone());

    let total: Decimal = lines
        .iter()
        .map(|l| l.product_price * Decimal::from(l.quantity))
        .sum();
    let text = format!(
        "✅ Заказ #{} оформлен!\n\nСумма: {total} ₽\nДоставка: {}\n\nОплатите заказ и нажмите «Я оплатил».",
        order.id, order.delivery_info
    );
    bot.send_message(msg.chat.id, text)
        .reply_markup(keyboards::payment(order.id))
        .await?;
    Ok(())
}

/// Дописывает заказ в CSV-журнал вне обработчика: сбой экспорта не
/// должен влиять на уже оформленный заказ.
fn spawn_order_export(order: orders::Order, lines: Vec<orders::OrderLine>) {
    tokio::task::spawn_blocking(move || {
        if let Err(err) = export::append_order_to_csv(&config::ORDERS_EXPORT_PATH, &order, &lines) {
            log::error!("Не удалось записать заказ #{} в CSV: {err}", order.id);
        }
    });
}

/// Общая точка входа для callback-запросов.
pub async fn handle_callback(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &ShopDialogue,
    deps: &HandlerDeps,
) -> HandlerResult {
    let action = q.data.as_deref().and_then(CallbackAction::parse);
    let Some(action) = action else {
        // Устаревшая или чужая кнопка: гасим без побочных эффектов
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let (chat_id, message_id) = match q.message.as_ref() {
        Some(m) => (m.chat().id, Some(m.id())),
        None => {
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };
    let user_id = i64::try_from(q.from.id.0).unwrap_or(0);

    match action {
        CallbackAction::MainMenu => {
            bot.answer_callback_query(q.id.clone()).await?;
            dialogue.update(ChatState::Idle).await?;
            bot.send_message(chat_id, GREETING)
                .reply_markup(keyboards::main_menu())
                .await?;
        }
        CallbackAction::Category { id } => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_category(bot, chat_id, message_id, id, 0, deps).await?;
        }
        CallbackAction::CategoryPage { page } => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_root_catalog(bot, chat_id, message_id, page, deps).await?;
        }
        CallbackAction::Subcategory { id } => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_category_products(bot, chat_id, message_id, id, deps).await?;
        }
        CallbackAction::SubcategoryPage { id, page } => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_category(bot, chat_id, message_id, id, page, deps).await?;
        }
        CallbackAction::Product { id } => {
            bot.answer_callback_query(q.id.clone()).await?;
            show_product_card(bot, chat_id, message_id, id, deps).await?;
        }
        CallbackAction::AddToCart { product_id } => {
            bot.answer_callback_query(q.id.clone()).await?;
            send_or_edit(
                bot,
                chat_id,
                message_id,
                "Сколько штук добавить?",
                Some(keyboards::quantity_picker(product_id)),
            )
            .await?;
        }
        CallbackAction::Quantity { product_id, quantity } => {
            if !(1..=config::catalog::MAX_QUANTITY).contains(&quantity) {
                bot.answer_callback_query(q.id.clone())
                    .text("Недопустимое количество")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            bot.answer_callback_query(q.id.clone()).await?;
            let text = format!("Добавить {quantity} шт. в корзину?");
            send_or_edit(bot, chat_id, message_id, &text, Some(keyboards::confirm_add(product_id, quantity))).await?;
        }
        CallbackAction::Confirm { product_id, quantity } => {
            if !(1..=config::catalog::MAX_QUANTITY).contains(&quantity) {
                bot.answer_callback_query(q.id.clone())
                    .text("Недопустимое количество")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            let conn = get_connection(&deps.db_pool)?;
            let Some(product) = catalog::fetch_product(&conn, product_id)? else {
                bot.answer_callback_query(q.id.clone())
                    .text("Товар больше недоступен")
                    .show_alert(true)
                    .await?;
                return Ok(());
            };
            let total_quantity = cart::add_to_cart(&conn, user_id, product_id, quantity)?;
            bot.answer_callback_query(q.id.clone())
                .text(format!("В корзине: {total_quantity} шт."))
                .await?;
            let text = format!("✅ «{}» добавлен в корзину.", product.name);
            let back = CallbackAction::Subcategory { id: product.category_id };
            let markup = keyboards::products(back, &[]);
            send_or_edit(bot, chat_id, message_id, &text, Some(markup)).await?;
        }
        CallbackAction::CartIncrement { line_id } => {
            let conn = get_connection(&deps.db_pool)?;
            match cart::change_quantity(&conn, user_id, line_id, 1)? {
                Some(_) => {
                    bot.answer_callback_query(q.id.clone()).await?;
                    render_cart(bot, chat_id, message_id, user_id, deps).await?;
                }
                None => {
                    bot.answer_callback_query(q.id.clone())
                        .text("Позиция не найдена")
                        .await?;
                }
            }
        }
        CallbackAction::CartDecrement { line_id } => {
            let conn = get_connection(&deps.db_pool)?;
            match cart::change_quantity(&conn, user_id, line_id, -1)? {
                Some(_) => {
                    bot.answer_callback_query(q.id.clone()).await?;
                    render_cart(bot, chat_id, message_id, user_id, deps).await?;
                }
                None => {
                    bot.answer_callback_query(q.id.clone())
                        .text("Позиция не найдена")
                        .await?;
                }
            }
        }
        CallbackAction::CartRemove { line_id } => {
            let conn = get_connection(&deps.db_pool)?;
            cart::remove_line(&conn, user_id, line_id)?;
            bot.answer_callback_query(q.id.clone()).await?;
            render_cart(bot, chat_id, message_id, user_id, deps).await?;
        }
        CallbackAction::CartNoop => {
            bot.answer_callback_query(q.id.clone()).await?;
        }
        CallbackAction::Checkout => {
            let conn = get_connection(&deps.db_pool)?;
            let lines = cart::fetch_active_cart(&conn, user_id)?;
            if lines.is_empty() {
                bot.answer_callback_query(q.id.clone())
                    .text("Корзина пуста")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            bot.answer_callback_query(q.id.clone()).await?;
            dialogue.update(ChatState::AwaitingDeliveryInfo).await?;
            bot.send_message(chat_id, ASK_DELIVERY).await?;
        }
        CallbackAction::Paid { order_id } => {
            let conn = get_connection(&deps.db_pool)?;
            let updated = orders::update_order_status(&conn, user_id, order_id, orders::OrderStatus::Paid)?;
            if updated {
                bot.answer_callback_query(q.id.clone())
                    .text("Спасибо! Мы отметили оплату.")
                    .await?;
                send_or_edit(
                    bot,
                    chat_id,
                    message_id,
                    &format!("✅ Заказ #{order_id} отмечен как оплаченный. Мы свяжемся с вами!"),
                    None,
                )
                .await?;
            } else {
                bot.answer_callback_query(q.id.clone())
                    .text("Заказ не найден")
                    .show_alert(true)
                    .await?;
            }
        }
        CallbackAction::FaqEntry { id } => {
            let conn = get_connection(&deps.db_pool)?;
            let Some(entry) = catalog::fetch_faq_entry(&conn, id)? else {
                bot.answer_callback_query(q.id.clone())
                    .text("Вопрос больше недоступен")
                    .show_alert(true)
                    .await?;
                return Ok(());
            };
            bot.answer_callback_query(q.id.clone()).await?;
            let text = format!("❓ {}\n\n{}", entry.question, entry.answer);
            send_or_edit(bot, chat_id, message_id, &text, Some(keyboards::faq_answer())).await?;
        }
        CallbackAction::FaqAll | CallbackAction::FaqBackToList => {
            let conn = get_connection(&deps.db_pool)?;
            let entries = catalog::fetch_all_faq(&conn)?;
            bot.answer_callback_query(q.id.clone()).await?;
            if entries.is_empty() {
                send_or_edit(bot, chat_id, message_id, "Пока в FAQ нет ни одного вопроса.", None).await?;
            } else {
                send_or_edit(
                    bot,
                    chat_id,
                    message_id,
                    "📃 Частые вопросы:",
                    Some(keyboards::faq_list(&entries, false)),
                )
                .await?;
            }
        }
    }
    Ok(())
}

/// Правит существующее сообщение либо шлёт новое, если править нечего
/// (например, исходное сообщение стало недоступно).
async fn send_or_edit(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    text: &str,
    markup: Option<teloxide::types::InlineKeyboardMarkup>,
) -> HandlerResult {
    if let Some(message_id) = message_id {
        let mut req = bot.edit_message_text(chat_id, message_id, text);
        if let Some(markup) = markup.clone() {
            req = req.reply_markup(markup);
        }
        match req.await {
            Ok(_) => return Ok(()),
            // Telegram отвечает ошибкой на правку тем же текстом; шлём новое
            Err(err) => log::debug!("Правка сообщения не удалась, отправляю новое: {err}"),
        }
    }

    let mut req = bot.send_message(chat_id, text);
    if let Some(markup) = markup {
        req = req.reply_markup(markup);
    }
    req.await?;
    Ok(())
}
