//! Сборка клавиатур: главное меню, каталог, корзина, оплата, FAQ.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

use crate::core::config;
use crate::storage::cart::CartLine;
use crate::storage::catalog::{Category, FaqEntry, Product};
use crate::telegram::callback::CallbackAction;

pub const MENU_CATALOG: &str = "🛍 Каталог";
pub const MENU_CART: &str = "🛒 Корзина";
pub const MENU_FAQ: &str = "❓ FAQ";

/// Постоянное меню-клавиатура под полем ввода.
pub fn main_menu() -> KeyboardMarkup {
    KeyboardMarkup::new([
        [KeyboardButton::new(MENU_CATALOG)],
        [KeyboardButton::new(MENU_CART)],
        [KeyboardButton::new(MENU_FAQ)],
    ])
    .resize_keyboard()
}

fn action_button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.encode())
}

/// Срез страницы: элементы страницы `page` плюс флаги наличия соседних
/// страниц. Страницы нумеруются с нуля; выход за последнюю страницу
/// прижимается к ней.
pub fn paginate<T>(items: &[T], page: usize) -> (&[T], usize, bool, bool) {
    let page_size = config::catalog::PAGE_SIZE;
    let last_page = items.len().saturating_sub(1) / page_size.max(1);
    let page = page.min(last_page);
    let start = page * page_size;
    let end = (start + page_size).min(items.len());
    (&items[start..end], page, page > 0, page < last_page)
}

fn pager_row(
    page: usize,
    has_prev: bool,
    has_next: bool,
    to_action: impl Fn(usize) -> CallbackAction,
) -> Vec<InlineKeyboardButton> {
    let mut row = Vec::new();
    if has_prev {
        row.push(action_button("⬅️", to_action(page - 1)));
    }
    if has_next {
        row.push(action_button("➡️", to_action(page + 1)));
    }
    row
}

/// Клавиатура корневых категорий с постраничной навигацией.
pub fn root_categories(categories: &[Category], page: usize) -> InlineKeyboardMarkup {
    let (visible, page, has_prev, has_next) = paginate(categories, page);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = visible
        .iter()
        .map(|c| vec![action_button(&c.name, CallbackAction::Category { id: c.id })])
        .collect();

    let pager = pager_row(page, has_prev, has_next, |page| CallbackAction::CategoryPage { page });
    if !pager.is_empty() {
        rows.push(pager);
    }
    rows.push(vec![action_button("🏠 Главное меню", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(rows)
}

/// Клавиатура подкатегорий выбранной категории.
pub fn subcategories(parent_id: i64, categories: &[Category], page: usize) -> InlineKeyboardMarkup {
    let (visible, page, has_prev, has_next) = paginate(categories, page);
    let mut rows: Vec<Vec<InlineKeyboardButton>> = visible
        .iter()
        .map(|c| vec![action_button(&c.name, CallbackAction::Subcategory { id: c.id })])
        .collect();

    let pager = pager_row(page, has_prev, has_next, |page| CallbackAction::SubcategoryPage {
        id: parent_id,
        page,
    });
    if !pager.is_empty() {
        rows.push(pager);
    }
    rows.push(vec![action_button("⬅️ К категориям", CallbackAction::CategoryPage { page: 0 })]);
    InlineKeyboardMarkup::new(rows)
}

/// Список товаров раздела; `back` — куда ведёт кнопка «Назад».
pub fn products(back: CallbackAction, products: &[Product]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|p| {
            vec![action_button(
                format!("{} — {} ₽", p.name, p.price),
                CallbackAction::Product { id: p.id },
            )]
        })
        .collect();
    rows.push(vec![action_button("⬅️ Назад", back)]);
    InlineKeyboardMarkup::new(rows)
}

/// Карточка товара: в корзину / назад к списку.
pub fn product_card(product: &Product) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![action_button(
            "🛒 В корзину",
            CallbackAction::AddToCart { product_id: product.id },
        )],
        vec![action_button(
            "⬅️ Назад",
            CallbackAction::Subcategory { id: product.category_id },
        )],
    ])
}

/// Выбор количества 1..=MAX_QUANTITY, по пять кнопок в ряд.
pub fn quantity_picker(product_id: i64) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut row = Vec::new();
    for quantity in 1..=config::catalog::MAX_QUANTITY {
        row.push(action_button(
            quantity.to_string(),
            CallbackAction::Quantity { product_id, quantity },
        ));
        if row.len() == 5 {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows.push(vec![action_button("⬅️ Назад", CallbackAction::Product { id: product_id })]);
    InlineKeyboardMarkup::new(rows)
}

/// Подтверждение добавления в корзину.
pub fn confirm_add(product_id: i64, quantity: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![action_button(
            "✅ Подтвердить",
            CallbackAction::Confirm { product_id, quantity },
        )],
        vec![action_button(
            "⬅️ Назад",
            CallbackAction::AddToCart { product_id },
        )],
    ])
}

/// Клавиатура корзины: ряд −/кол-во/+/✖ на позицию, затем оформление.
pub fn cart(lines: &[CartLine]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = lines
        .iter()
        .map(|line| {
            vec![
                action_button("➖", CallbackAction::CartDecrement { line_id: line.id }),
                action_button(format!("{} × {}", line.quantity, line.product_name), CallbackAction::CartNoop),
                action_button("➕", CallbackAction::CartIncrement { line_id: line.id }),
                action_button("✖️", CallbackAction::CartRemove { line_id: line.id }),
            ]
        })
        .collect();
    rows.push(vec![action_button("📦 Оформить заказ", CallbackAction::Checkout)]);
    rows.push(vec![action_button("🏠 Главное меню", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(rows)
}

/// Заглушка оплаты: внешняя ссылка и кнопка «Я оплатил».
pub fn payment(order_id: i64) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    let pay_url = format!("{}/{order_id}", config::PAYMENT_URL_BASE.trim_end_matches('/'));
    if let Ok(url) = url::Url::parse(&pay_url) {
        rows.push(vec![InlineKeyboardButton::url("💳 Оплатить", url)]);
    }
    rows.push(vec![action_button("✅ Я оплатил", CallbackAction::Paid { order_id })]);
    InlineKeyboardMarkup::new(rows)
}

/// Приглашение подписаться на канал магазина.
pub fn subscribe_prompt() -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(link) = config::CHANNEL_LINK.as_ref() {
        if let Ok(url) = url::Url::parse(link) {
            rows.push(vec![InlineKeyboardButton::url("📢 Подписаться", url)]);
        }
    }
    rows.push(vec![action_button("🔄 Я подписался", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(rows)
}

/// Список вопросов FAQ (результаты поиска или весь список).
pub fn faq_list(entries: &[FaqEntry], show_all_button: bool) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = entries
        .iter()
        .map(|e| vec![action_button(&e.question, CallbackAction::FaqEntry { id: e.id })])
        .collect();
    if show_all_button {
        rows.push(vec![action_button("📃 Все вопросы", CallbackAction::FaqAll)]);
    }
    rows.push(vec![action_button("🏠 Главное меню", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(rows)
}

/// Клавиатура под ответом FAQ.
pub fn faq_answer() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        vec![action_button("⬅️ К вопросам", CallbackAction::FaqBackToList)],
        vec![action_button("🏠 Главное меню", CallbackAction::MainMenu)],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_splits_into_pages_of_five() {
        let items: Vec<i32> = (0..12).collect();
        let (page0, idx, prev, next) = paginate(&items, 0);
        assert_eq!((page0.len(), idx, prev, next), (5, 0, false, true));

        let (page2, idx, prev, next) = paginate(&items, 2);
        assert_eq!(page2, &[10, 11]);
        assert_eq!((idx, prev, next), (2, true, false));
    }

    #[test]
    fn paginate_clamps_past_the_end() {
        let items: Vec<i32> = (0..7).collect();
        let (page, idx, prev, next) = paginate(&items, 99);
        assert_eq!(page, &[5, 6]);
        assert_eq!((idx, prev, next), (1, true, false));
    }

    #[test]
    fn paginate_handles_empty_list() {
        let items: Vec<i32> = vec![];
        let (page, idx, prev, next) = paginate(&items, 0);
        assert!(page.is_empty());
        assert_eq!((idx, prev, next), (0, false, false));
    }

    #[test]
    fn quantity_picker_offers_full_range() {
        let markup = quantity_picker(1);
        let buttons: usize = markup.inline_keyboard.iter().map(|row| row.len()).sum();
        // 10 количеств + кнопка «Назад»
        assert_eq!(buttons, config::catalog::MAX_QUANTITY as usize + 1);
    }
}
