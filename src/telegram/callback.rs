//! Типизированные callback-данные инлайн-клавиатур.
//!
//! На проводе — компактный формат с подчёркиваниями (`cat_5`, `qty_5_3`,
//! `cart_incr_7`), внутри бота — закрытый enum. Обработчики никогда не
//! разбирают строки сами: всё, что не парсится, превращается в `None`
//! и гасится без побочных эффектов.

/// Действие, закодированное в callback-данных кнопки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Возврат в главное меню
    MainMenu,
    /// Открыть категорию (показать подкатегории)
    Category { id: i64 },
    /// Страница списка корневых категорий
    CategoryPage { page: usize },
    /// Открыть подкатегорию (показать товары)
    Subcategory { id: i64 },
    /// Страница списка подкатегорий внутри категории
    SubcategoryPage { id: i64, page: usize },
    /// Карточка товара
    Product { id: i64 },
    /// Начать добавление товара: показать выбор количества
    AddToCart { product_id: i64 },
    /// Выбрано количество, показать подтверждение
    Quantity { product_id: i64, quantity: i64 },
    /// Подтверждено: положить в корзину
    Confirm { product_id: i64, quantity: i64 },
    /// Увеличить количество позиции корзины
    CartIncrement { line_id: i64 },
    /// Уменьшить количество позиции корзины
    CartDecrement { line_id: i64 },
    /// Убрать позицию из корзины
    CartRemove { line_id: i64 },
    /// Неактивная кнопка-счётчик в корзине
    CartNoop,
    /// Начать оформление заказа
    Checkout,
    /// «Я оплатил» для заказа
    Paid { order_id: i64 },
    /// Показать ответ на вопрос FAQ
    FaqEntry { id: i64 },
    /// Показать весь список FAQ
    FaqAll,
    /// Вернуться к списку найденных вопросов
    FaqBackToList,
}

impl CallbackAction {
    /// Сериализует действие в callback-данные кнопки.
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::MainMenu => "back_to_main_menu".to_string(),
            CallbackAction::Category { id } => format!("cat_{id}"),
            CallbackAction::CategoryPage { page } => format!("cat_page_{page}"),
            CallbackAction::Subcategory { id } => format!("subcat_{id}"),
            CallbackAction::SubcategoryPage { id, page } => format!("subcat_{id}_page_{page}"),
            CallbackAction::Product { id } => format!("product_{id}"),
            CallbackAction::AddToCart { product_id } => format!("addcart_{product_id}"),
            CallbackAction::Quantity { product_id, quantity } => format!("qty_{product_id}_{quantity}"),
            CallbackAction::Confirm { product_id, quantity } => format!("confirm_{product_id}_{quantity}"),
            CallbackAction::CartIncrement { line_id } => format!("cart_incr_{line_id}"),
            CallbackAction::CartDecrement { line_id } => format!("cart_decr_{line_id}"),
            CallbackAction::CartRemove { line_id } => format!("delcart_{line_id}"),
            CallbackAction::CartNoop => "cart_noop".to_string(),
            CallbackAction::Checkout => "order".to_string(),
            CallbackAction::Paid { order_id } => format!("paid_{order_id}"),
            CallbackAction::FaqEntry { id } => format!("faq_{id}"),
            CallbackAction::FaqAll => "faq_all".to_string(),
            CallbackAction::FaqBackToList => "faq_back_to_list".to_string(),
        }
    }

    /// Разбирает callback-данные. Неизвестный или искажённый формат — `None`.
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "back_to_main_menu" => return Some(CallbackAction::MainMenu),
            "cart_noop" => return Some(CallbackAction::CartNoop),
            "order" => return Some(CallbackAction::Checkout),
            "faq_all" => return Some(CallbackAction::FaqAll),
            "faq_back_to_list" => return Some(CallbackAction::FaqBackToList),
            _ => {}
        }

        // Префиксы проверяются от более специфичных к менее специфичным:
        // `cat_page_2` не должен разобраться как `cat_{id}`.
        if let Some(rest) = data.strip_prefix("cat_page_") {
            return Some(CallbackAction::CategoryPage { page: rest.parse().ok()? });
        }
        if let Some(rest) = data.strip_prefix("subcat_") {
            return if let Some((id, page)) = rest.split_once("_page_") {
                Some(CallbackAction::SubcategoryPage {
                    id: id.parse().ok()?,
                    page: page.parse().ok()?,
                })
            } else {
                Some(CallbackAction::Subcategory { id: rest.parse().ok()? })
            };
        }
        if let Some(rest) = data.strip_prefix("cat_") {
            return Some(CallbackAction::Category { id: rest.parse().ok()? });
        }
        if let Some(rest) = data.strip_prefix("product_") {
            return Some(CallbackAction::Product { id: rest.parse().ok()? });
        }
        if let Some(rest) = data.strip_prefix("addcart_") {
            return Some(CallbackAction::AddToCart { product_id: rest.parse().ok()? });
        }
        if let Some(rest) = data.strip_prefix("qty_") {
            let (product, quantity) = rest.split_once('_')?;
            return Some(CallbackAction::Quantity {
                product_id: product.parse().ok()?,
                quantity: quantity.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("confirm_") {
            let (product, quantity) = rest.split_once('_')?;
            return Some(CallbackAction::Confirm {
                product_id: product.parse().ok()?,
                quantity: quantity.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("cart_incr_") {
            return Some(CallbackAction::CartIncrement { line_id: rest.parse().ok()? });
        }
        if let Some(rest) = data.strip_prefix("cart_decr_") {
            return Some(CallbackAction::CartDecrement { line_id: rest.parse().ok()? });
        }
        if let Some(rest) = data.strip_prefix("delcart_") {
            return Some(CallbackAction::CartRemove { line_id: rest.parse().ok()? });
        }
        if let Some(rest) = data.strip_prefix("paid_") {
            return Some(CallbackAction::Paid { order_id: rest.parse().ok()? });
        }
        if let Some(rest) = data.strip_prefix("faq_") {
            return Some(CallbackAction::FaqEntry { id: rest.parse().ok()? });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_wire_format() {
        assert_eq!(CallbackAction::Category { id: 5 }.encode(), "cat_5");
        assert_eq!(CallbackAction::CategoryPage { page: 2 }.encode(), "cat_page_2");
        assert_eq!(
            CallbackAction::SubcategoryPage { id: 5, page: 2 }.encode(),
            "subcat_5_page_2"
        );
        assert_eq!(
            CallbackAction::Quantity { product_id: 5, quantity: 3 }.encode(),
            "qty_5_3"
        );
        assert_eq!(CallbackAction::CartIncrement { line_id: 7 }.encode(), "cart_incr_7");
        assert_eq!(CallbackAction::Paid { order_id: 9 }.encode(), "paid_9");
    }

    #[test]
    fn round_trips_every_variant() {
        let actions = [
            CallbackAction::MainMenu,
            CallbackAction::Category { id: 1 },
            CallbackAction::CategoryPage { page: 3 },
            CallbackAction::Subcategory { id: 12 },
            CallbackAction::SubcategoryPage { id: 12, page: 0 },
            CallbackAction::Product { id: 44 },
            CallbackAction::AddToCart { product_id: 44 },
            CallbackAction::Quantity { product_id: 44, quantity: 10 },
            CallbackAction::Confirm { product_id: 44, quantity: 2 },
            CallbackAction::CartIncrement { line_id: 8 },
            CallbackAction::CartDecrement { line_id: 8 },
            CallbackAction::CartRemove { line_id: 8 },
            CallbackAction::CartNoop,
            CallbackAction::Checkout,
            CallbackAction::Paid { order_id: 15 },
            CallbackAction::FaqEntry { id: 2 },
            CallbackAction::FaqAll,
            CallbackAction::FaqBackToList,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.encode()), Some(action));
        }
    }

    #[test]
    fn page_prefix_wins_over_category_id() {
        // "cat_page_2" не должен стать Category { id: ... }
        assert_eq!(
            CallbackAction::parse("cat_page_2"),
            Some(CallbackAction::CategoryPage { page: 2 })
        );
        assert_eq!(
            CallbackAction::parse("subcat_5_page_2"),
            Some(CallbackAction::SubcategoryPage { id: 5, page: 2 })
        );
    }

    #[test]
    fn garbage_parses_to_none() {
        for data in ["", "cat_", "cat_abc", "qty_5", "qty_5_", "confirm__2", "unknown_9", "paid_"] {
            assert_eq!(CallbackAction::parse(data), None, "{data:?}");
        }
    }
}
