//! User-facing chat message texts.

use crate::domain::foundation::Money;

pub fn balance_topped_up(amount: Money, balance: Money) -> String {
    format!(
        "✅ Баланс успешно пополнен на {}₽\nТекущий баланс: {}₽",
        amount, balance
    )
}

pub fn referral_bonus(bonus: Money) -> String {
    format!(
        "💰 Вам начислен реферальный бонус: {}₽ за пополнение друга!",
        bonus
    )
}

pub fn referral_program(invited: u64, earned: Money, link: &str) -> String {
    format!(
        "🤝 Партнерская программа\n\nПриглашай друзей и получай бонусы!\n\n👥 Приглашено: {}\n💰 Заработано: {}₽\n\n🔗 Твоя ссылка:\n{}",
        invited, earned, link
    )
}

pub fn access_link(url: &str) -> String {
    format!(
        "✅ Оплата прошла успешно!\n\nТвоя ссылка на VPN:\n{}\n\nПриятного пользования!",
        url
    )
}

pub fn access_link_unavailable() -> String {
    "✅ Оплата прошла успешно! Но возникла проблема при получении ссылки на конфиг. Напишите в поддержку."
        .to_string()
}

pub fn expiry_warning() -> String {
    "⚠️ Ваша подписка истекает через сутки! Пожалуйста, продлите её, чтобы не потерять доступ."
        .to_string()
}

pub fn expired() -> String {
    "❌ Ваша подписка истекла. Доступ к VPN заблокирован. Продлите подписку в меню 'Купить VPN'."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topup_message_shows_both_amounts() {
        let text = balance_topped_up(Money::from_major(100), Money::from_minor(14550));
        assert!(text.contains("100.00₽"));
        assert!(text.contains("145.50₽"));
    }

    #[test]
    fn referral_program_lists_stats_and_link() {
        let text = referral_program(3, Money::from_minor(4500), "https://t.me/bot?start=ref_1");
        assert!(text.contains("Приглашено: 3"));
        assert!(text.contains("45.00₽"));
        assert!(text.ends_with("https://t.me/bot?start=ref_1"));
    }

    #[test]
    fn access_link_embeds_url() {
        assert!(access_link("https://vpn.example/sub/x").contains("https://vpn.example/sub/x"));
    }
}
