//! Message rendering for classified leads.
//!
//! The operator message is Telegram Markdown with a fixed layout: every
//! question line is always present, unanswered ones are left blank.

use crate::pipeline::types::{AnswerSet, UrgencyTier};

/// Question captions in form order.
const QUESTION_CAPTIONS: [(u8, &str); 6] = [
    (1, "Для кого"),
    (2, "Участок"),
    (3, "Площадь"),
    (4, "Материал"),
    (5, "Бюджет"),
    (6, "Сроки"),
];

const CLIENT_MESSAGE_VIP: &str = "Здравствуйте! Ваша заявка получила VIP-статус. Наш лучший специалист уже изучает ваши ответы и свяжется с вами в течение 15 минут для детального обсуждения проекта. Ваш персональный каталог и скидка уже формируются! С уважением, команда «Тектоника».";

const CLIENT_MESSAGE_STANDARD: &str = "Здравствуйте! Мы получили вашу заявку, спасибо за интерес к нашей компании! Наш менеджер свяжется с вами в ближайшее рабочее время для консультации. А пока мы готовим для вас смету и каталог проектов. С уважением, команда «Тектоника».";

/// Rendered messages for one lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessages {
    /// Detail message for the sales team.
    pub operator_message: String,
    /// Acknowledgement shown or sent to the client.
    pub client_message: String,
}

/// Render both messages. Never fails; missing answers render empty.
pub fn render(tier: UrgencyTier, phone: &str, answers: &AnswerSet) -> RenderedMessages {
    RenderedMessages {
        operator_message: operator_message(tier, phone, answers),
        client_message: client_message(tier).to_string(),
    }
}

/// Client acknowledgement: VIP for hot leads, standard otherwise.
pub fn client_message(tier: UrgencyTier) -> &'static str {
    match tier {
        UrgencyTier::Hot => CLIENT_MESSAGE_VIP,
        UrgencyTier::Warm | UrgencyTier::Cold => CLIENT_MESSAGE_STANDARD,
    }
}

fn operator_message(tier: UrgencyTier, phone: &str, answers: &AnswerSet) -> String {
    let mut msg = String::with_capacity(512);

    msg.push_str(&format!("📌 *Новый лид ({})* 📌\n\n", tier.display_label()));
    msg.push_str(&format!(
        "*Контакт:* [{}](tel:{})\n\n",
        phone,
        phone_digits(phone)
    ));

    msg.push_str("*Ответы на вопросы:*\n");
    for (question, caption) in QUESTION_CAPTIONS {
        msg.push_str(&format!(
            "{}. {}: {}\n",
            question,
            caption,
            answers.get(question)
        ));
    }

    msg.push_str(&format!("\n*Рекомендации:* {}", tier.recommendation()));
    msg
}

/// Digits of a phone number, for `tel:` links.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}
