//! Reply to Telegram message mapping.

use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup, ReplyMarkup};

use crate::conversation::reply::Reply;

/// Sends one reply, attaching its keyboard as a resized reply keyboard.
pub async fn send_reply(
    bot: &Bot,
    chat_id: ChatId,
    reply: &Reply,
) -> Result<(), teloxide::RequestError> {
    let mut request = bot.send_message(chat_id, reply.text.clone());

    if let Some(rows) = &reply.keyboard {
        let keyboard = KeyboardMarkup::new(
            rows.iter()
                .map(|row| row.iter().cloned().map(KeyboardButton::new).collect::<Vec<_>>()),
        )
        .resize_keyboard();
        request = request.reply_markup(ReplyMarkup::Keyboard(keyboard));
    }

    request.await?;
    Ok(())
}
