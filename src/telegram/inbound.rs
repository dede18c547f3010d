//! Telegram message to platform-agnostic update mapping.

use teloxide::types::Message;

use crate::conversation::dispatcher::InboundUpdate;

/// Maps a Telegram message into the dispatcher's inbound form. Messages
/// without a sender (channel posts) and messages from bots are dropped.
pub fn inbound_update(msg: &Message, bot_id: i64) -> Option<InboundUpdate> {
    let from = msg.from.as_ref()?;
    if from.is_bot {
        return None;
    }

    Some(InboundUpdate {
        messenger_user_id: from.id.0 as i64,
        chat_id: msg.chat.id.0,
        bot_id,
        text: msg.text().map(str::to_string),
        language_code: from.language_code.clone(),
    })
}
