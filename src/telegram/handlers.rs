//! Dispatcher schema for the Telegram transport.
//!
//! The schema stays thin: map the message in, hand it to the channel
//! dispatcher, map the replies out. All conversation logic lives behind
//! `ChannelDispatcher`.

use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::conversation::dispatcher::ChannelDispatcher;
use crate::conversation::reply::Reply;
use crate::i18n;
use crate::telegram::{inbound, outbound};

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Dependencies shared by every handler invocation.
#[derive(Clone)]
pub struct HandlerDeps {
    pub dispatcher: Arc<ChannelDispatcher>,
    pub bot_id: i64,
}

/// The full handler tree, usable in production and in tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry().branch(Update::filter_message().endpoint(
        move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                handle_message(&bot, &msg, &deps).await;
                Ok::<(), HandlerError>(())
            }
        },
    ))
}

async fn handle_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) {
    let Some(update) = inbound::inbound_update(msg, deps.bot_id) else {
        return;
    };

    let replies = match deps.dispatcher.dispatch(&update).await {
        Ok(replies) => replies,
        Err(e) => {
            log::error!("dispatch failed for chat {}: {e}", msg.chat.id);
            let lang = i18n::lang_from_update(update.language_code.as_deref());
            vec![Reply::text(i18n::t(&lang, "reply.failed"))]
        }
    };

    for reply in &replies {
        if let Err(e) = outbound::send_reply(bot, msg.chat.id, reply).await {
            log::error!("failed to send reply to chat {}: {e}", msg.chat.id);
        }
    }
}
