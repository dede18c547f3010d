//! Telegram transport: bot setup, inbound/outbound mapping and the
//! dispatcher schema.

pub mod bot;
pub mod handlers;
pub mod inbound;
pub mod outbound;

pub use bot::{create_bot, setup_bot_commands};
pub use handlers::{schema, HandlerDeps, HandlerError};
