//! Feedbot: a Telegram bot for looking up and leaving feedback on people
//! and accounts (usernames, phone numbers, emails, links, names).
//!
//! The core is a persisted, per-chat conversation engine: each chat tuple
//! has at most one active conversation, driven step by step by a machine
//! per conversation kind. State survives restarts in SQLite; the Telegram
//! layer is a thin transport over the platform-agnostic dispatcher.

pub mod conversation;
pub mod core;
pub mod i18n;
pub mod parsers;
pub mod search;
pub mod storage;
pub mod telegram;
