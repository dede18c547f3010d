//! The conversation engine: per-chat step machines, their persisted state
//! and the dispatcher that routes inbound updates into them.

pub mod create;
pub mod dispatcher;
pub mod machine;
pub mod reply;
pub mod search;
pub mod state;
pub mod transfer;
pub mod validator;

pub use dispatcher::{ChannelDispatcher, InboundUpdate};
pub use machine::{ConversationStepMachine, MachineContext, Next, Turn};
pub use reply::{Reply, ReplyBuilder};
pub use state::{
    decode_state, encode_state, ConversationKind, ConversationState, CreateState, Rating,
    SearchState, STATE_SCHEMA_VERSION,
};
pub use transfer::{Messenger, SearchTermTransfer, SearchTermType};
