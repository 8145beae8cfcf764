//! Prelude module for convenient imports

pub use crate::channel::CommandChannel;
pub use crate::error::{ChannelError, ChannelResult};
pub use crate::protocol::{
    ChannelConfig, CommandKind, CommandRequest, Response, ResponseStatus, StatusSnapshot,
    RESPONSE_DATA_WORDS,
};
pub use crate::DEFAULT_SHM_NAME;
