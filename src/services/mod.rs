use crate::webhook::messenger::outgoing_schemas::OutboundMessage;
use async_trait::async_trait;
use derive_more::{Display, Error};

/// Accepted send API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub recipient_id: String,
    /// Missing for sender actions
    pub message_id: Option<String>,
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The platform answered with a non-2xx status
    #[display("send API returned {status}: {body}")]
    Rejected {
        status: u16,
        #[error(not(source))]
        body: String,
    },
    /// Request never got a usable answer (connection, timeout, decoding)
    #[display("send API call failed: {_0}")]
    Transport(#[error(not(source))] String),
}

/// Outbound side of the relay: one best-effort call per message, no retry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSender {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, SendError>;
}

pub type ImplMessageSender = Box<dyn MessageSender>;
