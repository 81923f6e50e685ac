//! # Messenger Outgoing Message Schemas
//!
//! Payloads accepted by the send API (`POST /me/messages`). A call carries
//! either a `message` or a `sender_action` for one recipient.

use serde::{Deserialize, Serialize};

/// Message or sender action addressed to one user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutboundMessage {
    pub recipient: Recipient,
    #[serde(flatten)]
    pub body: OutboundBody,
}

impl OutboundMessage {
    /// Plain text message
    pub fn text(recipient_id: &str, text: impl Into<String>) -> Self {
        Self::message(recipient_id, MessageContent::text(text))
    }

    pub fn message(recipient_id: &str, content: MessageContent) -> Self {
        Self {
            recipient: Recipient::new(recipient_id),
            body: OutboundBody::Message(content),
        }
    }

    pub fn sender_action(recipient_id: &str, action: SenderAction) -> Self {
        Self {
            recipient: Recipient::new(recipient_id),
            body: OutboundBody::SenderAction(action),
        }
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    pub id: String,
}

impl Recipient {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

/// Serialized as a `message` or `sender_action` key next to `recipient`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OutboundBody {
    Message(MessageContent),
    SenderAction(SenderAction),
}

/// Indicators shown to the user while the page works
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    MarkSeen,
    TypingOn,
    TypingOff,
}

/// Content of a `message` call
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        quick_replies: Vec<QuickReply>,
    },
    Attachment {
        attachment: Attachment,
    },
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text {
            text: text.into(),
            metadata: None,
            quick_replies: Vec::new(),
        }
    }

    pub fn attachment(attachment: Attachment) -> Self {
        MessageContent::Attachment { attachment }
    }
}

/// Tappable suggestion shown under a text message
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuickReply {
    pub content_type: String,
    pub title: String,
    pub payload: String,
}

impl QuickReply {
    pub fn text(title: &str, payload: &str) -> Self {
        Self {
            content_type: "text".into(),
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// Media sent by URL or a structured template
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Attachment {
    Image(MediaPayload),
    Audio(MediaPayload),
    Video(MediaPayload),
    File(MediaPayload),
    Template(Template),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MediaPayload {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "template_type", rename_all = "snake_case")]
pub enum Template {
    Button {
        text: String,
        buttons: Vec<Button>,
    },
    Generic {
        elements: Vec<GenericElement>,
    },
    Receipt(Box<ReceiptTemplate>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Button {
    WebUrl { url: String, title: String },
    Postback { title: String, payload: String },
    PhoneNumber { title: String, payload: String },
    AccountLink { url: String },
}

/// Card of a generic template
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenericElement {
    pub title: String,
    pub subtitle: String,
    pub item_url: String,
    pub image_url: String,
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReceiptTemplate {
    pub recipient_name: String,
    pub order_number: String,
    pub currency: String,
    pub payment_method: String,
    pub timestamp: String,
    pub elements: Vec<ReceiptElement>,
    pub address: Address,
    pub summary: Summary,
    pub adjustments: Vec<Adjustment>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReceiptElement {
    pub title: String,
    pub subtitle: String,
    pub quantity: u32,
    pub price: f64,
    pub currency: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Address {
    pub street_1: String,
    pub street_2: String,
    pub city: String,
    pub postal_code: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub subtotal: f64,
    pub shipping_cost: f64,
    pub total_tax: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Adjustment {
    pub name: String,
    pub amount: f64,
}

/// Successful send API response. Sender actions only return the recipient.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SendApiResponse {
    pub recipient_id: String,
    #[serde(default)]
    pub message_id: Option<String>,
}
